//! Query executor for OpalDB
//!
//! Statement dispatch, predicate compilation, expression evaluation,
//! join materialization, projection, and LIMIT/OFFSET handling.

use crate::catalog::{Column, DataType, Database, ForeignKey, Schema};
use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::sql::Parser;
use crate::storage::{Row, Table, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

static NUMERIC_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+\.?\d*$").expect("valid literal pattern"));

/// Query result returned to the embedder
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Result rows, rendered as text
    pub rows: Vec<Vec<String>>,
    /// Number of affected rows (for INSERT/UPDATE/DELETE)
    pub rows_affected: usize,
    /// Human-readable message
    pub message: String,
}

impl QueryResult {
    /// Create a new empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a result carrying only a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Create a result with an affected-row count
    pub fn with_rows_affected(count: usize, message: impl Into<String>) -> Self {
        Self {
            rows_affected: count,
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Alias-keyed table and column-offset maps for a joined row
struct JoinContext {
    tables: HashMap<String, Arc<Table>>,
    offsets: HashMap<String, usize>,
    /// Lookup names in registration order, for wildcard expansion
    ordered: Vec<String>,
}

impl JoinContext {
    fn new() -> Self {
        Self {
            tables: HashMap::new(),
            offsets: HashMap::new(),
            ordered: Vec::new(),
        }
    }

    fn register(&mut self, lookup: String, table: Arc<Table>, offset: usize) {
        self.tables.insert(lookup.clone(), table);
        self.offsets.insert(lookup.clone(), offset);
        self.ordered.push(lookup);
    }
}

/// The query executor: parses statement text and runs it against the
/// catalog.
pub struct Executor {
    db: Arc<Database>,
}

impl Executor {
    /// Create a new executor over a database
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The underlying database
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Lex, parse, and execute a single SQL statement
    pub fn execute(&self, sql: &str) -> Result<QueryResult> {
        debug!(statement = sql.trim(), "executing statement");
        let stmt = Parser::new(sql)?.parse()?;
        self.execute_statement(&stmt)
    }

    /// Execute a parsed statement
    pub fn execute_statement(&self, stmt: &Statement) -> Result<QueryResult> {
        match stmt {
            Statement::Select(s) => self.execute_select(s),
            Statement::Insert(s) => self.execute_insert(s),
            Statement::Update(s) => self.execute_update(s),
            Statement::Delete(s) => self.execute_delete(s),
            Statement::CreateTable(s) => self.execute_create_table(s),
            Statement::DropTable(s) => self.execute_drop_table(s),
            // Transactions parse but have no effect
            Statement::Begin => Ok(QueryResult::with_message("BEGIN TRANSACTION")),
            Statement::Commit => Ok(QueryResult::with_message("COMMIT")),
            Statement::Rollback => Ok(QueryResult::with_message("ROLLBACK")),
        }
    }

    // ========== SELECT ==========

    fn execute_select(&self, stmt: &SelectStatement) -> Result<QueryResult> {
        let primary_ref = stmt
            .tables
            .first()
            .ok_or_else(|| Error::Execution("no table specified in SELECT".to_string()))?;
        let primary = self.db.get_table(&primary_ref.name)?;

        let mut ctx = JoinContext::new();
        let lookup = primary_ref
            .alias
            .clone()
            .unwrap_or_else(|| primary_ref.name.clone());
        ctx.register(lookup, primary.clone(), 0);
        let mut width = primary.schema().column_count();

        // Seed the intermediate rowset; a joinless point query on an
        // indexed column goes through the B-tree instead of a scan.
        let mut rows = if stmt.joins.is_empty() {
            match self.try_index_lookup(&primary, stmt.where_clause.as_ref())? {
                Some(rows) => rows,
                None => primary.select(None),
            }
        } else {
            primary.select(None)
        };

        // Fold joins into the intermediate rowset in order.
        for join in &stmt.joins {
            let target = self.db.get_table(&join.table)?;
            let lookup = join.alias.clone().unwrap_or_else(|| join.table.clone());
            ctx.register(lookup, target.clone(), width);
            let target_width = target.schema().column_count();
            let target_rows = target.select(None);

            let mut joined = Vec::new();
            for left in &rows {
                let mut matched = false;
                for right in &target_rows {
                    let mut values = left.values().to_vec();
                    values.extend(right.values().iter().cloned());
                    let combined = Row::new(values);

                    let mut keep = true;
                    for cond in &join.conditions {
                        let v = self.eval_joined(cond, &combined, &ctx)?;
                        if !v.as_bool() {
                            keep = false;
                            break;
                        }
                    }
                    if keep {
                        joined.push(combined);
                        matched = true;
                    }
                }
                if !matched && join.join_type == JoinType::Left {
                    let mut values = left.values().to_vec();
                    values.extend(std::iter::repeat(Value::Null).take(target_width));
                    joined.push(Row::new(values));
                }
            }
            rows = joined;
            width += target_width;
        }

        // WHERE filter over the fully joined rows. Column references are
        // resolved up front so a bad name fails even on an empty table.
        if let Some(where_clause) = &stmt.where_clause {
            self.validate_joined(where_clause, &ctx)?;
            let mut filtered = Vec::with_capacity(rows.len());
            for row in rows {
                if self.eval_joined(where_clause, &row, &ctx)?.as_bool() {
                    filtered.push(row);
                }
            }
            rows = filtered;
        }

        if !stmt.order_by.is_empty() {
            let keys: Vec<(usize, bool)> = stmt
                .order_by
                .iter()
                .map(|ob| Ok((self.resolve_column(&ctx, None, &ob.column)?, ob.ascending)))
                .collect::<Result<_>>()?;
            rows.sort_by(|a, b| {
                for (idx, ascending) in &keys {
                    let ord = sort_cmp(&a.values()[*idx], &b.values()[*idx]);
                    let ord = if *ascending { ord } else { ord.reverse() };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        // Projection: expand `*` over every joined table in order, or
        // resolve each requested column to an offset in the concatenation.
        let mut headers = Vec::new();
        let mut projection = Vec::new();
        if stmt.columns == [SelectColumn::Wildcard] {
            for lookup in &ctx.ordered {
                for col in ctx.tables[lookup].schema().columns() {
                    headers.push(col.name.clone());
                }
            }
            projection = (0..width).collect();
        } else {
            for item in &stmt.columns {
                match item {
                    SelectColumn::Wildcard => {
                        return Err(Error::Execution(
                            "'*' cannot be combined with other columns".to_string(),
                        ))
                    }
                    SelectColumn::Column { table, name } => {
                        projection.push(self.resolve_column(&ctx, table.as_deref(), name)?);
                        headers.push(item.header());
                    }
                }
            }
        }

        let mut rendered: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                projection
                    .iter()
                    .map(|&i| row.values()[i].to_string())
                    .collect()
            })
            .collect();

        if stmt.limit.is_some() || stmt.offset.is_some() {
            let offset = stmt.offset.unwrap_or(0);
            if offset >= rendered.len() {
                rendered = Vec::new();
            } else {
                let limit = stmt.limit.unwrap_or(rendered.len() - offset);
                rendered = rendered.into_iter().skip(offset).take(limit).collect();
            }
        }

        Ok(QueryResult {
            columns: headers,
            rows: rendered,
            rows_affected: 0,
            message: String::new(),
        })
    }

    /// Point-lookup fast path: joinless `WHERE column = literal` on an
    /// indexed column of the primary table.
    fn try_index_lookup(
        &self,
        table: &Table,
        where_clause: Option<&Expr>,
    ) -> Result<Option<Vec<Row>>> {
        let Some(Expr::Binary {
            left,
            op: BinaryOp::Eq,
            right,
        }) = where_clause
        else {
            return Ok(None);
        };
        let (Expr::Column { table: qualifier, name }, Expr::Literal(text)) = (&**left, &**right)
        else {
            return Ok(None);
        };
        if qualifier.as_deref().is_some_and(|q| q != table.name()) {
            return Ok(None);
        }
        if !table.has_index(name) {
            return Ok(None);
        }

        let key = classify_literal(text)?;
        trace!(column = name.as_str(), "direct index lookup");
        Ok(Some(table.lookup_by_index(name, &key).into_iter().collect()))
    }

    fn validate_joined(&self, expr: &Expr, ctx: &JoinContext) -> Result<()> {
        match expr {
            Expr::Column { table, name } => self
                .resolve_column(ctx, table.as_deref(), name)
                .map(|_| ()),
            Expr::Binary { left, right, .. } => {
                self.validate_joined(left, ctx)?;
                self.validate_joined(right, ctx)
            }
            Expr::Unary { expr, .. } => self.validate_joined(expr, ctx),
            _ => Ok(()),
        }
    }

    /// Resolve a (possibly qualified) column reference to an offset in
    /// the joined-row concatenation. Unqualified names are searched in
    /// every joined table and fail as ambiguous on multiple hits.
    fn resolve_column(
        &self,
        ctx: &JoinContext,
        qualifier: Option<&str>,
        name: &str,
    ) -> Result<usize> {
        if let Some(q) = qualifier {
            let table = ctx
                .tables
                .get(q)
                .ok_or_else(|| Error::UnknownTableOrAlias(q.to_string()))?;
            let ci = table
                .schema()
                .column_index(name)
                .ok_or_else(|| Error::ColumnNotFound(format!("{}.{}", q, name)))?;
            return Ok(ctx.offsets[q] + ci);
        }

        let mut found = None;
        for (lookup, table) in &ctx.tables {
            if let Some(ci) = table.schema().column_index(name) {
                if found.is_some() {
                    return Err(Error::AmbiguousColumn(name.to_string()));
                }
                found = Some(ctx.offsets[lookup] + ci);
            }
        }
        found.ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    // ========== INSERT ==========

    fn execute_insert(&self, stmt: &InsertStatement) -> Result<QueryResult> {
        let table = self.db.get_table(&stmt.table)?;
        let schema = table.schema();

        for col in &stmt.columns {
            if !schema.has_column(col) {
                return Err(Error::ColumnNotFound(col.clone()));
            }
        }

        let mut inserted = 0;
        for row_exprs in &stmt.values {
            let row = if stmt.columns.is_empty() {
                let mut values = Vec::with_capacity(row_exprs.len());
                for expr in row_exprs {
                    values.push(self.eval_single(expr, schema, None)?);
                }
                Row::new(values)
            } else {
                if row_exprs.len() != stmt.columns.len() {
                    return Err(Error::Execution(format!(
                        "INSERT has {} columns but {} values",
                        stmt.columns.len(),
                        row_exprs.len()
                    )));
                }
                let provided: HashMap<&str, &Expr> = stmt
                    .columns
                    .iter()
                    .map(String::as_str)
                    .zip(row_exprs.iter())
                    .collect();
                let mut values = Vec::with_capacity(schema.column_count());
                for col in schema.columns() {
                    match provided.get(col.name.as_str()) {
                        Some(expr) => values.push(self.eval_single(expr, schema, None)?),
                        None => values.push(col.default.clone().unwrap_or(Value::Null)),
                    }
                }
                Row::new(values)
            };

            self.db.check_foreign_keys(&table, &row)?;
            table.insert(row)?;
            inserted += 1;
        }

        Ok(QueryResult::with_rows_affected(
            inserted,
            format!("{} row(s) inserted", inserted),
        ))
    }

    // ========== UPDATE ==========

    fn execute_update(&self, stmt: &UpdateStatement) -> Result<QueryResult> {
        let table = self.db.get_table(&stmt.table)?;
        let schema = table.schema();

        if let Some(where_clause) = &stmt.where_clause {
            validate_columns(where_clause, schema)?;
        }
        for assignment in &stmt.assignments {
            if !schema.has_column(&assignment.column) {
                return Err(Error::ColumnNotFound(assignment.column.clone()));
            }
            validate_columns(&assignment.value, schema)?;
        }

        let predicate_fn = stmt.where_clause.as_ref().map(|w| {
            move |row: &Row| {
                self.eval_single(w, schema, Some(row))
                    .map(|v| v.as_bool())
                    .unwrap_or(false)
            }
        });
        let predicate = predicate_fn
            .as_ref()
            .map(|f| f as &dyn Fn(&Row) -> bool);

        // Every SET expression is evaluated against the row's pre-update
        // image, then all slots are rewritten.
        let mutator = |row: &mut Row| -> Result<()> {
            let mut changes = Vec::with_capacity(stmt.assignments.len());
            for assignment in &stmt.assignments {
                let ci = schema
                    .column_index(&assignment.column)
                    .ok_or_else(|| Error::ColumnNotFound(assignment.column.clone()))?;
                let value = self.eval_single(&assignment.value, schema, Some(row))?;
                changes.push((ci, value));
            }
            for (ci, value) in changes {
                row.set(ci, value)?;
            }
            Ok(())
        };

        let updated = table.update(predicate, &mutator)?;
        Ok(QueryResult::with_rows_affected(
            updated,
            format!("{} row(s) updated", updated),
        ))
    }

    // ========== DELETE ==========

    fn execute_delete(&self, stmt: &DeleteStatement) -> Result<QueryResult> {
        let table = self.db.get_table(&stmt.table)?;
        let schema = table.schema();

        if let Some(where_clause) = &stmt.where_clause {
            validate_columns(where_clause, schema)?;
        }

        let predicate_fn = stmt.where_clause.as_ref().map(|w| {
            move |row: &Row| {
                self.eval_single(w, schema, Some(row))
                    .map(|v| v.as_bool())
                    .unwrap_or(false)
            }
        });
        let predicate = predicate_fn
            .as_ref()
            .map(|f| f as &dyn Fn(&Row) -> bool);

        let deleted = self.db.delete_from(&stmt.table, predicate)?;
        Ok(QueryResult::with_rows_affected(
            deleted,
            format!("{} row(s) deleted", deleted),
        ))
    }

    // ========== CREATE / DROP TABLE ==========

    fn execute_create_table(&self, stmt: &CreateTableStatement) -> Result<QueryResult> {
        let mut schema = Schema::new();
        for def in &stmt.columns {
            let data_type = DataType::from_name(&def.type_name)
                .ok_or_else(|| Error::UnknownDataType(def.type_name.clone()))?;
            let mut column = Column::new(def.name.clone(), data_type)
                .primary_key(def.primary_key)
                .unique(def.unique)
                .not_null(def.not_null);
            if let Some(expr) = &def.default {
                // Defaults are evaluated without a row context.
                let value = self.eval_single(expr, &schema, None)?;
                column = column.default(value);
            }
            schema.add_column(column);
        }

        self.db.create_table(&stmt.table, schema)?;

        for def in &stmt.foreign_keys {
            let fk = ForeignKey::new(
                def.columns.clone(),
                def.ref_table.clone(),
                def.ref_columns.clone(),
            )
            .on_delete(def.on_delete)
            .on_update(def.on_update);
            if let Err(e) = self.db.add_foreign_key(&stmt.table, fk) {
                let _ = self.db.drop_table(&stmt.table);
                return Err(e);
            }
        }

        Ok(QueryResult::with_message(format!(
            "Table {} created",
            stmt.table
        )))
    }

    fn execute_drop_table(&self, stmt: &DropTableStatement) -> Result<QueryResult> {
        self.db.drop_table(&stmt.table)?;
        Ok(QueryResult::with_message(format!(
            "Table {} dropped",
            stmt.table
        )))
    }

    // ========== Expression evaluation ==========

    /// Evaluate an expression against a joined row, resolving column
    /// references through the join context.
    fn eval_joined(&self, expr: &Expr, row: &Row, ctx: &JoinContext) -> Result<Value> {
        match expr {
            Expr::Literal(text) => classify_literal(text),
            Expr::Null => Ok(Value::Null),
            Expr::Column { table, name } => {
                let idx = self.resolve_column(ctx, table.as_deref(), name)?;
                row.get(idx)
                    .cloned()
                    .ok_or_else(|| Error::Execution(format!("column offset {} out of bounds", idx)))
            }
            Expr::Binary { left, op, right } => {
                let left = self.eval_joined(left, row, ctx)?;
                let right = self.eval_joined(right, row, ctx)?;
                eval_binary(&left, *op, &right)
            }
            Expr::Unary { op, expr } => {
                let value = self.eval_joined(expr, row, ctx)?;
                eval_unary(*op, &value)
            }
        }
    }

    /// Evaluate an expression in single-table context. Without a row,
    /// any column reference is an error.
    fn eval_single(&self, expr: &Expr, schema: &Schema, row: Option<&Row>) -> Result<Value> {
        match expr {
            Expr::Literal(text) => classify_literal(text),
            Expr::Null => Ok(Value::Null),
            Expr::Column { name, .. } => {
                let row = row.ok_or_else(|| {
                    Error::Execution(
                        "cannot evaluate column reference without row context".to_string(),
                    )
                })?;
                let ci = schema
                    .column_index(name)
                    .ok_or_else(|| Error::ColumnNotFound(name.clone()))?;
                row.get(ci)
                    .cloned()
                    .ok_or_else(|| Error::Execution(format!("column index {} out of bounds", ci)))
            }
            Expr::Binary { left, op, right } => {
                let left = self.eval_single(left, schema, row)?;
                let right = self.eval_single(right, schema, row)?;
                eval_binary(&left, *op, &right)
            }
            Expr::Unary { op, expr } => {
                let value = self.eval_single(expr, schema, row)?;
                eval_unary(*op, &value)
            }
        }
    }
}

/// Classify a literal's text into a typed value: a signed decimal with a
/// dot is a float, without one an integer; the words true/false are
/// booleans; anything else is text.
fn classify_literal(text: &str) -> Result<Value> {
    if NUMERIC_LITERAL.is_match(text) {
        if text.contains('.') {
            return text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| Error::InvalidLiteral {
                    expected: "float".to_string(),
                    text: text.to_string(),
                });
        }
        return text
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| Error::InvalidLiteral {
                expected: "integer".to_string(),
                text: text.to_string(),
            });
    }
    if text.eq_ignore_ascii_case("true") {
        return Ok(Value::Boolean(true));
    }
    if text.eq_ignore_ascii_case("false") {
        return Ok(Value::Boolean(false));
    }
    Ok(Value::Text(text.to_string()))
}

fn eval_binary(left: &Value, op: BinaryOp, right: &Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Boolean(left.equals(right))),
        BinaryOp::Neq => Ok(Value::Boolean(!left.equals(right))),
        BinaryOp::Lt => Ok(Value::Boolean(left.less_than(right))),
        BinaryOp::Lte => Ok(Value::Boolean(
            left.less_than(right) || left.equals(right),
        )),
        BinaryOp::Gt => Ok(Value::Boolean(
            !left.less_than(right) && !left.equals(right),
        )),
        BinaryOp::Gte => Ok(Value::Boolean(!left.less_than(right))),
        // AND and OR are truthiness-coerced and do not short-circuit:
        // both sides were already evaluated by the caller.
        BinaryOp::And => Ok(Value::Boolean(left.as_bool() && right.as_bool())),
        BinaryOp::Or => Ok(Value::Boolean(left.as_bool() || right.as_bool())),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            eval_arithmetic(left, op, right)
        }
    }
}

fn eval_arithmetic(left: &Value, op: BinaryOp, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => match op {
            BinaryOp::Add => Ok(Value::Integer(a.wrapping_add(*b))),
            BinaryOp::Sub => Ok(Value::Integer(a.wrapping_sub(*b))),
            BinaryOp::Mul => Ok(Value::Integer(a.wrapping_mul(*b))),
            BinaryOp::Div => {
                if *b == 0 {
                    Err(Error::DivisionByZero)
                } else {
                    Ok(Value::Integer(a / b))
                }
            }
            _ => unreachable!("non-arithmetic operator"),
        },
        (Value::Integer(_), Value::Float(_))
        | (Value::Float(_), Value::Integer(_))
        | (Value::Float(_), Value::Float(_)) => {
            let a = match left {
                Value::Integer(v) => *v as f64,
                Value::Float(v) => *v,
                _ => unreachable!(),
            };
            let b = match right {
                Value::Integer(v) => *v as f64,
                Value::Float(v) => *v,
                _ => unreachable!(),
            };
            match op {
                BinaryOp::Add => Ok(Value::Float(a + b)),
                BinaryOp::Sub => Ok(Value::Float(a - b)),
                BinaryOp::Mul => Ok(Value::Float(a * b)),
                BinaryOp::Div => {
                    if b == 0.0 {
                        Err(Error::DivisionByZero)
                    } else {
                        Ok(Value::Float(a / b))
                    }
                }
                _ => unreachable!("non-arithmetic operator"),
            }
        }
        _ => Err(Error::Execution(format!(
            "arithmetic not supported for {} and {}",
            left.data_type(),
            right.data_type()
        ))),
    }
}

fn eval_unary(op: UnaryOp, value: &Value) -> Result<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Boolean(!value.as_bool())),
        UnaryOp::Neg => match value {
            Value::Integer(i) => Ok(Value::Integer(-i)),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(Error::Execution(format!(
                "unary minus requires a numeric operand, got {}",
                other.data_type()
            ))),
        },
    }
}

/// Ensure every column reference in the expression resolves against the
/// schema, so a bad name aborts the statement instead of silently
/// matching nothing.
fn validate_columns(expr: &Expr, schema: &Schema) -> Result<()> {
    match expr {
        Expr::Column { name, .. } => {
            if schema.has_column(name) {
                Ok(())
            } else {
                Err(Error::ColumnNotFound(name.clone()))
            }
        }
        Expr::Binary { left, right, .. } => {
            validate_columns(left, schema)?;
            validate_columns(right, schema)
        }
        Expr::Unary { expr, .. } => validate_columns(expr, schema),
        _ => Ok(()),
    }
}

/// A total order over values for ORDER BY: values of one tag use their
/// natural order; everything else (including NULL) sorts by tag rank so
/// the comparator stays consistent.
fn sort_cmp(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Integer(_) => 0,
            Value::Float(_) => 1,
            Value::Text(_) => 2,
            Value::Boolean(_) => 3,
            Value::Null => 4,
        }
    }
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
