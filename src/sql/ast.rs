//! SQL abstract syntax tree
//!
//! This module defines the AST nodes for SQL statements and expressions.

use crate::catalog::FkAction;

/// A SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    CreateTable(CreateTableStatement),
    DropTable(DropTableStatement),
    /// BEGIN [TRANSACTION]; parses but has no effect
    Begin,
    /// COMMIT; parses but has no effect
    Commit,
    /// ROLLBACK; parses but has no effect
    Rollback,
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub columns: Vec<SelectColumn>,
    pub tables: Vec<TableRef>,
    pub joins: Vec<JoinClause>,
    pub where_clause: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Parsed but not applied
    pub distinct: bool,
}

/// A single item in the SELECT column list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// `*`, only valid as the sole item
    Wildcard,
    /// A bare or qualified column name
    Column {
        table: Option<String>,
        name: String,
    },
}

impl SelectColumn {
    /// The column header shown in results
    pub fn header(&self) -> String {
        match self {
            SelectColumn::Wildcard => "*".to_string(),
            SelectColumn::Column { table: None, name } => name.clone(),
            SelectColumn::Column {
                table: Some(t),
                name,
            } => format!("{}.{}", t, name),
        }
    }
}

/// Table reference with optional alias
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

/// JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub alias: Option<String>,
    /// ON conditions, chained with AND
    pub conditions: Vec<Expr>,
}

/// Type of JOIN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

/// ORDER BY item
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    /// Optional column list; empty means positional values
    pub columns: Vec<String>,
    pub values: Vec<Vec<Expr>>,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Expr>,
}

/// Column assignment in a SET clause
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub where_clause: Option<Expr>,
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    pub table: String,
    pub columns: Vec<ColumnDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
}

/// Column definition inside CREATE TABLE
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    /// Textual type name, resolved by the executor
    pub type_name: String,
    pub primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
    pub default: Option<Expr>,
}

/// Table-level FOREIGN KEY clause inside CREATE TABLE
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDef {
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_delete: FkAction,
    pub on_update: FkAction,
}

/// DROP TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    pub table: String,
}

/// SQL expression.
///
/// The tree is a recursive tagged union; each node exclusively owns its
/// children and evaluation consumes immutable references.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Unclassified literal text; the executor classifies it into a
    /// typed value at evaluation time
    Literal(String),
    /// The NULL literal
    Null,
    /// Column reference, optionally qualified by table or alias
    Column {
        table: Option<String>,
        name: String,
    },
    /// Binary operation
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Unary operation
    Unary { op: UnaryOp, expr: Box<Expr> },
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}
