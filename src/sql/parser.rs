//! SQL parser
//!
//! Recursive-descent parser producing a typed AST. Expression precedence
//! from lowest to highest: OR, AND, prefix NOT, comparison, additive,
//! multiplicative, unary minus, primary.

use super::ast::*;
use super::lexer::Lexer;
use super::token::{Token, TokenKind};
use crate::catalog::FkAction;
use crate::error::{Error, Result};

/// SQL parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a parser from a SQL string
    pub fn new(sql: &str) -> Result<Self> {
        let tokens = Lexer::new(sql).tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse a single SQL statement
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = match &self.current().kind {
            TokenKind::Select => self.parse_select().map(Statement::Select),
            TokenKind::Insert => self.parse_insert().map(Statement::Insert),
            TokenKind::Update => self.parse_update().map(Statement::Update),
            TokenKind::Delete => self.parse_delete().map(Statement::Delete),
            TokenKind::Create => self.parse_create_table().map(Statement::CreateTable),
            TokenKind::Drop => self.parse_drop_table().map(Statement::DropTable),
            TokenKind::Begin => self.parse_begin(),
            TokenKind::Commit => {
                self.advance();
                Ok(Statement::Commit)
            }
            TokenKind::Rollback => {
                self.advance();
                Ok(Statement::Rollback)
            }
            _ => Err(self.error_here(
                format!("unexpected token: {}", self.current()),
                "expected a SQL keyword",
            )),
        }?;

        while self.check(&TokenKind::Semicolon) {
            self.advance();
        }
        Ok(stmt)
    }

    // ========== SELECT ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(TokenKind::Select)?;

        let mut stmt = SelectStatement::default();
        if self.current_ident_is("DISTINCT") {
            stmt.distinct = true;
            self.advance();
        }

        stmt.columns = self.parse_column_list()?;
        self.expect(TokenKind::From)?;
        stmt.tables = self.parse_table_list()?;

        loop {
            match &self.current().kind {
                TokenKind::Where => {
                    self.advance();
                    stmt.where_clause = Some(self.parse_expr()?);
                }
                TokenKind::Join | TokenKind::Inner | TokenKind::Left | TokenKind::Right => {
                    stmt.joins.push(self.parse_join()?);
                }
                TokenKind::Order => {
                    self.advance();
                    self.expect(TokenKind::By)?;
                    stmt.order_by = self.parse_order_by()?;
                }
                TokenKind::Limit => {
                    self.advance();
                    stmt.limit = Some(self.parse_integer()?);
                }
                TokenKind::Offset => {
                    self.advance();
                    stmt.offset = Some(self.parse_integer()?);
                }
                _ => break,
            }
        }

        Ok(stmt)
    }

    fn parse_column_list(&mut self) -> Result<Vec<SelectColumn>> {
        if self.check(&TokenKind::Asterisk) {
            self.advance();
            return Ok(vec![SelectColumn::Wildcard]);
        }

        let mut columns = Vec::new();
        loop {
            let name = self.expect_identifier("column name")?;
            let column = if self.check(&TokenKind::Dot) {
                self.advance();
                let qualified = self.expect_identifier("column name after '.'")?;
                SelectColumn::Column {
                    table: Some(name),
                    name: qualified,
                }
            } else {
                SelectColumn::Column { table: None, name }
            };
            columns.push(column);

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(columns)
    }

    fn parse_table_list(&mut self) -> Result<Vec<TableRef>> {
        let mut tables = Vec::new();
        loop {
            let name = self.expect_identifier("table name")?;
            let alias = self.parse_alias()?;
            tables.push(TableRef { name, alias });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(tables)
    }

    /// Parse an `AS alias` or implicit trailing-identifier alias. `AS` is
    /// not in the keyword set; it arrives as an identifier.
    fn parse_alias(&mut self) -> Result<Option<String>> {
        if self.current_ident_is("AS") {
            self.advance();
            return Ok(Some(self.expect_identifier("alias name")?));
        }
        if let TokenKind::Identifier(alias) = &self.current().kind {
            let alias = alias.clone();
            self.advance();
            return Ok(Some(alias));
        }
        Ok(None)
    }

    fn parse_join(&mut self) -> Result<JoinClause> {
        let join_type = match &self.current().kind {
            TokenKind::Inner => {
                self.advance();
                JoinType::Inner
            }
            TokenKind::Left => {
                self.advance();
                if self.current_ident_is("OUTER") {
                    self.advance();
                }
                JoinType::Left
            }
            TokenKind::Right => {
                self.advance();
                if self.current_ident_is("OUTER") {
                    self.advance();
                }
                JoinType::Right
            }
            _ => JoinType::Inner,
        };
        self.expect(TokenKind::Join)?;

        let table = self.expect_identifier("table name")?;
        let alias = self.parse_alias()?;
        self.expect(TokenKind::On)?;

        let mut conditions = vec![self.parse_expr()?];
        while self.check(&TokenKind::And) {
            self.advance();
            conditions.push(self.parse_expr()?);
        }

        Ok(JoinClause {
            join_type,
            table,
            alias,
            conditions,
        })
    }

    fn parse_order_by(&mut self) -> Result<Vec<OrderBy>> {
        let mut items = Vec::new();
        loop {
            let column = self.expect_identifier("column for ORDER BY")?;
            let ascending = if self.check(&TokenKind::Desc) {
                self.advance();
                false
            } else {
                if self.check(&TokenKind::Asc) {
                    self.advance();
                }
                true
            };
            items.push(OrderBy { column, ascending });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(items)
    }

    // ========== INSERT ==========

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect(TokenKind::Insert)?;
        self.expect(TokenKind::Into)?;
        let table = self.expect_identifier("table name")?;

        let mut columns = Vec::new();
        if self.check(&TokenKind::LParen) {
            self.advance();
            columns = self.parse_identifier_list()?;
            self.expect(TokenKind::RParen)?;
        }

        self.expect(TokenKind::Values)?;

        let mut values = Vec::new();
        loop {
            self.expect(TokenKind::LParen)?;
            values.push(self.parse_expr_list()?);
            self.expect(TokenKind::RParen)?;

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(InsertStatement {
            table,
            columns,
            values,
        })
    }

    // ========== UPDATE ==========

    fn parse_update(&mut self) -> Result<UpdateStatement> {
        self.expect(TokenKind::Update)?;
        let table = self.expect_identifier("table name")?;
        self.expect(TokenKind::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier("column name")?;
            self.expect(TokenKind::Eq)?;
            let value = self.parse_expr()?;
            assignments.push(Assignment { column, value });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        let where_clause = if self.check(&TokenKind::Where) {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(UpdateStatement {
            table,
            assignments,
            where_clause,
        })
    }

    // ========== DELETE ==========

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect(TokenKind::Delete)?;
        self.expect(TokenKind::From)?;
        let table = self.expect_identifier("table name")?;

        let where_clause = if self.check(&TokenKind::Where) {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(DeleteStatement {
            table,
            where_clause,
        })
    }

    // ========== CREATE / DROP ==========

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect(TokenKind::Create)?;
        self.expect(TokenKind::Table)?;
        let table = self.expect_identifier("table name")?;
        self.expect(TokenKind::LParen)?;

        let mut columns = Vec::new();
        let mut foreign_keys = Vec::new();
        loop {
            if self.check(&TokenKind::Foreign) {
                foreign_keys.push(self.parse_foreign_key_def()?);
            } else {
                columns.push(self.parse_column_def()?);
            }

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(TokenKind::RParen)?;

        Ok(CreateTableStatement {
            table,
            columns,
            foreign_keys,
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_identifier("column name")?;
        let type_name = self
            .expect_identifier("column type")?
            .to_uppercase();

        let mut def = ColumnDef {
            name,
            type_name,
            primary_key: false,
            unique: false,
            not_null: false,
            default: None,
        };

        loop {
            match &self.current().kind {
                TokenKind::Primary => {
                    self.advance();
                    self.expect(TokenKind::Key)?;
                    def.primary_key = true;
                }
                TokenKind::Unique => {
                    self.advance();
                    def.unique = true;
                }
                TokenKind::Not => {
                    self.advance();
                    self.expect(TokenKind::Null)?;
                    def.not_null = true;
                }
                TokenKind::Default => {
                    self.advance();
                    def.default = Some(self.parse_primary_expr()?);
                }
                _ => break,
            }
        }

        Ok(def)
    }

    fn parse_foreign_key_def(&mut self) -> Result<ForeignKeyDef> {
        self.expect(TokenKind::Foreign)?;
        self.expect(TokenKind::Key)?;
        self.expect(TokenKind::LParen)?;
        let columns = self.parse_identifier_list()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::References)?;
        let ref_table = self.expect_identifier("referenced table name")?;
        self.expect(TokenKind::LParen)?;
        let ref_columns = self.parse_identifier_list()?;
        self.expect(TokenKind::RParen)?;

        let mut def = ForeignKeyDef {
            columns,
            ref_table,
            ref_columns,
            on_delete: FkAction::NoAction,
            on_update: FkAction::NoAction,
        };

        while self.check(&TokenKind::On) {
            self.advance();
            match &self.current().kind {
                TokenKind::Delete => {
                    self.advance();
                    def.on_delete = self.parse_fk_action()?;
                }
                TokenKind::Update => {
                    self.advance();
                    def.on_update = self.parse_fk_action()?;
                }
                _ => {
                    return Err(self.error_here(
                        "expected DELETE or UPDATE after ON",
                        "use ON DELETE or ON UPDATE",
                    ))
                }
            }
        }

        Ok(def)
    }

    fn parse_fk_action(&mut self) -> Result<FkAction> {
        match &self.current().kind {
            TokenKind::Cascade => {
                self.advance();
                Ok(FkAction::Cascade)
            }
            TokenKind::Restrict => {
                self.advance();
                Ok(FkAction::Restrict)
            }
            TokenKind::Set => {
                self.advance();
                self.expect(TokenKind::Null)?;
                Ok(FkAction::SetNull)
            }
            TokenKind::Identifier(word) if word.eq_ignore_ascii_case("NO") => {
                self.advance();
                if self.current_ident_is("ACTION") {
                    self.advance();
                    Ok(FkAction::NoAction)
                } else {
                    Err(self.error_here("expected ACTION after NO", "use NO ACTION"))
                }
            }
            _ => Err(self.error_here(
                "expected referential action",
                "use CASCADE, RESTRICT, SET NULL, or NO ACTION",
            )),
        }
    }

    fn parse_drop_table(&mut self) -> Result<DropTableStatement> {
        self.expect(TokenKind::Drop)?;
        self.expect(TokenKind::Table)?;
        let table = self.expect_identifier("table name")?;
        Ok(DropTableStatement { table })
    }

    fn parse_begin(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Begin)?;
        if self.check(&TokenKind::Transaction) {
            self.advance();
        }
        Ok(Statement::Begin)
    }

    // ========== Expressions ==========

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_and_expr()?;
        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: BinaryOp::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_not_expr()?;
        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_not_expr()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: BinaryOp::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr> {
        if self.check(&TokenKind::Not) {
            self.advance();
            let expr = self.parse_not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.parse_comparison_expr()
    }

    fn parse_comparison_expr(&mut self) -> Result<Expr> {
        let left = self.parse_additive_expr()?;
        let op = match &self.current().kind {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::Neq => Some(BinaryOp::Neq),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Lte => Some(BinaryOp::Lte),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Gte => Some(BinaryOp::Gte),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let right = self.parse_additive_expr()?;
            return Ok(Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative_expr()?;
        loop {
            let op = match &self.current().kind {
                TokenKind::Plus => Some(BinaryOp::Add),
                TokenKind::Minus => Some(BinaryOp::Sub),
                _ => None,
            };
            match op {
                Some(op) => {
                    self.advance();
                    let right = self.parse_multiplicative_expr()?;
                    left = Expr::Binary {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    };
                }
                None => break,
            }
        }
        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match &self.current().kind {
                TokenKind::Asterisk => Some(BinaryOp::Mul),
                TokenKind::Slash => Some(BinaryOp::Div),
                _ => None,
            };
            match op {
                Some(op) => {
                    self.advance();
                    let right = self.parse_unary_expr()?;
                    left = Expr::Binary {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    };
                }
                None => break,
            }
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        if self.check(&TokenKind::Minus) {
            self.advance();
            let expr = self.parse_unary_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            });
        }
        self.parse_primary_expr()
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        match self.current().kind.clone() {
            TokenKind::Number(text) => {
                self.advance();
                Ok(Expr::Literal(text))
            }
            TokenKind::Str(text) => {
                self.advance();
                Ok(Expr::Literal(text))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null)
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.check(&TokenKind::Dot) {
                    self.advance();
                    let column = self.expect_identifier("column name after '.'")?;
                    Ok(Expr::Column {
                        table: Some(name),
                        name: column,
                    })
                } else {
                    Ok(Expr::Column { table: None, name })
                }
            }
            _ => Err(self.error_here("expected expression", "provide a valid expression")),
        }
    }

    // ========== Helpers ==========

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = vec![self.expect_identifier("identifier")?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            identifiers.push(self.expect_identifier("identifier")?);
        }
        Ok(identifiers)
    }

    fn parse_integer(&mut self) -> Result<usize> {
        match self.current().kind.clone() {
            TokenKind::Number(text) => {
                let value = text.parse::<usize>().map_err(|_| {
                    self.error_here("invalid integer literal", "provide a valid integer")
                })?;
                self.advance();
                Ok(value)
            }
            _ => Err(self.error_here("expected integer literal", "provide a valid number")),
        }
    }

    fn current(&self) -> &Token {
        self.tokens
            .get(self.position)
            .unwrap_or_else(|| self.tokens.last().expect("token stream ends with EOF"))
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    /// Check for a contextual word (AS, OUTER, NO, ...) that is not in
    /// the keyword set and arrives as an identifier.
    fn current_ident_is(&self, word: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Identifier(s) if s.eq_ignore_ascii_case(word))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(
                format!("expected {}", kind),
                &format!("make sure to include {}", kind),
            ))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String> {
        match self.current().kind.clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here(
                format!("expected {}", what),
                &format!("provide a valid {}", what),
            )),
        }
    }

    fn error_here(&self, message: impl Into<String>, suggestion: &str) -> Error {
        let token = self.current();
        Error::Syntax {
            message: message.into(),
            line: token.line,
            column: token.column,
            near: token.to_string(),
            suggestion: suggestion.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Statement {
        Parser::new(sql).unwrap().parse().unwrap()
    }

    #[test]
    fn test_parse_simple_select() {
        match parse("SELECT * FROM users;") {
            Statement::Select(s) => {
                assert_eq!(s.columns, vec![SelectColumn::Wildcard]);
                assert_eq!(s.tables.len(), 1);
                assert_eq!(s.tables[0].name, "users");
            }
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_select_columns_and_where() {
        match parse("SELECT id, u.name FROM users u WHERE id = 1") {
            Statement::Select(s) => {
                assert_eq!(s.columns.len(), 2);
                assert_eq!(
                    s.columns[1],
                    SelectColumn::Column {
                        table: Some("u".into()),
                        name: "name".into()
                    }
                );
                assert_eq!(s.tables[0].alias, Some("u".to_string()));
                assert!(s.where_clause.is_some());
            }
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_join_variants() {
        match parse(
            "SELECT u.name, o.total FROM users AS u LEFT OUTER JOIN orders o ON u.id = o.user_id",
        ) {
            Statement::Select(s) => {
                assert_eq!(s.tables[0].alias, Some("u".to_string()));
                assert_eq!(s.joins.len(), 1);
                assert_eq!(s.joins[0].join_type, JoinType::Left);
                assert_eq!(s.joins[0].alias, Some("o".to_string()));
                assert_eq!(s.joins[0].conditions.len(), 1);
            }
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_order_limit_offset() {
        match parse("SELECT * FROM t ORDER BY a, b DESC LIMIT 10 OFFSET 5") {
            Statement::Select(s) => {
                assert_eq!(s.order_by.len(), 2);
                assert!(s.order_by[0].ascending);
                assert!(!s.order_by[1].ascending);
                assert_eq!(s.limit, Some(10));
                assert_eq!(s.offset, Some(5));
            }
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_insert_multi_row() {
        match parse("INSERT INTO users (id, name) VALUES (1, 'Alice'), (2, 'Bob')") {
            Statement::Insert(i) => {
                assert_eq!(i.table, "users");
                assert_eq!(i.columns, vec!["id".to_string(), "name".to_string()]);
                assert_eq!(i.values.len(), 2);
                assert_eq!(i.values[0][1], Expr::Literal("Alice".into()));
            }
            other => panic!("expected INSERT, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_update() {
        match parse("UPDATE users SET name = 'Carol', age = age + 1 WHERE id = 1") {
            Statement::Update(u) => {
                assert_eq!(u.assignments.len(), 2);
                assert!(u.where_clause.is_some());
            }
            other => panic!("expected UPDATE, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_delete() {
        match parse("DELETE FROM users WHERE id = 1") {
            Statement::Delete(d) => {
                assert_eq!(d.table, "users");
                assert!(d.where_clause.is_some());
            }
            other => panic!("expected DELETE, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_create_table_with_constraints() {
        let sql = "CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT UNIQUE,
            age INTEGER DEFAULT 0
        )";
        match parse(sql) {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.table, "users");
                assert_eq!(ct.columns.len(), 4);
                assert!(ct.columns[0].primary_key);
                assert!(ct.columns[1].not_null);
                assert!(ct.columns[2].unique);
                assert_eq!(ct.columns[3].default, Some(Expr::Literal("0".into())));
            }
            other => panic!("expected CREATE TABLE, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_create_table_with_foreign_key() {
        let sql = "CREATE TABLE orders (
            id INTEGER PRIMARY KEY,
            user_id INTEGER,
            FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
        )";
        match parse(sql) {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.columns.len(), 2);
                assert_eq!(ct.foreign_keys.len(), 1);
                let fk = &ct.foreign_keys[0];
                assert_eq!(fk.ref_table, "users");
                assert_eq!(fk.on_delete, FkAction::Cascade);
                assert_eq!(fk.on_update, FkAction::NoAction);
            }
            other => panic!("expected CREATE TABLE, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_fk_set_null_action() {
        let sql = "CREATE TABLE a (id INTEGER PRIMARY KEY, b_id INTEGER,
            FOREIGN KEY (b_id) REFERENCES b (id) ON DELETE SET NULL ON UPDATE NO ACTION)";
        match parse(sql) {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.foreign_keys[0].on_delete, FkAction::SetNull);
                assert_eq!(ct.foreign_keys[0].on_update, FkAction::NoAction);
            }
            other => panic!("expected CREATE TABLE, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_transactions() {
        assert_eq!(parse("BEGIN TRANSACTION"), Statement::Begin);
        assert_eq!(parse("BEGIN"), Statement::Begin);
        assert_eq!(parse("COMMIT"), Statement::Commit);
        assert_eq!(parse("ROLLBACK;"), Statement::Rollback);
    }

    #[test]
    fn test_expression_precedence() {
        let stmt = parse("SELECT * FROM t WHERE a = 1 + 2 * 3 OR NOT b = 4 AND c = 5");
        let Statement::Select(s) = stmt else {
            panic!("expected SELECT");
        };
        // OR at the root: (a = 1 + (2 * 3)) OR ((NOT b = 4) AND c = 5)
        let Some(Expr::Binary { op, left, right }) = s.where_clause else {
            panic!("expected binary root");
        };
        assert_eq!(op, BinaryOp::Or);
        let Expr::Binary { op, right: mul, .. } = *left else {
            panic!("expected comparison on the left");
        };
        assert_eq!(op, BinaryOp::Eq);
        let Expr::Binary { op, right: prod, .. } = *mul else {
            panic!("expected addition");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*prod, Expr::Binary { op: BinaryOp::Mul, .. }));
        let Expr::Binary { op, left: not, .. } = *right else {
            panic!("expected AND on the right");
        };
        assert_eq!(op, BinaryOp::And);
        assert!(matches!(*not, Expr::Unary { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn test_unary_minus() {
        match parse("SELECT * FROM t WHERE a = -5") {
            Statement::Select(s) => {
                let Some(Expr::Binary { right, .. }) = s.where_clause else {
                    panic!("expected comparison");
                };
                assert!(matches!(*right, Expr::Unary { op: UnaryOp::Neg, .. }));
            }
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_error_position_and_suggestion() {
        let err = Parser::new("SELECT id users").unwrap().parse().unwrap_err();
        match err {
            Error::Syntax { line, near, .. } => {
                assert_eq!(line, 1);
                assert_eq!(near, "users");
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_drop_table() {
        assert_eq!(
            parse("DROP TABLE users"),
            Statement::DropTable(DropTableStatement {
                table: "users".into()
            })
        );
    }
}
