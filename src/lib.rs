//! OpalDB - an in-memory relational database engine written in Rust
//!
//! This library provides the core components for a SQL database:
//! - SQL parsing (lexer, parser, AST)
//! - Storage engine (values, tables, B-tree indexes)
//! - Constraint enforcement (primary key, unique, not null, foreign key)
//! - Query execution
//! - Catalog with cross-table referential actions

pub mod catalog;
pub mod error;
pub mod executor;
pub mod sql;
pub mod storage;

pub use catalog::{Column, Database, DataType, FkAction, ForeignKey, Schema};
pub use error::{Error, Result};
pub use executor::{Executor, QueryResult};
pub use storage::{Row, Table, Value};
