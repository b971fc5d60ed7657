//! Error types for OpalDB
//!
//! This module defines all error types used throughout the database engine.

use thiserror::Error;

/// The main error type for OpalDB
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer / Parser Errors ==========
    #[error("Syntax error at line {line}, column {column}: {message} (near '{near}'). Suggestion: {suggestion}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
        near: String,
        suggestion: String,
    },

    // ========== Catalog Errors ==========
    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("ambiguous column name: {0}")]
    AmbiguousColumn(String),

    #[error("unknown table or alias: {0}")]
    UnknownTableOrAlias(String),

    #[error("index on column '{0}' already exists")]
    IndexAlreadyExists(String),

    #[error("index on column '{0}' not found")]
    IndexNotFound(String),

    // ========== Constraint Errors ==========
    #[error("primary key violation: duplicate value {0}")]
    DuplicateKey(String),

    #[error("unique constraint violation: duplicate value {0}")]
    UniqueViolation(String),

    #[error("column '{0}' cannot be null")]
    NullViolation(String),

    #[error("cannot update primary key column '{0}'")]
    PrimaryKeyUpdate(String),

    #[error("foreign key constraint violation: {0}")]
    ForeignKeyViolation(String),

    // ========== Type Errors ==========
    #[error("type mismatch for column '{column}': expected {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("invalid {expected} literal: {text}")]
    InvalidLiteral { expected: String, text: String },

    #[error("unsupported data type: {0}")]
    UnknownDataType(String),

    // ========== Execution Errors ==========
    #[error("division by zero")]
    DivisionByZero,

    #[error("key not found in index")]
    KeyNotFound,

    #[error("row {0} not found")]
    RowNotFound(usize),

    #[error("execution error: {0}")]
    Execution(String),

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("import failed at statement {index}: {source}")]
    Import {
        index: usize,
        #[source]
        source: Box<Error>,
    },
}

/// Result type alias for OpalDB operations
pub type Result<T> = std::result::Result<T, Error>;
