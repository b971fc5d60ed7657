//! Schema definitions for OpalDB
//!
//! This module defines table schemas, column metadata, and foreign keys.

use super::types::DataType;
use crate::storage::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column definition in a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// Is this the primary key?
    pub primary_key: bool,
    /// Is this column unique?
    pub unique: bool,
    /// Does this column reject NULL?
    pub not_null: bool,
    /// Default value used when the column is omitted from an INSERT
    pub default: Option<Value>,
}

impl Column {
    /// Create a new column with no constraints
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            primary_key: false,
            unique: false,
            not_null: false,
            default: None,
        }
    }

    /// Set the primary key flag
    pub fn primary_key(mut self, pk: bool) -> Self {
        self.primary_key = pk;
        self
    }

    /// Set the unique flag
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Set the NOT NULL flag
    pub fn not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    /// Set the default value
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Table schema: an ordered list of columns.
///
/// The position of a column within the schema is its column index and is
/// fixed for the lifetime of the table. Name lookup is case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Create a schema from a list of columns
    pub fn from_columns(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Add a column to the schema
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Get a column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get a column's index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Check if a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get all primary key columns
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// Get all column names in schema order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", col.name, col.data_type)?;
            if col.primary_key {
                write!(f, " PRIMARY KEY")?;
            }
            if col.unique {
                write!(f, " UNIQUE")?;
            }
            if col.not_null {
                write!(f, " NOT NULL")?;
            }
        }
        Ok(())
    }
}

/// Referential action taken when a referenced row is deleted or updated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FkAction {
    Cascade,
    Restrict,
    SetNull,
    NoAction,
}

impl fmt::Display for FkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FkAction::Cascade => write!(f, "CASCADE"),
            FkAction::Restrict => write!(f, "RESTRICT"),
            FkAction::SetNull => write!(f, "SET NULL"),
            FkAction::NoAction => write!(f, "NO ACTION"),
        }
    }
}

/// Foreign key constraint.
///
/// The referenced table is identified by name, never by pointer;
/// resolution happens inside the catalog's exclusive-lock scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Local columns holding the reference
    pub columns: Vec<String>,
    /// Referenced table name
    pub ref_table: String,
    /// Referenced columns, pairwise with `columns`
    pub ref_columns: Vec<String>,
    /// Action on delete of the referenced row
    pub on_delete: FkAction,
    /// Action on update of the referenced row
    pub on_update: FkAction,
}

impl ForeignKey {
    /// Create a foreign key with NO ACTION for both events
    pub fn new(
        columns: Vec<String>,
        ref_table: impl Into<String>,
        ref_columns: Vec<String>,
    ) -> Self {
        Self {
            columns,
            ref_table: ref_table.into(),
            ref_columns,
            on_delete: FkAction::NoAction,
            on_update: FkAction::NoAction,
        }
    }

    /// Set the ON DELETE action
    pub fn on_delete(mut self, action: FkAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Set the ON UPDATE action
    pub fn on_update(mut self, action: FkAction) -> Self {
        self.on_update = action;
        self
    }
}
