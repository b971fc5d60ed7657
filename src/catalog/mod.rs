//! Catalog module
//!
//! This module contains the database catalog, schema definitions, and
//! data types.

pub mod database;
pub mod schema;
pub mod types;

pub use database::Database;
pub use schema::{Column, FkAction, ForeignKey, Schema};
pub use types::DataType;
