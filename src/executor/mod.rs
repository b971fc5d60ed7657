//! Query execution module

pub mod executor;
pub mod script;

pub use executor::{Executor, QueryResult};
