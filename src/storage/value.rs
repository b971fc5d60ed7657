//! Value and Row types for OpalDB
//!
//! This module defines how data values are represented in memory.

use crate::catalog::DataType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value in the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Signed 64-bit integer
    Integer(i64),
    /// 64-bit IEEE floating point
    Float(f64),
    /// Unicode string
    Text(String),
    /// Boolean value
    Boolean(bool),
}

impl Value {
    /// Get the data type of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
        }
    }

    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Parse a textual literal into a typed value.
    pub fn parse(data_type: DataType, text: &str) -> Result<Value> {
        match data_type {
            DataType::Integer => text
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| Error::InvalidLiteral {
                    expected: "integer".to_string(),
                    text: text.to_string(),
                }),
            DataType::Float => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| Error::InvalidLiteral {
                    expected: "float".to_string(),
                    text: text.to_string(),
                }),
            DataType::Text => Ok(Value::Text(text.to_string())),
            DataType::Boolean => match text.to_lowercase().as_str() {
                "true" | "1" => Ok(Value::Boolean(true)),
                "false" | "0" => Ok(Value::Boolean(false)),
                _ => Err(Error::InvalidLiteral {
                    expected: "boolean".to_string(),
                    text: text.to_string(),
                }),
            },
            DataType::Null => Err(Error::InvalidLiteral {
                expected: "value".to_string(),
                text: text.to_string(),
            }),
        }
    }

    /// SQL equality: defined only between values of the same non-null tag.
    /// Every comparison involving NULL is false.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            _ => false,
        }
    }

    /// SQL ordering: defined only between values of the same non-null tag.
    /// Boolean ordering is false < true.
    pub fn less_than(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a < b,
            (Value::Float(a), Value::Float(b)) => a < b,
            (Value::Text(a), Value::Text(b)) => a < b,
            (Value::Boolean(a), Value::Boolean(b)) => !a && *b,
            _ => false,
        }
    }

    /// Truthiness coercion for AND, OR, NOT, and WHERE.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Null => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// A row in a table: an ordered vector of values.
///
/// Cloning a row is a deep clone; callers holding clones can mutate them
/// without affecting stored state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    /// Create a new row from values
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Get a value by column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Replace the value in a slot
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        if index >= self.values.len() {
            return Err(Error::Execution(format!("index out of bounds: {}", index)));
        }
        self.values[index] = value;
        Ok(())
    }

    /// Append a value to the row
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Get all values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of values in the row
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the row and return the values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_tag_comparison() {
        assert!(Value::Integer(3).less_than(&Value::Integer(5)));
        assert!(!Value::Integer(5).less_than(&Value::Integer(3)));
        assert!(Value::Integer(5).equals(&Value::Integer(5)));
        assert!(Value::Text("abc".into()).less_than(&Value::Text("abd".into())));
    }

    #[test]
    fn test_cross_tag_comparison_is_false() {
        assert!(!Value::Integer(1).equals(&Value::Float(1.0)));
        assert!(!Value::Integer(1).less_than(&Value::Float(2.0)));
        assert!(!Value::Null.equals(&Value::Null));
        assert!(!Value::Null.less_than(&Value::Integer(1)));
        assert!(!Value::Integer(1).less_than(&Value::Null));
    }

    #[test]
    fn test_boolean_ordering() {
        assert!(Value::Boolean(false).less_than(&Value::Boolean(true)));
        assert!(!Value::Boolean(true).less_than(&Value::Boolean(false)));
        assert!(!Value::Boolean(true).less_than(&Value::Boolean(true)));
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            Value::parse(DataType::Integer, "42").unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            Value::parse(DataType::Float, "2.5").unwrap(),
            Value::Float(2.5)
        );
        assert_eq!(
            Value::parse(DataType::Boolean, "TRUE").unwrap(),
            Value::Boolean(true)
        );
        assert!(Value::parse(DataType::Integer, "abc").is_err());
    }

    #[test]
    fn test_render() {
        assert_eq!(Value::Integer(-7).to_string(), "-7");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Text("hi".into()).to_string(), "hi");
        assert_eq!(Value::Null.to_string(), "NULL");
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Boolean(true).as_bool());
        assert!(Value::Integer(3).as_bool());
        assert!(!Value::Integer(0).as_bool());
        assert!(Value::Text("x".into()).as_bool());
        assert!(!Value::Text(String::new()).as_bool());
        assert!(!Value::Null.as_bool());
    }

    #[test]
    fn test_row_clone_is_deep() {
        let row = Row::new(vec![Value::Integer(1), Value::Text("a".into())]);
        let mut copy = row.clone();
        copy.set(1, Value::Text("b".into())).unwrap();
        assert_eq!(row.get(1), Some(&Value::Text("a".into())));
    }
}
