//! SQL script import and export
//!
//! Export emits one CREATE TABLE per table followed by an INSERT per
//! row. Import splits a script on `;` and executes each non-empty
//! statement in order, stopping at the first failure.

use super::executor::Executor;
use crate::error::{Error, Result};
use crate::storage::Value;
use std::path::Path;

impl Executor {
    /// Render the whole catalog as an executable SQL script.
    pub fn export_script(&self) -> String {
        let mut out = String::new();
        for name in self.database().list_tables() {
            let table = match self.database().get_table(&name) {
                Ok(t) => t,
                Err(_) => continue,
            };
            out.push_str(&format!("CREATE TABLE {} ({});\n", name, table.schema()));
            for row in table.select(None) {
                let values: Vec<String> = row.values().iter().map(render_sql_value).collect();
                out.push_str(&format!(
                    "INSERT INTO {} VALUES ({});\n",
                    name,
                    values.join(", ")
                ));
            }
            out.push('\n');
        }
        out
    }

    /// Execute every statement in a SQL script. Returns the number of
    /// statements executed; the first failure reports the statement
    /// position and stops.
    pub fn import_script(&self, script: &str) -> Result<usize> {
        let mut executed = 0;
        for stmt in script.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }
            self.execute(stmt).map_err(|e| Error::Import {
                index: executed + 1,
                source: Box::new(e),
            })?;
            executed += 1;
        }
        Ok(executed)
    }

    /// Write the exported script to a file
    pub fn export_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.export_script())?;
        Ok(())
    }

    /// Read a SQL file and execute its statements
    pub fn import_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let script = std::fs::read_to_string(path)?;
        self.import_script(&script)
    }
}

/// Render a value as a SQL literal. Text is single-quoted with embedded
/// quotes escaped; a whole float carries a forced `.0` so it
/// re-classifies as a float on import.
fn render_sql_value(value: &Value) -> String {
    match value {
        Value::Text(s) => format!("'{}'", s.replace('\'', "\\'")),
        // A bare true/false would parse as a column reference; the quoted
        // form classifies back to a boolean.
        Value::Boolean(b) => format!("'{}'", b),
        Value::Float(f) => {
            let s = f.to_string();
            if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
                s
            } else {
                format!("{}.0", s)
            }
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Database;
    use std::sync::Arc;

    fn setup() -> Executor {
        Executor::new(Arc::new(Database::new()))
    }

    #[test]
    fn test_render_sql_value() {
        assert_eq!(render_sql_value(&Value::Integer(5)), "5");
        assert_eq!(render_sql_value(&Value::Float(2.5)), "2.5");
        assert_eq!(render_sql_value(&Value::Float(3.0)), "3.0");
        assert_eq!(render_sql_value(&Value::Text("it's".into())), r"'it\'s'");
        assert_eq!(render_sql_value(&Value::Null), "NULL");
        assert_eq!(render_sql_value(&Value::Boolean(true)), "'true'");
    }

    #[test]
    fn test_import_counts_statements() {
        let exec = setup();
        let n = exec
            .import_script(
                "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);
                 INSERT INTO t (name) VALUES ('a');
                 ;
                 INSERT INTO t (name) VALUES ('b');",
            )
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(exec.database().get_table("t").unwrap().count(), 2);
    }

    #[test]
    fn test_import_stops_at_failing_statement() {
        let exec = setup();
        let err = exec
            .import_script(
                "CREATE TABLE t (id INTEGER PRIMARY KEY);
                 INSERT INTO missing VALUES (1);
                 INSERT INTO t VALUES (1);",
            )
            .unwrap_err();
        match err {
            Error::Import { index, source } => {
                assert_eq!(index, 2);
                assert!(matches!(*source, Error::TableNotFound(_)));
            }
            other => panic!("expected import error, got {:?}", other),
        }
        // The failing statement stopped the import before the last insert.
        assert_eq!(exec.database().get_table("t").unwrap().count(), 0);
    }

    #[test]
    fn test_export_shape() {
        let exec = setup();
        exec.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
            .unwrap();
        exec.execute("INSERT INTO t (name) VALUES ('a')").unwrap();
        let script = exec.export_script();
        assert!(script.contains("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL);"));
        assert!(script.contains("INSERT INTO t VALUES (1, 'a');"));
    }
}
