//! The catalog for OpalDB
//!
//! A database is a named map of tables plus every operation that spans
//! more than one table: foreign key registration and verification, and
//! the referential actions applied on delete. Cross-table operations
//! hold the catalog's exclusive lock for their whole duration; the lock
//! order is always catalog, then table, then index.

use super::schema::{FkAction, ForeignKey, Schema};
use crate::error::{Error, Result};
use crate::storage::{Row, RowPredicate, Table, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// The catalog: a name-to-table map
#[derive(Default)]
pub struct Database {
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Database {
    /// Create a new empty database
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Create a table.
    ///
    /// An index is created automatically on every primary key column and
    /// every non-primary-key unique column.
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        if tables.contains_key(name) {
            return Err(Error::TableAlreadyExists(name.to_string()));
        }

        let table = Table::new(name, schema);
        for col in table.schema().columns() {
            if col.primary_key || col.unique {
                table.add_index(&col.name)?;
            }
        }

        debug!(table = name, "created table");
        tables.insert(name.to_string(), Arc::new(table));
        Ok(())
    }

    /// Drop a table, releasing its rows, indexes, and foreign keys
    pub fn drop_table(&self, name: &str) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        if tables.remove(name).is_none() {
            return Err(Error::TableNotFound(name.to_string()));
        }
        debug!(table = name, "dropped table");
        Ok(())
    }

    /// Get a table by name
    pub fn get_table(&self, name: &str) -> Result<Arc<Table>> {
        let tables = self.tables.read().unwrap();
        tables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.read().unwrap().contains_key(name)
    }

    /// List all table names in sorted order
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Get a table's schema
    pub fn schema(&self, table_name: &str) -> Result<Schema> {
        Ok(self.get_table(table_name)?.schema().clone())
    }

    /// Register a foreign key on a table.
    ///
    /// Validates that the referenced table exists and carries every
    /// referenced column before appending the constraint.
    pub fn add_foreign_key(&self, table_name: &str, fk: ForeignKey) -> Result<()> {
        let tables = self.tables.write().unwrap();
        let table = tables
            .get(table_name)
            .ok_or_else(|| Error::TableNotFound(table_name.to_string()))?;
        let ref_table = tables
            .get(&fk.ref_table)
            .ok_or_else(|| Error::TableNotFound(fk.ref_table.clone()))?;
        for col in &fk.ref_columns {
            if !ref_table.schema().has_column(col) {
                return Err(Error::ColumnNotFound(col.clone()));
            }
        }
        table.add_foreign_key(fk)
    }

    /// Verify every foreign key of `table` against `row` before insert.
    ///
    /// A reference whose local values are all NULL is exempt; otherwise a
    /// row must exist in the referenced table matching every non-null
    /// component.
    pub fn check_foreign_keys(&self, table: &Table, row: &Row) -> Result<()> {
        let fks = table.foreign_keys();
        if fks.is_empty() {
            return Ok(());
        }

        let tables = self.tables.read().unwrap();
        for fk in fks {
            let mut locals = Vec::with_capacity(fk.columns.len());
            let mut all_null = true;
            for col in &fk.columns {
                let ci = table
                    .schema()
                    .column_index(col)
                    .ok_or_else(|| Error::ColumnNotFound(col.clone()))?;
                let v = row.get(ci).cloned().unwrap_or(Value::Null);
                if !v.is_null() {
                    all_null = false;
                }
                locals.push(v);
            }
            if all_null {
                continue;
            }

            let ref_table = tables
                .get(&fk.ref_table)
                .ok_or_else(|| Error::TableNotFound(fk.ref_table.clone()))?;
            let mut ref_indexes = Vec::with_capacity(fk.ref_columns.len());
            for col in &fk.ref_columns {
                ref_indexes.push(
                    ref_table
                        .schema()
                        .column_index(col)
                        .ok_or_else(|| Error::ColumnNotFound(col.clone()))?,
                );
            }

            let matches = |r: &Row| {
                ref_indexes
                    .iter()
                    .zip(&locals)
                    .all(|(&ri, lv)| lv.is_null() || r.get(ri).is_some_and(|rv| lv.equals(rv)))
            };
            if ref_table.select(Some(&matches)).is_empty() {
                let rendered: Vec<String> = locals.iter().map(|v| v.to_string()).collect();
                return Err(Error::ForeignKeyViolation(format!(
                    "no row in '{}' matches ({})",
                    fk.ref_table,
                    rendered.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Delete the rows of `table_name` matching the predicate, applying
    /// the referential actions of every foreign key that points at the
    /// table: CASCADE recurses, RESTRICT and NO ACTION reject the delete,
    /// SET NULL clears the referencing columns.
    ///
    /// Victim rows are collected before anything is mutated.
    pub fn delete_from(
        &self,
        table_name: &str,
        predicate: Option<RowPredicate>,
    ) -> Result<usize> {
        let tables = self.tables.write().unwrap();
        let table = tables
            .get(table_name)
            .ok_or_else(|| Error::TableNotFound(table_name.to_string()))?
            .clone();

        let victims = table.select(predicate);
        if victims.is_empty() {
            return Ok(0);
        }

        let pk_values = self.victim_keys(&tables, table_name, &table, &victims)?;
        if let Some(pk_values) = pk_values {
            let mut seen = HashSet::new();
            for v in &pk_values {
                seen.insert((table_name.to_string(), v.to_string()));
            }
            self.apply_delete_actions(&tables, table_name, &pk_values, &mut seen)?;
        }

        // A self-referencing cascade may already have removed some of the
        // victims; the affected count is the rows this DELETE matched.
        table.delete(predicate)?;
        Ok(victims.len())
    }

    /// Propagate the deletion of a single row through CASCADE foreign
    /// keys. The row itself is not removed.
    pub fn cascade_delete(&self, table_name: &str, row_id: usize) -> Result<()> {
        let tables = self.tables.write().unwrap();
        let table = tables
            .get(table_name)
            .ok_or_else(|| Error::TableNotFound(table_name.to_string()))?
            .clone();

        let pk_cols = table.schema().primary_key_columns();
        if pk_cols.len() != 1 {
            return Err(Error::Execution(
                "cascade delete only supported for single-column primary keys".to_string(),
            ));
        }
        let pk_index = table.schema().column_index(&pk_cols[0].name).unwrap();
        let row = table.get_row(row_id)?;
        let pk_value = row.get(pk_index).cloned().unwrap_or(Value::Null);
        if pk_value.is_null() {
            return Ok(());
        }

        let mut seen = HashSet::new();
        seen.insert((table_name.to_string(), pk_value.to_string()));
        self.apply_delete_actions(&tables, table_name, &[pk_value], &mut seen)
    }

    /// Extract the primary key values of the victim rows, or `None` when
    /// no referential action can apply. Errors if another table points a
    /// foreign key at a table without a single-column primary key.
    fn victim_keys(
        &self,
        tables: &HashMap<String, Arc<Table>>,
        table_name: &str,
        table: &Table,
        victims: &[Row],
    ) -> Result<Option<Vec<Value>>> {
        let referenced = tables.values().any(|t| {
            t.foreign_keys()
                .iter()
                .any(|fk| fk.ref_table == table_name)
        });
        if !referenced {
            return Ok(None);
        }

        let pk_cols = table.schema().primary_key_columns();
        if pk_cols.len() != 1 {
            return Err(Error::Execution(
                "cascade delete only supported for single-column primary keys".to_string(),
            ));
        }
        let pk_index = table.schema().column_index(&pk_cols[0].name).unwrap();
        let values = victims
            .iter()
            .filter_map(|r| r.get(pk_index).cloned())
            .filter(|v| !v.is_null())
            .collect();
        Ok(Some(values))
    }

    /// Apply on-delete actions for every foreign key referencing
    /// `parent`, given the primary key values of the rows being removed.
    /// `seen` guards against cyclic cascades.
    fn apply_delete_actions(
        &self,
        tables: &HashMap<String, Arc<Table>>,
        parent: &str,
        parent_keys: &[Value],
        seen: &mut HashSet<(String, String)>,
    ) -> Result<()> {
        if parent_keys.is_empty() {
            return Ok(());
        }

        for (child_name, child) in tables {
            for fk in child.foreign_keys() {
                if fk.ref_table != parent {
                    continue;
                }
                // Cascading matches on single-column references only.
                let col = match fk.columns.first() {
                    Some(col) => col,
                    None => continue,
                };
                let ci = match child.schema().column_index(col) {
                    Some(ci) => ci,
                    None => continue,
                };
                let references_victim = |r: &Row| {
                    r.get(ci)
                        .is_some_and(|v| parent_keys.iter().any(|p| p.equals(v)))
                };

                match fk.on_delete {
                    FkAction::Restrict | FkAction::NoAction => {
                        if !child.select(Some(&references_victim)).is_empty() {
                            return Err(Error::ForeignKeyViolation(format!(
                                "rows in '{}' still reference '{}'",
                                child_name, parent
                            )));
                        }
                    }
                    FkAction::SetNull => {
                        let column = child.schema().columns()[ci].clone();
                        if column.not_null {
                            return Err(Error::ForeignKeyViolation(format!(
                                "cannot set not-null column '{}.{}' to null",
                                child_name, column.name
                            )));
                        }
                        child.update(Some(&references_victim), &|r: &mut Row| {
                            r.set(ci, Value::Null)
                        })?;
                    }
                    FkAction::Cascade => {
                        let child_victims = child.select(Some(&references_victim));
                        if child_victims.is_empty() {
                            continue;
                        }
                        debug!(
                            table = child_name.as_str(),
                            rows = child_victims.len(),
                            "cascading delete"
                        );
                        let child_keys =
                            self.victim_keys(tables, child_name, child, &child_victims)?;
                        if let Some(child_keys) = child_keys {
                            let fresh: Vec<Value> = child_keys
                                .into_iter()
                                .filter(|v| {
                                    seen.insert((child_name.clone(), v.to_string()))
                                })
                                .collect();
                            self.apply_delete_actions(tables, child_name, &fresh, seen)?;
                        }
                        child.delete(Some(&references_victim))?;
                    }
                }
            }
        }
        Ok(())
    }
}
