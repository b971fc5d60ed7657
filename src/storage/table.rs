//! Table storage for OpalDB
//!
//! A table binds a schema to a row vector and owns the indexes built
//! over its columns. Constraint enforcement happens here on every
//! mutation. A readers/writer lock protects the row vector, the index
//! set, the foreign keys, and the row-id sequence as one unit.

use super::btree::BTree;
use super::value::{Row, Value};
use crate::catalog::{ForeignKey, Schema};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::RwLock;

/// Predicate over a row. A `None` predicate matches all rows.
pub type RowPredicate<'a> = &'a dyn Fn(&Row) -> bool;

struct TableState {
    rows: Vec<Row>,
    /// Indexes keyed by column name
    indexes: HashMap<String, BTree>,
    /// Next auto-assigned primary key value; strictly greater than every
    /// integer primary key currently present
    row_id_seq: i64,
    foreign_keys: Vec<ForeignKey>,
}

/// A table: schema, rows, indexes, and foreign keys
pub struct Table {
    name: String,
    schema: Schema,
    state: RwLock<TableState>,
}

impl Table {
    /// Create a new empty table
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            state: RwLock::new(TableState {
                rows: Vec::new(),
                indexes: HashMap::new(),
                row_id_seq: 1,
                foreign_keys: Vec::new(),
            }),
        }
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the table schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Insert a row, enforcing all column constraints.
    ///
    /// A missing or NULL single primary key is auto-assigned from the
    /// row-id sequence. Trailing omitted columns are filled from column
    /// defaults (or NULL). Returns the id (position) of the new row.
    ///
    /// Foreign keys are validated by the catalog before this call; the
    /// table itself has no access to other tables.
    pub fn insert(&self, mut row: Row) -> Result<usize> {
        let mut guard = self.state.write().unwrap();
        let state = &mut *guard;

        // Auto-assign the single primary key when absent or NULL.
        let pk_index = self.schema.columns().iter().position(|c| c.primary_key);
        if let Some(pk) = pk_index {
            let missing = row.get(pk).map_or(true, |v| v.is_null());
            if missing {
                while row.len() <= pk {
                    row.push(Value::Null);
                }
                row.set(pk, Value::Integer(state.row_id_seq))?;
            }
        }

        if row.len() > self.schema.column_count() {
            return Err(Error::Execution(format!(
                "row has {} values but table '{}' has {} columns",
                row.len(),
                self.name,
                self.schema.column_count()
            )));
        }

        for (i, col) in self.schema.columns().iter().enumerate() {
            let val = match row.get(i) {
                Some(v) => v,
                None => continue,
            };

            if !val.is_null() && val.data_type() != col.data_type {
                return Err(Error::TypeMismatch {
                    column: col.name.clone(),
                    expected: col.data_type.to_string(),
                    found: val.data_type().to_string(),
                });
            }

            if col.not_null && val.is_null() {
                return Err(Error::NullViolation(col.name.clone()));
            }

            if col.primary_key && !val.is_null() {
                for existing in &state.rows {
                    if existing.get(i).is_some_and(|e| val.equals(e)) {
                        // Advance the sequence past the rejected value so an
                        // immediate retry with an auto-assigned key cannot
                        // re-collide.
                        if let Value::Integer(v) = val {
                            if *v >= state.row_id_seq {
                                state.row_id_seq = *v + 1;
                            }
                        }
                        return Err(Error::DuplicateKey(val.to_string()));
                    }
                }
            }

            if col.unique && !val.is_null() {
                for existing in &state.rows {
                    if existing.get(i).is_some_and(|e| val.equals(e)) {
                        return Err(Error::UniqueViolation(val.to_string()));
                    }
                }
            }
        }

        // Fill trailing omitted columns from defaults.
        while row.len() < self.schema.column_count() {
            let col = &self.schema.columns()[row.len()];
            row.push(col.default.clone().unwrap_or(Value::Null));
        }

        // A manually supplied primary key at or past the sequence drags
        // the sequence along with it.
        if let Some(pk) = pk_index {
            if let Some(Value::Integer(v)) = row.get(pk) {
                if *v >= state.row_id_seq {
                    state.row_id_seq = *v;
                }
            }
        }

        let row_id = state.rows.len();
        state.rows.push(row);
        state.row_id_seq += 1;

        // Index maintenance. On failure the append, the sequence advance,
        // and any index entries already written are all rolled back.
        let entries: Vec<(String, Value)> = state
            .indexes
            .keys()
            .filter_map(|col| {
                let i = self.schema.column_index(col)?;
                let v = state.rows[row_id].get(i)?.clone();
                (!v.is_null()).then_some((col.clone(), v))
            })
            .collect();
        let mut written: Vec<(&str, &Value)> = Vec::new();
        for (col, val) in &entries {
            if let Err(e) = state.indexes[col].insert(val.clone(), row_id) {
                for (prev_col, prev_val) in written {
                    let _ = state.indexes[prev_col].delete(prev_val);
                }
                state.rows.pop();
                state.row_id_seq -= 1;
                return Err(e);
            }
            written.push((col.as_str(), val));
        }

        Ok(row_id)
    }

    /// Return deep clones of every row matching the predicate.
    pub fn select(&self, predicate: Option<RowPredicate>) -> Vec<Row> {
        let state = self.state.read().unwrap();
        state
            .rows
            .iter()
            .filter(|row| predicate.map_or(true, |p| p(row)))
            .cloned()
            .collect()
    }

    /// Update every row matching the predicate by applying the mutator.
    ///
    /// Rejects a change to any primary key column and any unique-column
    /// collision with another row. A rejection aborts the statement but
    /// leaves rows already updated in place. Indexes over changed
    /// columns are re-maintained.
    pub fn update(
        &self,
        predicate: Option<RowPredicate>,
        mutator: &dyn Fn(&mut Row) -> Result<()>,
    ) -> Result<usize> {
        let mut guard = self.state.write().unwrap();
        let state = &mut *guard;

        let mut updated = 0;
        for i in 0..state.rows.len() {
            if !predicate.map_or(true, |p| p(&state.rows[i])) {
                continue;
            }

            let before = state.rows[i].clone();
            let mut after = before.clone();
            mutator(&mut after)?;

            for (ci, col) in self.schema.columns().iter().enumerate() {
                if !col.primary_key {
                    continue;
                }
                let old = before.get(ci);
                let new = after.get(ci);
                if let (Some(old), Some(new)) = (old, new) {
                    let unchanged = new.equals(old) || (new.is_null() && old.is_null());
                    if !unchanged {
                        return Err(Error::PrimaryKeyUpdate(col.name.clone()));
                    }
                }
            }

            for (ci, col) in self.schema.columns().iter().enumerate() {
                if !col.unique {
                    continue;
                }
                let new = match after.get(ci) {
                    Some(v) if !v.is_null() => v,
                    _ => continue,
                };
                if before.get(ci).is_some_and(|old| new.equals(old)) {
                    continue;
                }
                for (j, other) in state.rows.iter().enumerate() {
                    if j != i && other.get(ci).is_some_and(|o| new.equals(o)) {
                        return Err(Error::UniqueViolation(new.to_string()));
                    }
                }
            }

            for (col, index) in &state.indexes {
                let ci = match self.schema.column_index(col) {
                    Some(ci) => ci,
                    None => continue,
                };
                let old = before.get(ci).cloned().unwrap_or(Value::Null);
                let new = after.get(ci).cloned().unwrap_or(Value::Null);
                let unchanged = new.equals(&old) || (new.is_null() && old.is_null());
                if unchanged {
                    continue;
                }
                if !old.is_null() {
                    index.delete(&old)?;
                }
                if !new.is_null() {
                    index.insert(new, i)?;
                }
            }

            state.rows[i] = after;
            updated += 1;
        }
        Ok(updated)
    }

    /// Delete every row matching the predicate.
    ///
    /// Row ids are positions, so deleting compacts the row vector and
    /// renumbers the survivors; every index is rebuilt over them.
    pub fn delete(&self, predicate: Option<RowPredicate>) -> Result<usize> {
        let mut guard = self.state.write().unwrap();
        let state = &mut *guard;

        let before = state.rows.len();
        state
            .rows
            .retain(|row| !predicate.map_or(true, |p| p(row)));
        let deleted = before - state.rows.len();

        if deleted > 0 {
            self.rebuild_indexes(state)?;
        }
        Ok(deleted)
    }

    fn rebuild_indexes(&self, state: &mut TableState) -> Result<()> {
        for (col, index) in state.indexes.iter_mut() {
            let ci = match self.schema.column_index(col) {
                Some(ci) => ci,
                None => continue,
            };
            let fresh = BTree::new();
            for (row_id, row) in state.rows.iter().enumerate() {
                if let Some(v) = row.get(ci) {
                    if !v.is_null() {
                        fresh.insert(v.clone(), row_id)?;
                    }
                }
            }
            *index = fresh;
        }
        Ok(())
    }

    /// Empty the table, reset the row-id sequence, and replace every
    /// index with an empty one.
    pub fn truncate(&self) {
        let mut guard = self.state.write().unwrap();
        let state = &mut *guard;
        state.rows.clear();
        state.row_id_seq = 1;
        for index in state.indexes.values_mut() {
            *index = BTree::new();
        }
    }

    /// Create an index on a column, backfilling every existing non-null
    /// value.
    pub fn add_index(&self, column: &str) -> Result<()> {
        if !self.schema.has_column(column) {
            return Err(Error::ColumnNotFound(column.to_string()));
        }
        let mut guard = self.state.write().unwrap();
        let state = &mut *guard;
        if state.indexes.contains_key(column) {
            return Err(Error::IndexAlreadyExists(column.to_string()));
        }

        let ci = self.schema.column_index(column).unwrap();
        let index = BTree::new();
        for (row_id, row) in state.rows.iter().enumerate() {
            if let Some(v) = row.get(ci) {
                if !v.is_null() {
                    index.insert(v.clone(), row_id)?;
                }
            }
        }
        state.indexes.insert(column.to_string(), index);
        Ok(())
    }

    /// Remove the index on a column
    pub fn remove_index(&self, column: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.indexes.remove(column).is_none() {
            return Err(Error::IndexNotFound(column.to_string()));
        }
        Ok(())
    }

    /// Check if a column has an index
    pub fn has_index(&self, column: &str) -> bool {
        self.state.read().unwrap().indexes.contains_key(column)
    }

    /// Point-lookup a row through the index on `column`, if one exists.
    /// Returns a deep clone of the row.
    pub fn lookup_by_index(&self, column: &str, key: &Value) -> Option<Row> {
        let state = self.state.read().unwrap();
        let index = state.indexes.get(column)?;
        let row_id = index.lookup(key)?;
        state.rows.get(row_id).cloned()
    }

    /// Get a deep clone of a row by id
    pub fn get_row(&self, row_id: usize) -> Result<Row> {
        let state = self.state.read().unwrap();
        state
            .rows
            .get(row_id)
            .cloned()
            .ok_or(Error::RowNotFound(row_id))
    }

    /// Number of rows
    pub fn count(&self) -> usize {
        self.state.read().unwrap().rows.len()
    }

    /// Append a foreign key constraint.
    ///
    /// Validates the column-count pairing and that every local column
    /// exists. The referenced side is validated by the catalog.
    pub fn add_foreign_key(&self, fk: ForeignKey) -> Result<()> {
        if fk.columns.is_empty() || fk.columns.len() != fk.ref_columns.len() {
            return Err(Error::ForeignKeyViolation(
                "foreign key column count mismatch".to_string(),
            ));
        }
        for col in &fk.columns {
            if !self.schema.has_column(col) {
                return Err(Error::ColumnNotFound(col.clone()));
            }
        }
        self.state.write().unwrap().foreign_keys.push(fk);
        Ok(())
    }

    /// Get the foreign keys declared on this table
    pub fn foreign_keys(&self) -> Vec<ForeignKey> {
        self.state.read().unwrap().foreign_keys.clone()
    }

    #[cfg(test)]
    fn row_id_seq(&self) -> i64 {
        self.state.read().unwrap().row_id_seq
    }

    #[cfg(test)]
    pub(crate) fn index_entries(&self, column: &str) -> Vec<(Value, usize)> {
        let state = self.state.read().unwrap();
        state
            .indexes
            .get(column)
            .map(|i| i.scan_all())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataType};

    fn users_table() -> Table {
        let schema = Schema::from_columns(vec![
            Column::new("id", DataType::Integer).primary_key(true),
            Column::new("name", DataType::Text).not_null(true),
            Column::new("age", DataType::Integer),
        ]);
        let table = Table::new("users", schema);
        table.add_index("id").unwrap();
        table
    }

    fn row(values: Vec<Value>) -> Row {
        Row::new(values)
    }

    #[test]
    fn test_insert_auto_assigns_primary_key() {
        let table = users_table();
        table
            .insert(row(vec![Value::Null, Value::Text("a".into())]))
            .unwrap();
        table
            .insert(row(vec![Value::Null, Value::Text("b".into())]))
            .unwrap();

        let rows = table.select(None);
        assert_eq!(rows[0].get(0), Some(&Value::Integer(1)));
        assert_eq!(rows[1].get(0), Some(&Value::Integer(2)));
        // Omitted trailing column filled with NULL
        assert_eq!(rows[0].get(2), Some(&Value::Null));
    }

    #[test]
    fn test_manual_pk_drags_sequence() {
        let table = users_table();
        table
            .insert(row(vec![Value::Integer(5), Value::Text("c".into())]))
            .unwrap();
        let id = table
            .insert(row(vec![Value::Null, Value::Text("d".into())]))
            .unwrap();
        assert_eq!(table.get_row(id).unwrap().get(0), Some(&Value::Integer(6)));
    }

    #[test]
    fn test_duplicate_pk_rejected_and_sequence_advanced() {
        let table = users_table();
        table
            .insert(row(vec![Value::Integer(5), Value::Text("x".into())]))
            .unwrap();
        let seq = table.row_id_seq();
        let err = table
            .insert(row(vec![Value::Integer(5), Value::Text("y".into())]))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));
        assert!(table.row_id_seq() >= seq);
        assert!(table.row_id_seq() > 5);
        assert_eq!(table.count(), 1);
    }

    #[test]
    fn test_type_mismatch_and_not_null() {
        let table = users_table();
        let err = table
            .insert(row(vec![Value::Null, Value::Integer(1)]))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));

        let err = table.insert(row(vec![Value::Null, Value::Null])).unwrap_err();
        assert!(matches!(err, Error::NullViolation(_)));
    }

    #[test]
    fn test_too_many_values_rejected() {
        let table = users_table();
        let err = table
            .insert(row(vec![
                Value::Integer(1),
                Value::Text("a".into()),
                Value::Integer(30),
                Value::Integer(99),
            ]))
            .unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
    }

    #[test]
    fn test_unique_constraint() {
        let schema = Schema::from_columns(vec![
            Column::new("id", DataType::Integer).primary_key(true),
            Column::new("email", DataType::Text).unique(true),
        ]);
        let table = Table::new("accounts", schema);
        table
            .insert(row(vec![Value::Integer(1), Value::Text("a@x".into())]))
            .unwrap();
        let err = table
            .insert(row(vec![Value::Integer(2), Value::Text("a@x".into())]))
            .unwrap_err();
        assert!(matches!(err, Error::UniqueViolation(_)));

        // NULL never collides
        table.insert(row(vec![Value::Integer(2), Value::Null])).unwrap();
        table.insert(row(vec![Value::Integer(3), Value::Null])).unwrap();
    }

    #[test]
    fn test_default_fills_omitted_column() {
        let schema = Schema::from_columns(vec![
            Column::new("id", DataType::Integer).primary_key(true),
            Column::new("status", DataType::Text).default(Value::Text("new".into())),
        ]);
        let table = Table::new("orders", schema);
        let id = table.insert(row(vec![Value::Integer(1)])).unwrap();
        assert_eq!(
            table.get_row(id).unwrap().get(1),
            Some(&Value::Text("new".into()))
        );
    }

    #[test]
    fn test_select_returns_clones() {
        let table = users_table();
        table
            .insert(row(vec![Value::Null, Value::Text("a".into())]))
            .unwrap();
        let mut rows = table.select(None);
        rows[0].set(1, Value::Text("mutated".into())).unwrap();
        assert_eq!(
            table.get_row(0).unwrap().get(1),
            Some(&Value::Text("a".into()))
        );
    }

    #[test]
    fn test_update_rejects_pk_change() {
        let table = users_table();
        table
            .insert(row(vec![Value::Null, Value::Text("a".into())]))
            .unwrap();
        let err = table
            .update(None, &|r| r.set(0, Value::Integer(42)))
            .unwrap_err();
        assert!(matches!(err, Error::PrimaryKeyUpdate(_)));
    }

    #[test]
    fn test_update_rejects_unique_collision() {
        let schema = Schema::from_columns(vec![
            Column::new("id", DataType::Integer).primary_key(true),
            Column::new("email", DataType::Text).unique(true),
        ]);
        let table = Table::new("accounts", schema);
        table
            .insert(row(vec![Value::Integer(1), Value::Text("a@x".into())]))
            .unwrap();
        table
            .insert(row(vec![Value::Integer(2), Value::Text("b@x".into())]))
            .unwrap();

        let pred = |r: &Row| r.get(0).is_some_and(|v| v.equals(&Value::Integer(2)));
        let err = table
            .update(Some(&pred), &|r| r.set(1, Value::Text("a@x".into())))
            .unwrap_err();
        assert!(matches!(err, Error::UniqueViolation(_)));
    }

    #[test]
    fn test_update_maintains_index() {
        let table = users_table();
        table
            .insert(row(vec![Value::Null, Value::Text("a".into())]))
            .unwrap();

        // id is indexed and cannot change; index the age column instead
        table.add_index("age").unwrap();
        table
            .update(None, &|r| r.set(2, Value::Integer(30)))
            .unwrap();
        assert_eq!(table.index_entries("age"), vec![(Value::Integer(30), 0)]);

        table
            .update(None, &|r| r.set(2, Value::Integer(31)))
            .unwrap();
        assert_eq!(table.index_entries("age"), vec![(Value::Integer(31), 0)]);
    }

    #[test]
    fn test_delete_renumbers_and_reindexes() {
        let table = users_table();
        for name in ["a", "b", "c"] {
            table
                .insert(row(vec![Value::Null, Value::Text(name.into())]))
                .unwrap();
        }
        let pred = |r: &Row| r.get(1).is_some_and(|v| v.equals(&Value::Text("b".into())));
        assert_eq!(table.delete(Some(&pred)).unwrap(), 1);
        assert_eq!(table.count(), 2);

        // Survivors keep their values; index entries point at the new positions.
        let entries = table.index_entries("id");
        assert_eq!(entries, vec![(Value::Integer(1), 0), (Value::Integer(3), 1)]);
        assert_eq!(table.lookup_by_index("id", &Value::Integer(3)).unwrap().get(1),
            Some(&Value::Text("c".into())));
    }

    #[test]
    fn test_truncate_resets_sequence() {
        let table = users_table();
        for _ in 0..3 {
            table
                .insert(row(vec![Value::Null, Value::Text("x".into())]))
                .unwrap();
        }
        table.truncate();
        assert_eq!(table.count(), 0);
        assert!(table.index_entries("id").is_empty());
        let id = table
            .insert(row(vec![Value::Null, Value::Text("y".into())]))
            .unwrap();
        assert_eq!(table.get_row(id).unwrap().get(0), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_add_index_backfills() {
        let table = users_table();
        for (name, age) in [("a", 20), ("b", 30)] {
            table
                .insert(row(vec![
                    Value::Null,
                    Value::Text(name.into()),
                    Value::Integer(age),
                ]))
                .unwrap();
        }
        table.add_index("age").unwrap();
        assert_eq!(
            table.index_entries("age"),
            vec![(Value::Integer(20), 0), (Value::Integer(30), 1)]
        );
        assert!(matches!(
            table.add_index("age"),
            Err(Error::IndexAlreadyExists(_))
        ));
        table.remove_index("age").unwrap();
        assert!(!table.has_index("age"));
    }

    #[test]
    fn test_add_foreign_key_validation() {
        let table = users_table();
        let bad = ForeignKey::new(vec!["id".into()], "other", Vec::new());
        assert!(table.add_foreign_key(bad).is_err());

        let missing = ForeignKey::new(vec!["nope".into()], "other", vec!["id".into()]);
        assert!(matches!(
            table.add_foreign_key(missing),
            Err(Error::ColumnNotFound(_))
        ));

        let ok = ForeignKey::new(vec!["age".into()], "other", vec!["id".into()]);
        table.add_foreign_key(ok).unwrap();
        assert_eq!(table.foreign_keys().len(), 1);
    }
}
