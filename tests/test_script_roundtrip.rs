//! Export-then-import round trips through the script interface.

use opaldb::{Database, Executor};
use std::sync::Arc;

fn setup() -> Executor {
    Executor::new(Arc::new(Database::new()))
}

fn populated() -> Executor {
    let exec = setup();
    exec.execute(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT UNIQUE)",
    )
    .unwrap();
    exec.execute("CREATE TABLE readings (id INTEGER PRIMARY KEY, celsius FLOAT, valid BOOLEAN)")
        .unwrap();
    exec.execute("INSERT INTO users (name, email) VALUES ('Alice', 'alice@x'), ('Bob', 'bob@x')")
        .unwrap();
    exec.execute("INSERT INTO users (name) VALUES ('O\\'Brien')")
        .unwrap();
    exec.execute("INSERT INTO readings (celsius, valid) VALUES (21.5, 'true'), (4.0, 'false')")
        .unwrap();
    exec.execute("INSERT INTO readings (celsius) VALUES (NULL)")
        .unwrap();
    exec
}

#[test]
fn test_export_import_reproduces_catalog() {
    let original = populated();
    let script = original.export_script();

    let restored = setup();
    restored.import_script(&script).unwrap();

    assert_eq!(
        original.database().list_tables(),
        restored.database().list_tables()
    );
    for name in original.database().list_tables() {
        assert_eq!(
            original.database().schema(&name).unwrap(),
            restored.database().schema(&name).unwrap(),
            "schema mismatch for {}",
            name
        );
        let before = original.execute(&format!("SELECT * FROM {}", name)).unwrap();
        let after = restored.execute(&format!("SELECT * FROM {}", name)).unwrap();
        assert_eq!(before.rows, after.rows, "row mismatch for {}", name);
    }

    // A second export of the restored catalog is byte-identical.
    assert_eq!(script, restored.export_script());
}

#[test]
fn test_roundtrip_preserves_quotes_and_floats() {
    let original = populated();
    let restored = setup();
    restored.import_script(&original.export_script()).unwrap();

    let result = restored
        .execute("SELECT name FROM users WHERE id = 3")
        .unwrap();
    assert_eq!(result.rows, vec![vec!["O'Brien".to_string()]]);

    // The whole float survives as a float, not an integer.
    let result = restored
        .execute("SELECT celsius FROM readings WHERE id = 2")
        .unwrap();
    assert_eq!(result.rows, vec![vec!["4".to_string()]]);
    let schema = restored.database().schema("readings").unwrap();
    assert_eq!(
        schema.get_column("celsius").unwrap().data_type,
        opaldb::DataType::Float
    );
}

#[test]
fn test_file_roundtrip() {
    let original = populated();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.sql");

    original.export_file(&path).unwrap();
    let restored = setup();
    let executed = restored.import_file(&path).unwrap();
    assert!(executed >= 7);
    assert_eq!(restored.database().get_table("users").unwrap().count(), 3);
    assert_eq!(restored.database().get_table("readings").unwrap().count(), 3);
}
