//! Integration test for the process-wide default manager.
//!
//! The global cell is shared by every test in a binary, so the whole lifecycle runs
//! in a single test.

use db_capsule::DbError;
use db_capsule::db::{self, Manager, global};
use db_capsule::grammar::Row;
use db_capsule::models::{Column, DriverKind, Table, Value};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_global_manager_lifecycle() {
    assert!(matches!(db::schema(), Err(DbError::NoGlobalManager)));
    assert!(matches!(db::query(), Err(DbError::NoGlobalManager)));

    let dir = TempDir::new().unwrap();
    let url = |file: &str| format!("sqlite://{}?mode=rwc", dir.path().join(file).display());

    // The first manager to register a connection becomes the global manager
    let first = Arc::new(Manager::new());
    first
        .add_conn("first", DriverKind::SQLite, &url("first.db"))
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&global::get().unwrap(), &first));

    let second = Arc::new(Manager::new());
    second
        .add_conn("second", DriverKind::SQLite, &url("second.db"))
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&global::get().unwrap(), &first));

    let table = Table::new("notes").with_column(Column::new("body", "text"));
    db::schema().unwrap().create(&table).await.unwrap();
    let row = Row::from([("body".to_string(), Value::from("hello"))]);
    db::query().unwrap().insert("notes", &[row]).await.unwrap();
    assert_eq!(db::query().unwrap().count("notes").await.unwrap(), 1);
    assert_eq!(
        db::schema().unwrap().connection().name(),
        "first"
    );

    // Explicit installation replaces the global manager
    second.set_as_global();
    assert_eq!(db::schema().unwrap().connection().name(), "second");
    assert!(!db::schema().unwrap().exists("notes").await.unwrap());

    global::clear();
    assert!(matches!(db::schema(), Err(DbError::NoGlobalManager)));
}
