//! Integration tests for schema compilation and introspection on SQLite.
//!
//! Tests verify that:
//! - Created tables can be introspected back into the schema model
//! - Pending commands are applied and cleared by alter
//! - Rename, drop and drop-if-exists behave per table existence
//! - Inserts, generated ids and counts round through the routed query

use db_capsule::DbError;
use db_capsule::config::CompileOptions;
use db_capsule::db::{Manager, SchemaCompiler};
use db_capsule::grammar::Row;
use db_capsule::models::{Column, Command, DriverKind, Index, IndexKind, Table, Value};
use std::sync::Arc;
use tempfile::TempDir;

async fn setup_manager(options: CompileOptions) -> (TempDir, Arc<Manager>) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("app.db").display());
    let manager = Arc::new(Manager::with_options(options));
    manager
        .add_conn("main", DriverKind::SQLite, &url)
        .await
        .unwrap();
    (dir, manager)
}

fn users_table() -> Table {
    Table::new("users")
        .with_column(Column::new("id", "bigInteger").auto_increment())
        .with_column(Column::new("email", "string").with_length(255))
        .with_column(
            Column::new("status", "enum")
                .with_options(["active", "banned"])
                .with_default("active"),
        )
        .with_column(Column::new("score", "decimal").with_precision(10, 2).nullable())
        .with_index(Index::unique("email", ["email"]))
}

fn schema(manager: &Manager) -> SchemaCompiler {
    manager.schema().unwrap()
}

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let (_dir, manager) = setup_manager(CompileOptions::default()).await;
    let schema = schema(&manager);

    assert!(!schema.exists("users").await.unwrap());
    schema.create(&users_table()).await.unwrap();
    assert!(schema.exists("users").await.unwrap());

    let table = schema.get_table("users").await.unwrap();
    let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "email", "status", "score"]);

    let id = table.column("id").unwrap();
    assert!(id.is_auto_increment());
    assert!(id.primary);
    assert_eq!(table.primary.as_ref().unwrap().columns, vec!["id"]);

    let email = table.column("email").unwrap();
    assert_eq!(email.type_name, "string");
    assert_eq!(email.length, Some(255));
    assert!(!email.nullable);

    let status = table.column("status").unwrap();
    assert_eq!(status.type_name, "enum");
    assert_eq!(status.options, vec!["active", "banned"]);
    assert_eq!(status.default, Some(Value::Text("active".to_string())));

    let score = table.column("score").unwrap();
    assert_eq!(score.type_name, "decimal");
    assert_eq!((score.precision, score.scale), (Some(10), Some(2)));
    assert!(score.nullable);

    let email_index = table.index("email").unwrap();
    assert_eq!(email_index.kind, IndexKind::Unique);
    assert_eq!(email_index.columns, vec!["email"]);

    table.validate().unwrap();
}

#[tokio::test]
async fn test_get_missing_table_is_schema_error() {
    let (_dir, manager) = setup_manager(CompileOptions::default()).await;
    let err = schema(&manager).get_table("nope").await.unwrap_err();
    assert!(matches!(err, DbError::Schema { ref object, .. } if object == "nope"));
    assert!(schema(&manager).column_listing("nope").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_alter_applies_and_clears_commands() {
    let (_dir, manager) = setup_manager(CompileOptions::default()).await;
    let schema = schema(&manager);
    schema.create(&users_table()).await.unwrap();

    let mut table = schema.get_table("users").await.unwrap();
    table
        .push_command(Command::AddColumn(
            Column::new("nickname", "string").with_length(32).nullable(),
        ))
        .push_command(Command::AddIndex(Index::new(
            "nickname",
            IndexKind::Index,
            ["nickname"],
        )))
        .push_command(Command::RenameColumn {
            from: "score".to_string(),
            to: "rating".to_string(),
        });
    schema.alter(&mut table).await.unwrap();

    assert!(table.commands.is_empty());
    assert!(table.column("rating").is_some());

    let listed: Vec<String> = schema
        .column_listing("users")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(listed, vec!["id", "email", "status", "rating", "nickname"]);

    let fresh = schema.get_table("users").await.unwrap();
    assert!(fresh.index("nickname").is_some());
}

#[tokio::test]
async fn test_unsupported_alter_keeps_commands() {
    let (_dir, manager) = setup_manager(CompileOptions::default()).await;
    let schema = schema(&manager);
    schema.create(&users_table()).await.unwrap();

    let mut table = schema.get_table("users").await.unwrap();
    table.push_command(Command::ModifyColumn(Column::new("email", "text")));
    let err = schema.alter(&mut table).await.unwrap_err();
    assert!(matches!(err, DbError::Compile { .. }));
    assert_eq!(table.commands.len(), 1);
}

#[tokio::test]
async fn test_rename_and_drop() {
    let (_dir, manager) = setup_manager(CompileOptions::default()).await;
    let schema = schema(&manager);
    schema.create(&users_table()).await.unwrap();

    schema.rename("users", "members").await.unwrap();
    assert!(!schema.exists("users").await.unwrap());
    assert!(schema.exists("members").await.unwrap());

    assert!(schema.drop("users").await.is_err());
    schema.drop_if_exists("users").await.unwrap();
    schema.drop("members").await.unwrap();
    assert!(!schema.exists("members").await.unwrap());
}

#[tokio::test]
async fn test_table_prefix_applies_everywhere() {
    let options = CompileOptions::default().with_table_prefix("app_");
    let (_dir, manager) = setup_manager(options).await;
    let schema = schema(&manager);
    schema.create(&users_table()).await.unwrap();

    // The prefixed name is what exists on disk
    let plain = SchemaCompiler::new(
        manager.get_connection("main").unwrap(),
        CompileOptions::default(),
    );
    assert!(plain.exists("app_users").await.unwrap());

    let table = schema.get_table("users").await.unwrap();
    assert_eq!(table.name, "users");
    assert_eq!(table.index("email").unwrap().columns, vec!["email"]);

    let query = manager.query().unwrap();
    let row = Row::from([("email".to_string(), Value::from("a@example.com"))]);
    query.insert("users", &[row]).await.unwrap();
    assert_eq!(query.count("users").await.unwrap(), 1);
}

#[tokio::test]
async fn test_insert_variants() {
    let (_dir, manager) = setup_manager(CompileOptions::default()).await;
    schema(&manager).create(&users_table()).await.unwrap();
    let query = manager.query().unwrap();

    let email = |e: &str| Row::from([("email".to_string(), Value::from(e))]);

    let id = query
        .insert_get_id("users", &email("a@example.com"), None)
        .await
        .unwrap();
    assert_eq!(id, 1);
    let id = query
        .insert_get_id("users", &email("b@example.com"), Some("id"))
        .await
        .unwrap();
    assert_eq!(id, 2);

    let ignored = query
        .insert_or_ignore("users", &[email("a@example.com"), email("c@example.com")])
        .await
        .unwrap();
    assert_eq!(ignored, 1);

    let err = query
        .insert("users", &[email("a@example.com")])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Database { .. }));

    let mismatched = Row::from([
        ("email".to_string(), Value::from("d@example.com")),
        ("status".to_string(), Value::from("banned")),
    ]);
    let err = query
        .insert("users", &[email("e@example.com"), mismatched])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidInput { .. }));

    assert_eq!(query.count("users").await.unwrap(), 3);
}
