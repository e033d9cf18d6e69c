//! SQLite grammar.
//!
//! An auto-increment column must be the table's rowid alias, so it carries the
//! primary key inline and no other primary key may be declared. SQLite cannot alter
//! a column or a primary key in place; those commands are rejected at compile time.

use super::quoter::SqliteQuoter;
use super::types::{self, TypeMapper};
use super::{
    Grammar, InsertMode, Quoter, Statement, bare_word, check_column, default_clause,
    join_clauses, unsupported,
};
use crate::config::CompileOptions;
use crate::error::{DbError, DbResult};
use crate::models::{Column, Command, DriverKind, Table};

mod queries {
    pub const EXISTS: &str =
        "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?";

    pub const TABLE: &str = "SELECT name AS table_name, type AS table_type, sql FROM sqlite_master WHERE type = 'table' AND name = ?";

    pub const COLUMNS: &str = r#"
        SELECT cid, name AS column_name, type AS data_type, "notnull" AS not_null,
               dflt_value AS default_value, pk
        FROM pragma_table_info(?, COALESCE(?, 'main'))
        ORDER BY cid
    "#;

    pub const INDEXES: &str = r#"
        SELECT il.name AS index_name, il."unique" AS is_unique, il.origin AS origin,
               ii.seqno AS seq, ii.name AS column_name
        FROM pragma_index_list(?) AS il
        JOIN pragma_index_info(il.name) AS ii
        ORDER BY il.name, ii.seqno
    "#;
}

#[derive(Debug, Clone)]
pub struct SqliteGrammar {
    options: CompileOptions,
    types: TypeMapper,
}

impl SqliteGrammar {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            types: TypeMapper::new(DriverKind::SQLite),
        }
    }

    fn check_auto_increment(&self, table: &Table) -> DbResult<()> {
        let auto: Vec<&Column> = table
            .columns
            .iter()
            .filter(|c| c.is_auto_increment())
            .collect();
        if auto.len() > 1 {
            return Err(DbError::compile(
                "SQLite allows one auto-increment column per table",
                table.name.clone(),
            ));
        }

        let Some(column) = auto.first() else {
            return Ok(());
        };
        let declared = table
            .primary
            .iter()
            .map(|p| &p.columns)
            .chain(table.indexes.iter().filter(|i| i.is_primary()).map(|i| &i.columns));
        for columns in declared {
            if columns.len() != 1 || columns[0] != column.name {
                return Err(DbError::compile(
                    "Auto-increment column must be the only primary key column",
                    table.object_name(&column.name),
                ));
            }
        }
        Ok(())
    }
}

impl Grammar for SqliteGrammar {
    fn driver(&self) -> DriverKind {
        DriverKind::SQLite
    }

    fn quoter(&self) -> &dyn Quoter {
        &SqliteQuoter
    }

    fn types(&self) -> &TypeMapper {
        &self.types
    }

    fn options(&self) -> &CompileOptions {
        &self.options
    }

    fn add_column_sql(&self, column: &Column) -> DbResult<String> {
        let q = self.quoter();
        let name = q.identifier(&column.name);
        if column.is_auto_increment() {
            return Ok(format!(
                "{} {} PRIMARY KEY AUTOINCREMENT",
                name,
                self.types.auto_increment_type(column, q)
            ));
        }

        let check = if types::canonical(&column.type_name) == Some("enum") {
            let options: Vec<String> = column.options.iter().map(|o| q.string(o)).collect();
            format!("CHECK ({} IN ({}))", name, options.join(", "))
        } else {
            String::new()
        };
        let collation = match column.collation.as_deref().filter(|c| !c.is_empty()) {
            Some(c) => format!(
                "COLLATE {}",
                bare_word(c, &format!("{}.{}", column.table_name, column.name))?
            ),
            None => String::new(),
        };

        Ok(join_clauses([
            name,
            self.types.column_type(column, q),
            if column.nullable { "NULL" } else { "NOT NULL" }.to_string(),
            default_clause(q, column)?,
            check,
            collation,
        ]))
    }

    fn inline_primary_key(&self, table: &Table, columns: &[String]) -> bool {
        !matches!(columns, [only] if table.column(only).is_some_and(Column::is_auto_increment))
    }

    fn exists_sql(&self, name: &str) -> Statement {
        Statement::new(queries::EXISTS).with_param(self.table_name(name))
    }

    fn table_sql(&self, name: &str) -> Statement {
        Statement::new(queries::TABLE).with_param(self.table_name(name))
    }

    fn column_listing_sql(&self, db_name: Option<&str>, name: &str) -> Statement {
        Statement::new(queries::COLUMNS)
            .with_param(self.table_name(name))
            .with_param(db_name.map(str::to_string))
    }

    fn index_listing_sql(&self, name: &str) -> Statement {
        Statement::new(queries::INDEXES).with_param(self.table_name(name))
    }

    fn create_sql(&self, table: &Table) -> DbResult<Vec<String>> {
        table.validate()?;
        self.check_auto_increment(table)?;

        let definitions = self.table_definitions(table)?;
        let mut statements = vec![format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.wrap_table(&table.name),
            definitions.join(",\n    ")
        )];
        statements.extend(self.index_statements(table)?);
        Ok(statements)
    }

    fn command_sql(&self, table: &Table, command: &Command) -> DbResult<Vec<String>> {
        let q = self.quoter();
        let alter = format!("ALTER TABLE {}", self.wrap_table(&table.name));

        let statements = match command {
            Command::AddColumn(column) => {
                check_column(table, column)?;
                if column.is_auto_increment() {
                    return Err(DbError::compile(
                        "Cannot add an auto-increment column to an existing table",
                        table.object_name(&column.name),
                    ));
                }
                vec![format!("{} ADD COLUMN {}", alter, self.add_column_sql(column)?)]
            }
            Command::RenameColumn { from, to } => {
                table.resolve_columns(std::slice::from_ref(from), &table.object_name(from))?;
                vec![format!(
                    "{} RENAME COLUMN {} TO {}",
                    alter,
                    q.identifier(from),
                    q.identifier(to)
                )]
            }
            Command::DropColumn(name) => {
                vec![format!("{} DROP COLUMN {}", alter, q.identifier(name))]
            }
            Command::AddIndex(index) if !index.is_primary() => {
                let sql = self.add_index_sql(table, index)?;
                if sql.is_empty() { Vec::new() } else { vec![sql] }
            }
            Command::DropIndex(name) => vec![format!(
                "DROP INDEX IF EXISTS {}",
                self.index_name(&table.name, name)
            )],
            Command::RenameTable(name) => vec![self.rename_sql(&table.name, name)],
            Command::ModifyColumn(_)
            | Command::AddIndex(_)
            | Command::AddPrimary(_)
            | Command::DropPrimary => return Err(unsupported(self.driver(), command, table)),
        };
        Ok(statements)
    }

    fn insert_verb(&self, mode: &InsertMode) -> &'static str {
        match mode {
            InsertMode::Ignore => "INSERT OR IGNORE INTO",
            _ => "INSERT INTO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Row;
    use crate::models::{Index, IndexKind, Primary, Value};

    fn grammar() -> SqliteGrammar {
        SqliteGrammar::new(CompileOptions::default())
    }

    fn users() -> Table {
        Table::new("users")
            .with_column(Column::new("id", "bigInteger").auto_increment())
            .with_column(Column::new("email", "string").with_length(255))
            .with_index(Index::unique("email", ["email"]))
            .with_primary(Primary::new(["id"]))
    }

    #[test]
    fn test_create_users() {
        let statements = grammar().create_sql(&users()).unwrap();
        assert_eq!(
            statements,
            vec![
                "CREATE TABLE \"users\" (\n    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,\n    \"email\" VARCHAR(255) NOT NULL\n)",
                "CREATE UNIQUE INDEX \"users_email\" ON \"users\" (\"email\")",
            ]
        );
    }

    #[test]
    fn test_composite_primary_key() {
        let table = Table::new("pairs")
            .with_column(Column::new("a", "integer"))
            .with_column(Column::new("b", "integer"))
            .with_primary(Primary::new(["a", "b"]));
        let statements = grammar().create_sql(&table).unwrap();
        assert!(statements[0].ends_with("PRIMARY KEY (\"a\", \"b\")\n)"));
    }

    #[test]
    fn test_auto_increment_conflicting_primary() {
        let table = users().with_column(Column::new("tenant", "integer"));
        let mut table = table;
        table.primary = Some(Primary::new(["id", "tenant"]));
        assert!(matches!(grammar().create_sql(&table), Err(DbError::Compile { .. })));
    }

    #[test]
    fn test_enum_check_constraint() {
        let col = Column::new("status", "enum")
            .with_options(["new", "it's"])
            .nullable();
        assert_eq!(
            grammar().add_column_sql(&col).unwrap(),
            "\"status\" TEXT NULL CHECK (\"status\" IN ('new', 'it''s'))"
        );
    }

    #[test]
    fn test_comments_are_dropped() {
        let table = Table::new("t")
            .with_column(Column::new("ip", "ipAddress").with_comment("client"))
            .with_comment("table");
        let statements = grammar().create_sql(&table).unwrap();
        assert_eq!(statements, vec!["CREATE TABLE \"t\" (\n    \"ip\" INTEGER NOT NULL\n)"]);
    }

    #[test]
    fn test_fulltext_is_plain_index() {
        let table = Table::new("posts")
            .with_column(Column::new("body", "text"))
            .with_index(Index::new("body", IndexKind::Fulltext, ["body"]));
        assert_eq!(
            grammar().add_index_sql(&table, &table.indexes[0]).unwrap(),
            "CREATE INDEX \"posts_body\" ON \"posts\" (\"body\")"
        );
    }

    #[test]
    fn test_supported_alterations() {
        let mut table = users();
        table
            .push_command(Command::AddColumn(Column::new("nick", "string").nullable()))
            .push_command(Command::AddIndex(Index::new("nick", IndexKind::Index, ["nick"])))
            .push_command(Command::DropIndex("email".to_string()))
            .push_command(Command::RenameColumn {
                from: "nick".to_string(),
                to: "handle".to_string(),
            })
            .push_command(Command::DropColumn("email".to_string()));
        assert_eq!(
            grammar().alter_sql(&table).unwrap(),
            vec![
                "ALTER TABLE \"users\" ADD COLUMN \"nick\" VARCHAR NULL",
                "CREATE INDEX \"users_nick\" ON \"users\" (\"nick\")",
                "DROP INDEX IF EXISTS \"users_email\"",
                "ALTER TABLE \"users\" RENAME COLUMN \"nick\" TO \"handle\"",
                "ALTER TABLE \"users\" DROP COLUMN \"email\"",
            ]
        );
    }

    #[test]
    fn test_unsupported_alterations() {
        let g = grammar();
        for command in [
            Command::ModifyColumn(Column::new("email", "text")),
            Command::AddPrimary(Primary::new(["email"])),
            Command::DropPrimary,
            Command::AddIndex(Index::new("pk", IndexKind::Primary, ["email"])),
            Command::AddColumn(Column::new("seq", "integer").auto_increment()),
        ] {
            let mut table = users();
            table.push_command(command);
            assert!(matches!(g.alter_sql(&table), Err(DbError::Compile { .. })));
        }
    }

    #[test]
    fn test_insert_or_ignore() {
        let mut row = Row::new();
        row.insert("email".to_string(), Value::from("a@b.c"));
        row.insert("id".to_string(), Value::Int(1));
        let stmt = grammar().insert_sql("users", &[row], &InsertMode::Ignore).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT OR IGNORE INTO \"users\" (\"email\", \"id\") VALUES (?, ?)"
        );
        assert_eq!(stmt.params, vec![Value::from("a@b.c"), Value::Int(1)]);
    }
}
