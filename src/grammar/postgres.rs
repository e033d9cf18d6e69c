//! PostgreSQL grammar.

use super::quoter::PostgresQuoter;
use super::types::{self, TypeMapper};
use super::{
    Grammar, InsertMode, Quoter, Statement, check_column, comment_marker, default_clause,
    join_clauses,
};
use crate::config::CompileOptions;
use crate::error::{DbError, DbResult};
use crate::models::{Column, Command, DriverKind, Table};

mod queries {
    pub const EXISTS: &str = r#"
        SELECT COUNT(*) AS count
        FROM information_schema.tables
        WHERE table_schema = current_schema() AND table_name = $1
    "#;

    pub const TABLE: &str = r#"
        SELECT
            current_database()::text AS db_name,
            t.table_schema::text AS schema_name,
            t.table_name::text AS table_name,
            t.table_type::text AS table_type,
            obj_description(c.oid, 'pg_class') AS table_comment,
            c.reltuples::bigint AS table_rows
        FROM information_schema.tables t
        JOIN pg_catalog.pg_namespace n ON n.nspname = t.table_schema
        JOIN pg_catalog.pg_class c ON c.relname = t.table_name AND c.relnamespace = n.oid
        WHERE t.table_schema = current_schema() AND t.table_name = $1
    "#;

    pub const COLUMNS: &str = r#"
        SELECT
            c.table_catalog::text AS db_name,
            c.table_name::text AS table_name,
            c.column_name::text AS column_name,
            c.ordinal_position::int4 AS position,
            c.column_default::text AS default_value,
            (c.is_nullable = 'YES') AS nullable,
            c.data_type::text AS data_type,
            c.udt_name::text AS udt_name,
            c.character_maximum_length::int4 AS char_length,
            c.character_octet_length::int4 AS octet_length,
            c.numeric_precision::int4 AS numeric_precision,
            c.numeric_scale::int4 AS numeric_scale,
            c.datetime_precision::int4 AS datetime_precision,
            c.character_set_name::text AS charset,
            c.collation_name::text AS collation,
            col_description(a.attrelid, a.attnum) AS column_comment
        FROM information_schema.columns c
        JOIN pg_catalog.pg_namespace n ON n.nspname = c.table_schema
        JOIN pg_catalog.pg_class r ON r.relname = c.table_name AND r.relnamespace = n.oid
        JOIN pg_catalog.pg_attribute a ON a.attrelid = r.oid AND a.attname = c.column_name
        WHERE c.table_schema = current_schema()
          AND c.table_catalog = COALESCE($1, current_database())
          AND c.table_name = $2
        ORDER BY c.ordinal_position
    "#;

    pub const INDEXES: &str = r#"
        SELECT
            i.relname::text AS index_name,
            a.attname::text AS column_name,
            ix.indisunique AS is_unique,
            ix.indisprimary AS is_primary,
            k.ord::int8 AS seq
        FROM pg_catalog.pg_class t
        JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
        JOIN pg_catalog.pg_index ix ON ix.indrelid = t.oid
        JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
        CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
        JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
        WHERE n.nspname = current_schema() AND t.relname = $1
        ORDER BY i.relname, k.ord
    "#;
}

#[derive(Debug, Clone)]
pub struct PostgresGrammar {
    options: CompileOptions,
    types: TypeMapper,
}

impl PostgresGrammar {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            types: TypeMapper::new(DriverKind::PostgreSQL),
        }
    }

    /// Idempotent creation of the derived enum type for a column.
    fn enum_type_sql(&self, column: &Column) -> Option<String> {
        if types::canonical(&column.type_name) != Some("enum") {
            return None;
        }
        let q = self.quoter();
        let labels: Vec<String> = column.options.iter().map(|o| q.string(o)).collect();
        let body = format!(
            "BEGIN CREATE TYPE {} AS ENUM ({}); EXCEPTION WHEN duplicate_object THEN NULL; END",
            q.identifier(&types::enum_type_name(&column.options)),
            labels.join(", ")
        );

        // Dollar-quote tag must not occur inside the body
        let mut tag = "$enum$".to_string();
        let mut n = 0;
        while body.contains(&tag) {
            n += 1;
            tag = format!("$enum{}$", n);
        }
        Some(format!("DO {tag} {body} {tag}"))
    }

    fn pkey_name(&self, table: &Table) -> String {
        self.quoter()
            .identifier(&format!("{}_pkey", self.table_name(&table.name)))
    }

    fn collation_clause(&self, column: &Column) -> String {
        column
            .collation
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| format!("COLLATE {}", self.quoter().identifier(c)))
            .unwrap_or_default()
    }

    fn modify_column_sql(&self, table: &Table, column: &Column) -> DbResult<Vec<String>> {
        if table.column(&column.name).is_none() {
            return Err(DbError::compile(
                "Column does not exist",
                table.object_name(&column.name),
            ));
        }
        check_column(table, column)?;

        let q = self.quoter();
        let name = q.identifier(&column.name);
        let native = self.types.column_type(column, q);

        let mut actions = vec![join_clauses([
            format!("ALTER COLUMN {} TYPE {}", name, native),
            self.collation_clause(column),
            format!("USING {}::{}", name, native),
        ])];
        actions.push(format!(
            "ALTER COLUMN {} {} NOT NULL",
            name,
            if column.nullable { "DROP" } else { "SET" }
        ));
        let default = default_clause(q, column)?;
        if !default.is_empty() {
            actions.push(format!("ALTER COLUMN {} SET {}", name, default));
        } else if !column.is_auto_increment() {
            actions.push(format!("ALTER COLUMN {} DROP DEFAULT", name));
        }

        let mut statements: Vec<String> = self.enum_type_sql(column).into_iter().collect();
        statements.push(format!(
            "ALTER TABLE {} {}",
            self.wrap_table(&table.name),
            actions.join(", ")
        ));
        let comment = self.column_comment_sql(&table.name, column);
        if !comment.is_empty() {
            statements.push(comment);
        }
        Ok(statements)
    }
}

impl Grammar for PostgresGrammar {
    fn driver(&self) -> DriverKind {
        DriverKind::PostgreSQL
    }

    fn quoter(&self) -> &dyn Quoter {
        &PostgresQuoter
    }

    fn types(&self) -> &TypeMapper {
        &self.types
    }

    fn options(&self) -> &CompileOptions {
        &self.options
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn add_column_sql(&self, column: &Column) -> DbResult<String> {
        let q = self.quoter();
        if column.is_auto_increment() {
            return Ok(join_clauses([
                q.identifier(&column.name),
                self.types.auto_increment_type(column, q),
            ]));
        }

        Ok(join_clauses([
            q.identifier(&column.name),
            self.types.column_type(column, q),
            if column.nullable { "NULL" } else { "NOT NULL" }.to_string(),
            default_clause(q, column)?,
            self.collation_clause(column),
        ]))
    }

    fn column_comment_sql(&self, table: &str, column: &Column) -> String {
        match comment_marker(column) {
            Some(text) => format!(
                "COMMENT ON COLUMN {}.{} IS {}",
                self.wrap_table(table),
                self.quoter().identifier(&column.name),
                self.quoter().string(&text)
            ),
            None => String::new(),
        }
    }

    fn exists_sql(&self, name: &str) -> Statement {
        Statement::new(queries::EXISTS).with_param(self.table_name(name))
    }

    fn table_sql(&self, name: &str) -> Statement {
        Statement::new(queries::TABLE).with_param(self.table_name(name))
    }

    fn column_listing_sql(&self, db_name: Option<&str>, name: &str) -> Statement {
        Statement::new(queries::COLUMNS)
            .with_param(db_name.map(str::to_string))
            .with_param(self.table_name(name))
    }

    fn index_listing_sql(&self, name: &str) -> Statement {
        Statement::new(queries::INDEXES).with_param(self.table_name(name))
    }

    fn create_sql(&self, table: &Table) -> DbResult<Vec<String>> {
        table.validate()?;

        let mut statements: Vec<String> = Vec::new();
        for sql in table.columns.iter().filter_map(|c| self.enum_type_sql(c)) {
            if !statements.contains(&sql) {
                statements.push(sql);
            }
        }

        let definitions = self.table_definitions(table)?;
        statements.push(format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.wrap_table(&table.name),
            definitions.join(",\n    ")
        ));
        statements.extend(self.index_statements(table)?);

        if let Some(comment) = table.comment.as_deref().filter(|c| !c.is_empty()) {
            statements.push(format!(
                "COMMENT ON TABLE {} IS {}",
                self.wrap_table(&table.name),
                self.quoter().string(comment)
            ));
        }
        statements.extend(
            table
                .columns
                .iter()
                .map(|c| self.column_comment_sql(&table.name, c))
                .filter(|sql| !sql.is_empty()),
        );
        Ok(statements)
    }

    fn command_sql(&self, table: &Table, command: &Command) -> DbResult<Vec<String>> {
        let q = self.quoter();
        let alter = format!("ALTER TABLE {}", self.wrap_table(&table.name));

        let statements = match command {
            Command::AddColumn(column) => {
                check_column(table, column)?;
                let mut statements: Vec<String> = self.enum_type_sql(column).into_iter().collect();
                statements.push(format!("{} ADD COLUMN {}", alter, self.add_column_sql(column)?));
                let comment = self.column_comment_sql(&table.name, column);
                if !comment.is_empty() {
                    statements.push(comment);
                }
                statements
            }
            Command::ModifyColumn(column) => self.modify_column_sql(table, column)?,
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
            Command::AddIndex(index) => {
                let sql = self.add_index_sql(table, index)?;
                match sql.is_empty() {
                    true => Vec::new(),
                    false if index.is_primary() => vec![format!("{} ADD {}", alter, sql)],
                    false => vec![sql],
                }
            }
            Command::DropIndex(name) => {
                vec![format!(
                    "DROP INDEX IF EXISTS {}",
                    self.index_name(&table.name, name)
                )]
            }
            Command::AddPrimary(primary) => {
                vec![format!("{} ADD {}", alter, self.add_primary_sql(table, primary)?)]
            }
            Command::DropPrimary => {
                vec![format!("{} DROP CONSTRAINT {}", alter, self.pkey_name(table))]
            }
            Command::RenameTable(name) => vec![self.rename_sql(&table.name, name)],
        };
        Ok(statements)
    }

    fn insert_suffix(&self, mode: &InsertMode) -> String {
        match mode {
            InsertMode::Plain => String::new(),
            InsertMode::Ignore => "ON CONFLICT DO NOTHING".to_string(),
            InsertMode::Returning(column) => {
                format!("RETURNING {}", self.quoter().identifier(column))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Row;
    use crate::models::{Index, IndexKind, Primary, Value};

    fn grammar() -> PostgresGrammar {
        PostgresGrammar::new(CompileOptions::default())
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
                "CREATE TABLE \"users\" (\n    \"id\" BIGSERIAL,\n    \"email\" VARCHAR(255) NOT NULL,\n    PRIMARY KEY (\"id\")\n)",
                "CREATE UNIQUE INDEX \"users_email\" ON \"users\" (\"email\")",
            ]
        );
    }

    #[test]
    fn test_auto_increment_has_no_null_or_default() {
        let col = Column::new("id", "integer")
            .auto_increment()
            .nullable()
            .with_default(5);
        assert_eq!(grammar().add_column_sql(&col).unwrap(), "\"id\" SERIAL");
    }

    #[test]
    fn test_column_clauses() {
        let col = Column::new("name", "string")
            .with_length(64)
            .nullable()
            .with_default("anon")
            .with_collation("C");
        assert_eq!(
            grammar().add_column_sql(&col).unwrap(),
            "\"name\" VARCHAR(64) NULL DEFAULT 'anon' COLLATE \"C\""
        );
    }

    #[test]
    fn test_enum_type_created_first() {
        let table = Table::new("orders")
            .with_column(Column::new("status", "enum").with_options(["New", "done"]));
        let statements = grammar().create_sql(&table).unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("DO $enum$ BEGIN CREATE TYPE \"enum__new_eopt_done\" AS ENUM ('New', 'done');"));
        assert!(statements[0].ends_with("END $enum$"));
        assert!(statements[1].contains("\"status\" \"enum__new_eopt_done\" NOT NULL"));
    }

    #[test]
    fn test_enum_dollar_tag_avoids_body() {
        let col = Column::new("s", "enum").with_options(["$enum$"]);
        let sql = grammar().enum_type_sql(&col).unwrap();
        assert!(sql.starts_with("DO $enum1$ "));
        assert!(sql.ends_with(" $enum1$"));
    }

    #[test]
    fn test_enum_without_options() {
        let table = Table::new("t").with_column(Column::new("s", "enum"));
        assert!(matches!(grammar().create_sql(&table), Err(DbError::Compile { .. })));
    }

    #[test]
    fn test_type_marker_comments() {
        let table = Table::new("hits")
            .with_column(Column::new("ip", "ipAddress").with_comment("client"))
            .with_column(Column::new("y", "year"))
            .with_comment("raw hits");
        let statements = grammar().create_sql(&table).unwrap();
        assert!(statements[0].contains("\"ip\" INTEGER NOT NULL"));
        assert!(statements[0].contains("\"y\" SMALLINT NOT NULL"));
        assert_eq!(statements[1], "COMMENT ON TABLE \"hits\" IS 'raw hits'");
        assert_eq!(
            statements[2],
            "COMMENT ON COLUMN \"hits\".\"ip\" IS 'T:ipAddress|client'"
        );
        assert_eq!(statements[3], "COMMENT ON COLUMN \"hits\".\"y\" IS 'T:year|'");
    }

    #[test]
    fn test_json_index_suppressed() {
        let table = Table::new("docs")
            .with_column(Column::new("body", "jsonb"))
            .with_column(Column::new("slug", "string"))
            .with_index(Index::new("body", IndexKind::Index, ["body"]))
            .with_index(Index::new("slug", IndexKind::Index, ["slug"]));
        let g = grammar();
        assert_eq!(g.add_index_sql(&table, &table.indexes[0]).unwrap(), "");
        assert_eq!(
            g.add_index_sql(&table, &table.indexes[1]).unwrap(),
            "CREATE INDEX \"docs_slug\" ON \"docs\" (\"slug\")"
        );
        assert_eq!(g.create_sql(&table).unwrap().len(), 2);
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
    fn test_alter_commands() {
        let mut table = users();
        table
            .push_command(Command::AddColumn(Column::new("age", "smallInteger").nullable()))
            .push_command(Command::AddIndex(Index::new("age", IndexKind::Index, ["age"])))
            .push_command(Command::RenameColumn {
                from: "age".to_string(),
                to: "years".to_string(),
            })
            .push_command(Command::DropIndex("email".to_string()))
            .push_command(Command::DropPrimary)
            .push_command(Command::RenameTable("members".to_string()));
        let statements = grammar().alter_sql(&table).unwrap();
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE \"users\" ADD COLUMN \"age\" SMALLINT NULL",
                "CREATE INDEX \"users_age\" ON \"users\" (\"age\")",
                "ALTER TABLE \"users\" RENAME COLUMN \"age\" TO \"years\"",
                "DROP INDEX IF EXISTS \"users_email\"",
                "ALTER TABLE \"users\" DROP CONSTRAINT \"users_pkey\"",
                "ALTER TABLE \"users\" RENAME TO \"members\"",
            ]
        );
    }

    #[test]
    fn test_modify_column() {
        let mut table = users();
        table.push_command(Command::ModifyColumn(
            Column::new("email", "string").with_length(320).nullable(),
        ));
        let statements = grammar().alter_sql(&table).unwrap();
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE \"users\" ALTER COLUMN \"email\" TYPE VARCHAR(320) USING \"email\"::VARCHAR(320), \
                 ALTER COLUMN \"email\" DROP NOT NULL, ALTER COLUMN \"email\" DROP DEFAULT"
            ]
        );
    }

    #[test]
    fn test_modify_unknown_column() {
        let mut table = users();
        table.push_command(Command::ModifyColumn(Column::new("phone", "string")));
        assert!(matches!(grammar().alter_sql(&table), Err(DbError::Compile { .. })));
    }

    #[test]
    fn test_add_index_after_unknown_column_fails() {
        let mut table = users();
        table.push_command(Command::AddIndex(Index::unique("phone", ["phone"])));
        let err = grammar().alter_sql(&table).unwrap_err();
        assert!(matches!(err, DbError::Compile { ref object, .. } if object == "users.phone"));
    }

    #[test]
    fn test_introspection_statements_are_parameterized() {
        let g = grammar();
        let stmt = g.exists_sql("users'; DROP TABLE x; --");
        assert!(stmt.sql.contains("$1"));
        assert!(!stmt.sql.contains("DROP TABLE x"));
        assert_eq!(stmt.params, vec![Value::Text("users'; DROP TABLE x; --".to_string())]);

        let stmt = g.column_listing_sql(None, "users");
        assert_eq!(stmt.params, vec![Value::Null, Value::Text("users".to_string())]);
    }

    #[test]
    fn test_insert_modes() {
        let g = grammar();
        let mut row = Row::new();
        row.insert("email".to_string(), Value::from("a@b.c"));
        row.insert("name".to_string(), Value::from("A"));
        let rows = vec![row.clone(), row];

        let stmt = g.insert_sql("users", &rows, &InsertMode::Plain).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"users\" (\"email\", \"name\") VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(stmt.params.len(), 4);

        let stmt = g.insert_sql("users", &rows[..1], &InsertMode::Ignore).unwrap();
        assert!(stmt.sql.ends_with("VALUES ($1, $2) ON CONFLICT DO NOTHING"));

        let stmt = g
            .insert_sql("users", &rows[..1], &InsertMode::Returning("id".to_string()))
            .unwrap();
        assert!(stmt.sql.ends_with("RETURNING \"id\""));
    }

    #[test]
    fn test_insert_rejects_mismatched_rows() {
        let mut a = Row::new();
        a.insert("x".to_string(), Value::Int(1));
        let mut b = Row::new();
        b.insert("y".to_string(), Value::Int(2));
        let err = grammar().insert_sql("t", &[a, b], &InsertMode::Plain).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
        assert!(matches!(
            grammar().insert_sql("t", &[], &InsertMode::Plain),
            Err(DbError::InvalidInput { .. })
        ));
    }
}
