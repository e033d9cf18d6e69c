//! MySQL grammar.

use super::quoter::MySqlQuoter;
use super::types::TypeMapper;
use super::{
    Grammar, InsertMode, Quoter, Statement, bare_word, check_column, default_clause,
    join_clauses,
};
use crate::config::CompileOptions;
use crate::error::{DbError, DbResult};
use crate::models::{AUTO_INCREMENT, Column, Command, DriverKind, Index, IndexKind, Table};

mod queries {
    pub const EXISTS: &str = r#"
        SELECT COUNT(*) AS count
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
    "#;

    pub const TABLE: &str = r#"
        SELECT
            CONVERT(t.TABLE_SCHEMA USING utf8mb4) AS db_name,
            CONVERT(t.TABLE_NAME USING utf8mb4) AS table_name,
            CONVERT(t.TABLE_TYPE USING utf8mb4) AS table_type,
            CONVERT(t.ENGINE USING utf8mb4) AS engine,
            CONVERT(t.TABLE_COLLATION USING utf8mb4) AS collation,
            CONVERT(c.CHARACTER_SET_NAME USING utf8mb4) AS charset,
            CONVERT(t.TABLE_COMMENT USING utf8mb4) AS table_comment,
            CAST(t.TABLE_ROWS AS SIGNED) AS table_rows,
            CAST(t.AVG_ROW_LENGTH AS SIGNED) AS avg_row_length,
            CAST(t.INDEX_LENGTH AS SIGNED) AS index_length,
            CAST(t.AUTO_INCREMENT AS SIGNED) AS auto_increment,
            CAST(t.CREATE_TIME AS CHAR) AS create_time
        FROM information_schema.TABLES t
        LEFT JOIN information_schema.COLLATION_CHARACTER_SET_APPLICABILITY c
            ON c.COLLATION_NAME = t.TABLE_COLLATION
        WHERE t.TABLE_SCHEMA = DATABASE() AND t.TABLE_NAME = ?
        LIMIT 1
    "#;

    pub const COLUMNS: &str = r#"
        SELECT
            CONVERT(TABLE_SCHEMA USING utf8mb4) AS db_name,
            CONVERT(TABLE_NAME USING utf8mb4) AS table_name,
            CONVERT(COLUMN_NAME USING utf8mb4) AS column_name,
            CAST(ORDINAL_POSITION AS SIGNED) AS position,
            CONVERT(COLUMN_DEFAULT USING utf8mb4) AS default_value,
            CAST(IS_NULLABLE = 'YES' AS SIGNED) AS nullable,
            CONVERT(DATA_TYPE USING utf8mb4) AS data_type,
            CONVERT(COLUMN_TYPE USING utf8mb4) AS column_type,
            CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS char_length,
            CAST(CHARACTER_OCTET_LENGTH AS SIGNED) AS octet_length,
            CAST(NUMERIC_PRECISION AS SIGNED) AS numeric_precision,
            CAST(NUMERIC_SCALE AS SIGNED) AS numeric_scale,
            CAST(DATETIME_PRECISION AS SIGNED) AS datetime_precision,
            CONVERT(CHARACTER_SET_NAME USING utf8mb4) AS charset,
            CONVERT(COLLATION_NAME USING utf8mb4) AS collation,
            CONVERT(COLUMN_KEY USING utf8mb4) AS column_key,
            CONVERT(EXTRA USING utf8mb4) AS extra,
            CONVERT(COLUMN_COMMENT USING utf8mb4) AS column_comment
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
    "#;

    pub const INDEXES: &str = r#"
        SELECT
            CONVERT(INDEX_NAME USING utf8mb4) AS index_name,
            CONVERT(COLUMN_NAME USING utf8mb4) AS column_name,
            CAST(NON_UNIQUE AS SIGNED) AS non_unique,
            CONVERT(INDEX_TYPE USING utf8mb4) AS index_type,
            CONVERT(INDEX_COMMENT USING utf8mb4) AS index_comment,
            CAST(SEQ_IN_INDEX AS SIGNED) AS seq
        FROM information_schema.STATISTICS
        WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
        ORDER BY INDEX_NAME, SEQ_IN_INDEX
    "#;
}

#[derive(Debug, Clone)]
pub struct MySqlGrammar {
    options: CompileOptions,
    types: TypeMapper,
}

impl MySqlGrammar {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            types: TypeMapper::new(DriverKind::MySQL),
        }
    }

    /// `ENGINE=... DEFAULT CHARSET=... COLLATE=... COMMENT=...`
    fn table_options(&self, table: &Table) -> DbResult<String> {
        let engine = table.engine.as_deref().or(self.options.engine.as_deref());
        let charset = table.charset.as_deref().or(self.options.charset.as_deref());
        let collation = table
            .collation
            .as_deref()
            .or(self.options.collation.as_deref());

        let mut clauses = Vec::new();
        if let Some(engine) = engine {
            clauses.push(format!("ENGINE={}", bare_word(engine, &table.name)?));
        }
        if let Some(charset) = charset {
            clauses.push(format!("DEFAULT CHARSET={}", bare_word(charset, &table.name)?));
        }
        if let Some(collation) = collation {
            clauses.push(format!("COLLATE={}", bare_word(collation, &table.name)?));
        }
        if let Some(comment) = table.comment.as_deref().filter(|c| !c.is_empty()) {
            clauses.push(format!("COMMENT={}", self.quoter().string(comment)));
        }
        Ok(join_clauses(clauses))
    }
}

impl Grammar for MySqlGrammar {
    fn driver(&self) -> DriverKind {
        DriverKind::MySQL
    }

    fn quoter(&self) -> &dyn Quoter {
        &MySqlQuoter
    }

    fn types(&self) -> &TypeMapper {
        &self.types
    }

    fn options(&self) -> &CompileOptions {
        &self.options
    }

    fn add_column_sql(&self, column: &Column) -> DbResult<String> {
        let q = self.quoter();
        let object = format!("{}.{}", column.table_name, column.name);
        let auto = column.is_auto_increment();

        let charset = match column.charset.as_deref().filter(|c| !c.is_empty()) {
            Some(c) => format!("CHARACTER SET {}", bare_word(c, &object)?),
            None => String::new(),
        };
        let collation = match column.collation.as_deref().filter(|c| !c.is_empty()) {
            Some(c) => format!("COLLATE {}", bare_word(c, &object)?),
            None => String::new(),
        };
        let (nullability, default, extra) = if auto {
            (String::new(), String::new(), AUTO_INCREMENT.to_string())
        } else {
            (
                if column.nullable { "NULL" } else { "NOT NULL" }.to_string(),
                default_clause(q, column)?,
                String::new(),
            )
        };
        let comment = column
            .comment_text()
            .map(|c| format!("COMMENT {}", q.string(c)))
            .unwrap_or_default();

        Ok(join_clauses([
            q.identifier(&column.name),
            if auto {
                self.types.auto_increment_type(column, q)
            } else {
                self.types.column_type(column, q)
            },
            charset,
            nullability,
            default,
            extra,
            collation,
            comment,
        ]))
    }

    fn index_keyword(&self, kind: IndexKind) -> &'static str {
        match kind {
            IndexKind::Unique => "UNIQUE INDEX",
            IndexKind::Fulltext => "FULLTEXT INDEX",
            _ => "INDEX",
        }
    }

    fn index_comment(&self, index: &Index) -> String {
        index
            .comment
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| format!("COMMENT {}", self.quoter().string(c)))
            .unwrap_or_default()
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

        let definitions = self.table_definitions(table)?;
        let mut statements = vec![join_clauses([
            format!(
                "CREATE TABLE {} (\n    {}\n)",
                self.wrap_table(&table.name),
                definitions.join(",\n    ")
            ),
            self.table_options(table)?,
        ])];
        statements.extend(self.index_statements(table)?);
        Ok(statements)
    }

    fn command_sql(&self, table: &Table, command: &Command) -> DbResult<Vec<String>> {
        let q = self.quoter();
        let alter = format!("ALTER TABLE {}", self.wrap_table(&table.name));

        let statements = match command {
            Command::AddColumn(column) => {
                check_column(table, column)?;
                vec![format!("{} ADD COLUMN {}", alter, self.add_column_sql(column)?)]
            }
            Command::ModifyColumn(column) => {
                if table.column(&column.name).is_none() {
                    return Err(DbError::compile(
                        "Column does not exist",
                        table.object_name(&column.name),
                    ));
                }
                check_column(table, column)?;
                vec![format!("{} MODIFY COLUMN {}", alter, self.add_column_sql(column)?)]
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
            Command::AddIndex(index) => {
                let sql = self.add_index_sql(table, index)?;
                match sql.is_empty() {
                    true => Vec::new(),
                    false if index.is_primary() => vec![format!("{} ADD {}", alter, sql)],
                    false => vec![sql],
                }
            }
            Command::DropIndex(name) => vec![format!(
                "DROP INDEX {} ON {}",
                self.index_name(&table.name, name),
                self.wrap_table(&table.name)
            )],
            Command::AddPrimary(primary) => {
                vec![format!("{} ADD {}", alter, self.add_primary_sql(table, primary)?)]
            }
            Command::DropPrimary => vec![format!("{} DROP PRIMARY KEY", alter)],
            Command::RenameTable(name) => vec![self.rename_sql(&table.name, name)],
        };
        Ok(statements)
    }

    fn insert_verb(&self, mode: &InsertMode) -> &'static str {
        match mode {
            InsertMode::Ignore => "INSERT IGNORE INTO",
            _ => "INSERT INTO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Row;
    use crate::models::{Primary, Value};

    fn grammar() -> MySqlGrammar {
        MySqlGrammar::new(CompileOptions::default())
    }

    fn users() -> Table {
        Table::new("users")
            .with_column(Column::new("id", "bigInteger").auto_increment().unsigned())
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
                "CREATE TABLE `users` (\n    `id` BIGINT UNSIGNED AUTO_INCREMENT,\n    `email` VARCHAR(255) NOT NULL,\n    PRIMARY KEY (`id`)\n)",
                "CREATE UNIQUE INDEX `users_email` ON `users` (`email`)",
            ]
        );
    }

    #[test]
    fn test_table_options() {
        let options = CompileOptions {
            engine: Some("InnoDB".to_string()),
            charset: Some("utf8mb4".to_string()),
            collation: Some("utf8mb4_unicode_ci".to_string()),
            ..CompileOptions::default()
        };
        let table = Table::new("t")
            .with_column(Column::new("a", "integer"))
            .with_comment("it's");
        let statements = MySqlGrammar::new(options).create_sql(&table).unwrap();
        assert!(statements[0].ends_with(
            ") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci COMMENT='it''s'"
        ));

        let table = Table::new("t")
            .with_column(Column::new("a", "integer"))
            .with_engine("InnoDB; DROP TABLE x");
        assert!(matches!(grammar().create_sql(&table), Err(DbError::Compile { .. })));
    }

    #[test]
    fn test_column_clauses() {
        let col = Column::new("title", "string")
            .with_length(100)
            .with_charset("utf8mb4")
            .with_collation("utf8mb4_bin")
            .nullable()
            .with_default("untitled")
            .with_comment("display title");
        assert_eq!(
            grammar().add_column_sql(&col).unwrap(),
            "`title` VARCHAR(100) CHARACTER SET utf8mb4 NULL DEFAULT 'untitled' COLLATE utf8mb4_bin COMMENT 'display title'"
        );

        let col = Column::new("t", "string").with_collation("bad name");
        assert!(grammar().add_column_sql(&col).is_err());
    }

    #[test]
    fn test_enum_inline() {
        let col = Column::new("status", "enum")
            .with_options(["new", "done"])
            .with_default("new");
        assert_eq!(
            grammar().add_column_sql(&col).unwrap(),
            "`status` ENUM('new','done') NOT NULL DEFAULT 'new'"
        );
    }

    #[test]
    fn test_fulltext_and_comment() {
        let table = Table::new("posts")
            .with_column(Column::new("body", "text"))
            .with_column(Column::new("meta", "json"))
            .with_index(Index::new("body", IndexKind::Fulltext, ["body"]).with_comment("search"))
            .with_index(Index::new("meta", IndexKind::Index, ["meta", "body"]));
        let g = grammar();
        assert_eq!(
            g.add_index_sql(&table, &table.indexes[0]).unwrap(),
            "CREATE FULLTEXT INDEX `posts_body` ON `posts` (`body`) COMMENT 'search'"
        );
        assert_eq!(g.add_index_sql(&table, &table.indexes[1]).unwrap(), "");
    }

    #[test]
    fn test_alter_commands() {
        let mut table = users();
        table
            .push_command(Command::ModifyColumn(
                Column::new("email", "string").with_length(320),
            ))
            .push_command(Command::DropIndex("email".to_string()))
            .push_command(Command::DropPrimary)
            .push_command(Command::AddPrimary(Primary::new(["id", "email"])))
            .push_command(Command::DropColumn("email".to_string()));
        let statements = grammar().alter_sql(&table).unwrap();
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE `users` MODIFY COLUMN `email` VARCHAR(320) NOT NULL",
                "DROP INDEX `users_email` ON `users`",
                "ALTER TABLE `users` DROP PRIMARY KEY",
                "ALTER TABLE `users` ADD PRIMARY KEY (`id`, `email`)",
                "ALTER TABLE `users` DROP COLUMN `email`",
            ]
        );
    }

    #[test]
    fn test_insert_ignore() {
        let mut row = Row::new();
        row.insert("email".to_string(), Value::from("a@b.c"));
        let stmt = grammar()
            .insert_sql("users", &[row.clone()], &InsertMode::Ignore)
            .unwrap();
        assert_eq!(stmt.sql, "INSERT IGNORE INTO `users` (`email`) VALUES (?)");

        let stmt = grammar()
            .insert_sql("users", &[row], &InsertMode::Returning("id".to_string()))
            .unwrap();
        assert_eq!(stmt.sql, "INSERT INTO `users` (`email`) VALUES (?)");
    }

    #[test]
    fn test_introspection_placeholders() {
        let stmt = grammar().column_listing_sql(Some("app"), "users");
        assert_eq!(stmt.sql.matches('?').count(), 2);
        assert_eq!(
            stmt.params,
            vec![Value::Text("app".to_string()), Value::Text("users".to_string())]
        );
    }
}
