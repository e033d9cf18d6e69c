//! Dialect grammars.
//!
//! A [`Grammar`] compiles the schema model into SQL text for one engine. The trait
//! carries the shared fragment builders as default methods; each dialect supplies the
//! column definition, introspection statements and the per-command alteration rules.
//!
//! - `mysql`: backtick identifiers, inline comments, table options
//! - `postgres`: serial columns, derived enum types, `COMMENT ON` statements
//! - `sqlite`: rowid auto-increment, CHECK-constrained enums
//!
//! Compilation is pure: no statement is executed here.

pub mod mysql;
pub mod postgres;
pub mod quoter;
pub mod sqlite;
pub mod types;

pub use mysql::MySqlGrammar;
pub use postgres::PostgresGrammar;
pub use quoter::Quoter;
pub use sqlite::SqliteGrammar;
pub use types::TypeMapper;

use crate::config::CompileOptions;
use crate::error::{DbError, DbResult};
use crate::models::{Column, Command, DriverKind, Index, IndexKind, Primary, Table, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One insert row, keyed by column name.
pub type Row = BTreeMap<String, Value>;

/// SQL text plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: impl Into<Value>) -> Self {
        self.params.push(param.into());
        self
    }
}

/// How an insert treats conflicts and generated keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertMode {
    Plain,
    /// Skip rows that violate a unique constraint
    Ignore,
    /// Return the named generated column where the engine supports it
    Returning(String),
}

/// Get the grammar for a driver.
pub fn for_driver(driver: DriverKind, options: CompileOptions) -> Arc<dyn Grammar> {
    match driver {
        DriverKind::MySQL => Arc::new(MySqlGrammar::new(options)),
        DriverKind::PostgreSQL => Arc::new(PostgresGrammar::new(options)),
        DriverKind::SQLite => Arc::new(SqliteGrammar::new(options)),
    }
}

pub trait Grammar: Send + Sync + std::fmt::Debug {
    fn driver(&self) -> DriverKind;

    fn quoter(&self) -> &dyn Quoter;

    fn types(&self) -> &TypeMapper;

    fn options(&self) -> &CompileOptions;

    /// Table name with the configured prefix.
    fn table_name(&self, name: &str) -> String {
        match self.options().table_prefix.as_deref() {
            Some(prefix) => format!("{}{}", prefix, name),
            None => name.to_string(),
        }
    }

    /// Quoted, prefixed table name.
    fn wrap_table(&self, name: &str) -> String {
        self.quoter().identifier(&self.table_name(name))
    }

    /// Quoted index name derived from its table.
    fn index_name(&self, table: &str, index: &str) -> String {
        self.quoter()
            .identifier(&format!("{}_{}", self.table_name(table), index))
    }

    /// Positional parameter placeholder (1-based).
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    // =========================================================================
    // Fragments
    // =========================================================================

    /// Column definition for CREATE TABLE and ADD COLUMN.
    fn add_column_sql(&self, column: &Column) -> DbResult<String>;

    /// Separate comment statement for a column, empty when there is nothing to emit.
    fn add_comment_sql(&self, column: &Column) -> String {
        self.column_comment_sql(&column.table_name, column)
    }

    /// Comment statement for a column of `table`.
    fn column_comment_sql(&self, _table: &str, _column: &Column) -> String {
        String::new()
    }

    /// Index statement, or a bare `PRIMARY KEY` fragment for primary indexes.
    ///
    /// Returns an empty string when any member column is JSON-typed.
    fn add_index_sql(&self, table: &Table, index: &Index) -> DbResult<String> {
        let object = table.object_name(&index.name);
        let members = table.resolve_columns(&index.columns, &object)?;
        if members.iter().any(|c| types::is_json(&c.type_name)) {
            return Ok(String::new());
        }

        let columns = column_list(self.quoter(), &index.columns);
        if index.is_primary() {
            return Ok(join_clauses([
                format!("PRIMARY KEY ({})", columns),
                self.index_comment(index),
            ]));
        }

        Ok(join_clauses([
            format!(
                "CREATE {} {} ON {} ({})",
                self.index_keyword(index.kind),
                self.index_name(&table.name, &index.name),
                self.wrap_table(&table.name),
                columns
            ),
            self.index_comment(index),
        ]))
    }

    /// `PRIMARY KEY (...)` fragment.
    fn add_primary_sql(&self, table: &Table, primary: &Primary) -> DbResult<String> {
        table.resolve_columns(&primary.columns, &table.object_name(&primary.name))?;
        Ok(format!(
            "PRIMARY KEY ({})",
            column_list(self.quoter(), &primary.columns)
        ))
    }

    fn index_keyword(&self, kind: IndexKind) -> &'static str {
        match kind {
            IndexKind::Unique => "UNIQUE INDEX",
            _ => "INDEX",
        }
    }

    fn index_comment(&self, _index: &Index) -> String {
        String::new()
    }

    /// Definitions inside the CREATE TABLE parentheses, in declared order.
    fn table_definitions(&self, table: &Table) -> DbResult<Vec<String>> {
        let mut definitions = table
            .columns
            .iter()
            .map(|column| {
                check_column(table, column)?;
                self.add_column_sql(column)
            })
            .collect::<DbResult<Vec<_>>>()?;

        if let Some(primary) = &table.primary {
            if self.inline_primary_key(table, &primary.columns) {
                definitions.push(self.add_primary_sql(table, primary)?);
            }
        }
        for index in table.indexes.iter().filter(|i| i.is_primary()) {
            if self.inline_primary_key(table, &index.columns) {
                let fragment = self.add_index_sql(table, index)?;
                if !fragment.is_empty() {
                    definitions.push(fragment);
                }
            }
        }
        Ok(definitions)
    }

    /// False when a column definition already declares this primary key.
    fn inline_primary_key(&self, _table: &Table, _columns: &[String]) -> bool {
        true
    }

    /// Statements for the table's non-primary indexes, suppressed ones skipped.
    fn index_statements(&self, table: &Table) -> DbResult<Vec<String>> {
        let mut statements = Vec::new();
        for index in table.indexes.iter().filter(|i| !i.is_primary()) {
            let sql = self.add_index_sql(table, index)?;
            if !sql.is_empty() {
                statements.push(sql);
            }
        }
        Ok(statements)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Single-row statement yielding `count` > 0 when the table exists.
    fn exists_sql(&self, name: &str) -> Statement;

    /// Table-level metadata.
    fn table_sql(&self, name: &str) -> Statement;

    /// Column metadata in ordinal order.
    fn column_listing_sql(&self, db_name: Option<&str>, name: &str) -> Statement;

    /// Index membership rows ordered by index and key position.
    fn index_listing_sql(&self, name: &str) -> Statement;

    // =========================================================================
    // Structure
    // =========================================================================

    /// CREATE TABLE plus the statements that must follow it.
    fn create_sql(&self, table: &Table) -> DbResult<Vec<String>>;

    /// Statements for one pending command against the current table shape.
    fn command_sql(&self, table: &Table, command: &Command) -> DbResult<Vec<String>>;

    /// Statements for all pending commands, in order.
    fn alter_sql(&self, table: &Table) -> DbResult<Vec<String>> {
        let mut shadow = table.clone();
        shadow.commands.clear();

        let mut statements = Vec::new();
        for command in &table.commands {
            statements.extend(self.command_sql(&shadow, command)?);
            apply_command(&mut shadow, command);
        }
        Ok(statements)
    }

    fn drop_sql(&self, name: &str) -> String {
        format!("DROP TABLE {}", self.wrap_table(name))
    }

    fn drop_if_exists_sql(&self, name: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.wrap_table(name))
    }

    fn rename_sql(&self, old: &str, new: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.wrap_table(old),
            self.wrap_table(new)
        )
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Single-row statement yielding the table's row `count`.
    fn count_sql(&self, table: &str) -> Statement {
        Statement::new(format!(
            "SELECT COUNT(*) AS count FROM {}",
            self.wrap_table(table)
        ))
    }

    fn insert_verb(&self, _mode: &InsertMode) -> &'static str {
        "INSERT INTO"
    }

    fn insert_suffix(&self, _mode: &InsertMode) -> String {
        String::new()
    }

    /// Parameterized multi-row insert. Every row must carry the first row's columns.
    fn insert_sql(&self, table: &str, rows: &[Row], mode: &InsertMode) -> DbResult<Statement> {
        let first = rows
            .first()
            .ok_or_else(|| DbError::invalid_input("No rows to insert"))?;
        if first.is_empty() {
            return Err(DbError::invalid_input("Insert row has no columns"));
        }
        let columns: Vec<&String> = first.keys().collect();

        let mut params = Vec::with_capacity(rows.len() * columns.len());
        let mut tuples = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() || !columns.iter().all(|c| row.contains_key(*c)) {
                return Err(DbError::invalid_input(format!(
                    "Row {} does not match the columns of the first row",
                    i
                )));
            }
            let placeholders: Vec<String> = columns
                .iter()
                .map(|c| {
                    params.push(row[*c].clone());
                    self.placeholder(params.len())
                })
                .collect();
            tuples.push(format!("({})", placeholders.join(", ")));
        }

        let quoted: Vec<String> = columns
            .iter()
            .map(|c| self.quoter().identifier(c))
            .collect();
        let sql = join_clauses([
            format!(
                "{} {} ({}) VALUES {}",
                self.insert_verb(mode),
                self.wrap_table(table),
                quoted.join(", "),
                tuples.join(", ")
            ),
            self.insert_suffix(mode),
        ]);

        Ok(Statement { sql, params })
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Quote and join column names in key order.
pub fn column_list(quoter: &dyn Quoter, names: &[String]) -> String {
    names
        .iter()
        .map(|n| quoter.identifier(n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Join non-empty clauses with single spaces.
pub fn join_clauses<I, S>(clauses: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    clauses
        .into_iter()
        .filter_map(|c| {
            let c = c.as_ref().trim();
            (!c.is_empty()).then(|| c.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Validate a bare word such as a charset, collation or engine name.
pub fn bare_word<'a>(word: &'a str, object: &str) -> DbResult<&'a str> {
    if !word.is_empty() && word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(word)
    } else {
        Err(DbError::compile(
            format!("'{}' is not a valid name", word),
            object,
        ))
    }
}

/// `DEFAULT ...` clause, empty when the column has no default.
pub fn default_clause(quoter: &dyn Quoter, column: &Column) -> DbResult<String> {
    if let Some(value) = &column.default {
        return Ok(format!("DEFAULT {}", quoter.literal(value)));
    }
    match column.default_expression.as_deref().map(str::trim) {
        Some(expr) if !expr.is_empty() => {
            if !is_single_expression(expr) {
                return Err(DbError::compile(
                    format!("Default expression '{}' is not a single expression", expr),
                    format!("{}.{}", column.table_name, column.name),
                ));
            }
            Ok(format!("DEFAULT {}", expr))
        }
        _ => Ok(String::new()),
    }
}

/// Scan a raw default expression: quotes terminated, parentheses balanced, no
/// statement or comment breaks, no top-level comma.
fn is_single_expression(expr: &str) -> bool {
    if expr.contains("--") || expr.contains("/*") || expr.contains('\\') {
        return false;
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in expr.chars() {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            (None, ';') => return false,
            (None, ',') if depth == 0 => return false,
            _ => {}
        }
    }
    quote.is_none() && depth == 0
}

/// Comment text with the type marker applied for type-preserving columns.
pub fn comment_marker(column: &Column) -> Option<String> {
    match types::canonical(&column.type_name) {
        Some(t) if types::PRESERVED_TYPES.contains(&t) => Some(format!(
            "T:{}|{}",
            t,
            column.comment_text().unwrap_or_default()
        )),
        _ => column.comment_text().map(str::to_string),
    }
}

/// Split a stored comment into its type marker and user comment.
pub fn parse_comment_marker(comment: &str) -> (Option<String>, Option<String>) {
    if let Some(rest) = comment.strip_prefix("T:") {
        if let Some((type_name, user)) = rest.split_once('|') {
            let user = (!user.is_empty()).then(|| user.to_string());
            return (Some(type_name.to_string()), user);
        }
    }
    let user = (!comment.is_empty()).then(|| comment.to_string());
    (None, user)
}

/// Per-column checks shared by CREATE and ADD COLUMN.
pub fn check_column(table: &Table, column: &Column) -> DbResult<()> {
    let object = table.object_name(&column.name);
    if column.name.is_empty() {
        return Err(DbError::compile("Column name cannot be empty", object));
    }
    if !column.table_name.is_empty() && column.table_name != table.name {
        return Err(DbError::compile(
            format!("Column belongs to table '{}'", column.table_name),
            object,
        ));
    }
    if types::canonical(&column.type_name) == Some("enum") && column.options.is_empty() {
        return Err(DbError::compile("Enum column has no options", object));
    }
    Ok(())
}

/// Reject commands a dialect cannot express.
pub fn unsupported(driver: DriverKind, command: &Command, table: &Table) -> DbError {
    DbError::compile(
        format!("{} does not support {} on an existing table", driver, command.name()),
        table.name.clone(),
    )
}

/// Replay a command on the in-memory table so later commands see its effect.
pub fn apply_command(table: &mut Table, command: &Command) {
    match command {
        Command::AddColumn(column) => {
            table.add_column(column.clone());
        }
        Command::ModifyColumn(column) => {
            if let Some(existing) = table.columns.iter_mut().find(|c| c.name == column.name) {
                let position = existing.position;
                *existing = column.clone();
                existing.position = position;
                existing.table_name = table.name.clone();
            }
        }
        Command::RenameColumn { from, to } => {
            for column in table.columns.iter_mut().filter(|c| &c.name == from) {
                column.name = to.clone();
            }
            let rename = |names: &mut Vec<String>| {
                for name in names.iter_mut().filter(|n| *n == from) {
                    *name = to.clone();
                }
            };
            table.indexes.iter_mut().for_each(|i| rename(&mut i.columns));
            if let Some(primary) = table.primary.as_mut() {
                rename(&mut primary.columns);
            }
        }
        Command::DropColumn(name) => {
            table.columns.retain(|c| &c.name != name);
            table.indexes.retain(|i| !i.columns.contains(name));
        }
        Command::AddIndex(index) => {
            table.add_index(index.clone());
        }
        Command::DropIndex(name) => table.indexes.retain(|i| &i.name != name),
        Command::AddPrimary(primary) => {
            table.set_primary(primary.clone());
        }
        Command::DropPrimary => {
            table.primary = None;
            table.indexes.retain(|i| !i.is_primary());
        }
        Command::RenameTable(name) => {
            table.name = name.clone();
            table.columns.iter_mut().for_each(|c| c.table_name = name.clone());
            table.indexes.iter_mut().for_each(|i| i.table_name = name.clone());
            if let Some(primary) = table.primary.as_mut() {
                primary.table_name = name.clone();
            }
        }
    }
}
