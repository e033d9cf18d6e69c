//! Schema compilation and introspection.
//!
//! [`SchemaCompiler`] runs grammar output against the primary connection and decodes
//! catalog rows back into the schema model.
//!
//! # Architecture
//!
//! The SQL itself comes from the connection's [`Grammar`]. Row decoding lives in the
//! database-specific submodules (postgres, mysql, sqlite), each providing the same
//! interface. The shared helpers below turn native type strings and stored defaults
//! into their abstract form.

use crate::config::CompileOptions;
use crate::db::executor::QueryExecutor;
use crate::db::pool::{Connection, DbPool};
use crate::error::{DbError, DbResult};
use crate::grammar::{self, Grammar, Statement, apply_command, types};
use crate::models::{AUTO_INCREMENT, Column, Index, IndexKind, Primary, Table, Value};
use std::sync::Arc;
use tracing::debug;

/// Compiles and executes DDL on one connection.
#[derive(Debug, Clone)]
pub struct SchemaCompiler {
    connection: Arc<Connection>,
    grammar: Arc<dyn Grammar>,
    executor: QueryExecutor,
}

impl SchemaCompiler {
    pub fn new(connection: Arc<Connection>, options: CompileOptions) -> Self {
        let grammar = grammar::for_driver(connection.driver(), options);
        Self {
            connection,
            grammar,
            executor: QueryExecutor::new(),
        }
    }

    /// Use a custom executor (e.g. a different statement timeout).
    pub fn with_executor(mut self, executor: QueryExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn grammar(&self) -> &dyn Grammar {
        self.grammar.as_ref()
    }

    fn pool(&self) -> &DbPool {
        self.connection.pool()
    }

    /// True if the table exists in the connection's current database.
    pub async fn exists(&self, name: &str) -> DbResult<bool> {
        let count = self
            .executor
            .fetch_count(self.pool(), &self.grammar.exists_sql(name))
            .await?;
        Ok(count > 0)
    }

    /// Fill `table` from the catalog: metadata, columns, indexes and primary key.
    ///
    /// The table name and pending commands are kept; everything else is replaced.
    pub async fn get(&self, table: &mut Table) -> DbResult<()> {
        let name = table.name.clone();
        debug!(
            connection = %self.connection.name(),
            table = %name,
            "Introspecting table"
        );

        let found = self.fetch_meta(table).await?;
        if !found {
            return Err(DbError::schema(
                format!("Table '{}' not found", self.grammar.table_name(&name)),
                name,
            ));
        }

        let columns = self.fetch_columns(&name).await?;
        let rows = self.fetch_index_rows(&name).await?;
        assemble(table, columns, rows, &self.grammar.table_name(&name));
        Ok(())
    }

    /// Introspect a table by name.
    pub async fn get_table(&self, name: &str) -> DbResult<Table> {
        let mut table = Table::new(name);
        self.get(&mut table).await?;
        Ok(table)
    }

    /// Column metadata in ordinal order. Empty when the table does not exist.
    pub async fn column_listing(&self, name: &str) -> DbResult<Vec<Column>> {
        let mut table = Table::new(name);
        for column in self.fetch_columns(name).await? {
            table.add_column(column);
        }
        Ok(table.columns)
    }

    /// Create the table with its indexes and comments.
    pub async fn create(&self, table: &Table) -> DbResult<()> {
        let statements = self.grammar.create_sql(table)?;
        self.run(&table.name, statements).await
    }

    /// Apply the table's pending commands, then clear them.
    ///
    /// On success the in-memory table reflects the applied commands.
    pub async fn alter(&self, table: &mut Table) -> DbResult<()> {
        let statements = self.grammar.alter_sql(table)?;
        self.run(&table.name, statements).await?;

        let commands = std::mem::take(&mut table.commands);
        for command in &commands {
            apply_command(table, command);
        }
        Ok(())
    }

    pub async fn drop(&self, name: &str) -> DbResult<()> {
        self.run(name, vec![self.grammar.drop_sql(name)]).await
    }

    pub async fn drop_if_exists(&self, name: &str) -> DbResult<()> {
        self.run(name, vec![self.grammar.drop_if_exists_sql(name)])
            .await
    }

    pub async fn rename(&self, from: &str, to: &str) -> DbResult<()> {
        self.run(from, vec![self.grammar.rename_sql(from, to)]).await
    }

    async fn run(&self, table: &str, statements: Vec<String>) -> DbResult<()> {
        debug!(
            connection = %self.connection.name(),
            driver = %self.connection.driver(),
            table = %table,
            statements = statements.len(),
            "Executing DDL"
        );
        self.executor.execute_all(self.pool(), &statements).await?;
        Ok(())
    }

    async fn fetch_meta(&self, table: &mut Table) -> DbResult<bool> {
        let statement = self.grammar.table_sql(&table.name);
        let limit = self.executor.timeout();
        match self.pool() {
            DbPool::MySql(p) => mysql::fetch_meta(p, &statement, limit, table).await,
            DbPool::Postgres(p) => postgres::fetch_meta(p, &statement, limit, table).await,
            DbPool::SQLite(p) => sqlite::fetch_meta(p, &statement, limit, table).await,
        }
    }

    async fn fetch_columns(&self, name: &str) -> DbResult<Vec<Column>> {
        let statement = self.grammar.column_listing_sql(None, name);
        let limit = self.executor.timeout();
        match self.pool() {
            DbPool::MySql(p) => mysql::fetch_columns(p, &statement, limit).await,
            DbPool::Postgres(p) => postgres::fetch_columns(p, &statement, limit).await,
            DbPool::SQLite(p) => {
                let create = sqlite::create_sql(p, &self.grammar.table_sql(name), limit).await?;
                sqlite::fetch_columns(p, &statement, limit, &create).await
            }
        }
    }

    async fn fetch_index_rows(&self, name: &str) -> DbResult<Vec<IndexRow>> {
        let statement = self.grammar.index_listing_sql(name);
        let limit = self.executor.timeout();
        match self.pool() {
            DbPool::MySql(p) => mysql::fetch_indexes(p, &statement, limit).await,
            DbPool::Postgres(p) => postgres::fetch_indexes(p, &statement, limit).await,
            DbPool::SQLite(p) => sqlite::fetch_indexes(p, &statement, limit).await,
        }
    }
}

// =============================================================================
// Shared decoding
// =============================================================================

/// One index membership row, in index then key order.
#[derive(Debug, Clone, PartialEq)]
struct IndexRow {
    name: String,
    column: String,
    unique: bool,
    primary: bool,
    fulltext: bool,
    comment: Option<String>,
}

/// Rebuild columns, indexes and the primary key of `table`.
fn assemble(table: &mut Table, columns: Vec<Column>, rows: Vec<IndexRow>, prefixed: &str) {
    table.columns.clear();
    table.indexes.clear();
    table.primary = None;
    for column in columns {
        table.add_column(column);
    }

    let mut groups: Vec<(IndexRow, Vec<String>)> = Vec::new();
    for row in rows {
        match groups.iter_mut().find(|(first, _)| first.name == row.name) {
            Some((_, members)) => members.push(row.column),
            None => {
                let column = row.column.clone();
                groups.push((row, vec![column]));
            }
        }
    }

    for (row, members) in groups {
        if row.primary {
            table.set_primary(Primary::new(members));
            continue;
        }
        let kind = if row.fulltext {
            IndexKind::Fulltext
        } else if row.unique {
            IndexKind::Unique
        } else {
            IndexKind::Index
        };
        let mut index = Index::new(local_index_name(prefixed, &row.name), kind, members);
        index.comment = row.comment;
        table.add_index(index);
    }

    // Rowid aliases carry no index; their key is only visible on the column
    if table.primary.is_none() {
        let members: Vec<String> = table
            .columns
            .iter()
            .filter(|c| c.primary)
            .map(|c| c.name.clone())
            .collect();
        if !members.is_empty() {
            table.set_primary(Primary::new(members));
        }
    }

    let keys = table
        .primary
        .as_ref()
        .map(|p| p.columns.clone())
        .unwrap_or_default();
    for column in table.columns.iter_mut().filter(|c| keys.contains(&c.name)) {
        column.primary = true;
        column.key.get_or_insert_with(|| "PRI".to_string());
    }
}

/// Strip the `{table}_` prefix that index names are created with.
fn local_index_name(prefixed_table: &str, name: &str) -> String {
    name.strip_prefix(prefixed_table)
        .and_then(|rest| rest.strip_prefix('_'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(name)
        .to_string()
}

/// A native column type split into base name, arguments and modifiers.
#[derive(Debug, Clone, PartialEq, Default)]
struct NativeType {
    /// Lowercased, without arguments
    base: String,
    /// Raw text between the parentheses
    args: String,
    unsigned: bool,
}

impl NativeType {
    fn parse(native: &str) -> Self {
        let native = native.trim();
        let (head, args, tail) = match (native.find('('), native.rfind(')')) {
            (Some(open), Some(close)) if close > open => (
                &native[..open],
                &native[open + 1..close],
                &native[close + 1..],
            ),
            _ => (native, "", ""),
        };

        let lower_head = head.trim().to_ascii_lowercase();
        let unsigned =
            lower_head.ends_with(" unsigned") || tail.to_ascii_lowercase().contains("unsigned");
        let base = lower_head.trim_end_matches(" unsigned").trim().to_string();

        Self {
            base,
            args: args.to_string(),
            unsigned,
        }
    }

    /// Numeric arguments, e.g. `[10, 2]` for `decimal(10,2)`.
    fn numbers(&self) -> Vec<u32> {
        self.args
            .split(',')
            .filter_map(|a| a.trim().parse().ok())
            .collect()
    }

    /// Abstract type name, falling back to the native base name.
    fn abstract_type(&self) -> String {
        types::canonical(&self.base)
            .map(str::to_string)
            .unwrap_or_else(|| self.base.clone())
    }
}

/// Read single-quoted items up to the first unquoted `)`. `''` escapes a quote.
fn parse_quoted_list(input: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                let mut item = String::new();
                while let Some(c) = chars.next() {
                    if c == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            item.push('\'');
                        } else {
                            break;
                        }
                    } else {
                        item.push(c);
                    }
                }
                items.push(item);
            }
            ')' => break,
            _ => {}
        }
    }
    items
}

/// Split a single-quoted literal off the front of `raw`, returning it and the rest.
fn split_quoted(raw: &str) -> Option<(String, &str)> {
    let body = raw.strip_prefix('\'')?;
    let mut text = String::new();
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                text.push('\'');
            } else {
                return Some((text, &body[i + 1..]));
            }
        } else {
            text.push(c);
        }
    }
    None
}

/// Decode a stored SQL default into a literal or an engine expression.
fn parse_default(raw: &str) -> (Option<Value>, Option<String>) {
    let mut raw = raw.trim();
    while raw.len() > 1 && raw.starts_with('(') && raw.ends_with(')') {
        raw = raw[1..raw.len() - 1].trim();
    }
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return (None, None);
    }

    let (escaped, quoted) = match raw.strip_prefix(['E', 'e']) {
        Some(rest) if rest.starts_with('\'') => (true, rest),
        _ => (false, raw),
    };
    if let Some((text, rest)) = split_quoted(quoted) {
        let rest = rest.trim();
        // A trailing cast such as `::character varying` keeps the literal
        if rest.is_empty() || rest.starts_with("::") {
            let text = if escaped {
                text.replace("\\\\", "\\")
            } else {
                text
            };
            return (Some(Value::Text(text)), None);
        }
    }

    if let Ok(i) = raw.parse::<i64>() {
        return (Some(Value::Int(i)), None);
    }
    if raw.contains(['.', 'e', 'E']) {
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return (Some(Value::Float(f)), None);
            }
        }
    }
    if raw.eq_ignore_ascii_case("true") {
        return (Some(Value::Bool(true)), None);
    }
    if raw.eq_ignore_ascii_case("false") {
        return (Some(Value::Bool(false)), None);
    }
    (None, Some(raw.to_string()))
}

fn positive(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok()).filter(|v| *v > 0)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn takes_length(abstract_type: &str) -> bool {
    matches!(abstract_type, "string" | "char")
}

fn takes_datetime_precision(abstract_type: &str) -> bool {
    matches!(
        abstract_type,
        "dateTime" | "dateTimeTz" | "time" | "timeTz" | "timestamp" | "timestampTz"
    )
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use crate::db::executor::postgres::fetch_all;
    use crate::grammar::parse_comment_marker;
    use sqlx::{PgPool, Row};
    use std::time::Duration;

    const ENUM_PREFIX: &str = "enum__";

    pub async fn fetch_meta(
        pool: &PgPool,
        statement: &Statement,
        limit: Duration,
        table: &mut Table,
    ) -> DbResult<bool> {
        let rows = fetch_all(pool, statement, limit).await?;
        let Some(row) = rows.first() else {
            return Ok(false);
        };

        table.db_name = row.try_get("db_name")?;
        table.schema_name = row.try_get("schema_name")?;
        table.table_type = row.try_get("table_type")?;
        table.comment = non_empty(row.try_get("table_comment")?);
        // reltuples is -1 until the table is first analyzed
        table.rows = row
            .try_get::<Option<i64>, _>("table_rows")?
            .and_then(|r| u64::try_from(r).ok());
        Ok(true)
    }

    pub async fn fetch_columns(
        pool: &PgPool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<Vec<Column>> {
        let rows = fetch_all(pool, statement, limit).await?;
        rows.iter()
            .map(|row| {
                Ok(decode_column(PgColumnRow {
                    db_name: row.try_get("db_name")?,
                    name: row.try_get("column_name")?,
                    default_value: row.try_get("default_value")?,
                    nullable: row.try_get("nullable")?,
                    data_type: row.try_get("data_type")?,
                    udt_name: row.try_get("udt_name")?,
                    char_length: row.try_get::<Option<i32>, _>("char_length")?.map(i64::from),
                    octet_length: row.try_get::<Option<i32>, _>("octet_length")?.map(i64::from),
                    precision: row
                        .try_get::<Option<i32>, _>("numeric_precision")?
                        .map(i64::from),
                    scale: row.try_get::<Option<i32>, _>("numeric_scale")?.map(i64::from),
                    datetime_precision: row
                        .try_get::<Option<i32>, _>("datetime_precision")?
                        .map(i64::from),
                    charset: row.try_get("charset")?,
                    collation: row.try_get("collation")?,
                    comment: row.try_get("column_comment")?,
                }))
            })
            .collect()
    }

    pub async fn fetch_indexes(
        pool: &PgPool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<Vec<IndexRow>> {
        let rows = fetch_all(pool, statement, limit).await?;
        rows.iter()
            .map(|row| {
                Ok(IndexRow {
                    name: row.try_get("index_name")?,
                    column: row.try_get("column_name")?,
                    unique: row.try_get("is_unique")?,
                    primary: row.try_get("is_primary")?,
                    fulltext: false,
                    comment: None,
                })
            })
            .collect()
    }

    #[derive(Debug, Default)]
    pub(super) struct PgColumnRow {
        pub db_name: String,
        pub name: String,
        pub default_value: Option<String>,
        pub nullable: bool,
        pub data_type: String,
        pub udt_name: String,
        pub char_length: Option<i64>,
        pub octet_length: Option<i64>,
        pub precision: Option<i64>,
        pub scale: Option<i64>,
        pub datetime_precision: Option<i64>,
        pub charset: Option<String>,
        pub collation: Option<String>,
        pub comment: Option<String>,
    }

    pub(super) fn decode_column(row: PgColumnRow) -> Column {
        let mut column = Column::new(row.name, "");
        column.db_name = row.db_name;
        column.nullable = row.nullable;

        if let Some(labels) = row.udt_name.strip_prefix(ENUM_PREFIX) {
            column.type_name = "enum".to_string();
            column.options = labels
                .split(&types::ENUM_OPTION_SEPARATOR.to_lowercase())
                .map(str::to_string)
                .collect();
        } else {
            column.type_name = NativeType::parse(&row.data_type).abstract_type();
        }

        let abstract_type = column.type_name.clone();
        if takes_length(&abstract_type) {
            column.length = positive(row.char_length);
        }
        column.octet_length = positive(row.octet_length);
        if abstract_type == "decimal" {
            column.precision = positive(row.precision);
            column.scale = row.scale.and_then(|s| u32::try_from(s).ok());
        }
        if takes_datetime_precision(&abstract_type) {
            column.datetime_precision = row.datetime_precision.and_then(|p| u32::try_from(p).ok());
        }
        column.charset = non_empty(row.charset);
        column.collation = non_empty(row.collation);

        match row.default_value.as_deref() {
            Some(raw) if raw.starts_with("nextval(") => {
                column.extra = Some(AUTO_INCREMENT.to_string());
            }
            Some(raw) => (column.default, column.default_expression) = parse_default(raw),
            None => {}
        }

        if let Some(comment) = row.comment {
            let (marker, user) = parse_comment_marker(&comment);
            if let Some(type_name) = marker {
                column.type_name = type_name;
            }
            column.comment = user;
        }
        column
    }
}

mod mysql {
    use super::*;
    use crate::db::executor::mysql::fetch_all;
    use chrono::NaiveDateTime;
    use sqlx::Row;
    use sqlx::mysql::{MySqlPool, MySqlRow};
    use std::time::Duration;

    /// Safely get an optional string from a MySQL row.
    /// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
    fn get_optional_string(row: &MySqlRow, column: &str) -> Option<String> {
        row.try_get::<Option<String>, _>(column)
            .ok()
            .flatten()
            .or_else(|| {
                row.try_get::<Option<Vec<u8>>, _>(column)
                    .ok()
                    .flatten()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
    }

    fn get_string(row: &MySqlRow, column: &str) -> String {
        get_optional_string(row, column).unwrap_or_default()
    }

    fn get_i64(row: &MySqlRow, column: &str) -> DbResult<Option<i64>> {
        Ok(row.try_get::<Option<i64>, _>(column)?)
    }

    fn get_u64(row: &MySqlRow, column: &str) -> DbResult<Option<u64>> {
        Ok(get_i64(row, column)?.and_then(|v| u64::try_from(v).ok()))
    }

    pub async fn fetch_meta(
        pool: &MySqlPool,
        statement: &Statement,
        limit: Duration,
        table: &mut Table,
    ) -> DbResult<bool> {
        let rows = fetch_all(pool, statement, limit).await?;
        let Some(row) = rows.first() else {
            return Ok(false);
        };

        table.db_name = get_string(row, "db_name");
        table.schema_name = table.db_name.clone();
        table.table_type = get_optional_string(row, "table_type");
        table.engine = get_optional_string(row, "engine");
        table.collation = get_optional_string(row, "collation");
        table.charset = get_optional_string(row, "charset");
        table.comment = non_empty(get_optional_string(row, "table_comment"));
        table.rows = get_u64(row, "table_rows")?;
        table.avg_row_length = get_u64(row, "avg_row_length")?;
        table.index_length = get_u64(row, "index_length")?;
        table.auto_increment = get_u64(row, "auto_increment")?;
        table.create_time = get_optional_string(row, "create_time")
            .and_then(|t| NaiveDateTime::parse_from_str(&t, "%Y-%m-%d %H:%M:%S").ok())
            .map(|t| t.and_utc());
        Ok(true)
    }

    pub async fn fetch_columns(
        pool: &MySqlPool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<Vec<Column>> {
        let rows = fetch_all(pool, statement, limit).await?;
        rows.iter()
            .map(|row| {
                Ok(decode_column(MySqlColumnRow {
                    db_name: get_string(row, "db_name"),
                    name: get_string(row, "column_name"),
                    default_value: get_optional_string(row, "default_value"),
                    nullable: get_i64(row, "nullable")?.unwrap_or(0) != 0,
                    column_type: get_string(row, "column_type"),
                    char_length: get_i64(row, "char_length")?,
                    octet_length: get_i64(row, "octet_length")?,
                    precision: get_i64(row, "numeric_precision")?,
                    scale: get_i64(row, "numeric_scale")?,
                    datetime_precision: get_i64(row, "datetime_precision")?,
                    charset: get_optional_string(row, "charset"),
                    collation: get_optional_string(row, "collation"),
                    key: get_optional_string(row, "column_key"),
                    extra: get_string(row, "extra"),
                    comment: get_optional_string(row, "column_comment"),
                }))
            })
            .collect()
    }

    pub async fn fetch_indexes(
        pool: &MySqlPool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<Vec<IndexRow>> {
        let rows = fetch_all(pool, statement, limit).await?;
        rows.iter()
            .map(|row| {
                let name = get_string(row, "index_name");
                Ok(IndexRow {
                    primary: name == "PRIMARY",
                    name,
                    column: get_string(row, "column_name"),
                    unique: get_i64(row, "non_unique")?.unwrap_or(1) == 0,
                    fulltext: get_string(row, "index_type").eq_ignore_ascii_case("FULLTEXT"),
                    comment: non_empty(get_optional_string(row, "index_comment")),
                })
            })
            .collect()
    }

    #[derive(Debug, Default)]
    pub(super) struct MySqlColumnRow {
        pub db_name: String,
        pub name: String,
        pub default_value: Option<String>,
        pub nullable: bool,
        pub column_type: String,
        pub char_length: Option<i64>,
        pub octet_length: Option<i64>,
        pub precision: Option<i64>,
        pub scale: Option<i64>,
        pub datetime_precision: Option<i64>,
        pub charset: Option<String>,
        pub collation: Option<String>,
        pub key: Option<String>,
        pub extra: String,
        pub comment: Option<String>,
    }

    pub(super) fn decode_column(row: MySqlColumnRow) -> Column {
        let native = NativeType::parse(&row.column_type);
        let mut column = Column::new(row.name, "");
        column.db_name = row.db_name;
        column.nullable = row.nullable;
        column.unsigned = native.unsigned;

        column.type_name = if native.base == "tinyint" && native.numbers() == [1] {
            "boolean".to_string()
        } else {
            native.abstract_type()
        };
        if column.type_name == "enum" {
            column.options = parse_quoted_list(&native.args);
        }

        let abstract_type = column.type_name.clone();
        if takes_length(&abstract_type) {
            column.length = positive(row.char_length);
        }
        column.octet_length = positive(row.octet_length);
        match (abstract_type.as_str(), native.numbers().as_slice()) {
            ("decimal", _) => {
                column.precision = positive(row.precision);
                column.scale = row.scale.and_then(|s| u32::try_from(s).ok());
            }
            ("float" | "double", [p, s]) => {
                column.precision = Some(*p);
                column.scale = Some(*s);
            }
            _ => {}
        }
        if takes_datetime_precision(&abstract_type) {
            column.datetime_precision = row.datetime_precision.and_then(|p| u32::try_from(p).ok());
        }
        column.charset = non_empty(row.charset);
        column.collation = non_empty(row.collation);
        column.key = non_empty(row.key);
        column.comment = non_empty(row.comment);

        let extra = row.extra.to_ascii_lowercase();
        if extra.contains("auto_increment") {
            column.extra = Some(AUTO_INCREMENT.to_string());
        }

        // COLUMN_DEFAULT holds string literals unquoted
        if let Some(raw) = row.default_value {
            if extra.contains("default_generated") {
                column.default_expression = Some(raw);
            } else if raw.starts_with('\'') {
                (column.default, column.default_expression) = parse_default(&raw);
            } else {
                column.default = Some(match abstract_type.as_str() {
                    "boolean" => Value::Bool(raw != "0"),
                    "tinyInteger" | "smallInteger" | "integer" | "bigInteger" => raw
                        .parse::<i64>()
                        .map(Value::Int)
                        .unwrap_or(Value::Text(raw)),
                    "decimal" | "float" | "double" => raw
                        .parse::<f64>()
                        .map(Value::Float)
                        .unwrap_or(Value::Text(raw)),
                    _ => Value::Text(raw),
                });
            }
        }
        column
    }
}

mod sqlite {
    use super::*;
    use crate::db::executor::sqlite::fetch_all;
    use crate::grammar::Quoter;
    use crate::grammar::quoter::SqliteQuoter;
    use sqlx::{Row, SqlitePool};
    use std::time::Duration;

    pub async fn fetch_meta(
        pool: &SqlitePool,
        statement: &Statement,
        limit: Duration,
        table: &mut Table,
    ) -> DbResult<bool> {
        let rows = fetch_all(pool, statement, limit).await?;
        let Some(row) = rows.first() else {
            return Ok(false);
        };
        table.db_name = "main".to_string();
        table.schema_name = "main".to_string();
        table.table_type = row.try_get("table_type")?;
        Ok(true)
    }

    /// The table's CREATE statement, empty when the table does not exist.
    pub async fn create_sql(
        pool: &SqlitePool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<String> {
        let rows = fetch_all(pool, statement, limit).await?;
        match rows.first() {
            Some(row) => Ok(row.try_get::<Option<String>, _>("sql")?.unwrap_or_default()),
            None => Ok(String::new()),
        }
    }

    pub async fn fetch_columns(
        pool: &SqlitePool,
        statement: &Statement,
        limit: Duration,
        create: &str,
    ) -> DbResult<Vec<Column>> {
        let rows = fetch_all(pool, statement, limit).await?;
        let decoded = rows
            .iter()
            .map(|row| {
                Ok(SqliteColumnRow {
                    name: row.try_get("column_name")?,
                    data_type: row.try_get::<Option<String>, _>("data_type")?.unwrap_or_default(),
                    not_null: row.try_get::<i64, _>("not_null")? != 0,
                    default_value: row.try_get("default_value")?,
                    pk: row.try_get("pk")?,
                })
            })
            .collect::<DbResult<Vec<_>>>()?;

        let key_columns = decoded.iter().filter(|r| r.pk > 0).count();
        Ok(decoded
            .into_iter()
            .map(|row| decode_column(row, key_columns, create))
            .collect())
    }

    pub async fn fetch_indexes(
        pool: &SqlitePool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<Vec<IndexRow>> {
        let rows = fetch_all(pool, statement, limit).await?;
        let mut decoded = Vec::with_capacity(rows.len());
        for row in &rows {
            // Expression index members have no column name
            let Some(column) = row.try_get::<Option<String>, _>("column_name")? else {
                continue;
            };
            decoded.push(IndexRow {
                name: row.try_get("index_name")?,
                column,
                unique: row.try_get::<i64, _>("is_unique")? != 0,
                primary: row.try_get::<String, _>("origin")? == "pk",
                fulltext: false,
                comment: None,
            });
        }
        Ok(decoded)
    }

    #[derive(Debug, Default)]
    pub(super) struct SqliteColumnRow {
        pub name: String,
        pub data_type: String,
        pub not_null: bool,
        pub default_value: Option<String>,
        pub pk: i64,
    }

    pub(super) fn decode_column(row: SqliteColumnRow, key_columns: usize, create: &str) -> Column {
        let native = NativeType::parse(&row.data_type);
        let mut column = Column::new(row.name, native.abstract_type());
        column.db_name = "main".to_string();
        column.nullable = !row.not_null;
        column.unsigned = native.unsigned;

        match (column.type_name.as_str(), native.numbers().as_slice()) {
            ("string" | "char", [len]) => column.length = Some(*len),
            ("decimal" | "float" | "double", [p, s]) => {
                column.precision = Some(*p);
                column.scale = Some(*s);
            }
            _ => {}
        }

        if column.type_name == "text" {
            let options = check_options(create, &SqliteQuoter.identifier(&column.name));
            if !options.is_empty() {
                column.type_name = "enum".to_string();
                column.options = options;
            }
        }

        if row.pk > 0 {
            column.primary = true;
            column.key = Some("PRI".to_string());
            // A lone INTEGER PRIMARY KEY aliases the rowid
            if key_columns == 1 && native.base == "integer" {
                column.extra = Some(AUTO_INCREMENT.to_string());
                column.nullable = false;
            }
        }

        if let Some(raw) = row.default_value.as_deref() {
            (column.default, column.default_expression) = parse_default(raw);
        }
        column
    }

    /// Options of a `CHECK ("col" IN (...))` constraint in a CREATE statement.
    pub(super) fn check_options(create: &str, quoted_column: &str) -> Vec<String> {
        let needle = format!("CHECK ({} IN (", quoted_column);
        match create.find(&needle) {
            Some(pos) => parse_quoted_list(&create[pos + needle.len()..]),
            None => Vec::new(),
        }
    }
}
