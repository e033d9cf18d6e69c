//! Schema model.
//!
//! Dialect-neutral description of a table that grammars compile to DDL and that
//! introspection fills in. Indexes and primary keys refer to their member columns by
//! name; [`Table::validate`] checks those references before anything is compiled.

use crate::error::{DbError, DbResult};
use crate::models::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Marker stored in `Column::extra` for auto-increment columns built in code.
pub const AUTO_INCREMENT: &str = "AUTO_INCREMENT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    pub db_name: String,
    pub schema_name: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// e.g. "BASE TABLE"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_type: Option<String>,
    /// MySQL only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_row_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<u64>,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<Primary>,
    /// Pending alterations, compiled in order by `Grammar::alter_sql`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Command>,
}

impl Table {
    /// Create an empty table description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a column, taking ownership of its table name and position.
    pub fn add_column(&mut self, mut column: Column) -> &mut Self {
        column.table_name = self.name.clone();
        column.db_name = self.db_name.clone();
        column.position = self.columns.len() as u32 + 1;
        self.columns.push(column);
        self
    }

    /// Append an index.
    pub fn add_index(&mut self, mut index: Index) -> &mut Self {
        index.table_name = self.name.clone();
        index.db_name = self.db_name.clone();
        self.indexes.push(index);
        self
    }

    /// Set the primary key, replacing any previous one.
    pub fn set_primary(&mut self, mut primary: Primary) -> &mut Self {
        primary.table_name = self.name.clone();
        primary.db_name = self.db_name.clone();
        self.primary = Some(primary);
        self
    }

    /// Queue a pending alteration.
    pub fn push_command(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Builder form of [`Table::add_column`].
    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    /// Builder form of [`Table::add_index`].
    pub fn with_index(mut self, index: Index) -> Self {
        self.add_index(index);
        self
    }

    /// Builder form of [`Table::set_primary`].
    pub fn with_primary(mut self, primary: Primary) -> Self {
        self.set_primary(primary);
        self
    }

    /// Set the table comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the storage engine (MySQL only).
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up an index by name.
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Resolve member column names against this table, preserving key order.
    pub fn resolve_columns<'a>(&'a self, names: &[String], object: &str) -> DbResult<Vec<&'a Column>> {
        if names.is_empty() {
            return Err(DbError::compile("Key has no columns", object));
        }
        names
            .iter()
            .map(|name| {
                self.column(name).ok_or_else(|| {
                    DbError::compile(
                        format!("Column '{}' does not belong to table '{}'", name, self.name),
                        object,
                    )
                })
            })
            .collect()
    }

    /// Check ownership and key invariants.
    pub fn validate(&self) -> DbResult<()> {
        if self.name.is_empty() {
            return Err(DbError::compile("Table name cannot be empty", "<table>"));
        }

        if self.columns.is_empty() {
            return Err(DbError::compile("Table has no columns", self.name.clone()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            check_owner(&self.name, &column.table_name, &column.name)?;
            if !seen.insert(column.name.as_str()) {
                return Err(DbError::compile(
                    format!("Duplicate column '{}' in table '{}'", column.name, self.name),
                    self.object_name(&column.name),
                ));
            }
        }

        let mut primaries = 0;
        for index in &self.indexes {
            check_owner(&self.name, &index.table_name, &index.name)?;
            self.resolve_columns(&index.columns, &self.object_name(&index.name))?;
            if index.is_primary() {
                primaries += 1;
            }
        }

        if let Some(primary) = &self.primary {
            check_owner(&self.name, &primary.table_name, &primary.name)?;
            self.resolve_columns(&primary.columns, &self.object_name(&primary.name))?;
            primaries += 1;
        }

        if primaries > 1 {
            return Err(DbError::compile(
                "A table can have at most one primary key",
                self.name.clone(),
            ));
        }
        Ok(())
    }

    /// Qualified name used in error messages.
    pub fn object_name(&self, member: &str) -> String {
        format!("{}.{}", self.name, member)
    }
}

fn check_owner(table: &str, owner: &str, member: &str) -> DbResult<()> {
    // Members built outside a Table carry no owner yet
    if owner.is_empty() || owner == table {
        Ok(())
    } else {
        Err(DbError::compile(
            format!("'{}' belongs to table '{}', not '{}'", member, owner, table),
            format!("{}.{}", table, member),
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Column {
    pub db_name: String,
    pub table_name: String,
    pub name: String,
    /// 1-based ordinal position
    pub position: u32,
    /// Abstract type name, e.g. "string", "bigInteger", "ipAddress"
    #[serde(rename = "type")]
    pub type_name: String,
    pub nullable: bool,
    pub unsigned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub octet_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime_precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    /// Key role reported by introspection, e.g. "PRI", "UNI", "MUL"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Auto-increment marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Engine expression such as `CURRENT_TIMESTAMP`, emitted verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_expression: Option<String>,
    /// Permitted values of an enum column
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub primary: bool,
}

impl Column {
    /// Create a NOT NULL column of the given abstract type.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn with_datetime_precision(mut self, precision: u32) -> Self {
        self.datetime_precision = Some(precision);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.extra = Some(AUTO_INCREMENT.to_string());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_default_expression(mut self, expression: impl Into<String>) -> Self {
        self.default_expression = Some(expression.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Any non-empty `extra` marks the column as auto-increment.
    pub fn is_auto_increment(&self) -> bool {
        self.extra.as_deref().is_some_and(|e| !e.trim().is_empty())
    }

    /// The comment, treating an empty string as absent.
    pub fn comment_text(&self) -> Option<&str> {
        self.comment.as_deref().filter(|c| !c.is_empty())
    }
}

/// Index type tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Primary,
    Unique,
    #[default]
    Index,
    Fulltext,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Index {
    pub db_name: String,
    pub table_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: IndexKind,
    pub primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Member column names in key order
    pub columns: Vec<String>,
}

impl Index {
    pub fn new<I, S>(name: impl Into<String>, kind: IndexKind, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind,
            primary: kind == IndexKind::Primary,
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn unique<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, IndexKind::Unique, columns)
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_primary(&self) -> bool {
        self.primary || self.kind == IndexKind::Primary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Primary {
    pub db_name: String,
    pub table_name: String,
    pub name: String,
    /// Member column names in key order
    pub columns: Vec<String>,
}

impl Primary {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "PRIMARY".to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// A pending DDL action queued against a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "params", rename_all = "camelCase")]
pub enum Command {
    AddColumn(Column),
    ModifyColumn(Column),
    RenameColumn { from: String, to: String },
    DropColumn(String),
    AddIndex(Index),
    DropIndex(String),
    AddPrimary(Primary),
    DropPrimary,
    RenameTable(String),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddColumn(_) => "AddColumn",
            Self::ModifyColumn(_) => "ModifyColumn",
            Self::RenameColumn { .. } => "RenameColumn",
            Self::DropColumn(_) => "DropColumn",
            Self::AddIndex(_) => "AddIndex",
            Self::DropIndex(_) => "DropIndex",
            Self::AddPrimary(_) => "AddPrimary",
            Self::DropPrimary => "DropPrimary",
            Self::RenameTable(_) => "RenameTable",
        }
    }
}
