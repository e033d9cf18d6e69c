//! Routed data operations.
//!
//! A [`Query`] holds the connection picked for writes and the one picked for reads at
//! the time it was built. Inserts compile with the write connection's grammar and run
//! there; counts run on the read connection.

use crate::config::CompileOptions;
use crate::db::executor::QueryExecutor;
use crate::db::pool::Connection;
use crate::error::DbResult;
use crate::grammar::{self, Grammar, InsertMode, Row};
use std::sync::Arc;
use tracing::debug;

/// Column returned by [`Query::insert_get_id`] when none is named.
pub const DEFAULT_ID_COLUMN: &str = "id";

#[derive(Debug, Clone)]
pub struct Query {
    write: Arc<Connection>,
    read: Arc<Connection>,
    write_grammar: Arc<dyn Grammar>,
    read_grammar: Arc<dyn Grammar>,
    executor: QueryExecutor,
}

impl Query {
    pub fn new(write: Arc<Connection>, read: Arc<Connection>, options: CompileOptions) -> Self {
        let write_grammar = grammar::for_driver(write.driver(), options.clone());
        let read_grammar = grammar::for_driver(read.driver(), options);
        Self {
            write,
            read,
            write_grammar,
            read_grammar,
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

    pub fn write_connection(&self) -> &Arc<Connection> {
        &self.write
    }

    pub fn read_connection(&self) -> &Arc<Connection> {
        &self.read
    }

    /// Insert rows on the write connection. Returns the affected row count.
    pub async fn insert(&self, table: &str, rows: &[Row]) -> DbResult<u64> {
        self.run_insert(table, rows, InsertMode::Plain).await
    }

    /// Insert rows, skipping those that violate a unique constraint.
    pub async fn insert_or_ignore(&self, table: &str, rows: &[Row]) -> DbResult<u64> {
        self.run_insert(table, rows, InsertMode::Ignore).await
    }

    /// Insert one row and return its generated key.
    ///
    /// `sequence` names the generated column on engines that return it from the insert;
    /// it defaults to `id`.
    pub async fn insert_get_id(
        &self,
        table: &str,
        row: &Row,
        sequence: Option<&str>,
    ) -> DbResult<i64> {
        let column = sequence.unwrap_or(DEFAULT_ID_COLUMN).to_string();
        let statement = self.write_grammar.insert_sql(
            table,
            std::slice::from_ref(row),
            &InsertMode::Returning(column),
        )?;
        debug!(
            connection = %self.write.name(),
            table = %table,
            "Insert with generated id"
        );
        self.executor
            .insert_get_id(self.write.pool(), &statement)
            .await
    }

    /// Count the table's rows on the read connection.
    pub async fn count(&self, table: &str) -> DbResult<i64> {
        debug!(connection = %self.read.name(), table = %table, "Count");
        self.executor
            .fetch_count(self.read.pool(), &self.read_grammar.count_sql(table))
            .await
    }

    async fn run_insert(&self, table: &str, rows: &[Row], mode: InsertMode) -> DbResult<u64> {
        let statement = self.write_grammar.insert_sql(table, rows, &mode)?;
        debug!(
            connection = %self.write.name(),
            table = %table,
            rows = rows.len(),
            mode = ?mode,
            "Insert"
        );
        self.executor.execute(self.write.pool(), &statement).await
    }
}
