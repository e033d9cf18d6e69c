//! Statement execution engine.
//!
//! This module runs compiled [`Statement`]s with support for:
//! - Parameterized statements (values bound per dialect)
//! - Raw multi-statement execution when nothing is bound
//! - Statement timeouts
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific fetch and write operations
//! - `postgres`: PostgreSQL-specific fetch and write operations
//! - `sqlite`: SQLite-specific fetch and write operations
//!
//! Each submodule provides identical functionality adapted to the database's type system.
//! The typed row fetchers are crate-visible so schema introspection can decode rows
//! with the concrete `Row` type of its engine.

use crate::config::DEFAULT_STATEMENT_TIMEOUT_SECS;
use crate::db::pool::DbPool;
use crate::error::{DbError, DbResult};
use crate::grammar::Statement;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// Executor for compiled statements.
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor {
    timeout: Duration,
}

impl QueryExecutor {
    /// Create a new executor with the default statement timeout.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_STATEMENT_TIMEOUT_SECS),
        }
    }

    /// Create a new executor with a custom statement timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute one statement and return the affected row count.
    pub async fn execute(&self, pool: &DbPool, statement: &Statement) -> DbResult<u64> {
        let start = Instant::now();
        debug!(
            sql = %statement.sql,
            params = statement.params.len(),
            driver = %pool.driver(),
            "Executing statement"
        );

        let rows_affected = match pool {
            DbPool::MySql(p) => mysql::execute(p, statement, self.timeout).await?,
            DbPool::Postgres(p) => postgres::execute(p, statement, self.timeout).await?,
            DbPool::SQLite(p) => sqlite::execute(p, statement, self.timeout).await?,
        };

        debug!(
            rows_affected,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Statement complete"
        );
        Ok(rows_affected)
    }

    /// Execute unbound statements in order, stopping at the first failure.
    pub async fn execute_all(&self, pool: &DbPool, statements: &[String]) -> DbResult<u64> {
        let mut total = 0;
        for sql in statements {
            total += self.execute(pool, &Statement::new(sql.as_str())).await?;
        }
        Ok(total)
    }

    /// Run a single-row statement and read its `count` column.
    pub async fn fetch_count(&self, pool: &DbPool, statement: &Statement) -> DbResult<i64> {
        debug!(sql = %statement.sql, driver = %pool.driver(), "Fetching count");
        match pool {
            DbPool::MySql(p) => mysql::fetch_count(p, statement, self.timeout).await,
            DbPool::Postgres(p) => postgres::fetch_count(p, statement, self.timeout).await,
            DbPool::SQLite(p) => sqlite::fetch_count(p, statement, self.timeout).await,
        }
    }

    /// Run an insert and return the generated key.
    ///
    /// PostgreSQL statements must end in `RETURNING <column>`; the other engines report
    /// the last inserted id of the connection that ran the insert.
    pub async fn insert_get_id(&self, pool: &DbPool, statement: &Statement) -> DbResult<i64> {
        debug!(sql = %statement.sql, driver = %pool.driver(), "Inserting with generated id");
        match pool {
            DbPool::MySql(p) => mysql::insert_get_id(p, statement, self.timeout).await,
            DbPool::Postgres(p) => postgres::insert_get_id(p, statement, self.timeout).await,
            DbPool::SQLite(p) => sqlite::insert_get_id(p, statement, self.timeout).await,
        }
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn timeout_error(operation: &str, timeout: Duration) -> DbError {
    DbError::database(
        format!("{} timed out after {} seconds", operation, timeout.as_secs()),
        None,
    )
}

async fn bounded<T, F>(operation: &str, limit: Duration, future: F) -> DbResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(limit, future).await {
        Ok(result) => result.map_err(DbError::from),
        Err(_) => Err(timeout_error(operation, limit)),
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.

pub(crate) mod mysql {
    use super::*;
    use crate::db::params::bind_mysql_param;
    use sqlx::mysql::{MySqlArguments, MySqlRow};
    use sqlx::{MySql, MySqlPool, Row};

    fn bind(statement: &Statement) -> sqlx::query::Query<'_, MySql, MySqlArguments> {
        statement
            .params
            .iter()
            .fold(sqlx::query(&statement.sql), bind_mysql_param)
    }

    pub async fn execute(
        pool: &MySqlPool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<u64> {
        // Raw SQL when nothing is bound: some DDL cannot be prepared
        let result = if statement.params.is_empty() {
            use sqlx::Executor;
            bounded("statement", limit, pool.execute(statement.sql.as_str())).await?
        } else {
            bounded("statement", limit, bind(statement).execute(pool)).await?
        };
        Ok(result.rows_affected())
    }

    pub async fn fetch_all(
        pool: &MySqlPool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<Vec<MySqlRow>> {
        bounded("query", limit, bind(statement).fetch_all(pool)).await
    }

    pub async fn fetch_count(
        pool: &MySqlPool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<i64> {
        let row = bounded("count", limit, bind(statement).fetch_one(pool)).await?;
        Ok(row.try_get::<i64, _>("count")?)
    }

    pub async fn insert_get_id(
        pool: &MySqlPool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<i64> {
        let result = bounded("insert", limit, bind(statement).execute(pool)).await?;
        i64::try_from(result.last_insert_id())
            .map_err(|_| DbError::internal("Generated id does not fit in i64"))
    }
}

pub(crate) mod postgres {
    use super::*;
    use crate::db::params::bind_postgres_param;
    use sqlx::postgres::{PgArguments, PgRow};
    use sqlx::{PgPool, Postgres, Row};

    fn bind(statement: &Statement) -> sqlx::query::Query<'_, Postgres, PgArguments> {
        statement
            .params
            .iter()
            .fold(sqlx::query(&statement.sql), bind_postgres_param)
    }

    pub async fn execute(pool: &PgPool, statement: &Statement, limit: Duration) -> DbResult<u64> {
        let result = if statement.params.is_empty() {
            use sqlx::Executor;
            bounded("statement", limit, pool.execute(statement.sql.as_str())).await?
        } else {
            bounded("statement", limit, bind(statement).execute(pool)).await?
        };
        Ok(result.rows_affected())
    }

    pub async fn fetch_all(
        pool: &PgPool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<Vec<PgRow>> {
        bounded("query", limit, bind(statement).fetch_all(pool)).await
    }

    pub async fn fetch_count(
        pool: &PgPool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<i64> {
        let row = bounded("count", limit, bind(statement).fetch_one(pool)).await?;
        Ok(row.try_get::<i64, _>("count")?)
    }

    pub async fn insert_get_id(
        pool: &PgPool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<i64> {
        let row = bounded("insert", limit, bind(statement).fetch_one(pool)).await?;
        // SERIAL keys come back as int4
        match row.try_get::<i64, _>(0) {
            Ok(id) => Ok(id),
            Err(_) => Ok(i64::from(row.try_get::<i32, _>(0)?)),
        }
    }
}

pub(crate) mod sqlite {
    use super::*;
    use crate::db::params::bind_sqlite_param;
    use sqlx::sqlite::{SqliteArguments, SqliteRow};
    use sqlx::{Row, Sqlite, SqlitePool};

    fn bind(statement: &Statement) -> sqlx::query::Query<'_, Sqlite, SqliteArguments<'_>> {
        statement
            .params
            .iter()
            .fold(sqlx::query(&statement.sql), bind_sqlite_param)
    }

    pub async fn execute(
        pool: &SqlitePool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<u64> {
        let result = if statement.params.is_empty() {
            use sqlx::Executor;
            bounded("statement", limit, pool.execute(statement.sql.as_str())).await?
        } else {
            bounded("statement", limit, bind(statement).execute(pool)).await?
        };
        Ok(result.rows_affected())
    }

    pub async fn fetch_all(
        pool: &SqlitePool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<Vec<SqliteRow>> {
        bounded("query", limit, bind(statement).fetch_all(pool)).await
    }

    pub async fn fetch_count(
        pool: &SqlitePool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<i64> {
        let row = bounded("count", limit, bind(statement).fetch_one(pool)).await?;
        Ok(row.try_get::<i64, _>("count")?)
    }

    pub async fn insert_get_id(
        pool: &SqlitePool,
        statement: &Statement,
        limit: Duration,
    ) -> DbResult<i64> {
        let result = bounded("insert", limit, bind(statement).execute(pool)).await?;
        Ok(result.last_insert_rowid())
    }
}
