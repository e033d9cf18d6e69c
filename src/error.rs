//! Error types for db-capsule.
//!
//! This module defines all error types using `thiserror`. Every variant carries the
//! name, driver, data source or schema object needed to diagnose the failure without
//! re-running the operation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection error: {message} (connection: '{name}', driver: '{driver}', data source: '{data_source}')")]
    Connection {
        name: String,
        driver: String,
        /// Masked: credentials are replaced before the error is built
        data_source: String,
        message: String,
    },

    #[error("The connection '{name}' is not registered")]
    NotRegistered { name: String },

    #[error("No primary connection registered")]
    NoPrimaryConnection,

    #[error("No global manager has been set")]
    NoGlobalManager,

    #[error("Compile error: {message} (object: {object})")]
    Compile { message: String, object: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error.
    pub fn connection(
        name: impl Into<String>,
        driver: impl Into<String>,
        data_source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Connection {
            name: name.into(),
            driver: driver.into(),
            data_source: data_source.into(),
            message: message.into(),
        }
    }

    /// Create a not registered error.
    pub fn not_registered(name: impl Into<String>) -> Self {
        Self::NotRegistered { name: name.into() }
    }

    /// Create a compile error for a schema object.
    pub fn compile(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Compile {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the SQLSTATE code reported by the engine, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Database { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }

    /// True for errors raised while routing to a connection.
    pub fn is_routing(&self) -> bool {
        matches!(
            self,
            Self::NotRegistered { .. } | Self::NoPrimaryConnection | Self::NoGlobalManager
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// Connection-level failures are wrapped by the pool with the connection's identity, so
/// this conversion only covers errors raised while executing statements.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => DbError::database("No rows returned", None),
            sqlx::Error::PoolTimedOut => DbError::database("Timed out acquiring a connection", None),
            sqlx::Error::PoolClosed => DbError::database("Connection pool is closed", None),
            sqlx::Error::Io(io_err) => DbError::database(format!("I/O error: {}", io_err), None),
            sqlx::Error::Protocol(msg) => {
                DbError::database(format!("Protocol error: {}", msg), None)
            }
            sqlx::Error::TypeNotFound { type_name } => DbError::schema(
                format!("Type not found: {}", type_name),
                type_name.to_string(),
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
