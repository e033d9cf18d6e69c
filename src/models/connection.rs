//! Connection-related data models.
//!
//! This module defines types for database connection configuration.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Includes MariaDB
    MySQL,
    PostgreSQL,
    SQLite,
}

impl DriverKind {
    /// Parse driver kind from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Get the display name for this driver.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySQL => "MySQL",
            Self::PostgreSQL => "PostgreSQL",
            Self::SQLite => "SQLite",
        }
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for DriverKind {
    type Err = ConnectionConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySQL),
            "postgres" | "postgresql" | "pgsql" | "pg" => Ok(Self::PostgreSQL),
            "sqlite" | "sqlite3" => Ok(Self::SQLite),
            _ => Err(ConnectionConfigError::UnknownDriver(s.to_string())),
        }
    }
}

/// Configuration for a registered connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,
    pub driver: DriverKind,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub data_source: String,
    /// Default: false, the connection also serves writes
    #[serde(default)]
    pub read_only: bool,
}

impl ConnectionConfig {
    /// Create a new connection configuration.
    pub fn new(
        name: impl Into<String>,
        driver: DriverKind,
        data_source: impl Into<String>,
        read_only: bool,
    ) -> Result<Self, ConnectionConfigError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ConnectionConfigError::EmptyName);
        }
        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConnectionConfigError::InvalidName(name));
        }

        Ok(Self {
            name,
            driver,
            data_source: data_source.into(),
            read_only,
        })
    }

    /// Create a configuration, detecting the driver from the data source scheme.
    pub fn detect(
        name: impl Into<String>,
        data_source: impl Into<String>,
        read_only: bool,
    ) -> Result<Self, ConnectionConfigError> {
        let data_source = data_source.into();
        let driver = DriverKind::from_connection_string(&data_source)
            .ok_or_else(|| ConnectionConfigError::UnknownDriver(mask_data_source(&data_source)))?;
        Self::new(name, driver, data_source, read_only)
    }

    /// Get a display-safe version of the data source (credentials masked).
    pub fn masked_data_source(&self) -> String {
        mask_data_source(&self.data_source)
    }
}

/// Replace the password part of a URL-style data source.
pub fn mask_data_source(data_source: &str) -> String {
    if let Some(at_pos) = data_source.find('@') {
        if let Some(colon_pos) = data_source[..at_pos].rfind(':') {
            // "mysql://user@host" has its only colon in the scheme
            if !data_source[colon_pos..].starts_with("://") {
                let prefix = &data_source[..colon_pos + 1];
                let suffix = &data_source[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
    }
    data_source.to_string()
}

/// Errors that can occur when creating a connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionConfigError {
    #[error("Connection name cannot be empty")]
    EmptyName,

    #[error("Connection name contains invalid characters: {0}")]
    InvalidName(String),

    #[error("Unknown database driver: {0}")]
    UnknownDriver(String),
}

/// Connection information returned by list_connections (no secrets exposed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSummary {
    pub name: String,
    pub driver: DriverKind,
    pub read_only: bool,
}
