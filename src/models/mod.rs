//! Data models for db-capsule.
//!
//! This module re-exports all model types used throughout the library.

pub mod connection;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use connection::{
    ConnectionConfig, ConnectionConfigError, ConnectionSummary, DriverKind, mask_data_source,
};
pub use schema::{AUTO_INCREMENT, Column, Command, Index, IndexKind, Primary, Table};
pub use value::Value;
