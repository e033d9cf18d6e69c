//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool management and primary/read-only routing
//! - The process-wide default manager
//! - Statement execution
//! - Schema compilation and introspection
//! - Routed insert and count operations
//! - Database dispatch macros for reducing code duplication

pub mod executor;
pub mod global;
#[macro_use]
pub mod macros;
pub mod params;
pub mod pool;
pub mod query;
pub mod schema;

pub use executor::QueryExecutor;
pub use pool::{Connection, DbPool, Manager};
pub use query::Query;
pub use schema::SchemaCompiler;

use crate::error::DbResult;

/// Schema compiler on a primary connection of the global manager.
pub fn schema() -> DbResult<SchemaCompiler> {
    global::get()?.schema()
}

/// Query routed through the global manager.
pub fn query() -> DbResult<Query> {
    global::get()?.query()
}
