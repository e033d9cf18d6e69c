//! db-capsule library
//!
//! Routes database work across named primary and read-only connections
//! (SQLite, PostgreSQL, MySQL) and compiles dialect-neutral table descriptions
//! into DDL for each engine.

pub mod config;
pub mod db;
pub mod error;
pub mod grammar;
pub mod models;

pub use config::{CompileOptions, Config};
pub use db::{Manager, Query, SchemaCompiler};
pub use error::{DbError, DbResult};
