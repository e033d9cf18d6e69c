//! Identifier and literal quoting per dialect.
//!
//! Every name and value that ends up in compiled SQL goes through a [`Quoter`]:
//! identifiers are wrapped in the dialect's delimiter with embedded delimiters doubled,
//! literals are rendered so that no content can terminate the literal early.

use crate::models::{DriverKind, Value};
use std::fmt::Write as _;

pub trait Quoter: Send + Sync + std::fmt::Debug {
    /// Quote a table, column, index or type name.
    fn identifier(&self, name: &str) -> String;

    /// Render a string literal.
    fn string(&self, s: &str) -> String;

    /// Render a byte-sequence literal.
    fn bytes(&self, b: &[u8]) -> String;

    /// Render a boolean literal.
    fn boolean(&self, b: bool) -> String {
        if b { "TRUE" } else { "FALSE" }.to_string()
    }

    /// Render a float literal. Non-finite values are dialect specific.
    fn float(&self, f: f64) -> String;

    /// Render any admitted value as a SQL literal.
    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.boolean(*b),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => self.float(*f),
            Value::Text(s) => self.string(s),
            Value::Bytes(b) => self.bytes(b),
        }
    }
}

/// Get the quoter for a driver.
pub fn for_driver(driver: DriverKind) -> &'static dyn Quoter {
    match driver {
        DriverKind::MySQL => &MySqlQuoter,
        DriverKind::PostgreSQL => &PostgresQuoter,
        DriverKind::SQLite => &SqliteQuoter,
    }
}

fn hex(b: &[u8]) -> String {
    let mut out = String::with_capacity(b.len() * 2);
    for byte in b {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Debug formatting always keeps a `.` or exponent, so the engine reads a float.
fn finite_float(f: f64) -> String {
    format!("{:?}", f)
}

/// MySQL: backtick identifiers, backslash-aware string escaping.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlQuoter;

impl Quoter for MySqlQuoter {
    fn identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('\0', "").replace('`', "``"))
    }

    fn string(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('\'');
        for c in s.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                '\0' => out.push_str("\\0"),
                '\u{1a}' => out.push_str("\\Z"),
                _ => out.push(c),
            }
        }
        out.push('\'');
        out
    }

    fn bytes(&self, b: &[u8]) -> String {
        format!("X'{}'", hex(b))
    }

    fn float(&self, f: f64) -> String {
        // MySQL has no representation for NaN or infinities
        if f.is_finite() {
            finite_float(f)
        } else {
            "NULL".to_string()
        }
    }
}

/// PostgreSQL: double-quote identifiers, `E''` strings when backslashes are present.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresQuoter;

impl Quoter for PostgresQuoter {
    fn identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('\0', "").replace('"', "\"\""))
    }

    /// NUL characters are dropped: PostgreSQL text cannot store them.
    fn string(&self, s: &str) -> String {
        let cleaned = s.replace('\0', "");
        if cleaned.contains('\\') {
            // Escape-string syntax reads the same regardless of standard_conforming_strings
            format!(
                "E'{}'",
                cleaned.replace('\\', "\\\\").replace('\'', "''")
            )
        } else {
            format!("'{}'", cleaned.replace('\'', "''"))
        }
    }

    fn bytes(&self, b: &[u8]) -> String {
        format!("decode('{}', 'hex')", hex(b))
    }

    fn float(&self, f: f64) -> String {
        if f.is_nan() {
            "'NaN'::float8".to_string()
        } else if f == f64::INFINITY {
            "'Infinity'::float8".to_string()
        } else if f == f64::NEG_INFINITY {
            "'-Infinity'::float8".to_string()
        } else {
            finite_float(f)
        }
    }
}

/// SQLite: double-quote identifiers, integer booleans.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteQuoter;

impl Quoter for SqliteQuoter {
    fn identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('\0', "").replace('"', "\"\""))
    }

    fn string(&self, s: &str) -> String {
        if s.contains('\0') {
            // Statement text ends at NUL, so carry the content as a blob
            format!("CAST(X'{}' AS TEXT)", hex(s.as_bytes()))
        } else {
            format!("'{}'", s.replace('\'', "''"))
        }
    }

    fn bytes(&self, b: &[u8]) -> String {
        format!("X'{}'", hex(b))
    }

    fn boolean(&self, b: bool) -> String {
        if b { "1" } else { "0" }.to_string()
    }

    fn float(&self, f: f64) -> String {
        if f.is_nan() {
            "NULL".to_string()
        } else if f == f64::INFINITY {
            "9e999".to_string()
        } else if f == f64::NEG_INFINITY {
            "-9e999".to_string()
        } else {
            finite_float(f)
        }
    }
}
