//! Abstract column types and their native rendering per dialect.
//!
//! An abstract type name (e.g. `bigInteger`, `ipAddress`) is first normalized by
//! [`canonical`], then looked up in the dialect's table. [`TypeMapper::column_type`]
//! applies the formatting rules in a fixed order:
//!
//! 1. decimal-like types with precision and scale render `TOKEN(p,s)`
//! 2. time tokens with a precision placeholder take the datetime precision (default 0)
//! 3. large binary tokens are used as-is
//! 4. enums are encoded per dialect
//! 5. a positive length renders `TOKEN(length)`
//! 6. `ipAddress` and `year` are overridden by their storage type

use crate::grammar::quoter::Quoter;
use crate::models::{Column, DriverKind};

/// Types whose members cannot be indexed directly.
pub const JSON_TYPES: &[&str] = &["json", "jsonb"];

/// Types whose native storage loses the abstract type.
pub const PRESERVED_TYPES: &[&str] = &["ipAddress", "year"];

/// Precision placeholder inside time tokens.
const PRECISION: &str = "{p}";

/// Separator between enum options in derived type names.
pub const ENUM_OPTION_SEPARATOR: &str = "_EOPT_";

const ABSTRACT_TYPES: &[&str] = &[
    "string",
    "char",
    "text",
    "mediumText",
    "longText",
    "binary",
    "tinyInteger",
    "smallInteger",
    "integer",
    "bigInteger",
    "decimal",
    "float",
    "double",
    "boolean",
    "date",
    "dateTime",
    "dateTimeTz",
    "time",
    "timeTz",
    "timestamp",
    "timestampTz",
    "enum",
    "json",
    "jsonb",
    "uuid",
    "ipAddress",
    "macAddress",
    "year",
];

/// Normalize a type name to its abstract form.
///
/// Accepts the abstract names in any case, `unsigned*` variants and common native
/// spellings. Returns `None` for names nothing maps.
pub fn canonical(name: &str) -> Option<&'static str> {
    let name = strip_unsigned(name.trim());
    if let Some(t) = ABSTRACT_TYPES.iter().find(|t| **t == name) {
        return Some(t);
    }

    let lower = name.to_ascii_lowercase();
    if let Some(t) = ABSTRACT_TYPES
        .iter()
        .find(|t| t.to_ascii_lowercase() == lower)
    {
        return Some(t);
    }

    let alias = match lower.as_str() {
        "varchar" | "character varying" | "nvarchar" => "string",
        "character" | "bpchar" => "char",
        "tinytext" => "text",
        "blob" | "bytea" | "varbinary" | "longblob" | "mediumblob" => "binary",
        "tinyint" | "int1" => "tinyInteger",
        "smallint" | "int2" => "smallInteger",
        "int" | "int4" | "mediumint" => "integer",
        "bigint" | "int8" => "bigInteger",
        "numeric" => "decimal",
        "real" | "float4" => "float",
        "double precision" | "float8" => "double",
        "bool" => "boolean",
        "datetime" | "timestamp without time zone" => "dateTime",
        "timestamptz" | "timestamp with time zone" => "timestampTz",
        "time without time zone" => "time",
        "timetz" | "time with time zone" => "timeTz",
        "inet" => "ipAddress",
        "macaddr" => "macAddress",
        _ => return None,
    };
    Some(alias)
}

fn strip_unsigned(name: &str) -> &str {
    match name.strip_prefix("unsigned") {
        Some(rest) if !rest.is_empty() => rest,
        _ => name,
    }
}

/// True if the type name carries an `unsigned` prefix.
pub fn is_unsigned_name(name: &str) -> bool {
    strip_unsigned(name.trim()).len() != name.trim().len()
}

/// True for JSON-family abstract types.
pub fn is_json(type_name: &str) -> bool {
    canonical(type_name).is_some_and(|t| JSON_TYPES.contains(&t))
}

/// True for abstract types whose comment carries a type marker.
pub fn is_preserved(type_name: &str) -> bool {
    canonical(type_name).is_some_and(|t| PRESERVED_TYPES.contains(&t))
}

/// Derived PostgreSQL type name for an enum's option set.
pub fn enum_type_name(options: &[String]) -> String {
    format!("ENUM__{}", options.join(ENUM_OPTION_SEPARATOR)).to_lowercase()
}

/// Per-dialect type table and formatting rules.
#[derive(Debug, Clone, Copy)]
pub struct TypeMapper {
    driver: DriverKind,
}

impl TypeMapper {
    pub fn new(driver: DriverKind) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> DriverKind {
        self.driver
    }

    /// Native token for an abstract type. Unknown types map to `VARCHAR`.
    pub fn native(&self, type_name: &str) -> &'static str {
        let Some(t) = canonical(type_name) else {
            return "VARCHAR";
        };
        match self.driver {
            DriverKind::PostgreSQL => postgres_native(t),
            DriverKind::MySQL => mysql_native(t),
            DriverKind::SQLite => sqlite_native(t),
        }
    }

    /// Render the column's type, ignoring auto-increment.
    pub fn column_type(&self, column: &Column, quoter: &dyn Quoter) -> String {
        let abstract_type = canonical(&column.type_name);
        let token = self.native(&column.type_name);

        if let Some(t) = abstract_type.and_then(|t| self.storage_override(t)) {
            return t.to_string();
        }

        let rendered = match (column.precision, column.scale) {
            (Some(p), Some(s)) if abstract_type.is_some_and(|t| self.takes_precision_scale(t)) => {
                format!("{}({},{})", token, p, s)
            }
            _ if token.contains(PRECISION) => {
                token.replace(PRECISION, &column.datetime_precision.unwrap_or(0).to_string())
            }
            _ if abstract_type == Some("binary") => token.to_string(),
            _ if abstract_type == Some("enum") => self.enum_type(column, quoter),
            _ => match column.length {
                Some(len) if len > 0 && !token.contains('(') => format!("{}({})", token, len),
                _ if token == "VARCHAR" && self.driver == DriverKind::MySQL => {
                    "VARCHAR(255)".to_string()
                }
                _ => token.to_string(),
            },
        };

        if self.driver == DriverKind::MySQL
            && (column.unsigned || is_unsigned_name(&column.type_name))
            && abstract_type.is_some_and(is_numeric)
        {
            format!("{} UNSIGNED", rendered)
        } else {
            rendered
        }
    }

    /// Render the self-incrementing variant of the column's type.
    pub fn auto_increment_type(&self, column: &Column, quoter: &dyn Quoter) -> String {
        match self.driver {
            DriverKind::PostgreSQL => match canonical(&column.type_name) {
                Some("bigInteger") => "BIGSERIAL",
                Some("smallInteger") | Some("tinyInteger") => "SMALLSERIAL",
                _ => "SERIAL",
            }
            .to_string(),
            // AUTO_INCREMENT is a column attribute on MySQL
            DriverKind::MySQL => self.column_type(column, quoter),
            // Only INTEGER PRIMARY KEY aliases the rowid
            DriverKind::SQLite => "INTEGER".to_string(),
        }
    }

    fn enum_type(&self, column: &Column, quoter: &dyn Quoter) -> String {
        match self.driver {
            DriverKind::PostgreSQL => quoter.identifier(&enum_type_name(&column.options)),
            DriverKind::MySQL => {
                let options: Vec<String> = column.options.iter().map(|o| quoter.string(o)).collect();
                format!("ENUM({})", options.join(","))
            }
            // Constrained by a CHECK clause in the column definition
            DriverKind::SQLite => "TEXT".to_string(),
        }
    }

    fn takes_precision_scale(&self, abstract_type: &str) -> bool {
        match self.driver {
            // REAL and DOUBLE PRECISION reject a (p,s) modifier
            DriverKind::PostgreSQL => abstract_type == "decimal",
            DriverKind::MySQL | DriverKind::SQLite => {
                matches!(abstract_type, "decimal" | "float" | "double")
            }
        }
    }

    fn storage_override(&self, abstract_type: &str) -> Option<&'static str> {
        match (abstract_type, self.driver) {
            ("ipAddress", DriverKind::MySQL) => Some("INT UNSIGNED"),
            ("ipAddress", _) => Some("INTEGER"),
            ("year", DriverKind::MySQL) => Some("YEAR"),
            ("year", _) => Some("SMALLINT"),
            _ => None,
        }
    }
}

fn is_numeric(abstract_type: &str) -> bool {
    matches!(
        abstract_type,
        "tinyInteger" | "smallInteger" | "integer" | "bigInteger" | "decimal" | "float" | "double"
    )
}

fn postgres_native(t: &str) -> &'static str {
    match t {
        "string" => "VARCHAR",
        "char" => "CHAR",
        "text" | "mediumText" | "longText" => "TEXT",
        "binary" => "BYTEA",
        "tinyInteger" | "smallInteger" => "SMALLINT",
        "integer" => "INTEGER",
        "bigInteger" => "BIGINT",
        "decimal" => "NUMERIC",
        "float" => "REAL",
        "double" => "DOUBLE PRECISION",
        "boolean" => "BOOLEAN",
        "date" => "DATE",
        "dateTime" | "timestamp" => "TIMESTAMP({p}) WITHOUT TIME ZONE",
        "dateTimeTz" | "timestampTz" => "TIMESTAMP({p}) WITH TIME ZONE",
        "time" => "TIME({p}) WITHOUT TIME ZONE",
        "timeTz" => "TIME({p}) WITH TIME ZONE",
        "enum" => "ENUM",
        "json" => "JSON",
        "jsonb" => "JSONB",
        "uuid" => "UUID",
        "ipAddress" => "INTEGER",
        "macAddress" => "MACADDR",
        "year" => "SMALLINT",
        _ => "VARCHAR",
    }
}

fn mysql_native(t: &str) -> &'static str {
    match t {
        "string" => "VARCHAR",
        "char" => "CHAR",
        "text" => "TEXT",
        "mediumText" => "MEDIUMTEXT",
        "longText" => "LONGTEXT",
        "binary" => "BLOB",
        "tinyInteger" => "TINYINT",
        "smallInteger" => "SMALLINT",
        "integer" => "INT",
        "bigInteger" => "BIGINT",
        "decimal" => "DECIMAL",
        "float" => "FLOAT",
        "double" => "DOUBLE",
        "boolean" => "TINYINT(1)",
        "date" => "DATE",
        "dateTime" | "dateTimeTz" => "DATETIME({p})",
        "time" | "timeTz" => "TIME({p})",
        "timestamp" | "timestampTz" => "TIMESTAMP({p})",
        "enum" => "ENUM",
        "json" | "jsonb" => "JSON",
        "uuid" => "CHAR(36)",
        "ipAddress" => "INT UNSIGNED",
        "macAddress" => "VARCHAR(17)",
        "year" => "YEAR",
        _ => "VARCHAR",
    }
}

fn sqlite_native(t: &str) -> &'static str {
    match t {
        "string" => "VARCHAR",
        "char" => "CHAR",
        "text" | "mediumText" | "longText" => "TEXT",
        "binary" => "BLOB",
        "tinyInteger" => "TINYINT",
        "smallInteger" => "SMALLINT",
        "integer" => "INTEGER",
        "bigInteger" => "BIGINT",
        "decimal" => "NUMERIC",
        "float" => "FLOAT",
        "double" => "DOUBLE",
        "boolean" => "BOOLEAN",
        "date" => "DATE",
        "dateTime" | "dateTimeTz" | "timestamp" | "timestampTz" => "DATETIME",
        "time" | "timeTz" => "TIME",
        "enum" | "json" | "jsonb" => "TEXT",
        "uuid" => "CHAR(36)",
        "ipAddress" => "INTEGER",
        "macAddress" => "VARCHAR(17)",
        "year" => "SMALLINT",
        _ => "VARCHAR",
    }
}
