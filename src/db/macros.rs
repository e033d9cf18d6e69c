//! Database dispatch macros for reducing code duplication.
//!
//! The macro expands to a plain `match` over `DbPool`, so each arm keeps the concrete
//! pool type (`MySqlPool`, `PgPool`, `SqlitePool`) without boxing.

/// Macro for generating database dispatch match arms.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(pool, {
///     MySql(p) => do_mysql(p),
///     Postgres(p) => do_postgres(p),
///     SQLite(p) => do_sqlite(p),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::db::pool::DbPool::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;

#[cfg(test)]
mod tests {
    use crate::db::pool::DbPool;
    use crate::models::DriverKind;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_dispatch_keeps_concrete_pool() {
        let pool = DbPool::SQLite(
            SqlitePoolOptions::new()
                .connect_lazy("sqlite::memory:")
                .unwrap(),
        );
        let driver = impl_db_dispatch!(&pool, {
            MySql(_p) => DriverKind::MySQL,
            Postgres(_p) => DriverKind::PostgreSQL,
            SQLite(p) => {
                assert_eq!(p.size(), 0);
                DriverKind::SQLite
            },
        });
        assert_eq!(driver, DriverKind::SQLite);
    }
}
