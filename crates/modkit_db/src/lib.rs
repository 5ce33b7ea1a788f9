//! modkit_db
//!
//! Postgres pool construction and embedded migrations. Everything here is
//! plumbing other crates build repositories on top of; it has no domain
//! knowledge of submissions, decisions or evidence.

use chrono::{DateTime, Datelike, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Query(#[from] sqlx::Error),
}

/// Pool sizing defaults: 25 max, 5 min connections, 1 h max
/// connection lifetime.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 25,
            min_connections: 5,
            max_lifetime: Duration::from_secs(3600),
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

pub async fn connect(config: &PoolConfig) -> Result<PgPool, DbError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .max_lifetime(config.max_lifetime)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await
        .map_err(DbError::Connect)
}

/// Runs the embedded migration set. Safe to call on every startup; sqlx
/// tracks applied versions in `_sqlx_migrations`.
pub async fn migrate(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// The name of the monthly partition a row with this `created_at` belongs
/// to, e.g. `2026_07` for July 2026.
pub fn partition_suffix(created_at: DateTime<Utc>) -> String {
    format!("{:04}_{:02}", created_at.year(), created_at.month())
}

/// Lazily creates the monthly partition for `table` covering the month of
/// `created_at`, if it doesn't already exist. Idempotent: `IF NOT EXISTS`
/// plus the default partition absorbs any inter-partition race, since a row
/// landing in the default partition is still valid, just not yet moved into
/// its dedicated one.
pub async fn ensure_monthly_partition(
    pool: &PgPool,
    table: &str,
    created_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let year = created_at.year();
    let month = created_at.month();
    let suffix = partition_suffix(created_at);
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let partition_name = format!("{table}_y{suffix}");
    let from = format!("{year:04}-{month:02}-01");
    let to = format!("{next_year:04}-{next_month:02}-01");

    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {partition_name} PARTITION OF {table} \
         FOR VALUES FROM ('{from}') TO ('{to}')"
    );
    sqlx::query(&sql).execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn partition_suffix_is_zero_padded() {
        let dt = Utc.with_ymd_and_hms(2026, 7, 26, 0, 0, 0).unwrap();
        assert_eq!(partition_suffix(dt), "2026_07");
    }

    #[test]
    fn default_pool_sizing() {
        let cfg = PoolConfig::new("postgres://localhost/db");
        assert_eq!(cfg.max_connections, 25);
        assert_eq!(cfg.min_connections, 5);
        assert_eq!(cfg.max_lifetime, Duration::from_secs(3600));
    }
}
