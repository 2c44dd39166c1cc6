//! PostgreSQL connection pool
//!
//! Pool construction, health checks and the embedded schema migrations used
//! by [`PgStore`](crate::store::PgStore).

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::parse::parse_duration;

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection URL (from `DATABASE_URL`)
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,
    /// Maximum lifetime of a connection before it's closed
    pub max_lifetime: Duration,
    /// Maximum idle time before a connection is closed
    pub idle_timeout: Duration,
    /// SSL mode for connections
    pub ssl_mode: SslMode,
    /// Run migrations automatically on connect
    pub auto_migrate: bool,
}

/// SSL/TLS mode for database connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Never use SSL (local development only)
    Disable,
    /// Use SSL if available
    Prefer,
    /// Require SSL
    #[default]
    Require,
    /// Require SSL and verify the server certificate
    VerifyCa,
    /// Require SSL and verify certificate and hostname
    VerifyFull,
}

impl SslMode {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "disable" => Self::Disable,
            "prefer" => Self::Prefer,
            "verify-ca" | "verifyca" => Self::VerifyCa,
            "verify-full" | "verifyfull" => Self::VerifyFull,
            _ => Self::Require,
        }
    }
}

impl From<SslMode> for PgSslMode {
    fn from(mode: SslMode) -> Self {
        match mode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
            SslMode::VerifyCa => PgSslMode::VerifyCa,
            SslMode::VerifyFull => PgSslMode::VerifyFull,
        }
    }
}

impl DatabaseConfig {
    /// Defaults for `database_url`.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(30 * 60),
            idle_timeout: Duration::from_secs(10 * 60),
            ssl_mode: SslMode::Require,
            auto_migrate: true,
        }
    }

    /// Defaults for `database_url`, overridden by environment variables.
    ///
    /// - `DB_MAX_CONNECTIONS` (default: 10)
    /// - `DB_MIN_CONNECTIONS` (default: 1)
    /// - `DB_ACQUIRE_TIMEOUT` (default: "30s")
    /// - `DB_MAX_LIFETIME` (default: "30m")
    /// - `DB_IDLE_TIMEOUT` (default: "10m")
    /// - `DB_SSL_MODE`: disable|prefer|require|verify-ca|verify-full (default: require)
    /// - `DB_AUTO_MIGRATE` (default: true)
    pub fn from_env_with_url(database_url: impl Into<String>) -> Self {
        let defaults = Self::new(database_url);
        let env = |key: &str| std::env::var(key).ok();

        Self {
            max_connections: env("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_connections),
            min_connections: env("DB_MIN_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_connections),
            acquire_timeout: env("DB_ACQUIRE_TIMEOUT")
                .and_then(|s| parse_duration(&s))
                .unwrap_or(defaults.acquire_timeout),
            max_lifetime: env("DB_MAX_LIFETIME")
                .and_then(|s| parse_duration(&s))
                .unwrap_or(defaults.max_lifetime),
            idle_timeout: env("DB_IDLE_TIMEOUT")
                .and_then(|s| parse_duration(&s))
                .unwrap_or(defaults.idle_timeout),
            ssl_mode: env("DB_SSL_MODE")
                .map(|s| SslMode::parse(&s))
                .unwrap_or(defaults.ssl_mode),
            auto_migrate: env("DB_AUTO_MIGRATE")
                .map(|s| s.to_lowercase() != "false")
                .unwrap_or(defaults.auto_migrate),
            ..defaults
        }
    }
}

/// Database errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Invalid URL or options
    #[error("database configuration error: {0}")]
    Configuration(String),
    /// Could not connect
    #[error("database connection error: {0}")]
    Connection(String),
    /// Health check query failed
    #[error("database health check failed: {0}")]
    HealthCheck(String),
    /// Migration failed
    #[error("database migration error: {0}")]
    Migration(String),
}

/// Connect, optionally migrate, and health-check a pool.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    info!(
        max_connections = config.max_connections,
        ssl_mode = ?config.ssl_mode,
        auto_migrate = config.auto_migrate,
        "Initializing database connection pool"
    );

    let connect_options = PgConnectOptions::from_str(&config.database_url)
        .map_err(|e| DatabaseError::Configuration(format!("Invalid DATABASE_URL: {}", e)))?
        .ssl_mode(config.ssl_mode.into());

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await
        .map_err(|e| DatabaseError::Connection(format!("Failed to connect: {}", e)))?;

    if config.auto_migrate {
        run_migrations(&pool).await?;
    }

    health_check(&pool).await?;

    Ok(pool)
}

/// Apply the embedded migrations in `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;
    info!("Database migrations applied");
    Ok(())
}

/// Database health status
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// SSL/TLS is in use on the checked connection
    pub ssl_enabled: bool,
    /// Round-trip latency of the check
    pub latency: Duration,
    /// Current pool size
    pub pool_size: u32,
}

/// Run a trivial query and report connection security.
pub async fn health_check(pool: &PgPool) -> Result<HealthStatus, DatabaseError> {
    let start = std::time::Instant::now();

    let (one,): (i32,) = sqlx::query_as("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| DatabaseError::HealthCheck(format!("Query failed: {}", e)))?;
    if one != 1 {
        return Err(DatabaseError::HealthCheck("Unexpected query result".into()));
    }

    let (ssl_enabled,): (bool,) = sqlx::query_as(
        "SELECT COALESCE((SELECT ssl FROM pg_stat_ssl WHERE pid = pg_backend_pid()), false)",
    )
    .fetch_one(pool)
    .await
    .unwrap_or((false,));

    let status = HealthStatus {
        ssl_enabled,
        latency: start.elapsed(),
        pool_size: pool.size(),
    };

    if status.ssl_enabled {
        info!(latency_ms = status.latency.as_millis() as u64, "Database health check passed");
    } else {
        warn!(
            latency_ms = status.latency.as_millis() as u64,
            "Database health check passed without SSL"
        );
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::new("postgres://localhost/bridger");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.ssl_mode, SslMode::Require);
        assert!(config.auto_migrate);
    }

    #[test]
    fn test_ssl_mode_parse() {
        assert_eq!(SslMode::parse("disable"), SslMode::Disable);
        assert_eq!(SslMode::parse("VERIFY-FULL"), SslMode::VerifyFull);
        assert_eq!(SslMode::parse("bogus"), SslMode::Require);
    }
}
