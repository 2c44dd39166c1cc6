//! Configuration
//!
//! [`AppConfig`] is read once at startup and is the only place the process
//! environment is consulted for auth settings. Anything wrong with the
//! signing secret is a [`ConfigError`], and the binary refuses to start.
//!
//! [`SecurityConfig`] covers the HTTP hardening layers and, like the rest of
//! the transport knobs, falls back to defaults on unparseable values.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use thiserror::Error;

use crate::auth::{HashCost, PasswordHasher, SecretError, SecretPolicy, SigningSecret, DEFAULT_TOKEN_TTL};
use crate::error::ErrorConfig;
use crate::parse::{parse_duration, parse_size};

/// Fatal startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `JWT_SECRET` is not set
    #[error("JWT_SECRET must be set")]
    MissingSecret,

    /// `JWT_SECRET` is set but refused by the environment's policy
    #[error("JWT_SECRET rejected: {0}")]
    Secret(#[from] SecretError),

    /// A value is present but unusable
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `APP_ENV` (or `RUST_ENV`), lowercased; selects the secret policy
    pub environment: String,
    /// Validated token signing key
    pub signing_secret: SigningSecret,
    /// Lifetime of issued tokens
    pub token_ttl: Duration,
    /// Listen address
    pub bind_addr: IpAddr,
    /// Listen port
    pub port: u16,
    /// Argon2id hasher at the configured cost
    pub password_hasher: PasswordHasher,
    /// PostgreSQL URL; in-memory stores are used when absent
    pub database_url: Option<String>,
    /// HTTP hardening layers
    pub security: SecurityConfig,
    /// Error rendering; details are exposed only in an explicit development environment
    pub errors: ErrorConfig,
}

impl AppConfig {
    /// Load from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `JWT_SECRET` (required)
    /// - `APP_ENV` / `RUST_ENV`: production|staging|testing|development (default: development)
    /// - `TOKEN_TTL`: e.g. "24h", "30m" (default: "24h")
    /// - `BIND_ADDR` (default: "0.0.0.0"), `SERVER_PORT` (default: 8080)
    /// - `PASSWORD_HASH_MEMORY_KIB`, `PASSWORD_HASH_ITERATIONS`,
    ///   `PASSWORD_HASH_PARALLELISM` (default: argon2 defaults)
    /// - `DATABASE_URL` (optional)
    /// - plus everything [`SecurityConfig::from_env`] reads
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let declared = lookup("APP_ENV").or_else(|| lookup("RUST_ENV"));
        let errors = ErrorConfig::for_environment(declared.as_deref());
        let environment = declared
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase();

        let secret = lookup("JWT_SECRET").ok_or(ConfigError::MissingSecret)?;
        let signing_secret =
            SigningSecret::new(secret, &SecretPolicy::for_environment(&environment))?;

        let token_ttl = match lookup("TOKEN_TTL") {
            None => DEFAULT_TOKEN_TTL,
            Some(raw) => match parse_duration(&raw) {
                Some(ttl) if !ttl.is_zero() => ttl,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "TOKEN_TTL",
                        value: raw,
                        reason: "expected a positive duration such as 24h or 30m".into(),
                    })
                }
            },
        };

        let bind_addr = match lookup("BIND_ADDR") {
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            Some(raw) => raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
        };

        let port = parse_number(&lookup, "SERVER_PORT", 8080u16)?;

        let defaults = HashCost::default();
        let hash_cost = HashCost {
            memory_kib: parse_number(&lookup, "PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_number(&lookup, "PASSWORD_HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_number(&lookup, "PASSWORD_HASH_PARALLELISM", defaults.parallelism)?,
        };
        let password_hasher = PasswordHasher::new(hash_cost).map_err(|e| ConfigError::Invalid {
            key: "PASSWORD_HASH_*",
            value: format!("{:?}", hash_cost),
            reason: e.to_string(),
        })?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        Ok(Self {
            environment,
            signing_secret,
            token_ttl,
            bind_addr,
            port,
            password_hasher,
            database_url,
            security: SecurityConfig::from_lookup(&lookup),
            errors,
        })
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }
}

fn parse_number<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

/// HTTP hardening configuration.
///
/// # Example
///
/// ```ignore
/// let config = SecurityConfig::builder()
///     .max_request_size(64 * 1024)
///     .request_timeout(Duration::from_secs(10))
///     .rate_limit(10, 20)
///     .cors_origins(vec!["https://app.example.com"])
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes
    pub max_request_size: usize,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// Rate limit: requests per second per client IP
    pub rate_limit_per_second: u64,

    /// Rate limit: burst size
    pub rate_limit_burst: u32,

    /// Enable rate limiting. Off only in tests.
    pub rate_limit_enabled: bool,

    /// CORS allowed origins.
    /// Empty = same-origin only, `["*"]` = any origin.
    pub cors_origins: Vec<String>,

    /// Enable security headers
    pub security_headers_enabled: bool,

    /// Enable request/response tracing
    pub tracing_enabled: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024,
            request_timeout: Duration::from_secs(30),
            rate_limit_per_second: 5,
            rate_limit_burst: 10,
            rate_limit_enabled: true,
            cors_origins: Vec::new(),
            security_headers_enabled: true,
            tracing_enabled: true,
        }
    }
}

impl SecurityConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MAX_REQUEST_SIZE`: e.g., "64KB", "1MB" (default: "1MB")
    /// - `REQUEST_TIMEOUT`: e.g., "30s", "5m" (default: "30s")
    /// - `RATE_LIMIT_PER_SECOND`: requests/sec (default: 5)
    /// - `RATE_LIMIT_BURST`: burst size (default: 10)
    /// - `RATE_LIMIT_ENABLED`: "true"/"false" (default: "true")
    /// - `CORS_ALLOWED_ORIGINS`: comma-separated, or "*" (default: empty/restrictive)
    /// - `SECURITY_HEADERS_ENABLED`: "true"/"false" (default: "true")
    /// - `TRACING_ENABLED`: "true"/"false" (default: "true")
    pub fn from_env() -> Self {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|s| s.to_lowercase() != "false")
                .unwrap_or(default)
        };

        let cors_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            max_request_size: lookup("MAX_REQUEST_SIZE")
                .and_then(|s| parse_size(&s))
                .unwrap_or(defaults.max_request_size),
            request_timeout: lookup("REQUEST_TIMEOUT")
                .and_then(|s| parse_duration(&s))
                .unwrap_or(defaults.request_timeout),
            rate_limit_per_second: lookup("RATE_LIMIT_PER_SECOND")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_per_second),
            rate_limit_burst: lookup("RATE_LIMIT_BURST")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_burst),
            rate_limit_enabled: flag("RATE_LIMIT_ENABLED", defaults.rate_limit_enabled),
            cors_origins,
            security_headers_enabled: flag(
                "SECURITY_HEADERS_ENABLED",
                defaults.security_headers_enabled,
            ),
            tracing_enabled: flag("TRACING_ENABLED", defaults.tracing_enabled),
        }
    }

    /// Create a new builder for programmatic configuration.
    pub fn builder() -> SecurityConfigBuilder {
        SecurityConfigBuilder::default()
    }

    /// Check if CORS is in permissive mode (allows any origin).
    pub fn cors_is_permissive(&self) -> bool {
        self.cors_origins.len() == 1 && self.cors_origins[0] == "*"
    }

    /// Check if CORS is in restrictive mode (same-origin only).
    pub fn cors_is_restrictive(&self) -> bool {
        self.cors_origins.is_empty()
    }
}

/// Builder for SecurityConfig
#[derive(Debug, Clone, Default)]
pub struct SecurityConfigBuilder {
    config: SecurityConfig,
}

impl SecurityConfigBuilder {
    /// Set maximum request body size in bytes.
    pub fn max_request_size(mut self, size: usize) -> Self {
        self.config.max_request_size = size;
        self
    }

    /// Set request timeout duration.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set rate limiting parameters.
    pub fn rate_limit(mut self, per_second: u64, burst: u32) -> Self {
        self.config.rate_limit_per_second = per_second;
        self.config.rate_limit_burst = burst;
        self
    }

    /// Set CORS allowed origins.
    pub fn cors_origins(mut self, origins: Vec<&str>) -> Self {
        self.config.cors_origins = origins.into_iter().map(String::from).collect();
        self
    }

    /// Allow any CORS origin (development only).
    pub fn cors_permissive(mut self) -> Self {
        self.config.cors_origins = vec!["*".to_string()];
        self
    }

    /// Disable security headers.
    pub fn disable_security_headers(mut self) -> Self {
        self.config.security_headers_enabled = false;
        self
    }

    /// Disable request/response tracing.
    pub fn disable_tracing(mut self) -> Self {
        self.config.tracing_enabled = false;
        self
    }

    /// Disable rate limiting (tests only).
    pub fn disable_rate_limiting(mut self) -> Self {
        self.config.rate_limit_enabled = false;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> SecurityConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const DEV_SECRET: &str = "k3y-material-for-local-dev-only";
    const PROD_SECRET: &str = "Zq7!vN2#pL9$wX4%rT6^yB8&uM1*kC3(hF5)jD0_gS2+eA7=oI9?qW4~zR6@xV8|";

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn test_empty_secret_is_fatal() {
        assert!(matches!(
            load(&[("JWT_SECRET", "")]),
            Err(ConfigError::Secret(SecretError::Empty))
        ));
    }

    #[test]
    fn test_production_demands_stronger_secret() {
        let err = load(&[("APP_ENV", "production"), ("JWT_SECRET", DEV_SECRET)]).unwrap_err();
        assert!(matches!(err, ConfigError::Secret(SecretError::TooShort { .. })));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("JWT_SECRET", DEV_SECRET)]).unwrap();
        assert_eq!(config.environment, "development");
        assert_eq!(config.token_ttl, Duration::from_secs(86_400));
        assert_eq!(config.bind_addr, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.port, 8080);
        assert!(config.database_url.is_none());
        assert!(!config.is_production());
        assert!(!config.errors.expose_details);
    }

    #[test]
    fn test_environment_precedence_is_shared() {
        let config = load(&[
            ("APP_ENV", "production"),
            ("RUST_ENV", "development"),
            ("JWT_SECRET", PROD_SECRET),
        ])
        .unwrap();
        assert!(config.is_production());
        assert!(!config.errors.expose_details);

        let config = load(&[("APP_ENV", "development"), ("JWT_SECRET", DEV_SECRET)]).unwrap();
        assert!(config.errors.expose_details);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("JWT_SECRET", DEV_SECRET),
            ("TOKEN_TTL", "30m"),
            ("BIND_ADDR", "127.0.0.1"),
            ("SERVER_PORT", "9000"),
            ("PASSWORD_HASH_MEMORY_KIB", "8192"),
            ("PASSWORD_HASH_ITERATIONS", "1"),
            ("DATABASE_URL", "postgres://localhost/bridger"),
            ("RATE_LIMIT_ENABLED", "false"),
            ("MAX_REQUEST_SIZE", "64KB"),
        ])
        .unwrap();

        assert_eq!(config.token_ttl, Duration::from_secs(1800));
        assert_eq!(config.bind_addr, "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/bridger"));
        assert!(!config.security.rate_limit_enabled);
        assert_eq!(config.security.max_request_size, 64 * 1024);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        for (key, value) in [
            ("TOKEN_TTL", "forever"),
            ("TOKEN_TTL", "0s"),
            ("BIND_ADDR", "not-an-ip"),
            ("SERVER_PORT", "70000"),
            ("PASSWORD_HASH_ITERATIONS", "0"),
        ] {
            let result = load(&[("JWT_SECRET", DEV_SECRET), (key, value)]);
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "{key}={value}"
            );
        }
    }

    #[test]
    fn test_security_defaults_are_restrictive() {
        let config = SecurityConfig::default();
        assert!(config.rate_limit_enabled);
        assert!(config.cors_is_restrictive());
        assert!(config.security_headers_enabled);
    }

    #[test]
    fn test_security_builder() {
        let config = SecurityConfig::builder()
            .rate_limit(10, 20)
            .cors_origins(vec!["https://app.example.com"])
            .disable_rate_limiting()
            .build();
        assert_eq!(config.rate_limit_per_second, 10);
        assert_eq!(config.rate_limit_burst, 20);
        assert_eq!(config.cors_origins, vec!["https://app.example.com"]);
        assert!(!config.rate_limit_enabled);
    }
}
