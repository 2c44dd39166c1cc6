//! Observability
//!
//! Structured logging for the service. Application code uses plain `tracing`
//! macros plus [`security_event!`](crate::security_event) for audit-relevant
//! events; this module only decides where and how they are written.
//!
//! # Usage
//!
//! ```ignore
//! use bridger::observability::{init, ObservabilityConfig};
//!
//! init(ObservabilityConfig::from_env())?;
//! ```

mod config;
mod events;
mod providers;

pub use config::{LogFormat, ObservabilityConfig, ObservabilityConfigBuilder};
pub use events::{SecurityEvent, Severity};

use thiserror::Error;
use tracing::info;

/// Install the global tracing subscriber.
///
/// Must be called once, before anything is logged. A second call fails with
/// [`ObservabilityError::Provider`].
pub fn init(config: ObservabilityConfig) -> Result<(), ObservabilityError> {
    providers::init_tracing(&config)?;

    info!(
        log_format = ?config.log_format,
        log_filter = %config.log_filter,
        "Observability initialized"
    );

    Ok(())
}

/// Observability initialization errors
#[derive(Debug, Error)]
pub enum ObservabilityError {
    /// Invalid configuration
    #[error("observability config error: {0}")]
    Config(String),
    /// Subscriber could not be installed
    #[error("tracing provider error: {0}")]
    Provider(String),
}
