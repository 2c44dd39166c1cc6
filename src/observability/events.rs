//! Security Event Logging
//!
//! Structured audit records for authentication, authorization and account
//! lifecycle events.
//!
//! ```ignore
//! use bridger::observability::SecurityEvent;
//! use bridger::security_event;
//!
//! security_event!(
//!     SecurityEvent::AuthenticationFailure,
//!     email = %email,
//!     reason = "invalid_credentials",
//!     "Authentication failed"
//! );
//! ```

use std::fmt;

/// Security event categories for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    // Authentication events
    /// Credentials verified and a token issued
    AuthenticationSuccess,
    /// Login attempt rejected
    AuthenticationFailure,
    /// Bearer token rejected by the guard
    TokenRejected,

    // Authorization events
    /// Ownership check passed
    AccessGranted,
    /// Ownership check failed
    AccessDenied,

    // User management events
    /// New account created
    UserRegistered,
    /// Account profile changed
    UserModified,
    /// Account deleted
    UserDeleted,

    // Resource events
    /// Owned resource created
    ResourceCreated,
    /// Owned resource changed
    ResourceModified,
    /// Owned resource deleted
    ResourceDeleted,

    // Security events
    /// Rate limit exceeded
    RateLimitExceeded,

    // System events
    /// Application started
    SystemStartup,
    /// Application shutdown
    SystemShutdown,
    /// Database connection established
    DatabaseConnected,
}

impl SecurityEvent {
    /// Get the event category for filtering/grouping
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess | Self::AuthenticationFailure | Self::TokenRejected => {
                "authentication"
            }

            Self::AccessGranted | Self::AccessDenied => "authorization",

            Self::UserRegistered | Self::UserModified | Self::UserDeleted => "user_management",

            Self::ResourceCreated | Self::ResourceModified | Self::ResourceDeleted => "resource",

            Self::RateLimitExceeded => "security",

            Self::SystemStartup | Self::SystemShutdown | Self::DatabaseConnected => "system",
        }
    }

    /// Get the severity level for the event
    pub fn severity(&self) -> Severity {
        match self {
            Self::AuthenticationFailure
            | Self::TokenRejected
            | Self::AccessDenied
            | Self::RateLimitExceeded => Severity::High,

            Self::AuthenticationSuccess
            | Self::UserRegistered
            | Self::UserModified
            | Self::UserDeleted
            | Self::ResourceDeleted => Severity::Medium,

            Self::AccessGranted
            | Self::ResourceCreated
            | Self::ResourceModified
            | Self::SystemStartup
            | Self::SystemShutdown
            | Self::DatabaseConnected => Severity::Low,
        }
    }

    /// Get the event name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::TokenRejected => "token_rejected",
            Self::AccessGranted => "access_granted",
            Self::AccessDenied => "access_denied",
            Self::UserRegistered => "user_registered",
            Self::UserModified => "user_modified",
            Self::UserDeleted => "user_deleted",
            Self::ResourceCreated => "resource_created",
            Self::ResourceModified => "resource_modified",
            Self::ResourceDeleted => "resource_deleted",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::SystemStartup => "system_startup",
            Self::SystemShutdown => "system_shutdown",
            Self::DatabaseConnected => "database_connected",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine operations
    Low,
    /// Important state changes
    Medium,
    /// Security-relevant failures
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Log a security event with structured fields.
///
/// Adds `security_event`, `category` and `severity` fields and picks the
/// tracing level from the event's severity.
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        let category = event.category();
        let event_name = event.name();

        match event.severity() {
            $crate::observability::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::observability::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::observability::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}
