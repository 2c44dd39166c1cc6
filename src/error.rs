//! Error Handling
//!
//! [`AppError`] is the single error type handlers return. It maps onto an
//! HTTP status and a JSON envelope:
//!
//! ```json
//! { "status": 404, "error": "not_found", "message": "Chat room not found" }
//! ```
//!
//! Internal causes are logged but only reach the client when the process runs
//! with [`ErrorConfig::development`]. Authentication and authorization failures
//! never carry details, so a caller cannot tell *why* a token was refused.
//!
//! # Usage
//!
//! ```ignore
//! use bridger::error::AppError;
//!
//! async fn handler() -> Result<String, AppError> {
//!     let data = fetch_data().map_err(|e| AppError::internal("Failed to fetch data", e))?;
//!     Ok(data)
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use crate::auth::{AuthError, PasswordError};
use crate::store::StoreError;
use crate::validation::ValidationError;

// ============================================================================
// Error Configuration
// ============================================================================

/// Error exposure configuration
#[derive(Debug, Clone)]
pub struct ErrorConfig {
    /// Whether to expose detailed error messages.
    /// Should be `false` in production.
    pub expose_details: bool,

    /// Whether to log errors as they are rendered
    pub log_errors: bool,

    /// Message shown for internal errors when details are hidden
    pub internal_error_message: String,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl ErrorConfig {
    /// Production configuration (secure defaults)
    pub fn production() -> Self {
        Self {
            expose_details: false,
            log_errors: true,
            internal_error_message: "An internal error occurred".to_string(),
        }
    }

    /// Development configuration (detailed errors)
    pub fn development() -> Self {
        Self {
            expose_details: true,
            log_errors: true,
            internal_error_message: "Internal server error".to_string(),
        }
    }

    /// Pick the configuration for a deployment environment name.
    ///
    /// Only an explicit "development", "dev" or "local" exposes details;
    /// anything else, including no environment at all, is production.
    pub fn for_environment(environment: Option<&str>) -> Self {
        match environment.map(str::to_lowercase).as_deref() {
            Some("development" | "dev" | "local") => Self::development(),
            _ => Self::production(),
        }
    }
}

// Set once at startup
static ERROR_CONFIG: std::sync::OnceLock<ErrorConfig> = std::sync::OnceLock::new();

/// Initialize error handling configuration. Later calls are ignored.
pub fn init(config: ErrorConfig) {
    let _ = ERROR_CONFIG.set(config);
}

/// Get the current error configuration
pub fn config() -> &'static ErrorConfig {
    ERROR_CONFIG.get_or_init(ErrorConfig::default)
}

// ============================================================================
// Error Types
// ============================================================================

/// Application error with safe client rendering
#[derive(Debug)]
pub struct AppError {
    /// Error kind determines HTTP status and handling
    pub kind: ErrorKind,
    /// User-facing message (safe to expose)
    pub message: String,
    /// Internal details (logged, not exposed in production)
    pub details: Option<String>,
    /// Underlying error (for logging)
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Error categories with appropriate HTTP status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request (400) - malformed input
    BadRequest,
    /// Unauthorized (401) - missing, invalid or expired credentials
    Unauthorized,
    /// Forbidden (403) - authenticated but not the owner
    Forbidden,
    /// Not found (404) - resource doesn't exist
    NotFound,
    /// Conflict (409) - e.g. duplicate email
    Conflict,
    /// Unprocessable entity (422) - validation error
    Validation,
    /// Too many requests (429) - rate limited
    RateLimited,
    /// Internal server error (500) - hide details
    Internal,
    /// Service unavailable (503) - temporary failure
    Unavailable,
}

impl ErrorKind {
    /// Get the HTTP status code for this error kind
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether details can be safely exposed for this error kind
    pub fn expose_details(&self) -> bool {
        matches!(
            self,
            Self::BadRequest | Self::Validation | Self::NotFound | Self::Conflict
        )
    }
}

impl AppError {
    /// Create a new error
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a bad request error (400)
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// Create an unauthorized error (401)
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a forbidden error (403)
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Create a not found error (404)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a conflict error (409)
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a validation error (422)
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an internal error (500) with source
    ///
    /// The message is what users see; the source is logged but not exposed.
    pub fn internal(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
            details: Some(source.to_string()),
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error whose cause is logged but never rendered,
    /// whatever the [`ErrorConfig`].
    pub fn internal_opaque(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
            details: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error without a source
    pub fn internal_msg(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a service unavailable error (503)
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    /// Add internal details (logged but not exposed)
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn log(&self) {
        if !config().log_errors {
            return;
        }

        let cause = self.source.as_ref().map(|e| e.to_string());
        let details = self
            .details
            .as_deref()
            .or(cause.as_deref())
            .unwrap_or("none");

        match self.kind {
            ErrorKind::Internal | ErrorKind::Unavailable => {
                tracing::error!(
                    error_kind = %self.kind,
                    message = %self.message,
                    details = %details,
                    "Internal error"
                );
            }
            ErrorKind::Unauthorized | ErrorKind::Forbidden => {
                tracing::warn!(
                    error_kind = %self.kind,
                    message = %self.message,
                    "Auth error"
                );
            }
            _ => {
                tracing::debug!(
                    error_kind = %self.kind,
                    message = %self.message,
                    "Client error"
                );
            }
        }
    }

    /// Render into the response envelope under `cfg`.
    fn to_body(&self, cfg: &ErrorConfig) -> ErrorResponse {
        let message = if cfg.expose_details || self.kind.expose_details() {
            self.message.clone()
        } else {
            match self.kind {
                ErrorKind::Internal => cfg.internal_error_message.clone(),
                ErrorKind::Unauthorized => "Authentication required".to_string(),
                ErrorKind::Forbidden => "Access denied".to_string(),
                _ => self.message.clone(),
            }
        };

        ErrorResponse {
            status: self.kind.status_code().as_u16(),
            error: self.kind.to_string(),
            message,
            detail: if cfg.expose_details {
                self.details.clone()
            } else {
                None
            },
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest => write!(f, "bad_request"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation_error"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Internal => write!(f, "internal_error"),
            Self::Unavailable => write!(f, "service_unavailable"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

// ============================================================================
// Error Response
// ============================================================================

/// JSON error envelope
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// HTTP status code, repeated in the body
    pub status: u16,
    /// Error type/code
    pub error: String,
    /// Human-readable message
    pub message: String,
    /// Internal details (only in development)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let body = self.to_body(config());
        (self.kind.status_code(), Json(body)).into_response()
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::internal("Password processing failed", err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::not_found("Resource not found"),
            StoreError::Conflict(msg) => AppError::conflict(msg),
            other => AppError::internal("Storage error", other),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::unauthorized("Invalid email or password"),
            // the login flow never reveals why it failed internally
            other => AppError::internal_opaque("Authentication failed", other),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::internal("Database error", err)
    }
}

/// Result type alias for handlers returning AppError
pub type Result<T> = std::result::Result<T, AppError>;
