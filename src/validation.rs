//! Input Validation
//!
//! Request bodies are validated before any handler logic runs:
//!
//! - [`Validate`] is implemented by each request type
//! - [`ValidatedJson`] deserializes and validates in one extractor, rejecting
//!   with the standard error envelope
//!
//! ```ignore
//! impl Validate for CreateUserRequest {
//!     fn validate(&self) -> Result<(), ValidationError> {
//!         validate_length(&self.name, 1, 64, "name")?;
//!         validate_email(&self.email)?;
//!         Ok(())
//!     }
//! }
//! ```

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use std::fmt;

use crate::error::AppError;

/// Validation error with field context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field that failed validation (if applicable)
    pub field: Option<String>,
    /// Error code for programmatic handling
    pub code: ValidationErrorCode,
    /// Human-readable message
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(code: ValidationErrorCode, message: impl Into<String>) -> Self {
        Self {
            field: None,
            code,
            message: message.into(),
        }
    }

    /// Create a validation error for a specific field
    pub fn for_field(
        field: impl Into<String>,
        code: ValidationErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: Some(field.into()),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validation error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// Value is required but missing/empty
    Required,
    /// Value is too short
    TooShort,
    /// Value is too long
    TooLong,
    /// Value contains control characters
    InvalidCharacters,
    /// Email format is invalid
    InvalidEmail,
}

impl fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::TooShort => write!(f, "too_short"),
            Self::TooLong => write!(f, "too_long"),
            Self::InvalidCharacters => write!(f, "invalid_characters"),
            Self::InvalidEmail => write!(f, "invalid_email"),
        }
    }
}

/// Types that can check their own contents
pub trait Validate {
    /// Validate the instance, returning the first violation found
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Validate that a string is not blank
pub fn validate_required(value: &str, field: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::Required,
            "Field is required",
        ));
    }
    Ok(())
}

/// Validate string length bounds, counted in characters (both inclusive)
pub fn validate_length(value: &str, min: usize, max: usize, field: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::TooShort,
            format!("Must be at least {} characters", min),
        ));
    }
    if len > max {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::TooLong,
            format!("Must be at most {} characters", max),
        ));
    }
    Ok(())
}

/// Reject control characters (newlines, NUL, escapes)
pub fn validate_no_control(value: &str, field: &str) -> Result<(), ValidationError> {
    if value.chars().any(char::is_control) {
        return Err(ValidationError::for_field(
            field,
            ValidationErrorCode::InvalidCharacters,
            "Control characters are not allowed",
        ));
    }
    Ok(())
}

/// Validate email format.
///
/// Structural check only: one `@`, a sane local part, and a dotted domain.
/// Deliverability is not checked.
pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    let invalid = |message: &str| {
        ValidationError::for_field("email", ValidationErrorCode::InvalidEmail, message)
    };

    let (local, domain) = match value.split_once('@') {
        Some((local, domain)) if !domain.contains('@') => (local, domain),
        _ => return Err(invalid("Invalid email format")),
    };

    if local.is_empty()
        || local.len() > 64
        || local.starts_with('.')
        || local.ends_with('.')
        || local.contains("..")
        || local.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(invalid("Invalid email local part"));
    }

    if domain.is_empty()
        || domain.len() > 255
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid("Invalid email domain"));
    }
    if !domain.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '-') {
        return Err(invalid("Invalid email domain characters"));
    }

    Ok(())
}

/// JSON body extractor that runs [`Validate`] before the handler sees it.
///
/// Malformed JSON is rejected with 400; a failed validation with 422. Both
/// use the standard error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            tracing::debug!(error = %e, "JSON parsing failed");
            AppError::bad_request("Request body is not valid JSON for this endpoint")
                .with_details(e.body_text())
        })?;

        if let Err(error) = value.validate() {
            tracing::debug!(
                field = ?error.field,
                code = %error.code,
                "Validation failed"
            );
            return Err(error.into());
        }

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert!(validate_required("x", "name").is_ok());
        let err = validate_required("   ", "name").unwrap_err();
        assert_eq!(err.code, ValidationErrorCode::Required);
        assert_eq!(err.field.as_deref(), Some("name"));
    }

    #[test]
    fn test_validate_length_counts_chars() {
        assert!(validate_length("한국어", 1, 3, "name").is_ok());
        assert_eq!(
            validate_length("", 1, 3, "name").unwrap_err().code,
            ValidationErrorCode::TooShort
        );
        assert_eq!(
            validate_length("abcd", 1, 3, "name").unwrap_err().code,
            ValidationErrorCode::TooLong
        );
    }

    #[test]
    fn test_validate_no_control() {
        assert!(validate_no_control("hello world", "name").is_ok());
        assert!(validate_no_control("line\nbreak", "name").is_err());
        assert!(validate_no_control("nul\0byte", "name").is_err());
    }

    #[test]
    fn test_validate_email() {
        for ok in ["u@test.com", "first.last@sub.example.org", "a+tag@x.io"] {
            assert!(validate_email(ok).is_ok(), "{ok}");
        }
        for bad in [
            "",
            "no-at-sign",
            "@x.com",
            "a@",
            "a@@x.com",
            "a@b@c.com",
            ".a@x.com",
            "a..b@x.com",
            "a@localhost",
            "a@x.com.",
            "a b@x.com",
            "a@x_y.com",
        ] {
            assert_eq!(
                validate_email(bad).unwrap_err().code,
                ValidationErrorCode::InvalidEmail,
                "{bad}"
            );
        }
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::for_field("email", ValidationErrorCode::InvalidEmail, "bad");
        assert_eq!(err.to_string(), "email: bad");
        let err = ValidationError::new(ValidationErrorCode::Required, "missing");
        assert_eq!(err.to_string(), "missing");
    }
}
