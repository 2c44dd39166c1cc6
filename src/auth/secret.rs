//! Signing Secret Validation
//!
//! The token signing secret is loaded once at startup, checked against an
//! environment-aware policy, and then wrapped in [`SigningSecret`] so the
//! rest of the crate can only ever see a validated, immutable value.
//!
//! # Policies
//!
//! - `production`: 64 char min, 128-bit entropy, character diversity
//! - `staging`: 48 char min, 96-bit entropy, character diversity
//! - `testing`: 32 char min, 64-bit entropy
//! - `development` (default): non-empty, 16 char min, weak patterns rejected
//!
//! # Example
//!
//! ```
//! use bridger::auth::{SecretPolicy, SigningSecret};
//!
//! let policy = SecretPolicy::for_environment("development");
//! let secret = SigningSecret::new("k3y-material-for-local-dev-only", &policy);
//! assert!(secret.is_ok());
//! ```

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Reasons a signing secret is refused at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SecretError {
    /// No secret was provided, or it was only whitespace
    #[error("signing secret is empty")]
    Empty,

    /// Secret is too short for the active policy
    #[error("signing secret length ({actual} chars) is below minimum ({minimum} chars) for {context}")]
    TooShort {
        actual: usize,
        minimum: usize,
        context: String,
    },

    /// Secret contains a weak/common pattern
    #[error("signing secret contains weak pattern: '{pattern}'")]
    WeakPattern { pattern: String },

    /// Secret has insufficient entropy
    #[error("signing secret entropy ({actual:.1} bits) is below minimum ({minimum:.1} bits) for {context}")]
    LowEntropy {
        actual: f64,
        minimum: f64,
        context: String,
    },

    /// Secret lacks required character diversity
    #[error("signing secret must contain: {}", missing.join(", "))]
    InsufficientDiversity { missing: Vec<String> },
}

/// Requirements a signing secret must meet.
#[derive(Debug, Clone)]
pub struct SecretPolicy {
    /// Minimum secret length in characters
    pub min_length: usize,
    /// Minimum Shannon entropy in bits
    pub min_entropy: f64,
    /// Whether to require upper, lower, digit and special characters
    pub require_diversity: bool,
    /// Whether to reject well-known weak substrings
    pub check_weak_patterns: bool,
    /// Context string for error messages
    pub context: String,
}

impl Default for SecretPolicy {
    fn default() -> Self {
        Self::for_environment("development")
    }
}

impl SecretPolicy {
    /// Create a policy for a named environment (`APP_ENV`).
    pub fn for_environment(environment: &str) -> Self {
        match environment.to_lowercase().as_str() {
            "production" | "prod" => Self {
                min_length: 64,
                min_entropy: 128.0,
                require_diversity: true,
                check_weak_patterns: true,
                context: "production environment".to_string(),
            },
            "staging" | "stage" => Self {
                min_length: 48,
                min_entropy: 96.0,
                require_diversity: true,
                check_weak_patterns: true,
                context: "staging environment".to_string(),
            },
            "testing" | "test" => Self {
                min_length: 32,
                min_entropy: 64.0,
                require_diversity: false,
                check_weak_patterns: true,
                context: "testing environment".to_string(),
            },
            _ => Self {
                min_length: 16,
                min_entropy: 0.0,
                require_diversity: false,
                check_weak_patterns: true,
                context: "development environment".to_string(),
            },
        }
    }

    /// A policy that only rejects empty secrets.
    pub fn permissive() -> Self {
        Self {
            min_length: 1,
            min_entropy: 0.0,
            require_diversity: false,
            check_weak_patterns: false,
            context: "permissive policy".to_string(),
        }
    }

    /// Validate a secret against this policy.
    pub fn validate(&self, secret: &str) -> Result<(), SecretError> {
        if secret.trim().is_empty() {
            return Err(SecretError::Empty);
        }

        if secret.len() < self.min_length {
            return Err(SecretError::TooShort {
                actual: secret.len(),
                minimum: self.min_length,
                context: self.context.clone(),
            });
        }

        if self.check_weak_patterns {
            if let Some(pattern) = find_weak_pattern(secret) {
                return Err(SecretError::WeakPattern {
                    pattern: pattern.to_string(),
                });
            }
        }

        let entropy = calculate_entropy(secret);
        if entropy < self.min_entropy {
            return Err(SecretError::LowEntropy {
                actual: entropy,
                minimum: self.min_entropy,
                context: self.context.clone(),
            });
        }

        if self.require_diversity {
            let missing = check_diversity(secret);
            if !missing.is_empty() {
                return Err(SecretError::InsufficientDiversity { missing });
            }
        }

        Ok(())
    }
}

/// A validated HMAC signing secret.
///
/// Only constructible through [`SigningSecret::new`], so holding one proves the
/// secret passed its policy. `Debug` never prints the key material.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Validate `secret` against `policy` and wrap it.
    pub fn new(secret: impl Into<String>, policy: &SecretPolicy) -> Result<Self, SecretError> {
        let secret = secret.into();
        policy.validate(&secret)?;
        Ok(Self(secret.into_bytes()))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigningSecret").field(&"[REDACTED]").finish()
    }
}

fn find_weak_pattern(secret: &str) -> Option<&'static str> {
    const WEAK_PATTERNS: &[&str] = &[
        "password", "admin", "123456", "qwerty", "default", "example", "changeme",
        "letmein", "welcome", "monkey", "dragon", "master",
    ];

    let secret_lower = secret.to_lowercase();
    WEAK_PATTERNS
        .iter()
        .find(|pattern| secret_lower.contains(*pattern))
        .copied()
}

fn check_diversity(secret: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !secret.chars().any(|c| c.is_uppercase()) {
        missing.push("uppercase letters".to_string());
    }
    if !secret.chars().any(|c| c.is_lowercase()) {
        missing.push("lowercase letters".to_string());
    }
    if !secret.chars().any(|c| c.is_ascii_digit()) {
        missing.push("digits".to_string());
    }
    if !secret.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        missing.push("special characters".to_string());
    }

    missing
}

/// Total Shannon entropy of a string in bits.
pub fn calculate_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut char_counts: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *char_counts.entry(c).or_insert(0) += 1;
    }

    let total = s.chars().count() as f64;
    let per_char: f64 = char_counts
        .values()
        .map(|count| {
            let p = *count as f64 / total;
            -p * p.log2()
        })
        .sum();

    per_char * total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_secret_rejected_by_every_policy() {
        for env in ["production", "staging", "testing", "development"] {
            let policy = SecretPolicy::for_environment(env);
            assert_eq!(policy.validate(""), Err(SecretError::Empty));
            assert_eq!(policy.validate("   "), Err(SecretError::Empty));
        }
        assert_eq!(SecretPolicy::permissive().validate(""), Err(SecretError::Empty));
    }

    #[test]
    fn test_development_policy() {
        let policy = SecretPolicy::for_environment("development");
        assert!(policy.validate("k3y-material-for-local-dev-only").is_ok());
        assert!(matches!(
            policy.validate("short"),
            Err(SecretError::TooShort { minimum: 16, .. })
        ));
        assert!(matches!(
            policy.validate("my-password-is-long-enough"),
            Err(SecretError::WeakPattern { .. })
        ));
    }

    #[test]
    fn test_production_policy_requires_diversity() {
        let policy = SecretPolicy::for_environment("production");
        let lowercase_only: String = "abcdefghijklmnopqrstuvwxyz".repeat(3);
        assert!(policy.validate(&lowercase_only).is_err());

        let strong = "Zq7!vN2#pL9$wX4%rT6^yB8&uM1*kC3(hF5)jD0_gS2+eA7=oI9?qW4~zR6@xV8|";
        assert!(policy.validate(strong).is_ok());
    }

    #[test]
    fn test_entropy() {
        assert!(calculate_entropy("aaaaaa") < 1.0);
        assert!(calculate_entropy("aB3$xY9!") > 20.0);
        assert_eq!(calculate_entropy(""), 0.0);
    }

    #[test]
    fn test_signing_secret_debug_is_redacted() {
        let secret =
            SigningSecret::new("k3y-material-for-local-dev-only", &SecretPolicy::default())
                .unwrap();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("k3y"));
        assert!(debug.contains("REDACTED"));
    }
}
