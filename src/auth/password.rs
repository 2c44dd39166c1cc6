//! Password Hashing
//!
//! Argon2id hashing with a per-password random salt, stored in PHC string
//! format (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`). The cost parameters
//! travel inside the PHC string, so hashes created under older parameters
//! still verify after the configured cost is raised.
//!
//! Hashing is deliberately expensive. Async callers should run it through
//! [`PasswordHasher::hash_blocking`] / [`PasswordHasher::verify_blocking`],
//! which move the work onto tokio's blocking pool.

use argon2::password_hash::{self, PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier as _, Version};
use rand::rngs::OsRng;
use thiserror::Error;

/// Password hashing failures
#[derive(Debug, Error)]
pub enum PasswordError {
    /// The hash could not be produced (resource exhaustion, bad parameters)
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// The stored hash is not a well-formed PHC string for a supported algorithm
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),

    /// The blocking worker running the hash was cancelled or panicked
    #[error("password hashing task failed: {0}")]
    Task(String),
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory size in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Stateless Argon2id hasher.
///
/// Cheap to clone; each call builds its own `Argon2` context.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Create a hasher with the given cost.
    pub fn new(cost: HashCost) -> Result<Self, PasswordError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| PasswordError::Hashing(format!("invalid argon2 parameters: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password into a PHC string.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// Verify a plaintext password against a stored PHC string.
    ///
    /// Returns `Ok(false)` on mismatch. Errors only when `hashed` cannot be
    /// parsed or names parameters argon2 cannot use.
    pub fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, PasswordError> {
        let parsed =
            PasswordHash::new(hashed).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

        match self.argon2().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::MalformedHash(e.to_string())),
        }
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| PasswordError::Task(e.to_string()))?
    }

    /// [`verify`](Self::verify) on the blocking thread pool.
    pub async fn verify_blocking(
        &self,
        plaintext: String,
        hashed: String,
    ) -> Result<bool, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hashed))
            .await
            .map_err(|e| PasswordError::Task(e.to_string()))?
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(HashCost {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("valid test parameters")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hasher = test_hasher();
        let hash = hasher.hash("secret123").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("secret123", &hash).unwrap());
    }

    #[test]
    fn test_wrong_password_is_false_not_error() {
        let hasher = test_hasher();
        let hash = hasher.hash("secret123").unwrap();

        assert!(!hasher.verify("secret124", &hash).unwrap());
        assert!(!hasher.verify("", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = test_hasher();
        let a = hasher.hash("same password").unwrap();
        let b = hasher.hash("same password").unwrap();

        assert_ne!(a, b);
        assert!(hasher.verify("same password", &a).unwrap());
        assert!(hasher.verify("same password", &b).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let hasher = test_hasher();
        assert!(matches!(
            hasher.verify("secret123", "not-a-phc-string"),
            Err(PasswordError::MalformedHash(_))
        ));
        assert!(matches!(
            hasher.verify("secret123", ""),
            Err(PasswordError::MalformedHash(_))
        ));
    }

    #[test]
    fn test_hash_from_other_cost_still_verifies() {
        let cheap = test_hasher();
        let hash = cheap.hash("secret123").unwrap();

        let other = PasswordHasher::new(HashCost {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        assert!(other.verify("secret123", &hash).unwrap());
    }

    #[test]
    fn test_invalid_cost_rejected() {
        let result = PasswordHasher::new(HashCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 0,
        });
        assert!(matches!(result, Err(PasswordError::Hashing(_))));
    }

    #[test]
    fn test_never_fails_on_input_shape() {
        let hasher = test_hasher();
        let long = "x".repeat(4096);
        for input in ["", " ", "🔐 unicode ✓", long.as_str()] {
            let hash = hasher.hash(input).unwrap();
            assert!(hasher.verify(input, &hash).unwrap());
        }
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let hasher = test_hasher();
        let hash = hasher.hash_blocking("secret123".to_string()).await.unwrap();
        assert!(hasher
            .verify_blocking("secret123".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!hasher
            .verify_blocking("nope".to_string(), hash)
            .await
            .unwrap());
    }
}
