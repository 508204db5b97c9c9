//! Secret Hashing Service
//!
//! Argon2id hashing for OAuth client secrets and other long-lived
//! credentials. Output uses the self-describing PHC string format
//! (`$argon2id$v=19$m=65536,t=2,p=4$<salt>$<hash>`) so verification
//! re-derives with the parameters embedded in the stored hash.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::warn;

use crate::shared::error::{AuthError, Result};

/// Secrets shorter than this are rejected outright.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Argon2 version this service produces and accepts.
const SUPPORTED_VERSION: u32 = 19;

/// Argon2id parameter set
#[derive(Debug, Clone)]
pub struct Argon2Config {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Time cost (iterations)
    pub time_cost: u32,
    /// Parallelism
    pub parallelism: u32,
    /// Output hash length in bytes
    pub output_len: usize,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 2,
            parallelism: 4,
            output_len: 32,
        }
    }
}

impl Argon2Config {
    /// Low memory config for tests
    pub fn testing() -> Self {
        Self {
            memory_cost: 4096, // 4 MiB
            time_cost: 1,
            parallelism: 1,
            output_len: 32,
        }
    }

    fn to_params(&self) -> Params {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(self.output_len),
        )
        .expect("Invalid Argon2 params")
    }
}

/// Secret hashing service
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new(config: Argon2Config) -> Self {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, config.to_params());
        Self { argon2 }
    }

    /// Hash a secret using Argon2id.
    ///
    /// Rejects input shorter than [`MIN_SECRET_LENGTH`]; generated client
    /// secrets and bootstrap secrets must meet it.
    pub fn hash(&self, secret: &str) -> Result<String> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(AuthError::validation(format!(
                "Secret must be at least {} characters",
                MIN_SECRET_LENGTH
            )));
        }

        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal {
                message: format!("Failed to hash secret: {}", e),
            })?;

        Ok(hash.to_string())
    }

    /// Verify a secret against a stored PHC-encoded hash.
    ///
    /// The comparison re-derives with the parameters and salt embedded in
    /// the stored string and compares in constant time.
    pub fn verify(&self, secret: &str, encoded: &str) -> Result<bool> {
        let parsed = PasswordHash::new(encoded).map_err(|e| AuthError::InvalidHashedString {
            message: format!("{}", e),
        })?;

        if let Some(version) = parsed.version {
            if version != SUPPORTED_VERSION {
                return Err(AuthError::IncompatibleVersion {
                    version: version.to_string(),
                });
            }
        }

        match self.argon2.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                warn!("Secret verification failed: mismatch");
                Ok(false)
            }
            Err(e) => Err(AuthError::InvalidHashedString {
                message: format!("{}", e),
            }),
        }
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new(Argon2Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> PasswordService {
        PasswordService::new(Argon2Config::testing())
    }

    const SECRET: &str = "correct-horse-battery-staple-plus-extra";

    #[test]
    fn test_hash_and_verify() {
        let service = service();
        let hash = service.hash(SECRET).unwrap();

        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(service.verify(SECRET, &hash).unwrap());
        assert!(!service
            .verify("wrong-horse-battery-staple-plus-extra!!", &hash)
            .unwrap());
    }

    #[test]
    fn test_hash_embeds_parameters() {
        let service = PasswordService::new(Argon2Config {
            memory_cost: 4096,
            time_cost: 1,
            parallelism: 1,
            output_len: 32,
        });
        let hash = service.hash(SECRET).unwrap();
        assert!(hash.contains("m=4096,t=1,p=1"));

        // A service configured with different parameters still verifies,
        // because the parameters come from the stored hash.
        let other = PasswordService::default();
        assert!(other.verify(SECRET, &hash).unwrap());
    }

    #[test]
    fn test_hash_uniqueness() {
        let service = service();
        let hash1 = service.hash(SECRET).unwrap();
        let hash2 = service.hash(SECRET).unwrap();

        // Random salt means same input produces different encodings
        assert_ne!(hash1, hash2);
        assert!(service.verify(SECRET, &hash1).unwrap());
        assert!(service.verify(SECRET, &hash2).unwrap());
    }

    #[test]
    fn test_rejects_short_secret() {
        let service = service();
        assert!(service.hash("short").is_err());
    }

    #[test]
    fn test_malformed_hash() {
        let service = service();
        let err = service.verify(SECRET, "not-a-phc-string").unwrap_err();
        assert!(matches!(err, AuthError::InvalidHashedString { .. }));
    }
}
