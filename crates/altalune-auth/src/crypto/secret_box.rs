//! Provider Secret Encryption
//!
//! AES-256-GCM encryption for upstream provider client secrets at rest.
//! The ciphertext is stored base64-encoded with the 12-byte nonce prefixed,
//! so each encryption of the same plaintext produces a distinct value.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;

use crate::shared::error::{AuthError, Result};

/// Symmetric encryption for secrets that must be revealed as plaintext.
pub struct SecretBox {
    cipher: Aes256Gcm,
}

impl SecretBox {
    /// Build from a base64-encoded 32-byte key.
    pub fn new(encryption_key: &str) -> Result<Self> {
        let key_bytes = BASE64
            .decode(encryption_key)
            .map_err(|e| AuthError::Configuration {
                message: format!("Invalid base64 encryption key: {}", e),
            })?;

        if key_bytes.len() != 32 {
            return Err(AuthError::Configuration {
                message: format!("Encryption key must be 32 bytes, got {}", key_bytes.len()),
            });
        }

        let cipher =
            Aes256Gcm::new_from_slice(&key_bytes).map_err(|e| AuthError::Configuration {
                message: format!("Failed to initialize cipher: {}", e),
            })?;

        Ok(Self { cipher })
    }

    /// Encrypt a plaintext secret. Returns base64(nonce || ciphertext).
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| AuthError::Internal {
                message: format!("Encryption failed: {}", e),
            })?;

        let mut output = nonce_bytes.to_vec();
        output.extend(ciphertext);
        Ok(BASE64.encode(output))
    }

    /// Decrypt a value produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let data = BASE64.decode(encoded).map_err(|e| AuthError::Internal {
            message: format!("Invalid encrypted value: {}", e),
        })?;

        if data.len() < 12 {
            return Err(AuthError::Internal {
                message: "Encrypted value too short".to_string(),
            });
        }

        let (nonce_bytes, ciphertext) = data.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext =
            self.cipher
                .decrypt(nonce, ciphertext)
                .map_err(|e| AuthError::Internal {
                    message: format!("Decryption failed: {}", e),
                })?;

        String::from_utf8(plaintext).map_err(|e| AuthError::Internal {
            message: format!("Decrypted value is not UTF-8: {}", e),
        })
    }
}

/// Generate a new base64-encoded encryption key.
pub fn generate_key() -> String {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    BASE64.encode(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let secret_box = SecretBox::new(&generate_key()).unwrap();
        let encrypted = secret_box.encrypt("upstream-client-secret").unwrap();
        assert_ne!(encrypted, "upstream-client-secret");
        assert_eq!(secret_box.decrypt(&encrypted).unwrap(), "upstream-client-secret");
    }

    #[test]
    fn test_nonce_uniqueness() {
        let secret_box = SecretBox::new(&generate_key()).unwrap();
        let a = secret_box.encrypt("same").unwrap();
        let b = secret_box.encrypt("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let box_a = SecretBox::new(&generate_key()).unwrap();
        let box_b = SecretBox::new(&generate_key()).unwrap();
        let encrypted = box_a.encrypt("secret").unwrap();
        assert!(box_b.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(SecretBox::new("short").is_err());
        assert!(SecretBox::new(&BASE64.encode([0u8; 16])).is_err());
    }
}
