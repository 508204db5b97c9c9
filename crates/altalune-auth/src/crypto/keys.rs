//! RSA Key Material
//!
//! Loads the PKCS8 private key and PKIX public key used for RS256 token
//! signing, and extracts the public modulus/exponent for JWKS publication.
//! Missing or unparseable key material is fatal at startup.

use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::{
    pkcs8::DecodePublicKey,
    traits::PublicKeyParts,
    RsaPublicKey,
};
use std::path::Path;

use crate::shared::error::{AuthError, Result};

/// RSA public key components for JWKS
#[derive(Debug, Clone)]
pub struct RsaComponents {
    /// Modulus (n) - base64url encoded, no padding
    pub n: String,
    /// Exponent (e) - base64url encoded, no padding ("AQAB" for 65537)
    pub e: String,
}

/// Loaded RSA signing key pair plus its published key identifier
pub struct JwtKeys {
    pub encoding_key: EncodingKey,
    pub decoding_key: DecodingKey,
    pub kid: String,
    pub components: RsaComponents,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("encoding_key", &"<redacted>")
            .field("decoding_key", &"<redacted>")
            .field("kid", &self.kid)
            .field("components", &self.components)
            .finish()
    }
}

impl JwtKeys {
    /// Load keys from PEM files. 2048 and 4096 bit keys are supported.
    pub fn from_pem_files(
        private_key_path: impl AsRef<Path>,
        public_key_path: impl AsRef<Path>,
        kid: impl Into<String>,
    ) -> Result<Self> {
        let private_pem = std::fs::read_to_string(private_key_path.as_ref()).map_err(|e| {
            AuthError::Configuration {
                message: format!(
                    "Failed to read private key {}: {}",
                    private_key_path.as_ref().display(),
                    e
                ),
            }
        })?;
        let public_pem = std::fs::read_to_string(public_key_path.as_ref()).map_err(|e| {
            AuthError::Configuration {
                message: format!(
                    "Failed to read public key {}: {}",
                    public_key_path.as_ref().display(),
                    e
                ),
            }
        })?;

        Self::from_pem(&private_pem, &public_pem, kid)
    }

    /// Load keys from PEM strings
    pub fn from_pem(
        private_pem: &str,
        public_pem: &str,
        kid: impl Into<String>,
    ) -> Result<Self> {
        let encoding_key =
            EncodingKey::from_rsa_pem(private_pem.as_bytes()).map_err(|e| {
                AuthError::Configuration {
                    message: format!("Invalid RSA private key: {}", e),
                }
            })?;

        let decoding_key =
            DecodingKey::from_rsa_pem(public_pem.as_bytes()).map_err(|e| {
                AuthError::Configuration {
                    message: format!("Invalid RSA public key: {}", e),
                }
            })?;

        let components = extract_rsa_components(public_pem)?;

        Ok(Self {
            encoding_key,
            decoding_key,
            kid: kid.into(),
            components,
        })
    }

    /// Generate a fresh 2048-bit key pair as PEM strings.
    ///
    /// Used for bootstrap tooling and tests; production deployments load
    /// provisioned key files.
    pub fn generate_pem_pair() -> Result<(String, String)> {
        use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
        use rsa::RsaPrivateKey;

        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).map_err(|e| AuthError::Internal {
            message: format!("Failed to generate RSA key: {}", e),
        })?;
        let public_key = RsaPublicKey::from(&private_key);

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AuthError::Internal {
                message: format!("Failed to encode private key: {}", e),
            })?
            .to_string();

        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AuthError::Internal {
                message: format!("Failed to encode public key: {}", e),
            })?;

        Ok((private_pem, public_pem))
    }
}

/// Extract RSA public key components (n, e) for JWKS
fn extract_rsa_components(public_pem: &str) -> Result<RsaComponents> {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    let public_key =
        RsaPublicKey::from_public_key_pem(public_pem).map_err(|e| AuthError::Configuration {
            message: format!("Failed to parse RSA public key: {}", e),
        })?;

    let n_bytes = public_key.n().to_bytes_be();
    let e_bytes = public_key.e().to_bytes_be();

    Ok(RsaComponents {
        n: URL_SAFE_NO_PAD.encode(&n_bytes),
        e: URL_SAFE_NO_PAD.encode(&e_bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_generate_and_load() {
        let (private_pem, public_pem) = JwtKeys::generate_pem_pair().unwrap();
        let keys = JwtKeys::from_pem(&private_pem, &public_pem, "test-kid").unwrap();

        assert_eq!(keys.kid, "test-kid");
        // 65537 encodes as "AQAB"
        assert_eq!(keys.components.e, "AQAB");
        assert!(!keys.components.n.is_empty());
    }

    #[test]
    fn test_load_from_files() {
        let (private_pem, public_pem) = JwtKeys::generate_pem_pair().unwrap();

        let mut private_file = tempfile::NamedTempFile::new().unwrap();
        private_file.write_all(private_pem.as_bytes()).unwrap();
        let mut public_file = tempfile::NamedTempFile::new().unwrap();
        public_file.write_all(public_pem.as_bytes()).unwrap();

        let keys =
            JwtKeys::from_pem_files(private_file.path(), public_file.path(), "file-kid").unwrap();
        assert_eq!(keys.kid, "file-kid");
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = JwtKeys::from_pem_files("/nonexistent/private.pem", "/nonexistent/public.pem", "k")
            .unwrap_err();
        assert!(matches!(err, AuthError::Configuration { .. }));
    }

    #[test]
    fn test_garbage_pem_rejected() {
        let err = JwtKeys::from_pem("garbage", "garbage", "k").unwrap_err();
        assert!(matches!(err, AuthError::Configuration { .. }));
    }
}
