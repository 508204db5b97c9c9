//! Secure Random Material
//!
//! All codes, tokens, OTPs, state and CSRF tokens come from the OS CSPRNG.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of generated OAuth client secrets.
pub const CLIENT_SECRET_LENGTH: usize = 32;

/// Number of digits in a login OTP.
pub const OTP_LENGTH: usize = 6;

/// Generate a random alphanumeric string of the given length.
pub fn alphanumeric(len: usize) -> String {
    let mut rng = OsRng;
    (0..len)
        .map(|_| ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char)
        .collect()
}

/// Generate a new 32-character OAuth client secret.
pub fn client_secret() -> String {
    alphanumeric(CLIENT_SECRET_LENGTH)
}

/// Generate a 6-digit numeric OTP, zero-padded.
pub fn otp() -> String {
    let mut rng = OsRng;
    let value: u32 = rng.gen_range(0..1_000_000);
    format!("{:06}", value)
}

/// Generate 32 raw random bytes, base64url encoded without padding.
///
/// Used for OAuth state and CSRF tokens.
pub fn url_safe_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_secret_format() {
        let secret = client_secret();
        assert_eq!(secret.len(), CLIENT_SECRET_LENGTH);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_otp_format() {
        for _ in 0..50 {
            let code = otp();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_url_safe_token_decodes_to_32_bytes() {
        let token = url_safe_token();
        let decoded = URL_SAFE_NO_PAD.decode(&token).unwrap();
        assert_eq!(decoded.len(), 32);
    }

    #[test]
    fn test_uniqueness() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(url_safe_token()));
        }
    }
}
