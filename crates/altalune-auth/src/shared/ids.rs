//! Public Identifier Generation
//!
//! Entities are exposed through prefixed public ids ("usr_...", "oac_...")
//! while OAuth-visible credentials (client_id, codes, refresh tokens) are
//! bare UUIDs.

use uuid::Uuid;

/// Generate a prefixed public id, e.g. `public_id("usr")` -> "usr_1f0c...".
pub fn public_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Generate a bare UUID string (OAuth client_id, codes, refresh tokens).
pub fn uuid_string() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_id_prefix() {
        let id = public_id("usr");
        assert!(id.starts_with("usr_"));
        assert_eq!(id.len(), 4 + 32);
    }

    #[test]
    fn test_uuid_string_parses() {
        let id = uuid_string();
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
