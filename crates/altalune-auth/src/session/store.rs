//! Signed Cookie Session Store
//!
//! Sessions are serialized [`SessionData`] values carried in a single
//! cookie, authenticated with HMAC-SHA256 under a server-side secret of at
//! least 32 bytes. Tampered or unparseable cookies yield a fresh empty
//! session rather than an error.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::session::data::SessionData;
use crate::shared::error::{AuthError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Session cookie codec and policy.
pub struct SessionStore {
    secret: Vec<u8>,
    cookie_name: String,
    secure: bool,
    max_age_secs: i64,
}

impl SessionStore {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        cookie_name: impl Into<String>,
        secure: bool,
        max_age_secs: i64,
    ) -> Result<Self> {
        let secret = secret.into();
        if secret.len() < 32 {
            return Err(AuthError::Configuration {
                message: "Session secret must be at least 32 bytes".to_string(),
            });
        }

        Ok(Self {
            secret,
            cookie_name: cookie_name.into(),
            secure,
            max_age_secs,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Serialize and sign session data into a cookie value.
    pub fn encode(&self, data: &SessionData) -> Result<String> {
        let payload = serde_json::to_vec(data)?;
        let encoded = URL_SAFE_NO_PAD.encode(&payload);
        let tag = self.sign(encoded.as_bytes());
        Ok(format!("{}.{}", encoded, tag))
    }

    /// Verify and deserialize a cookie value.
    ///
    /// Returns `None` for missing signatures, bad tags, or undecodable
    /// payloads; callers treat that as an empty session.
    pub fn decode(&self, value: &str) -> Option<SessionData> {
        let (payload, tag) = value.rsplit_once('.')?;

        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(payload.as_bytes());
        let tag_bytes = URL_SAFE_NO_PAD.decode(tag).ok()?;
        mac.verify_slice(&tag_bytes).ok()?;

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&json).ok()
    }

    /// Load the session from the request's cookie jar.
    pub fn load(&self, jar: &CookieJar) -> SessionData {
        jar.get(&self.cookie_name)
            .and_then(|cookie| self.decode(cookie.value()))
            .unwrap_or_default()
    }

    /// Build the session cookie for a response.
    pub fn to_cookie(&self, data: &SessionData) -> Result<Cookie<'static>> {
        let value = self.encode(data)?;
        Ok(Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.max_age_secs))
            .build())
    }

    /// Save the session into the jar, returning the updated jar.
    pub fn save(&self, jar: CookieJar, data: &SessionData) -> Result<CookieJar> {
        Ok(jar.add(self.to_cookie(data)?))
    }

    /// Build an expired cookie that clears the session.
    pub fn clear_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(0))
            .build()
    }

    fn sign(&self, payload: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload);
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn store() -> SessionStore {
        SessionStore::new(SECRET, "altalune_auth", false, 86400).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let store = store();
        let mut data = SessionData::default();
        data.authenticate("usr_1");
        data.original_url = Some("/oauth/authorize?client_id=abc".to_string());

        let encoded = store.encode(&data).unwrap();
        let decoded = store.decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let store = store();
        let mut data = SessionData::default();
        data.authenticate("usr_1");

        let encoded = store.encode(&data).unwrap();
        let (payload, tag) = encoded.rsplit_once('.').unwrap();

        // Forge a payload claiming a different user, keep the old tag
        let mut forged: SessionData = data.clone();
        forged.user_id = Some("usr_2".to_string());
        let forged_payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        assert_ne!(forged_payload, payload);

        assert!(store.decode(&format!("{}.{}", forged_payload, tag)).is_none());
    }

    #[test]
    fn test_garbage_yields_none() {
        let store = store();
        assert!(store.decode("garbage").is_none());
        assert!(store.decode("a.b").is_none());
        assert!(store.decode("").is_none());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let store_a = store();
        let store_b =
            SessionStore::new(b"ffffffffffffffffffffffffffffffff".to_vec(), "altalune_auth", false, 86400)
                .unwrap();

        let encoded = store_a.encode(&SessionData::default()).unwrap();
        assert!(store_b.decode(&encoded).is_none());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(SessionStore::new(b"short".to_vec(), "altalune_auth", false, 86400).is_err());
    }

    #[test]
    fn test_cookie_flags() {
        let store = SessionStore::new(SECRET, "altalune_auth", true, 3600).unwrap();
        let cookie = store.to_cookie(&SessionData::default()).unwrap();

        assert_eq!(cookie.name(), "altalune_auth");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));
    }
}
