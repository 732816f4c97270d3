//! Session Manager - Stateless Encrypted Session Handling
//!
//! The `SessionManager` seals [`SessionPayload`]s with AES-256-GCM and stores
//! the sealed string in the `jwt` field of the signed cookie session. Nothing
//! is kept server side.

use crate::models::SessionPayload;
use crate::session::cookie::{CookieSession, CookieSessionStore, SESSION_JWT_FIELD};
use crate::settings::CookieSettings;
use crate::utils::crypto::{decrypt_data, derive_encryption_key, derive_signing_key, encrypt_data};
use actix_web::{cookie::Cookie, HttpRequest};
use anyhow::Result;

#[derive(Clone)]
pub struct SessionManager {
    encryption_key: [u8; 32],
    store: CookieSessionStore,
}

impl SessionManager {
    /// Create a session manager from the cookie password and cookie attributes.
    ///
    /// Encryption and signing keys are both derived from `password`.
    #[must_use]
    pub fn new(
        password: &[u8],
        cookie_name: &str,
        cookie_secure: bool,
        domain: Option<String>,
        max_age_seconds: u64,
    ) -> Self {
        Self {
            encryption_key: derive_encryption_key(password),
            store: CookieSessionStore::new(
                cookie_name,
                derive_signing_key(password),
                cookie_secure,
                domain,
                max_age_seconds,
            ),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &CookieSettings) -> Self {
        Self::new(
            settings.password.as_bytes(),
            &settings.name,
            settings.secure,
            settings.domain.clone(),
            settings.max_age_seconds,
        )
    }

    /// Cookie session store backing this manager
    #[must_use]
    pub fn store(&self) -> &CookieSessionStore {
        &self.store
    }

    /// Encrypt a session payload into an opaque sealed string
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or encryption fails
    pub fn seal(&self, payload: &SessionPayload) -> Result<String> {
        encrypt_data(payload, &self.encryption_key)
    }

    /// Decrypt a sealed string produced by [`Self::seal`]
    ///
    /// # Errors
    ///
    /// Returns an error if the value was sealed with another key, was tampered
    /// with, or does not contain a session payload
    pub fn unseal(&self, sealed: &str) -> Result<SessionPayload> {
        decrypt_data(sealed, &self.encryption_key)
    }

    /// Store an already sealed payload in the request's cookie session and
    /// return the cookie to send back. Other fields already present in the
    /// session are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if committing the cookie fails
    pub fn commit_sealed(&self, req: &HttpRequest, sealed: String) -> Result<Cookie<'static>> {
        let mut session = self.store.get_session(req);
        session.set(SESSION_JWT_FIELD, sealed);
        self.store.commit_session(&session)
    }

    /// Read the current session payload from the request cookie.
    ///
    /// Returns `None` when there is no cookie, no `jwt` field, or the sealed
    /// value cannot be opened with the configured password.
    #[must_use]
    pub fn read_session(&self, req: &HttpRequest) -> Option<SessionPayload> {
        let session = self.store.get_session(req);
        self.payload_from(&session)
    }

    fn payload_from(&self, session: &CookieSession) -> Option<SessionPayload> {
        let sealed = session.get(SESSION_JWT_FIELD)?;
        match self.unseal(sealed) {
            Ok(payload) => Some(payload),
            Err(e) => {
                log::warn!("Failed to unseal session from cookie: {e}");
                None
            }
        }
    }

    /// Expired cookie that clears the session in the browser
    #[must_use]
    pub fn destroy_session(&self) -> Cookie<'static> {
        self.store.destroy_session()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{constants::TEST_COOKIE_PASSWORD, fixtures::TestFixtures};
    use crate::utils::crypto::sign_value;
    use actix_web::test as actix_test;
    use base64::{engine::general_purpose, Engine as _};

    #[test]
    fn test_seal_and_unseal_payload() {
        let manager = TestFixtures::session_manager();
        let payload = TestFixtures::session_payload();

        let sealed = manager.seal(&payload).unwrap();
        assert!(!sealed.contains(&payload.access_token));
        assert_eq!(manager.unseal(&sealed).unwrap(), payload);
    }

    #[test]
    fn test_unseal_with_other_password_fails() {
        let payload = TestFixtures::session_payload();
        let sealed = TestFixtures::session_manager().seal(&payload).unwrap();

        let other = SessionManager::new(
            b"a-completely-different-cookie-password!!",
            "wos-session",
            true,
            None,
            3600,
        );
        assert!(other.unseal(&sealed).is_err());
    }

    #[test]
    fn test_commit_sealed_and_read_back() {
        let manager = TestFixtures::session_manager();
        let payload = TestFixtures::session_payload();

        let req = actix_test::TestRequest::default().to_http_request();
        let sealed = manager.seal(&payload).unwrap();
        let cookie = manager.commit_sealed(&req, sealed).unwrap();

        let req = actix_test::TestRequest::default().cookie(cookie).to_http_request();
        assert_eq!(manager.read_session(&req), Some(payload));
    }

    #[test]
    fn test_commit_sealed_preserves_other_fields() {
        let manager = TestFixtures::session_manager();
        let mut existing = CookieSession::new();
        existing.set("theme", "dark".to_string());
        existing.set(SESSION_JWT_FIELD, "stale".to_string());
        let existing_cookie = manager.store().commit_session(&existing).unwrap();

        let req = actix_test::TestRequest::default()
            .cookie(existing_cookie)
            .to_http_request();
        let sealed = manager.seal(&TestFixtures::session_payload()).unwrap();
        let cookie = manager.commit_sealed(&req, sealed).unwrap();

        let session = manager.store().parse_session(cookie.value()).unwrap();
        assert_eq!(session.get("theme"), Some("dark"));
        assert_ne!(session.get(SESSION_JWT_FIELD), Some("stale"));
    }

    #[test]
    fn test_read_session_without_cookie() {
        let req = actix_test::TestRequest::default().to_http_request();
        assert!(TestFixtures::session_manager().read_session(&req).is_none());
    }

    #[test]
    fn test_read_session_with_garbage_jwt_field() {
        let manager =
            SessionManager::new(TEST_COOKIE_PASSWORD.as_bytes(), "wos-session", true, None, 60);
        let encoded = general_purpose::URL_SAFE_NO_PAD.encode(r#"{"jwt":"not-sealed"}"#);
        let signing_key = derive_signing_key(TEST_COOKIE_PASSWORD.as_bytes());
        let signed = sign_value(&encoded, &signing_key).unwrap();

        let req = actix_test::TestRequest::default()
            .cookie(Cookie::new("wos-session", signed))
            .to_http_request();
        assert!(manager.read_session(&req).is_none());
    }
}
