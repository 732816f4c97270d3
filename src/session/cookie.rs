use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    HttpRequest,
};
use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use std::collections::BTreeMap;

use crate::utils::crypto::{sign_value, verify_signed_value};

/// Default name of the session cookie
pub const DEFAULT_COOKIE_NAME: &str = "wos-session";

/// Field of the cookie session holding the sealed session payload
pub const SESSION_JWT_FIELD: &str = "jwt";

/// 400 days, the longest lifetime browsers honour
pub const DEFAULT_COOKIE_MAX_AGE_SECONDS: u64 = 34_560_000;

/// Options for cookie creation
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: String,
    pub domain: Option<String>,
    pub max_age: Duration,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            domain: None,
            max_age: Duration::seconds(
                i64::try_from(DEFAULT_COOKIE_MAX_AGE_SECONDS).unwrap_or(i64::MAX),
            ),
        }
    }
}

/// Key/value session carried entirely inside a signed cookie
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieSession {
    data: BTreeMap<String, String>,
    is_new: bool,
}

impl CookieSession {
    /// Create an empty session that was not loaded from a cookie
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            is_new: true,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Set a field, replacing any previous value
    pub fn set(&mut self, key: &str, value: String) {
        self.data.insert(key.to_string(), value);
    }

    pub fn unset(&mut self, key: &str) {
        self.data.remove(key);
    }

    /// Whether this session was freshly created rather than read from a request
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Reads and writes [`CookieSession`]s as HMAC-signed cookies.
///
/// The cookie value is `base64url(json(fields)).signature`. Signing only
/// protects integrity; confidentiality of the session payload comes from the
/// sealing done by the session manager before the value is stored here.
#[derive(Clone)]
pub struct CookieSessionStore {
    name: String,
    signing_key: [u8; 32],
    cookie_secure: bool,
    domain: Option<String>,
    max_age_seconds: u64,
}

impl CookieSessionStore {
    #[must_use]
    pub fn new(
        name: &str,
        signing_key: [u8; 32],
        cookie_secure: bool,
        domain: Option<String>,
        max_age_seconds: u64,
    ) -> Self {
        Self {
            name: name.to_string(),
            signing_key,
            cookie_secure,
            domain,
            max_age_seconds,
        }
    }

    /// Load the session from the request cookie, or create a fresh one when the
    /// cookie is missing or fails verification
    #[must_use]
    pub fn get_session(&self, req: &HttpRequest) -> CookieSession {
        req.cookie(&self.name)
            .and_then(|cookie| self.parse_session(cookie.value()))
            .unwrap_or_else(CookieSession::new)
    }

    /// Decode a signed cookie value produced by [`Self::commit_session`]
    #[must_use]
    pub fn parse_session(&self, value: &str) -> Option<CookieSession> {
        let Some(encoded) = verify_signed_value(value, &self.signing_key) else {
            log::warn!("Ignoring session cookie '{}' with invalid signature", self.name);
            return None;
        };

        let json = general_purpose::URL_SAFE_NO_PAD.decode(encoded).ok()?;
        match serde_json::from_slice::<BTreeMap<String, String>>(&json) {
            Ok(data) => Some(CookieSession {
                data,
                is_new: false,
            }),
            Err(e) => {
                log::warn!("Failed to decode session cookie '{}': {e}", self.name);
                None
            }
        }
    }

    /// Serialize the session into a `Set-Cookie`-ready cookie
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or signing fails
    pub fn commit_session(&self, session: &CookieSession) -> Result<Cookie<'static>> {
        let json = serde_json::to_vec(&session.data).context("Failed to serialize session")?;
        let encoded = general_purpose::URL_SAFE_NO_PAD.encode(json);
        let value = sign_value(&encoded, &self.signing_key).context("Failed to sign session")?;

        Ok(self.build_cookie(
            value,
            CookieOptions {
                max_age: Duration::seconds(i64::try_from(self.max_age_seconds).unwrap_or(i64::MAX)),
                domain: self.domain.clone(),
                ..Default::default()
            },
        ))
    }

    /// Create an expired cookie to clear the session
    #[must_use]
    pub fn destroy_session(&self) -> Cookie<'static> {
        create_expired_cookie(&self.name, self.cookie_secure, self.domain.as_deref())
    }

    fn build_cookie(&self, value: String, options: CookieOptions) -> Cookie<'static> {
        let mut builder = Cookie::build(self.name.clone(), value)
            .http_only(options.http_only)
            .secure(self.cookie_secure && options.secure)
            .same_site(options.same_site)
            .path(options.path)
            .max_age(options.max_age);

        if let Some(domain) = options.domain {
            builder = builder.domain(domain);
        }

        builder.finish()
    }
}

/// Create an expired cookie to clear a specific cookie
#[must_use]
pub fn create_expired_cookie(name: &str, secure: bool, domain: Option<&str>) -> Cookie<'static> {
    let mut builder = Cookie::build(name.to_owned(), "")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(-1));

    if let Some(domain) = domain {
        builder = builder.domain(domain.to_owned());
    }

    builder.finish()
}
