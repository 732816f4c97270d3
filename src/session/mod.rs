//! Session Management Module
//!
//! Stateless sessions: the sealed session payload lives in a signed cookie.
//!
//! - [`cookie`] - Signed cookie session store and cookie attributes
//! - [`manager`] - Sealing and reading session payloads

pub mod cookie;
pub mod manager;

pub use cookie::{
    CookieOptions, CookieSession, CookieSessionStore, DEFAULT_COOKIE_MAX_AGE_SECONDS,
    DEFAULT_COOKIE_NAME, SESSION_JWT_FIELD,
};
pub use manager::SessionManager;
