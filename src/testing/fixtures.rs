//! Test fixtures providing pre-built test objects

use crate::handlers::callback::{CallbackHandler, HandleAuthOptions};
use crate::identity::IdentityService;
use crate::models::{AuthenticationResponse, Impersonator, OAuthTokens, SessionPayload, User};
use crate::session::SessionManager;
use crate::settings::AppSettings;
use crate::utils::redirect_validator::{RedirectPolicy, UntrustedRedirect};
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

use super::constants::{
    TEST_ACCESS_TOKEN, TEST_API_KEY, TEST_BASE_URL, TEST_CLIENT_ID, TEST_COOKIE_PASSWORD,
    TEST_EMAIL, TEST_REFRESH_TOKEN, TEST_USER_ID,
};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    #[must_use]
    pub fn user() -> User {
        User {
            object: "user".to_string(),
            id: TEST_USER_ID.to_string(),
            email: TEST_EMAIL.to_string(),
            email_verified: true,
            first_name: Some("Test".to_string()),
            last_name: Some("User".to_string()),
            profile_picture_url: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single(),
        }
    }

    /// Code exchange result without impersonation or upstream tokens
    #[must_use]
    pub fn authentication_response() -> AuthenticationResponse {
        AuthenticationResponse {
            access_token: TEST_ACCESS_TOKEN.to_string(),
            refresh_token: TEST_REFRESH_TOKEN.to_string(),
            user: Self::user(),
            impersonator: None,
            oauth_tokens: None,
        }
    }

    /// Code exchange result for an admin signed in as the test user
    #[must_use]
    pub fn impersonated_authentication_response() -> AuthenticationResponse {
        AuthenticationResponse {
            impersonator: Some(Impersonator {
                email: "admin@example.com".to_string(),
                reason: Some("Investigating a support ticket".to_string()),
            }),
            oauth_tokens: Some(OAuthTokens {
                access_token: "upstream_access_token".to_string(),
                refresh_token: None,
                expires_at: Some(1_700_000_000),
                scopes: vec!["openid".to_string()],
            }),
            ..Self::authentication_response()
        }
    }

    #[must_use]
    pub fn session_payload() -> SessionPayload {
        SessionPayload {
            access_token: TEST_ACCESS_TOKEN.to_string(),
            refresh_token: TEST_REFRESH_TOKEN.to_string(),
            user: Self::user(),
            impersonator: None,
            headers: HashMap::new(),
        }
    }

    /// Session manager using the test cookie password and default cookie name
    #[must_use]
    pub fn session_manager() -> SessionManager {
        SessionManager::from_settings(&Self::settings().cookies)
    }

    /// Valid settings for the test origin
    #[must_use]
    pub fn settings() -> AppSettings {
        let mut settings = AppSettings::default();
        settings.application.base_url = TEST_BASE_URL.to_string();
        settings.workos.client_id = TEST_CLIENT_ID.to_string();
        settings.workos.api_key = TEST_API_KEY.to_string();
        settings.workos.redirect_uri = format!("{TEST_BASE_URL}/auth/callback");
        settings.cookies.password = TEST_COOKIE_PASSWORD.to_string();
        settings
    }

    #[must_use]
    pub fn base_url() -> Url {
        Url::parse(TEST_BASE_URL).unwrap_or_else(|e| panic!("invalid test base URL: {e}"))
    }

    #[must_use]
    pub fn redirect_policy(untrusted: UntrustedRedirect) -> RedirectPolicy {
        RedirectPolicy::new(&["https://partner.example.org".to_string()], untrusted)
    }

    /// Callback handler on the test origin that rejects untrusted redirects
    #[must_use]
    pub fn callback_handler(
        identity: Arc<dyn IdentityService>,
        options: HandleAuthOptions,
    ) -> CallbackHandler {
        Self::callback_handler_with_policy(
            identity,
            options,
            Self::redirect_policy(UntrustedRedirect::Reject),
        )
    }

    #[must_use]
    pub fn callback_handler_with_policy(
        identity: Arc<dyn IdentityService>,
        options: HandleAuthOptions,
        policy: RedirectPolicy,
    ) -> CallbackHandler {
        CallbackHandler::new(
            identity,
            Self::session_manager(),
            TEST_CLIENT_ID,
            Self::base_url(),
            policy,
            options,
        )
    }
}
