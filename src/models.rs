use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// User record returned by the identity service.
///
/// Stored in camelCase inside the session; the identity API answers in
/// `snake_case`, which the aliases accept.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default = "default_user_object")]
    pub object: String,
    pub id: String,
    pub email: String,
    #[serde(default, alias = "email_verified")]
    pub email_verified: bool,
    #[serde(default, alias = "first_name")]
    pub first_name: Option<String>,
    #[serde(default, alias = "last_name")]
    pub last_name: Option<String>,
    #[serde(default, alias = "profile_picture_url")]
    pub profile_picture_url: Option<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_user_object() -> String {
    "user".to_string()
}

/// Actor signing in on behalf of another user (support/admin impersonation)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Impersonator {
    pub email: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Upstream OAuth tokens of the provider the user signed in with
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OAuthTokens {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(default, alias = "refresh_token")]
    pub refresh_token: Option<String>,
    #[serde(default, alias = "expires_at")]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Token bundle produced by exchanging an authorization code
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(alias = "refresh_token")]
    pub refresh_token: String,
    pub user: User,
    #[serde(default)]
    pub impersonator: Option<Impersonator>,
    #[serde(default, alias = "oauth_tokens")]
    pub oauth_tokens: Option<OAuthTokens>,
}

/// Plaintext sealed into the session cookie.
///
/// `headers` is always written as an empty object so readers of the cookie
/// see the same shape regardless of which side produced it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impersonator: Option<Impersonator>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl From<&AuthenticationResponse> for SessionPayload {
    fn from(auth: &AuthenticationResponse) -> Self {
        Self {
            access_token: auth.access_token.clone(),
            refresh_token: auth.refresh_token.clone(),
            user: auth.user.clone(),
            impersonator: auth.impersonator.clone(),
            headers: HashMap::new(),
        }
    }
}

/// Argument handed to the post-login success hook.
///
/// Unlike [`SessionPayload`], absent `impersonator` and `oauthTokens` are
/// serialized as explicit `null`s.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SuccessPayload {
    pub access_token: String,
    pub impersonator: Option<Impersonator>,
    pub oauth_tokens: Option<OAuthTokens>,
    pub refresh_token: String,
    pub user: User,
}

impl From<AuthenticationResponse> for SuccessPayload {
    fn from(auth: AuthenticationResponse) -> Self {
        Self {
            access_token: auth.access_token,
            impersonator: auth.impersonator,
            oauth_tokens: auth.oauth_tokens,
            refresh_token: auth.refresh_token,
            user: auth.user,
        }
    }
}

/// Public view of the current session, without tokens
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SessionUserInfo {
    pub user: User,
    pub impersonator: Option<Impersonator>,
}

impl From<SessionPayload> for SessionUserInfo {
    fn from(session: SessionPayload) -> Self {
        Self {
            user: session.user,
            impersonator: session.impersonator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_authentication_response_accepts_snake_case() {
        let body = json!({
            "access_token": "at_123",
            "refresh_token": "rt_456",
            "user": {
                "object": "user",
                "id": "user_01",
                "email": "jane@example.com",
                "email_verified": true,
                "first_name": "Jane",
                "last_name": null,
                "profile_picture_url": null,
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-02T00:00:00Z"
            },
            "oauth_tokens": {
                "access_token": "gho_abc",
                "refresh_token": null,
                "expires_at": 1_700_000_000,
                "scopes": ["repo"]
            }
        });

        let auth: AuthenticationResponse = serde_json::from_value(body).unwrap();
        assert_eq!(auth.access_token, "at_123");
        assert_eq!(auth.user.first_name.as_deref(), Some("Jane"));
        assert!(auth.user.email_verified);
        assert!(auth.impersonator.is_none());
        assert_eq!(auth.oauth_tokens.unwrap().scopes, vec!["repo".to_string()]);
    }

    #[test]
    fn test_session_payload_shape() {
        let auth = AuthenticationResponse {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            user: User {
                object: "user".to_string(),
                id: "user_01".to_string(),
                email: "jane@example.com".to_string(),
                email_verified: false,
                first_name: None,
                last_name: None,
                profile_picture_url: None,
                created_at: None,
                updated_at: None,
            },
            impersonator: None,
            oauth_tokens: None,
        };

        let value = serde_json::to_value(SessionPayload::from(&auth)).unwrap();
        assert_eq!(value["accessToken"], "at");
        assert_eq!(value["refreshToken"], "rt");
        assert_eq!(value["headers"], json!({}));
        assert!(value.get("impersonator").is_none());
        assert!(value.get("oauthTokens").is_none());
    }

    #[test]
    fn test_success_payload_writes_nulls() {
        let payload = SuccessPayload {
            access_token: "at".to_string(),
            impersonator: None,
            oauth_tokens: None,
            refresh_token: "rt".to_string(),
            user: User {
                object: "user".to_string(),
                id: "user_01".to_string(),
                email: "jane@example.com".to_string(),
                email_verified: true,
                first_name: None,
                last_name: None,
                profile_picture_url: None,
                created_at: None,
                updated_at: None,
            },
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert!(value["impersonator"].is_null());
        assert!(value["oauthTokens"].is_null());
    }
}
