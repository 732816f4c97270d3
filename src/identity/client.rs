use super::{IdentityError, IdentityService};
use crate::models::AuthenticationResponse;
use crate::settings::WorkOsSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

const AUTHENTICATE_PATH: &str = "/user_management/authenticate";
const AUTHORIZE_PATH: &str = "/user_management/authorize";

#[derive(Serialize)]
struct AuthenticateRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
    code: &'a str,
}

/// Error bodies come in two shapes depending on the endpoint
#[derive(Deserialize, Default)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

/// `WorkOS` User Management API client
#[derive(Clone)]
pub struct UserManagementClient {
    http_client: reqwest::Client,
    api_base_url: Url,
    api_key: String,
}

impl UserManagementClient {
    /// Create a client for the given API base URL
    ///
    /// # Errors
    ///
    /// Returns an error if `api_base_url` is not a valid URL
    pub fn new(api_base_url: &str, api_key: &str) -> Result<Self, IdentityError> {
        let api_base_url = Url::parse(api_base_url).map_err(|e| {
            IdentityError::Configuration(format!("invalid API base URL '{api_base_url}': {e}"))
        })?;

        Ok(Self {
            http_client: reqwest::Client::new(),
            api_base_url,
            api_key: api_key.to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the configured API base URL is invalid
    pub fn from_settings(settings: &WorkOsSettings) -> Result<Self, IdentityError> {
        Self::new(&settings.api_base_url, &settings.api_key)
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.api_base_url
            .join(path)
            .map_err(|e| IdentityError::Configuration(format!("invalid endpoint {path}: {e}")))
    }

    /// Hosted sign-in URL the browser is sent to before the callback
    ///
    /// # Errors
    ///
    /// Returns an error if the configured API base URL cannot be joined
    pub fn authorization_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        state: Option<&str>,
    ) -> Result<Url, IdentityError> {
        let mut url = self.endpoint(AUTHORIZE_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", client_id)
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("provider", "authkit");
            if let Some(state) = state {
                query.append_pair("state", state);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl IdentityService for UserManagementClient {
    async fn authenticate_with_code(
        &self,
        client_id: &str,
        code: &str,
    ) -> Result<AuthenticationResponse, IdentityError> {
        let url = self.endpoint(AUTHENTICATE_PATH)?;
        log::debug!("Exchanging authorization code at {url}");

        let response = self
            .http_client
            .post(url)
            .json(&AuthenticateRequest {
                client_id,
                client_secret: &self.api_key,
                grant_type: "authorization_code",
                code,
            })
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
                code: body
                    .error
                    .or(body.code)
                    .unwrap_or_else(|| "unknown_error".to_string()),
                message: body
                    .error_description
                    .or(body.message)
                    .unwrap_or_else(|| status.to_string()),
            });
        }

        let auth: AuthenticationResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;

        log::debug!("Authorization code exchanged for user {}", auth.user.id);
        Ok(auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::TestFixtures;
    use actix_web::{web, App, HttpResponse, HttpServer};
    use serde_json::{json, Value};

    /// Serve a single authenticate endpoint on an ephemeral port
    fn spawn_identity_server(status: u16, body: Value) -> String {
        let server = HttpServer::new(move || {
            let body = body.clone();
            App::new().route(
                AUTHENTICATE_PATH,
                web::post().to(move |request: web::Json<Value>| {
                    let body = body.clone();
                    async move {
                        if request["grant_type"] != "authorization_code"
                            || request["client_secret"] != "sk_test"
                        {
                            return HttpResponse::BadRequest().json(json!({
                                "error": "invalid_request",
                                "error_description": "bad request body"
                            }));
                        }
                        HttpResponse::build(
                            actix_web::http::StatusCode::from_u16(status).unwrap(),
                        )
                        .json(body)
                    }
                }),
            )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();

        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{addr}")
    }

    #[actix_web::test]
    async fn test_authenticate_with_code_success() {
        let auth = TestFixtures::authentication_response();
        let base = spawn_identity_server(200, serde_json::to_value(&auth).unwrap());
        let client = UserManagementClient::new(&base, "sk_test").unwrap();

        let result = client
            .authenticate_with_code("client_123", "code_abc")
            .await
            .unwrap();
        assert_eq!(result, auth);
    }

    #[actix_web::test]
    async fn test_authenticate_with_code_rejected() {
        let base = spawn_identity_server(
            400,
            json!({"error": "invalid_grant", "error_description": "The code has expired."}),
        );
        let client = UserManagementClient::new(&base, "sk_test").unwrap();

        match client.authenticate_with_code("client_123", "stale").await {
            Err(IdentityError::Rejected {
                status,
                code,
                message,
            }) => {
                assert_eq!(status, 400);
                assert_eq!(code, "invalid_grant");
                assert_eq!(message, "The code has expired.");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[actix_web::test]
    async fn test_authenticate_with_code_invalid_body() {
        let base = spawn_identity_server(200, json!({"unexpected": true}));
        let client = UserManagementClient::new(&base, "sk_test").unwrap();

        assert!(matches!(
            client.authenticate_with_code("client_123", "code").await,
            Err(IdentityError::InvalidResponse(_))
        ));
    }

    #[actix_web::test]
    async fn test_authenticate_with_code_unreachable() {
        let client = UserManagementClient::new("http://127.0.0.1:9", "sk_test").unwrap();

        assert!(matches!(
            client.authenticate_with_code("client_123", "code").await,
            Err(IdentityError::Network(_))
        ));
    }

    #[test]
    fn test_authorization_url() {
        let client = UserManagementClient::new("https://api.workos.com", "sk_test").unwrap();
        let url = client
            .authorization_url(
                "client_123",
                "http://localhost:8080/auth/callback",
                Some("eyJyZXR1cm5QYXRobmFtZSI6Ii8ifQ=="),
            )
            .unwrap();

        assert_eq!(url.path(), "/user_management/authorize");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".to_string(), "client_123".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://localhost:8080/auth/callback".to_string()
        )));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("provider".to_string(), "authkit".to_string())));
        assert!(pairs.contains(&(
            "state".to_string(),
            "eyJyZXR1cm5QYXRobmFtZSI6Ii8ifQ==".to_string()
        )));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            UserManagementClient::new("not a url", "sk_test"),
            Err(IdentityError::Configuration(_))
        ));
    }
}
