//! HTTP response helpers
//!
//! Error bodies that never vary are serialized once and reused.

use actix_web::{cookie::Cookie, http::header, HttpResponse};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::json;

/// Shown to users when any step of the sign-in callback fails
pub const SIGN_IN_FAILED_MESSAGE: &str = "Something went wrong";
pub const SIGN_IN_FAILED_DESCRIPTION: &str =
    "Couldn\u{2019}t sign in. If you are not sure what happened, please contact your organization admin.";

static CACHED_RESPONSES: Lazy<CachedResponses> = Lazy::new(CachedResponses::new);

/// Pre-serialized response bodies
struct CachedResponses {
    sign_in_failed: String,
    unauthorized: String,
}

impl CachedResponses {
    fn new() -> Self {
        Self {
            sign_in_failed: json!({
                "error": {
                    "message": SIGN_IN_FAILED_MESSAGE,
                    "description": SIGN_IN_FAILED_DESCRIPTION,
                }
            })
            .to_string(),
            unauthorized: json!({
                "error": "unauthorized",
                "error_description": "Authentication is required to access this resource"
            })
            .to_string(),
        }
    }
}

/// Unified response builder
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Generic 500 returned for every callback failure. Carries no detail about
    /// the cause and never sets cookies.
    #[must_use]
    pub fn sign_in_failed() -> HttpResponse {
        HttpResponse::InternalServerError()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .body(CACHED_RESPONSES.sign_in_failed.clone())
    }

    #[must_use]
    pub fn unauthorized() -> HttpResponse {
        HttpResponse::Unauthorized()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .body(CACHED_RESPONSES.unauthorized.clone())
    }

    /// 302 Found to `location`, carrying the given cookies
    #[must_use]
    pub fn redirect_with_cookies(location: &str, cookies: Vec<Cookie<'static>>) -> HttpResponse {
        let mut builder = HttpResponse::Found();

        for cookie in cookies {
            builder.cookie(cookie);
        }

        builder
            .insert_header((header::LOCATION, location.to_string()))
            .finish()
    }

    /// 200 OK with a JSON body
    #[must_use]
    pub fn ok_json<T: Serialize>(data: &T) -> HttpResponse {
        HttpResponse::Ok().json(data)
    }
}
