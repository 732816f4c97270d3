//! HTTP request builders for testing handlers

use actix_web::cookie::Cookie;
use actix_web::http::Method;
use actix_web::{test, HttpRequest};

/// Builder for creating HTTP requests for testing
pub struct RequestBuilder {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    cookies: Vec<Cookie<'static>>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            cookies: Vec::new(),
        }
    }

    /// Start a `GET /auth/callback` request
    #[must_use]
    pub fn callback() -> Self {
        Self::new().path("/auth/callback")
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Append a query parameter; it is percent-encoded when the URI is built
    #[must_use]
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn code(self, code: &str) -> Self {
        self.query("code", code)
    }

    #[must_use]
    pub fn state(self, state: &str) -> Self {
        self.query("state", state)
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Path plus encoded query string
    #[must_use]
    pub fn uri(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query)
            .finish();
        format!("{}?{query}", self.path)
    }

    /// Build an unstarted `TestRequest`, for use with `test::call_service`
    #[must_use]
    pub fn to_test_request(self) -> test::TestRequest {
        let mut req = test::TestRequest::default()
            .method(self.method.clone())
            .uri(&self.uri());

        for (name, value) in self.headers {
            req = req.insert_header((name, value));
        }

        for cookie in self.cookies {
            req = req.cookie(cookie);
        }

        req
    }

    /// Build the final `HttpRequest`
    #[must_use]
    pub fn build(self) -> HttpRequest {
        self.to_test_request().to_http_request()
    }
}
