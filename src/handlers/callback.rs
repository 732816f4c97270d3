//! Sign-in callback handler
//!
//! Completes the authorization-code flow: exchanges the code, seals the
//! resulting session into the session cookie and redirects the browser to
//! the return path carried in `state`.

use crate::handlers::errors::CallbackError;
use crate::identity::IdentityService;
use crate::models::{SessionPayload, SuccessPayload};
use crate::session::SessionManager;
use crate::utils::logging::LoggingHelper;
use crate::utils::oauth_state::decode_state;
use crate::utils::redirect_validator::{resolve_redirect_target, RedirectPolicy};
use crate::utils::responses::ResponseBuilder;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use url::Url;

/// What a failing success hook does to the sign-in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookFailurePolicy {
    /// Fail the callback with the generic error response
    #[default]
    Abort,
    /// Log the failure and redirect as if the hook had succeeded
    Ignore,
}

/// Caller-supplied action run after the session cookie has been prepared
/// and before the redirect is sent.
///
/// Any `Fn(SuccessPayload) -> impl Future<Output = anyhow::Result<()>>`
/// closure is a hook.
#[async_trait]
pub trait SuccessHook: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the post-login action failed
    async fn on_success(&self, payload: SuccessPayload) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> SuccessHook for F
where
    F: Fn(SuccessPayload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn on_success(&self, payload: SuccessPayload) -> anyhow::Result<()> {
        (self)(payload).await
    }
}

/// Per-handler behaviour of the callback
#[derive(Clone)]
pub struct HandleAuthOptions {
    /// Used when `state` carries no return path
    pub return_pathname: String,
    pub on_success: Option<Arc<dyn SuccessHook>>,
    pub hook_failure: HookFailurePolicy,
}

impl Default for HandleAuthOptions {
    fn default() -> Self {
        Self {
            return_pathname: "/".to_string(),
            on_success: None,
            hook_failure: HookFailurePolicy::Abort,
        }
    }
}

impl HandleAuthOptions {
    #[must_use]
    pub fn with_return_pathname(mut self, return_pathname: &str) -> Self {
        self.return_pathname = return_pathname.to_string();
        self
    }

    #[must_use]
    pub fn with_on_success<H: SuccessHook + 'static>(mut self, hook: H) -> Self {
        self.on_success = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_hook_failure(mut self, hook_failure: HookFailurePolicy) -> Self {
        self.hook_failure = hook_failure;
        self
    }
}

/// Query parameters of the callback request. Only the first occurrence of
/// each parameter is used.
#[derive(Debug, Default)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

impl CallbackParams {
    fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "code" if params.code.is_none() => params.code = Some(value.into_owned()),
                "state" if params.state.is_none() => params.state = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

#[derive(Clone)]
pub struct CallbackHandler {
    identity: Arc<dyn IdentityService>,
    sessions: SessionManager,
    client_id: String,
    base_url: Url,
    policy: RedirectPolicy,
    options: HandleAuthOptions,
}

impl CallbackHandler {
    /// `base_url` is the public origin of this service. Redirects are always
    /// resolved against it, never against request headers.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityService>,
        sessions: SessionManager,
        client_id: &str,
        base_url: Url,
        policy: RedirectPolicy,
        options: HandleAuthOptions,
    ) -> Self {
        Self {
            identity,
            sessions,
            client_id: client_id.to_string(),
            base_url,
            policy,
            options,
        }
    }

    /// Handle one callback request. Never fails: errors become the generic
    /// 500 response after being logged once with their stage.
    pub async fn handle(&self, req: &HttpRequest) -> HttpResponse {
        match self.complete_sign_in(req).await {
            Ok(response) => response,
            Err(e) => {
                LoggingHelper::log_callback_failure(e.stage(), &e.to_string());
                e.error_response()
            }
        }
    }

    async fn complete_sign_in(&self, req: &HttpRequest) -> Result<HttpResponse, CallbackError> {
        let params = CallbackParams::from_query(req.query_string());
        LoggingHelper::log_callback_received(params.code.is_some(), params.state.is_some());

        let state = decode_state(params.state.as_deref())?;

        let code = params
            .code
            .filter(|code| !code.is_empty())
            .ok_or(CallbackError::MissingCode)?;

        let auth = self
            .identity
            .authenticate_with_code(&self.client_id, &code)
            .await?;
        LoggingHelper::log_code_exchanged(&auth.user.id, auth.impersonator.is_some());

        let request_url = self.request_url(req);
        let redirect = resolve_redirect_target(
            &request_url,
            state.return_pathname.as_deref(),
            &self.options.return_pathname,
            &self.policy,
        )?;

        let sealed = self
            .sessions
            .seal(&SessionPayload::from(&auth))
            .map_err(CallbackError::Encryption)?;

        let cookie = self
            .sessions
            .commit_sealed(req, sealed)
            .map_err(CallbackError::Cookie)?;

        if let Some(hook) = &self.options.on_success {
            if let Err(e) = hook.on_success(SuccessPayload::from(auth)).await {
                match self.options.hook_failure {
                    HookFailurePolicy::Abort => return Err(CallbackError::SuccessHook(e)),
                    HookFailurePolicy::Ignore => {
                        LoggingHelper::log_success_hook_ignored(&e.to_string());
                    }
                }
            }
        }

        LoggingHelper::log_redirect_resolved(redirect.as_str());
        Ok(ResponseBuilder::redirect_with_cookies(
            redirect.as_str(),
            vec![cookie],
        ))
    }

    /// Absolute URL of the current request on the configured origin. Only the
    /// path and query come from the request line.
    fn request_url(&self, req: &HttpRequest) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(req.path());
        let query = req.query_string();
        url.set_query((!query.is_empty()).then_some(query));
        url
    }
}

/// `GET /auth/callback`
pub async fn auth_callback(req: HttpRequest, handler: web::Data<CallbackHandler>) -> HttpResponse {
    handler.handle(&req).await
}
