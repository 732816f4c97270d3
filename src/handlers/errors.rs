// Failures of the sign-in callback
use crate::identity::IdentityError;
use crate::utils::oauth_state::StateError;
use crate::utils::redirect_validator::RedirectError;
use crate::utils::responses::ResponseBuilder;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

/// Every way the callback can fail. All of them map to the same generic
/// response; only the logs tell them apart.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("invalid state parameter: {0}")]
    State(#[from] StateError),
    #[error("missing authorization code")]
    MissingCode,
    #[error("authorization code exchange failed: {0}")]
    Exchange(#[from] IdentityError),
    #[error("cannot resolve redirect target: {0}")]
    Redirect(#[from] RedirectError),
    #[error("session encryption failed: {0}")]
    Encryption(anyhow::Error),
    #[error("session cookie could not be written: {0}")]
    Cookie(anyhow::Error),
    #[error("success hook failed: {0}")]
    SuccessHook(anyhow::Error),
}

impl CallbackError {
    /// Label of the step that failed, used in logs
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::State(_) => "state",
            Self::MissingCode => "missing_code",
            Self::Exchange(_) => "exchange",
            Self::Redirect(_) => "redirect",
            Self::Encryption(_) => "encryption",
            Self::Cookie(_) => "cookie",
            Self::SuccessHook(_) => "success_hook",
        }
    }
}

impl ResponseError for CallbackError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        ResponseBuilder::sign_in_failed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        assert_eq!(CallbackError::MissingCode.stage(), "missing_code");
        assert_eq!(
            CallbackError::Redirect(RedirectError::SuspiciousPattern).stage(),
            "redirect"
        );
        assert_eq!(
            CallbackError::Exchange(IdentityError::Network("down".to_string())).stage(),
            "exchange"
        );
        assert_eq!(
            CallbackError::SuccessHook(anyhow::anyhow!("boom")).stage(),
            "success_hook"
        );
    }

    #[test]
    fn test_every_error_is_generic_500() {
        let errors = [
            CallbackError::MissingCode,
            CallbackError::Encryption(anyhow::anyhow!("bad key")),
            CallbackError::Cookie(anyhow::anyhow!("bad cookie")),
        ];

        for error in errors {
            let response = error.error_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(response
                .headers()
                .get(actix_web::http::header::SET_COOKIE)
                .is_none());
        }
    }
}
