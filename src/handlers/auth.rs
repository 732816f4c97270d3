// Authentication handlers: sign-in, sign-out and current user
use crate::identity::UserManagementClient;
use crate::models::SessionUserInfo;
use crate::session::SessionManager;
use crate::settings::AppSettings;
use crate::utils::oauth_state::encode_state;
use crate::utils::responses::ResponseBuilder;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, error};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SignInQuery {
    #[serde(rename = "returnPathname")]
    pub return_pathname: Option<String>,
}

/// `GET /auth/sign_in` - send the browser to the hosted sign-in page.
///
/// The optional `returnPathname` travels through `state` and comes back to
/// the callback.
pub async fn sign_in(
    query: web::Query<SignInQuery>,
    client: web::Data<UserManagementClient>,
    settings: web::Data<AppSettings>,
) -> HttpResponse {
    let state = query
        .return_pathname
        .as_deref()
        .filter(|path| !path.is_empty())
        .map(encode_state);

    match client.authorization_url(
        &settings.workos.client_id,
        &settings.workos.redirect_uri,
        state.as_deref(),
    ) {
        Ok(url) => {
            debug!("Redirecting to hosted sign-in (state present: {})", state.is_some());
            ResponseBuilder::redirect_with_cookies(url.as_str(), Vec::new())
        }
        Err(e) => {
            error!("Failed to build authorization URL: {e}");
            ResponseBuilder::sign_in_failed()
        }
    }
}

/// `GET|POST /auth/sign_out` - clear the session cookie and go home
pub async fn sign_out(session_manager: web::Data<SessionManager>) -> HttpResponse {
    ResponseBuilder::redirect_with_cookies("/", vec![session_manager.destroy_session()])
}

/// `GET /auth/userinfo` - user and impersonator of the current session
pub async fn userinfo(req: HttpRequest, session_manager: web::Data<SessionManager>) -> HttpResponse {
    match session_manager.read_session(&req) {
        Some(session) => ResponseBuilder::ok_json(&SessionUserInfo::from(session)),
        None => {
            debug!("Userinfo endpoint: no valid session cookie");
            ResponseBuilder::unauthorized()
        }
    }
}
