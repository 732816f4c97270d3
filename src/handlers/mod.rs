// HTTP request handlers for the sign-in flow
pub mod auth;
pub mod callback;
pub mod errors;
pub mod health;

// Re-export the main handler functions
pub use auth::{sign_in, sign_out, userinfo};
pub use callback::{
    auth_callback, CallbackHandler, HandleAuthOptions, HookFailurePolicy, SuccessHook,
};
pub use errors::CallbackError;
pub use health::health;

use actix_web::web;

/// Register every route on an app or scope
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/sign_in", web::get().to(sign_in))
        .route("/auth/callback", web::get().to(auth_callback))
        .route("/auth/userinfo", web::get().to(userinfo))
        .route("/auth/sign_out", web::get().to(sign_out))
        .route("/auth/sign_out", web::post().to(sign_out))
        .route("/ping", web::get().to(health));
}
