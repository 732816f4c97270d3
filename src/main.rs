#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_web::{
    middleware::{Compress, Logger},
    web, App, HttpServer,
};
use authkit_callback::{
    configure_services,
    handlers::{CallbackHandler, HandleAuthOptions},
    identity::UserManagementClient,
    session::SessionManager,
    settings::AppSettings,
    utils::{logging::LoggingHelper, redirect_validator::RedirectPolicy},
};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = AppSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    let client = UserManagementClient::from_settings(&settings.workos)
        .map_err(|e| std::io::Error::other(format!("Failed to create identity client: {e}")))?;

    let base_url = settings
        .base_url()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let callback_handler = CallbackHandler::new(
        Arc::new(client.clone()),
        SessionManager::from_settings(&settings.cookies),
        &settings.workos.client_id,
        base_url,
        RedirectPolicy::new(
            &settings.auth.allowed_redirect_origins,
            settings.auth.untrusted_redirect,
        ),
        HandleAuthOptions::default()
            .with_return_pathname(&settings.auth.return_pathname)
            .with_hook_failure(settings.auth.success_hook_failure),
    );

    println!("✓ Using stateless sessions with encrypted cookies");
    start_server(settings, client, callback_handler).await
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(
    settings: AppSettings,
    client: UserManagementClient,
    callback_handler: CallbackHandler,
) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    let session_manager = SessionManager::from_settings(&settings.cookies);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(settings.clone()))
            .app_data(web::Data::new(client.clone()))
            .app_data(web::Data::new(session_manager.clone()))
            .app_data(web::Data::new(callback_handler.clone()))
            .wrap(Compress::default())
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, settings: &AppSettings) {
    println!("Starting AuthKit callback service on http://{bind_address}");
    println!();
    println!("Endpoints:");
    println!("  GET      /auth/sign_in   - Redirect to hosted sign-in (?returnPathname=)");
    println!("  GET      /auth/callback  - Authorization code callback");
    println!("  GET      /auth/userinfo  - Current user from session cookie");
    println!("  GET|POST /auth/sign_out  - Clear session");
    println!("  GET      /ping           - Health check");
    println!();
    println!("Redirect URI to register with WorkOS:");
    println!("  {}", settings.workos.redirect_uri);

    LoggingHelper::log_startup(
        &settings.application.base_url,
        &settings.auth.return_pathname,
        &settings.auth.allowed_redirect_origins,
    );
}
