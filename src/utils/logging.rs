// Centralized log lines for the sign-in flow
use log::{debug, error, info, warn};

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log receipt of a callback request without its parameter values
    pub fn log_callback_received(has_code: bool, has_state: bool) {
        debug!("Sign-in callback received: code={has_code} state={has_state}");
    }

    /// Log a failed callback once, tagged with the stage that failed
    pub fn log_callback_failure(stage: &str, detail: &str) {
        error!("Sign-in callback failed: stage={stage} error={detail}");
    }

    /// Log a successful code exchange
    pub fn log_code_exchanged(user_id: &str, impersonated: bool) {
        if impersonated {
            info!("✅ Authorization code exchanged for user {user_id} (impersonated)");
        } else {
            info!("✅ Authorization code exchanged for user {user_id}");
        }
    }

    /// Log the resolved post-login redirect
    pub fn log_redirect_resolved(location: &str) {
        debug!("Redirecting signed-in user to {location}");
    }

    /// Log a success hook failure that is tolerated by configuration
    pub fn log_success_hook_ignored(detail: &str) {
        warn!("Success hook failed, continuing sign-in: {detail}");
    }

    /// Log the configured callback behaviour at startup
    pub fn log_startup(base_url: &str, return_pathname: &str, allowed_origins: &[String]) {
        info!("🔧 Callback redirects resolve against {base_url}");
        info!("🎯 Default return path: {return_pathname}");
        if !allowed_origins.is_empty() {
            info!("🌐 Additional redirect origins: {allowed_origins:?}");
        }
    }
}
