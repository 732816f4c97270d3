#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the authkit-callback application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod handlers;
pub mod identity;
pub mod models;
pub mod session;
pub mod settings;
pub mod testing;
pub mod utils;

/// Re-export commonly used items
pub use handlers::{
    auth_callback, configure_services, CallbackError, CallbackHandler, HandleAuthOptions,
    HookFailurePolicy, SuccessHook,
};
pub use identity::{IdentityError, IdentityService, UserManagementClient};
pub use models::{AuthenticationResponse, SessionPayload, SuccessPayload};
pub use session::SessionManager;
pub use settings::AppSettings;
