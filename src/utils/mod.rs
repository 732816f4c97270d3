// Shared building blocks for the sign-in flow
pub mod crypto;
pub mod logging;
pub mod oauth_state;
pub mod redirect_validator;
pub mod responses;
