//! Identity service integration
//!
//! The callback flow only depends on [`IdentityService`]; the HTTP client
//! talking to the `WorkOS` User Management API lives in [`client`].

pub mod client;

pub use client::UserManagementClient;

use crate::models::AuthenticationResponse;
use async_trait::async_trait;
use thiserror::Error;

/// Identity service errors
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity service unreachable: {0}")]
    Network(String),
    #[error("authorization code rejected ({status}): {code}: {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },
    #[error("invalid identity service response: {0}")]
    InvalidResponse(String),
    #[error("identity service misconfigured: {0}")]
    Configuration(String),
}

/// Exchanges authorization codes for authenticated sessions
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Exchange a one-time authorization code for tokens and the user record
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The identity service cannot be reached
    /// - The code is invalid, expired or already used
    /// - The response cannot be decoded
    async fn authenticate_with_code(
        &self,
        client_id: &str,
        code: &str,
    ) -> Result<AuthenticationResponse, IdentityError>;
}
