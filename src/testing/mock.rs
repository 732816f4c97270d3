//! Mock objects and fake implementations for testing

use crate::handlers::callback::SuccessHook;
use crate::identity::{IdentityError, IdentityService};
use crate::models::{AuthenticationResponse, SuccessPayload};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Canned outcome of a code exchange
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Success(AuthenticationResponse),
    Rejected { code: String, message: String },
    NetworkFailure,
}

/// Identity service that answers every exchange with the same outcome and
/// records the `(client_id, code)` pairs it was called with
pub struct MockIdentityService {
    outcome: MockOutcome,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockIdentityService {
    #[must_use]
    pub fn new(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn succeeding(response: AuthenticationResponse) -> Self {
        Self::new(MockOutcome::Success(response))
    }

    /// Rejects every code the way an expired or reused code is rejected
    #[must_use]
    pub fn rejecting() -> Self {
        Self::new(MockOutcome::Rejected {
            code: "invalid_grant".to_string(),
            message: "The code has expired.".to_string(),
        })
    }

    #[must_use]
    pub fn unreachable() -> Self {
        Self::new(MockOutcome::NetworkFailure)
    }

    /// Calls received so far
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl IdentityService for MockIdentityService {
    async fn authenticate_with_code(
        &self,
        client_id: &str,
        code: &str,
    ) -> Result<AuthenticationResponse, IdentityError> {
        self.calls
            .lock()
            .await
            .push((client_id.to_string(), code.to_string()));

        match &self.outcome {
            MockOutcome::Success(response) => Ok(response.clone()),
            MockOutcome::Rejected { code, message } => Err(IdentityError::Rejected {
                status: 400,
                code: code.clone(),
                message: message.clone(),
            }),
            MockOutcome::NetworkFailure => {
                Err(IdentityError::Network("connection refused".to_string()))
            }
        }
    }
}

/// Success hook that keeps every payload it receives
#[derive(Clone, Default)]
pub struct RecordingHook {
    payloads: Arc<Mutex<Vec<SuccessPayload>>>,
}

impl RecordingHook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn payloads(&self) -> Vec<SuccessPayload> {
        self.payloads.lock().await.clone()
    }
}

#[async_trait]
impl SuccessHook for RecordingHook {
    async fn on_success(&self, payload: SuccessPayload) -> anyhow::Result<()> {
        self.payloads.lock().await.push(payload);
        Ok(())
    }
}

/// Success hook that always fails, counting its invocations
#[derive(Clone, Default)]
pub struct FailingHook {
    invocations: Arc<Mutex<usize>>,
}

impl FailingHook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn invocations(&self) -> usize {
        *self.invocations.lock().await
    }
}

#[async_trait]
impl SuccessHook for FailingHook {
    async fn on_success(&self, _payload: SuccessPayload) -> anyhow::Result<()> {
        *self.invocations.lock().await += 1;
        Err(anyhow::anyhow!("user provisioning failed"))
    }
}
