//! Guardrail policy & confirmation store.
//!
//! Three pieces wired together by callers (`ayati-tools`): a hot-reloaded
//! [`PolicyStore`], a [`path_guard`]/[`shell_guard`] pair that consult it,
//! and a [`ConfirmationStore`] implementing the challenge/response protocol.

pub mod confirmation;
pub mod path_guard;
pub mod policy;
pub mod shell_guard;

pub use confirmation::{ConfirmationStore, VerifyError};
pub use policy::PolicyStore;

/// Outcome of a guarded check, mirroring the `{ok, error, meta}` shape
/// tools and the executor use for denial/confirmation-required results.
/// `requires_confirmation`'s fields flatten directly into the serialized
/// form, so a plain denial is just `{error}` and a confirmation-required
/// one adds `operationId`/`confirmationTokenFormat`/`expiresAt` alongside it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GuardDenied {
    pub error: String,
    #[serde(flatten)]
    pub requires_confirmation: Option<ConfirmationChallenge>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationChallenge {
    pub operation_id: String,
    pub confirmation_token_format: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl GuardDenied {
    pub fn simple(error: impl Into<String>) -> Self {
        Self { error: error.into(), requires_confirmation: None }
    }

    pub fn confirmation_required(operation_id: String, confirmation_token_format: String, expires_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            error: "confirmation required".into(),
            requires_confirmation: Some(ConfirmationChallenge { operation_id, confirmation_token_format, expires_at }),
        }
    }
}
