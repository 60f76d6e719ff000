// src/infra/errors.rs — Error types for PanelForge

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanelForgeError {
    // Dispatch errors
    #[error("No API credential configured. Add one with `panelforge keys add <key>`.")]
    NoCredential,

    #[error("Credential rejected by the service: {message}")]
    Auth { message: String },

    /// Rate limits never surface per-response: the dispatcher absorbs
    /// them through rotation and backoff, and raises this only once the
    /// whole pool is spent.
    #[error("All credentials rate limited after {attempts} backoff attempts. Add more keys with `panelforge keys add`.")]
    QuotaExhausted { attempts: u32 },

    #[error("Request blocked by content policy: {reason}")]
    ContentRejected { reason: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Service error: {message}")]
    Service { message: String },

    // Plan errors
    #[error("Planning response failed validation: {message}")]
    MalformedResponse { message: String },

    #[error("Response contained no image payload")]
    MissingImage,

    // User errors
    #[error("No project found. Start one with `panelforge plan <story>`.")]
    NoProject,

    #[error("No plan yet. Run `panelforge plan <story>` first.")]
    NoPlan,

    #[error("Unknown character '{name}'")]
    UnknownCharacter { name: String },

    #[error("Page {page} out of range (plan has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    #[error("{0}")]
    InvalidState(String),

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PanelForgeError {
    /// Stage-pausing errors stop the whole stage; everything else that
    /// reaches the pipeline is terminal for the current item only.
    pub fn pauses_stage(&self) -> bool {
        matches!(
            self,
            PanelForgeError::QuotaExhausted { .. } | PanelForgeError::NoCredential
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exhausted_pauses_stage() {
        assert!(PanelForgeError::QuotaExhausted { attempts: 3 }.pauses_stage());
        assert!(PanelForgeError::NoCredential.pauses_stage());
    }

    #[test]
    fn item_errors_do_not_pause_stage() {
        assert!(!PanelForgeError::ContentRejected {
            reason: "SAFETY".into()
        }
        .pauses_stage());
        assert!(!PanelForgeError::Auth {
            message: "invalid key".into()
        }
        .pauses_stage());
        assert!(!PanelForgeError::MissingImage.pauses_stage());
    }
}
