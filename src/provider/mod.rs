// src/provider/mod.rs — Remote generation service layer

pub mod classify;
pub mod dispatch;
pub mod google;
pub mod pool;

use async_trait::async_trait;

/// Routes a request to the planner (structured JSON) or the artist
/// (image) operation. Both go through the same dispatch logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Plan,
    Image,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// One multimodal request payload: reference images first, then a single
/// text segment. `system` carries the authoritative safety preamble on
/// image requests; user text never reaches that slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub system: Option<String>,
    pub reference_images: Vec<InlineImage>,
    pub text: String,
    /// For planning calls: the JSON schema the response must conform to.
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerateResponse {
    Text(String),
    Image { data: Vec<u8>, mime_type: String },
}

/// Raw failure surfaced by a backend, before classification. The service
/// signals errors through HTTP status and loosely-phrased message text;
/// `classify` turns this soft contract into a typed `ErrorKind`.
#[derive(Debug, Clone)]
pub struct BackendError {
    pub status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(code) => write!(f, "HTTP {}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Seam between the dispatcher and the actual service, so tests can
/// script outcomes without a network.
#[async_trait]
pub trait GenerateBackend: Send + Sync {
    async fn generate(
        &self,
        credential: &str,
        kind: RequestKind,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendError>;
}
