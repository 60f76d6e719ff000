// src/provider/google.rs — Google Generative AI (Gemini) backend

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::time::Duration;

use super::{BackendError, GenerateBackend, GenerateRequest, GenerateResponse, RequestKind};
use crate::infra::config::ModelsConfig;

pub struct GoogleBackend {
    client: reqwest::Client,
    models: ModelsConfig,
}

impl GoogleBackend {
    pub fn new(models: ModelsConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self { client, models }
    }

    fn base_url(&self) -> &str {
        "https://generativelanguage.googleapis.com/v1beta"
    }

    fn model_for(&self, kind: RequestKind) -> &str {
        match kind {
            RequestKind::Plan => &self.models.planner,
            RequestKind::Image => &self.models.artist,
        }
    }

    /// Build the Gemini request body: reference images first, then the
    /// single text segment, all in one user turn.
    fn build_request_body(&self, kind: RequestKind, request: &GenerateRequest) -> serde_json::Value {
        let mut parts: Vec<serde_json::Value> = request
            .reference_images
            .iter()
            .map(|img| {
                serde_json::json!({
                    "inline_data": {
                        "mime_type": img.mime_type,
                        "data": BASE64.encode(&img.data),
                    }
                })
            })
            .collect();
        parts.push(serde_json::json!({ "text": request.text }));

        let mut body = serde_json::json!({
            "contents": [{ "role": "user", "parts": parts }],
        });

        if let Some(ref system) = request.system {
            body["system_instruction"] = serde_json::json!({
                "parts": [{ "text": system }],
            });
        }

        if kind == RequestKind::Plan {
            let mut gen_config = serde_json::json!({
                "responseMimeType": "application/json",
            });
            if let Some(ref schema) = request.response_schema {
                gen_config["responseSchema"] = schema.clone();
            }
            body["generationConfig"] = gen_config;
        }

        body
    }
}

#[async_trait]
impl GenerateBackend for GoogleBackend {
    async fn generate(
        &self,
        credential: &str,
        kind: RequestKind,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendError> {
        let body = self.build_request_body(kind, request);

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url(),
            self.model_for(kind),
            credential,
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BackendError {
                status: Some(status.as_u16()),
                message: error_body,
            });
        }

        let resp: serde_json::Value = response.json().await.map_err(|e| BackendError {
            status: Some(status.as_u16()),
            message: format!("failed to parse response body: {}", e),
        })?;

        // A 2xx can still carry a policy block instead of content.
        if let Some(reason) = resp["promptFeedback"]["blockReason"].as_str() {
            return Err(BackendError {
                status: Some(status.as_u16()),
                message: format!("response blocked: {}", reason),
            });
        }
        if let Some(finish) = resp["candidates"][0]["finishReason"].as_str() {
            if finish == "SAFETY" || finish == "PROHIBITED_CONTENT" {
                return Err(BackendError {
                    status: Some(status.as_u16()),
                    message: format!("response blocked: {}", finish),
                });
            }
        }

        let parts = resp["candidates"][0]["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        // Prefer an inline image; fall back to concatenated text.
        for part in &parts {
            let inline = if part["inlineData"].is_object() {
                &part["inlineData"]
            } else {
                &part["inline_data"]
            };
            if let (Some(data), Some(mime)) = (
                inline["data"].as_str(),
                inline["mimeType"].as_str().or(inline["mime_type"].as_str()),
            ) {
                let bytes = BASE64.decode(data).map_err(|e| BackendError {
                    status: Some(status.as_u16()),
                    message: format!("invalid base64 image payload: {}", e),
                })?;
                return Ok(GenerateResponse::Image {
                    data: bytes,
                    mime_type: mime.to_string(),
                });
            }
        }

        let mut text = String::new();
        for part in &parts {
            if let Some(t) = part["text"].as_str() {
                text.push_str(t);
            }
        }

        if text.is_empty() {
            return Err(BackendError {
                status: Some(status.as_u16()),
                message: "response contained no content parts".into(),
            });
        }

        Ok(GenerateResponse::Text(text))
    }
}
