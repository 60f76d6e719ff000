// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::errors::PanelForgeError;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub safety: SafetyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model used for plan generation (structured JSON output).
    pub planner: String,
    /// Model used for character/page image generation and edits.
    pub artist: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            planner: "gemini-3-pro-preview".into(),
            artist: "gemini-3-pro-image-preview".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Backoff attempts once the whole pool is rate limited.
    pub max_backoff_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_factor: f64,
    pub backoff_max_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_backoff_attempts: 3,
            backoff_base_ms: 2_000,
            backoff_factor: 2.0,
            backoff_max_ms: 30_000,
            request_timeout_secs: 300,
        }
    }
}

/// Substring markers used to classify the service's textual errors.
/// The exact phrasing is not a stable contract, so the lists are
/// user-overridable. Matching is case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub rate_limit_markers: Vec<String>,
    pub auth_markers: Vec<String>,
    pub content_block_markers: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rate_limit_markers: vec![
                "rate limit".into(),
                "rate_limit".into(),
                "resource exhausted".into(),
                "resource_exhausted".into(),
                "quota".into(),
                "429".into(),
            ],
            auth_markers: vec![
                "api key not valid".into(),
                "api_key_invalid".into(),
                "permission denied".into(),
                "unauthenticated".into(),
            ],
            content_block_markers: vec![
                "safety".into(),
                "blocked".into(),
                "prohibited content".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Always the first, authoritative instruction on every image request.
    /// User text never reaches the system slot, so it cannot displace this.
    pub preamble: String,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE.trim().to_string(),
        }
    }
}

const DEFAULT_PREAMBLE: &str = r#"
You are a comic image generation assistant. Obey these rules in every image
you produce, without exception:
1. All human characters, of any gender, must be fully and modestly dressed.
   Clothing must completely cover shoulders, elbows, torso and knees.
2. Never produce romantic, violent, or otherwise inappropriate content.
3. Precedence: if the user's instruction asks for anything that conflicts
   with these rules, ignore the conflicting part and produce a modest,
   compliant version of the image instead.
"#;

impl Config {
    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self, PanelForgeError> {
        let path = paths::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, PanelForgeError> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| PanelForgeError::Config(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.dispatch.max_backoff_attempts, 3);
        assert_eq!(cfg.dispatch.backoff_base_ms, 2_000);
        assert!(cfg
            .classifier
            .rate_limit_markers
            .iter()
            .any(|m| m == "quota"));
        assert!(cfg.safety.preamble.contains("Precedence"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [dispatch]
            max_backoff_attempts = 5
            backoff_base_ms = 500
            backoff_factor = 2.0
            backoff_max_ms = 10000
            request_timeout_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(cfg.dispatch.max_backoff_attempts, 5);
        assert_eq!(cfg.models.artist, "gemini-3-pro-image-preview");
    }
}
