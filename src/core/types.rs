// src/core/types.rs — Project data model
//
// A Project is the unit of work: one story, one plan, one asset set.
// Binary image payloads are stored base64-encoded inside project.json so
// the whole project round-trips through a single JSON document, the same
// way the service itself transports inline images.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::infra::errors::PanelForgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    PlanReady,
    CharactersInProgress,
    CharactersReady,
    ProductionInProgress,
    ProductionComplete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: ProjectStatus,
    pub story: String,
    pub plan: Option<Plan>,
    #[serde(default)]
    pub assets: AssetSet,
    #[serde(default)]
    pub failures: StageFailures,
}

impl Project {
    pub fn new(story: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            status: ProjectStatus::Planning,
            story: story.into(),
            plan: None,
            assets: AssetSet::default(),
            failures: StageFailures::default(),
        }
    }

    pub fn plan(&self) -> Result<&Plan, PanelForgeError> {
        self.plan.as_ref().ok_or(PanelForgeError::NoPlan)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub title: String,
    #[serde(alias = "globalStyle")]
    pub global_style: String,
    pub characters: Vec<CharacterSpec>,
    pub pages: Vec<PageSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSpec {
    pub name: String,
    /// Visual description used to generate the reference portrait.
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    #[serde(alias = "pageNumber")]
    pub page_number: u32,
    #[serde(alias = "sceneDescription")]
    pub scene_description: String,
    #[serde(default, alias = "compositionSuggestion", skip_serializing_if = "Option::is_none")]
    pub composition_suggestion: Option<String>,
    #[serde(default, alias = "suggestedEmotion", skip_serializing_if = "Option::is_none")]
    pub suggested_emotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
    #[serde(default)]
    pub dialogue: Vec<DialogueLine>,
}

impl PageSpec {
    /// Characters referenced in this page's dialogue, deduplicated,
    /// ordered by first appearance.
    pub fn referenced_characters(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for line in &self.dialogue {
            let name = line.character.trim();
            if !name.is_empty() && !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub character: String,
    #[serde(rename = "type")]
    pub kind: BubbleKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BubbleKind {
    Speech,
    Thought,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    #[serde(with = "b64")]
    pub data: Vec<u8>,
    pub mime_type: String,
    pub generated_at: DateTime<Utc>,
}

impl ImageAsset {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            generated_at: Utc::now(),
        }
    }

    /// File extension matching the MIME type, for export.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

/// Generated assets. `pages[i]` corresponds to `Plan.pages[i]`; a `None`
/// slot has not been generated yet (or failed — see `StageFailures`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetSet {
    #[serde(default)]
    pub characters: BTreeMap<String, ImageAsset>,
    #[serde(default)]
    pub pages: Vec<Option<ImageAsset>>,
}

impl AssetSet {
    /// Grow the page vector to match the plan. Never shrinks: assets are
    /// only cleared by a full project reset.
    pub fn ensure_page_slots(&mut self, count: usize) {
        if self.pages.len() < count {
            self.pages.resize(count, None);
        }
    }
}

/// Terminal per-item failures recorded during a stage run. A stage is
/// settled when every item has either an asset or an entry here; partial
/// completion is a valid, inspectable end state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageFailures {
    #[serde(default)]
    pub characters: BTreeMap<String, String>,
    #[serde(default)]
    pub pages: BTreeMap<usize, String>,
}

impl StageFailures {
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.pages.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Character,
    Page,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Character => write!(f, "character"),
            AssetKind::Page => write!(f, "page"),
        }
    }
}

/// A single text-field mutation of the plan. Every edit goes through
/// `PipelineContext::apply_plan_edit`, which persists the whole project,
/// so each change is individually durable.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanEdit {
    Title(String),
    GlobalStyle(String),
    CharacterDescription { name: String, value: String },
    SceneDescription { page: usize, value: String },
    CompositionSuggestion { page: usize, value: Option<String> },
    SuggestedEmotion { page: usize, value: Option<String> },
    Narration { page: usize, value: Option<String> },
}

impl Plan {
    pub fn apply_edit(&mut self, edit: PlanEdit) -> Result<(), PanelForgeError> {
        match edit {
            PlanEdit::Title(v) => self.title = v,
            PlanEdit::GlobalStyle(v) => self.global_style = v,
            PlanEdit::CharacterDescription { name, value } => {
                let spec = self
                    .characters
                    .iter_mut()
                    .find(|c| c.name == name)
                    .ok_or(PanelForgeError::UnknownCharacter { name })?;
                spec.description = value;
            }
            PlanEdit::SceneDescription { page, value } => {
                self.page_mut(page)?.scene_description = value;
            }
            PlanEdit::CompositionSuggestion { page, value } => {
                self.page_mut(page)?.composition_suggestion = value;
            }
            PlanEdit::SuggestedEmotion { page, value } => {
                self.page_mut(page)?.suggested_emotion = value;
            }
            PlanEdit::Narration { page, value } => {
                self.page_mut(page)?.narration = value;
            }
        }
        Ok(())
    }

    fn page_mut(&mut self, index: usize) -> Result<&mut PageSpec, PanelForgeError> {
        let total = self.pages.len();
        self.pages
            .get_mut(index)
            .ok_or(PanelForgeError::PageOutOfRange { page: index, total })
    }
}

/// Base64 (de)serialization for inline image bytes.
mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        STANDARD.decode(raw).map_err(serde::de::Error::custom)
    }
}
