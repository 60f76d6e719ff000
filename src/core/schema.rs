// src/core/schema.rs — Planning response schema and validation
//
// The planner call constrains the response shape server-side with a JSON
// schema, and the response is still validated locally before a Plan is
// accepted: an optimistic parse of model output is how half-written plans
// end up committed. Validation failure is typed (`MalformedResponse`) and
// leaves the project untouched.

use crate::core::types::Plan;
use crate::infra::errors::PanelForgeError;

/// Schema sent as `responseSchema` on planning calls. Field names follow
/// the service's camelCase convention.
pub fn plan_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING", "description": "Short, catchy comic title" },
            "globalStyle": {
                "type": "STRING",
                "description": "Global art style (e.g. 'black-and-white manga', 'vintage american comic')"
            },
            "characters": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "description": {
                            "type": "STRING",
                            "description": "Detailed visual description (age, hair, main outfit) for the reference portrait"
                        }
                    },
                    "required": ["name", "description"]
                }
            },
            "pages": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "pageNumber": { "type": "NUMBER" },
                        "sceneDescription": {
                            "type": "STRING",
                            "description": "Detailed visual description of this page's scene"
                        },
                        "compositionSuggestion": { "type": "STRING", "description": "Camera angle, focus" },
                        "suggestedEmotion": { "type": "STRING", "description": "Dominant emotion of the scene" },
                        "dialogue": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "character": { "type": "STRING" },
                                    "type": { "type": "STRING", "enum": ["speech", "thought"] },
                                    "text": { "type": "STRING" }
                                }
                            }
                        },
                        "narration": { "type": "STRING" }
                    },
                    "required": ["pageNumber", "sceneDescription"]
                }
            }
        },
        "required": ["title", "globalStyle", "characters", "pages"]
    })
}

/// Parse and validate a planning response into a Plan.
pub fn parse_plan(raw: &str) -> Result<Plan, PanelForgeError> {
    let plan: Plan =
        serde_json::from_str(raw).map_err(|e| PanelForgeError::MalformedResponse {
            message: e.to_string(),
        })?;
    validate_plan(&plan)?;
    Ok(plan)
}

fn validate_plan(plan: &Plan) -> Result<(), PanelForgeError> {
    if plan.title.trim().is_empty() {
        return Err(malformed("empty title"));
    }
    if plan.global_style.trim().is_empty() {
        return Err(malformed("empty globalStyle"));
    }
    if plan.characters.is_empty() {
        return Err(malformed("no characters"));
    }
    if plan.pages.is_empty() {
        return Err(malformed("no pages"));
    }

    // Character names are unique within a plan
    for (i, c) in plan.characters.iter().enumerate() {
        if c.name.trim().is_empty() {
            return Err(malformed(&format!("character {} has an empty name", i)));
        }
        if plan.characters[..i].iter().any(|p| p.name == c.name) {
            return Err(malformed(&format!("duplicate character name '{}'", c.name)));
        }
    }

    for (i, page) in plan.pages.iter().enumerate() {
        if page.scene_description.trim().is_empty() {
            return Err(malformed(&format!("page {} has an empty scene", i)));
        }
        // Soft invariant: dialogue speakers should resolve to plan
        // characters. Unknown speakers just lose their reference image.
        for line in &page.dialogue {
            let speaker = line.character.trim();
            if !speaker.is_empty() && !plan.characters.iter().any(|c| c.name == speaker) {
                tracing::warn!(page = i, speaker, "dialogue speaker not in character list");
            }
        }
    }

    Ok(())
}

fn malformed(message: &str) -> PanelForgeError {
    PanelForgeError::MalformedResponse {
        message: message.to_string(),
    }
}
