// tests/common/mod.rs — Scripted backend and recording notifier shared by
// the integration tests. No network anywhere: each test scripts the exact
// sequence of service outcomes.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use panelforge::core::types::{
    AssetKind, BubbleKind, CharacterSpec, DialogueLine, PageSpec, Plan, Project, ProjectStatus,
};
use panelforge::infra::config::{ClassifierConfig, DispatchConfig};
use panelforge::infra::store::MemoryStore;
use panelforge::notify::Notifier;
use panelforge::provider::classify::ErrorClassifier;
use panelforge::provider::dispatch::Dispatcher;
use panelforge::provider::pool::SharedPool;
use panelforge::provider::{
    BackendError, GenerateBackend, GenerateRequest, GenerateResponse, RequestKind,
};

/// One scripted service outcome.
#[derive(Debug, Clone)]
pub enum Outcome {
    Text(String),
    Image(Vec<u8>),
    RateLimit,
    Auth,
    Blocked,
    ServerError,
}

#[derive(Debug, Clone)]
pub struct CallRecord {
    pub credential: String,
    pub kind: RequestKind,
    pub text: String,
    pub reference_count: usize,
}

pub struct ScriptedBackend {
    script: Mutex<VecDeque<Outcome>>,
    pub calls: Mutex<Vec<CallRecord>>,
}

impl ScriptedBackend {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn credentials_used(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.credential.clone())
            .collect()
    }
}

#[async_trait]
impl GenerateBackend for ScriptedBackend {
    async fn generate(
        &self,
        credential: &str,
        kind: RequestKind,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, BackendError> {
        self.calls.lock().unwrap().push(CallRecord {
            credential: credential.to_string(),
            kind,
            text: request.text.clone(),
            reference_count: request.reference_images.len(),
        });

        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("backend called more times than the test scripted");

        match outcome {
            Outcome::Text(text) => Ok(GenerateResponse::Text(text)),
            Outcome::Image(data) => Ok(GenerateResponse::Image {
                data,
                mime_type: "image/png".into(),
            }),
            Outcome::RateLimit => Err(BackendError {
                status: Some(429),
                message: "RESOURCE_EXHAUSTED: quota exceeded for this key".into(),
            }),
            Outcome::Auth => Err(BackendError {
                status: Some(400),
                message: "API key not valid. Please pass a valid API key.".into(),
            }),
            Outcome::Blocked => Err(BackendError {
                status: Some(200),
                message: "response blocked: SAFETY".into(),
            }),
            Outcome::ServerError => Err(BackendError {
                status: Some(503),
                message: "the model is overloaded".into(),
            }),
        }
    }
}

/// Captures advisory events as strings for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn recorded(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn credential_rotated(&self, index: usize, total: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("rotated:{}/{}", index, total));
    }

    fn quota_exhausted(&self, _message: &str) {
        self.events.lock().unwrap().push("quota_exhausted".into());
    }

    fn item_complete(&self, kind: AssetKind, index: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("item:{}:{}", kind, index));
    }

    fn stage_status_changed(&self, status: ProjectStatus) {
        self.events
            .lock()
            .unwrap()
            .push(format!("status:{:?}", status));
    }
}

pub struct Harness {
    pub backend: Arc<ScriptedBackend>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub pool: SharedPool,
    pub dispatcher: Dispatcher,
}

/// Fast backoff so paused-clock tests stay readable: 10ms base, 2 attempts
/// unless overridden per test.
pub fn fast_dispatch_config() -> DispatchConfig {
    DispatchConfig {
        max_backoff_attempts: 2,
        backoff_base_ms: 10,
        backoff_factor: 2.0,
        backoff_max_ms: 1_000,
        request_timeout_secs: 1,
    }
}

pub fn harness(keys: &[&str], outcomes: Vec<Outcome>, config: DispatchConfig) -> Harness {
    let backend = Arc::new(ScriptedBackend::new(outcomes));
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let pool = SharedPool::load(store.clone()).unwrap();
    for key in keys {
        pool.add(*key).unwrap();
    }
    let dispatcher = Dispatcher::new(
        backend.clone(),
        pool.clone(),
        ErrorClassifier::new(ClassifierConfig::default()),
        config,
        notifier.clone(),
    );
    Harness {
        backend,
        store,
        notifier,
        pool,
        dispatcher,
    }
}

pub fn two_character_plan() -> Plan {
    Plan {
        title: "The Lost Map".into(),
        global_style: "black-and-white manga".into(),
        characters: vec![
            CharacterSpec {
                name: "Aya".into(),
                description: "tall, red coat".into(),
            },
            CharacterSpec {
                name: "Ben".into(),
                description: "short, glasses".into(),
            },
        ],
        pages: vec![
            PageSpec {
                page_number: 1,
                scene_description: "A dusty attic at dawn".into(),
                composition_suggestion: None,
                suggested_emotion: None,
                narration: None,
                dialogue: vec![DialogueLine {
                    character: "Aya".into(),
                    kind: BubbleKind::Speech,
                    text: "Look at this!".into(),
                }],
            },
            PageSpec {
                page_number: 2,
                scene_description: "Rooftop chase".into(),
                composition_suggestion: None,
                suggested_emotion: None,
                narration: None,
                dialogue: vec![DialogueLine {
                    character: "Ben".into(),
                    kind: BubbleKind::Thought,
                    text: "Too fast!".into(),
                }],
            },
        ],
    }
}

pub fn project_with_plan(status: ProjectStatus) -> Project {
    let mut project = Project::new("a story about a lost map");
    let plan = two_character_plan();
    project.assets.ensure_page_slots(plan.pages.len());
    project.plan = Some(plan);
    project.status = status;
    project
}
