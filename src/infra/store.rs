// src/infra/store.rs — Persistence collaborator
//
// Two documents: keys.json (credential pool + rotation cursor) and
// project.json (the whole project, assets inline). Writes are atomic
// (temp file + rename) so a crash mid-write never leaves a torn document;
// every state-changing operation in the pipeline persists through here
// before it is considered committed.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::core::types::Project;
use crate::infra::errors::PanelForgeError;

/// Durable credential-pool state: ordered keys plus the rotation cursor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialState {
    pub credentials: Vec<String>,
    pub cursor: usize,
}

pub trait ProjectStore: Send + Sync {
    fn load_credentials(&self) -> Result<Option<CredentialState>, PanelForgeError>;
    fn save_credentials(&self, state: &CredentialState) -> Result<(), PanelForgeError>;
    fn load_project(&self) -> Result<Option<Project>, PanelForgeError>;
    fn save_project(&self, project: &Project) -> Result<(), PanelForgeError>;
}

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn at_default_location() -> Self {
        Self::new(crate::infra::paths::store_dir())
    }

    fn keys_path(&self) -> PathBuf {
        self.dir.join("keys.json")
    }

    fn project_path(&self) -> PathBuf {
        self.dir.join("project.json")
    }

    fn write_atomic(&self, path: &PathBuf, json: &str) -> Result<(), PanelForgeError> {
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(json.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn read_optional<T: for<'de> Deserialize<'de>>(
        &self,
        path: &PathBuf,
    ) -> Result<Option<T>, PanelForgeError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }
}

impl ProjectStore for JsonFileStore {
    fn load_credentials(&self) -> Result<Option<CredentialState>, PanelForgeError> {
        self.read_optional(&self.keys_path())
    }

    fn save_credentials(&self, state: &CredentialState) -> Result<(), PanelForgeError> {
        let json = serde_json::to_string_pretty(state)?;
        self.write_atomic(&self.keys_path(), &json)
    }

    fn load_project(&self) -> Result<Option<Project>, PanelForgeError> {
        self.read_optional(&self.project_path())
    }

    fn save_project(&self, project: &Project) -> Result<(), PanelForgeError> {
        let json = serde_json::to_string(project)?;
        self.write_atomic(&self.project_path(), &json)
    }
}

/// In-memory store used by tests and by callers that manage persistence
/// themselves. Also counts saves, which the resume-idempotence tests use
/// to assert checkpoint behavior.
#[derive(Default)]
pub struct MemoryStore {
    credentials: Mutex<Option<CredentialState>>,
    project: Mutex<Option<Project>>,
    pub project_saves: std::sync::atomic::AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectStore for MemoryStore {
    fn load_credentials(&self) -> Result<Option<CredentialState>, PanelForgeError> {
        Ok(self.credentials.lock().unwrap().clone())
    }

    fn save_credentials(&self, state: &CredentialState) -> Result<(), PanelForgeError> {
        *self.credentials.lock().unwrap() = Some(state.clone());
        Ok(())
    }

    fn load_project(&self) -> Result<Option<Project>, PanelForgeError> {
        Ok(self.project.lock().unwrap().clone())
    }

    fn save_project(&self, project: &Project) -> Result<(), PanelForgeError> {
        self.project_saves
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.project.lock().unwrap() = Some(project.clone());
        Ok(())
    }
}
