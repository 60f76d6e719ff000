// src/provider/pool.rs — Credential pool with bounded rotation
//
// Rotation policy: bounded with reset-on-add. The cursor only moves
// forward; at the last entry `rotate()` reports exhaustion. Appending a
// new credential past the cursor makes rotation possible again, which is
// what lets a user rescue a stalled run by adding keys mid-backoff.
//
// The pool itself is pure in-memory state. `SharedPool` adds durability:
// it persists through the store before an add or rotate is treated as
// committed.

use std::sync::{Arc, Mutex};

use crate::infra::errors::PanelForgeError;
use crate::infra::store::{CredentialState, ProjectStore};

#[derive(Debug, Clone, Default)]
pub struct CredentialPool {
    credentials: Vec<String>,
    cursor: usize,
}

impl CredentialPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: CredentialState) -> Self {
        let cursor = if state.credentials.is_empty() {
            0
        } else {
            state.cursor.min(state.credentials.len() - 1)
        };
        Self {
            credentials: state.credentials,
            cursor,
        }
    }

    pub fn to_state(&self) -> CredentialState {
        CredentialState {
            credentials: self.credentials.clone(),
            cursor: self.cursor,
        }
    }

    /// Appends a credential. No-op on duplicates. Never moves the cursor.
    /// Returns whether the pool changed.
    pub fn add(&mut self, token: impl Into<String>) -> bool {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() || self.credentials.iter().any(|c| c == token) {
            return false;
        }
        self.credentials.push(token.to_string());
        true
    }

    /// The credential at the cursor, or None when the pool is empty.
    pub fn current(&self) -> Option<&str> {
        self.credentials.get(self.cursor).map(String::as_str)
    }

    /// Advances the cursor. Returns false at the last entry (exhausted).
    pub fn rotate(&mut self) -> bool {
        if self.cursor + 1 < self.credentials.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

/// Pool handle shared between the pipeline and whoever may append keys
/// while a backoff wait is in progress (e.g. the CLI's stdin prompt, or a
/// test). Every successful add/rotate is persisted through the store
/// before it is reported back, and rolled back if persistence fails, so a
/// crash mid-rotation resumes from the last known-good cursor.
#[derive(Clone)]
pub struct SharedPool {
    inner: Arc<Mutex<CredentialPool>>,
    store: Arc<dyn ProjectStore>,
}

impl SharedPool {
    pub fn new(pool: CredentialPool, store: Arc<dyn ProjectStore>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
            store,
        }
    }

    pub fn load(store: Arc<dyn ProjectStore>) -> Result<Self, PanelForgeError> {
        let pool = match store.load_credentials()? {
            Some(state) => CredentialPool::from_state(state),
            None => CredentialPool::new(),
        };
        Ok(Self::new(pool, store))
    }

    pub fn add(&self, token: impl Into<String>) -> Result<bool, PanelForgeError> {
        let mut pool = self.inner.lock().unwrap();
        let before = pool.to_state();
        if !pool.add(token) {
            return Ok(false);
        }
        if let Err(e) = self.store.save_credentials(&pool.to_state()) {
            *pool = CredentialPool::from_state(before);
            return Err(e);
        }
        Ok(true)
    }

    pub fn rotate(&self) -> Result<bool, PanelForgeError> {
        let mut pool = self.inner.lock().unwrap();
        let before = pool.to_state();
        if !pool.rotate() {
            return Ok(false);
        }
        if let Err(e) = self.store.save_credentials(&pool.to_state()) {
            *pool = CredentialPool::from_state(before);
            return Err(e);
        }
        Ok(true)
    }

    pub fn current(&self) -> Option<String> {
        self.inner.lock().unwrap().current().map(str::to_string)
    }

    pub fn cursor(&self) -> usize {
        self.inner.lock().unwrap().cursor()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}
