// src/notify.rs — Advisory event sink
//
// One-way, non-blocking, optional. The pipeline and dispatcher report
// progress through this trait; the core works identically with the
// no-op implementation.

use crate::core::types::{AssetKind, ProjectStatus};

pub trait Notifier: Send + Sync {
    fn credential_rotated(&self, _index: usize, _total: usize) {}
    fn quota_exhausted(&self, _message: &str) {}
    fn item_complete(&self, _kind: AssetKind, _index: usize) {}
    fn stage_status_changed(&self, _status: ProjectStatus) {}
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {}
