// src/cli/progress.rs — Terminal progress notifier

use crate::core::types::{AssetKind, ProjectStatus};
use crate::notify::Notifier;

pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn credential_rotated(&self, index: usize, total: usize) {
        eprintln!("  ↻ rate limited, switched to key {}/{}", index + 1, total);
    }

    fn quota_exhausted(&self, message: &str) {
        eprintln!("  ⚠ {}", message);
        eprintln!("    (run `panelforge keys add <key>` in another terminal to unblock)");
    }

    fn item_complete(&self, kind: AssetKind, index: usize) {
        eprintln!("  ✓ {} {} done", kind, index + 1);
    }

    fn stage_status_changed(&self, status: ProjectStatus) {
        eprintln!("stage: {}", status_label(status));
    }
}

pub fn status_label(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Planning => "planning",
        ProjectStatus::PlanReady => "plan ready",
        ProjectStatus::CharactersInProgress => "characters in progress",
        ProjectStatus::CharactersReady => "characters ready",
        ProjectStatus::ProductionInProgress => "production in progress",
        ProjectStatus::ProductionComplete => "production complete",
    }
}
