// src/core/pipeline.rs — Pipeline state machine
//
// Drives the three generation stages (plan, characters, pages) and
// single-asset edits, strictly one request in flight. Concurrent calls
// would race the shared per-key quota and make rotation bookkeeping
// non-deterministic, so the pipeline is deliberately sequential.
//
// Per-item discipline in a stage: skip if the asset already exists,
// otherwise dispatch; on success store the asset and checkpoint before
// the next item begins; on a terminal error record the failure and keep
// going. Quota exhaustion pauses the whole stage with status unchanged —
// a re-run resumes from the first unfinished item.

use std::sync::Arc;

use crate::core::prompt;
use crate::core::schema;
use crate::core::types::{AssetKind, ImageAsset, PlanEdit, Project, ProjectStatus};
use crate::infra::errors::PanelForgeError;
use crate::infra::store::ProjectStore;
use crate::notify::Notifier;
use crate::provider::dispatch::Dispatcher;
use crate::provider::pool::SharedPool;
use crate::provider::{GenerateResponse, RequestKind};

/// Single source of truth for the mutable core state: the project and
/// the credential pool. Every mutation goes through these methods and is
/// persisted synchronously (store, then continue), so the one in-flight
/// operation never observes a half-committed intermediate.
pub struct PipelineContext {
    pub project: Project,
    pool: SharedPool,
    store: Arc<dyn ProjectStore>,
    notifier: Arc<dyn Notifier>,
}

impl PipelineContext {
    pub fn new(
        project: Project,
        pool: SharedPool,
        store: Arc<dyn ProjectStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            project,
            pool,
            store,
            notifier,
        }
    }

    /// Load the persisted project, failing when none exists.
    pub fn load(
        store: Arc<dyn ProjectStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, PanelForgeError> {
        let project = store.load_project()?.ok_or(PanelForgeError::NoProject)?;
        let pool = SharedPool::load(store.clone())?;
        Ok(Self::new(project, pool, store, notifier))
    }

    pub fn pool(&self) -> &SharedPool {
        &self.pool
    }

    pub fn checkpoint(&self) -> Result<(), PanelForgeError> {
        self.store.save_project(&self.project)
    }

    fn set_status(&mut self, status: ProjectStatus) -> Result<(), PanelForgeError> {
        if self.project.status != status {
            self.project.status = status;
            self.checkpoint()?;
            self.notifier.stage_status_changed(status);
        }
        Ok(())
    }

    /// The single mutation entry point for plan text fields. Each edit
    /// persists the whole project before returning.
    pub fn apply_plan_edit(&mut self, edit: PlanEdit) -> Result<(), PanelForgeError> {
        let plan = self.project.plan.as_mut().ok_or(PanelForgeError::NoPlan)?;
        plan.apply_edit(edit)?;
        self.checkpoint()
    }

    /// Full reset: a fresh empty project for the same story. The only
    /// operation that ever clears generated assets.
    pub fn reset(&mut self) -> Result<(), PanelForgeError> {
        self.project = Project::new(self.project.story.clone());
        self.checkpoint()?;
        self.notifier.stage_status_changed(self.project.status);
        Ok(())
    }
}

/// Outcome of one stage run. Partial completion is a valid end state;
/// `failed` items stay recorded on the project for inspection and are
/// re-attempted on the next run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Pipeline {
    dispatcher: Dispatcher,
    safety_preamble: String,
}

impl Pipeline {
    pub fn new(dispatcher: Dispatcher, safety_preamble: String) -> Self {
        Self {
            dispatcher,
            safety_preamble,
        }
    }

    /// Planning → PlanReady. The plan is written exactly once; on any
    /// parse/validation error nothing is committed and the project stays
    /// in Planning.
    pub async fn run_planning(&self, ctx: &mut PipelineContext) -> Result<(), PanelForgeError> {
        if ctx.project.plan.is_some() {
            return Err(PanelForgeError::InvalidState(
                "plan already exists; use `improve`, `edit-plan`, or `reset`".into(),
            ));
        }

        let request = prompt::plan_request(&ctx.project.story);
        let response = self.dispatcher.call(RequestKind::Plan, &request).await?;
        let plan = schema::parse_plan(&expect_text(response)?)?;

        ctx.project.assets.ensure_page_slots(plan.pages.len());
        ctx.project.plan = Some(plan);
        ctx.set_status(ProjectStatus::PlanReady)?;
        Ok(())
    }

    /// One AI refinement pass over the existing plan. The current plan is
    /// replaced only after the response validates; existing assets are
    /// kept (page slots grow if the plan gained pages).
    pub async fn improve_plan(&self, ctx: &mut PipelineContext) -> Result<(), PanelForgeError> {
        let request = prompt::improve_plan_request(ctx.project.plan()?);
        let response = self.dispatcher.call(RequestKind::Plan, &request).await?;
        let plan = schema::parse_plan(&expect_text(response)?)?;

        ctx.project.assets.ensure_page_slots(plan.pages.len());
        ctx.project.plan = Some(plan);
        ctx.checkpoint()?;
        Ok(())
    }

    /// PlanReady → CharactersInProgress → CharactersReady.
    pub async fn run_characters(
        &self,
        ctx: &mut PipelineContext,
    ) -> Result<StageReport, PanelForgeError> {
        let characters = ctx.project.plan()?.characters.clone();
        let global_style = ctx.project.plan()?.global_style.clone();

        // Retrying a failed portrait from the production stage never
        // invalidates page assets, so the status must not move backwards.
        let resumed_from_production = matches!(
            ctx.project.status,
            ProjectStatus::ProductionInProgress | ProjectStatus::ProductionComplete
        );
        if !resumed_from_production {
            ctx.set_status(ProjectStatus::CharactersInProgress)?;
        }

        let mut report = StageReport::default();
        for (index, spec) in characters.iter().enumerate() {
            if ctx.project.assets.characters.contains_key(&spec.name) {
                report.skipped += 1;
                continue;
            }

            let request = prompt::character_request(spec, &global_style, &self.safety_preamble);
            let outcome = self
                .dispatcher
                .call(RequestKind::Image, &request)
                .await
                .and_then(expect_image);
            match outcome {
                Ok(asset) => {
                    ctx.project.assets.characters.insert(spec.name.clone(), asset);
                    ctx.project.failures.characters.remove(&spec.name);
                    ctx.checkpoint()?;
                    ctx.notifier.item_complete(AssetKind::Character, index);
                    report.generated += 1;
                }
                Err(e) if e.pauses_stage() => {
                    ctx.checkpoint()?;
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(character = %spec.name, "generation failed: {}", e);
                    ctx.project
                        .failures
                        .characters
                        .insert(spec.name.clone(), e.to_string());
                    ctx.checkpoint()?;
                    report.failed += 1;
                }
            }
        }

        // Every character now has an asset or a recorded failure.
        if !resumed_from_production {
            ctx.set_status(ProjectStatus::CharactersReady)?;
        }
        Ok(report)
    }

    /// CharactersReady → ProductionInProgress → ProductionComplete.
    /// A re-run after ProductionComplete re-attempts only the
    /// missing/failed slots.
    pub async fn run_pages(
        &self,
        ctx: &mut PipelineContext,
    ) -> Result<StageReport, PanelForgeError> {
        let plan = ctx.project.plan()?.clone();
        if matches!(
            ctx.project.status,
            ProjectStatus::Planning | ProjectStatus::PlanReady | ProjectStatus::CharactersInProgress
        ) {
            return Err(PanelForgeError::InvalidState(
                "characters stage has not finished; run `panelforge characters` first".into(),
            ));
        }

        if plan.pages.len() > self.dispatcher.pool().len().max(1) * 10 {
            tracing::warn!(
                pages = plan.pages.len(),
                keys = self.dispatcher.pool().len(),
                "page count is large for the current key pool; expect rotation"
            );
        }

        ctx.project.assets.ensure_page_slots(plan.pages.len());
        ctx.set_status(ProjectStatus::ProductionInProgress)?;

        let mut report = StageReport::default();
        for (index, page) in plan.pages.iter().enumerate() {
            if ctx.project.assets.pages[index].is_some() {
                report.skipped += 1;
                continue;
            }

            // Reference list reflects whatever portraits exist right now;
            // missing ones are omitted, not an error.
            let request =
                prompt::page_request(page, &plan, &ctx.project.assets, &self.safety_preamble);
            let outcome = self
                .dispatcher
                .call(RequestKind::Image, &request)
                .await
                .and_then(expect_image);
            match outcome {
                Ok(asset) => {
                    ctx.project.assets.pages[index] = Some(asset);
                    ctx.project.failures.pages.remove(&index);
                    ctx.checkpoint()?;
                    ctx.notifier.item_complete(AssetKind::Page, index);
                    report.generated += 1;
                }
                Err(e) if e.pauses_stage() => {
                    ctx.checkpoint()?;
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(page = index, "generation failed: {}", e);
                    ctx.project.failures.pages.insert(index, e.to_string());
                    ctx.checkpoint()?;
                    report.failed += 1;
                }
            }
        }

        ctx.set_status(ProjectStatus::ProductionComplete)?;
        Ok(report)
    }

    /// Single-asset edit: replace a character portrait in place. Pipeline
    /// status is untouched.
    pub async fn edit_character(
        &self,
        ctx: &mut PipelineContext,
        name: &str,
        instruction: &str,
    ) -> Result<(), PanelForgeError> {
        let asset = ctx
            .project
            .assets
            .characters
            .get(name)
            .ok_or_else(|| PanelForgeError::UnknownCharacter { name: name.into() })?;
        let request = prompt::edit_request(asset, instruction, &self.safety_preamble);
        let response = self.dispatcher.call(RequestKind::Image, &request).await?;
        let new_asset = expect_image(response)?;
        ctx.project.assets.characters.insert(name.to_string(), new_asset);
        ctx.checkpoint()
    }

    /// Single-asset edit: replace a page image in place.
    pub async fn edit_page(
        &self,
        ctx: &mut PipelineContext,
        index: usize,
        instruction: &str,
    ) -> Result<(), PanelForgeError> {
        let total = ctx.project.assets.pages.len();
        let asset = ctx
            .project
            .assets
            .pages
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(PanelForgeError::PageOutOfRange { page: index, total })?;
        let request = prompt::edit_request(asset, instruction, &self.safety_preamble);
        let response = self.dispatcher.call(RequestKind::Image, &request).await?;
        let new_asset = expect_image(response)?;
        ctx.project.assets.pages[index] = Some(new_asset);
        ctx.checkpoint()
    }
}

/// Characters and pages that are still unsettled: no asset and no
/// recorded failure.
pub fn unsettled(project: &Project) -> (Vec<String>, Vec<usize>) {
    let failures = &project.failures;
    let mut characters = Vec::new();
    let mut pages = Vec::new();
    if let Some(ref plan) = project.plan {
        for c in &plan.characters {
            if !project.assets.characters.contains_key(&c.name)
                && !failures.characters.contains_key(&c.name)
            {
                characters.push(c.name.clone());
            }
        }
        for i in 0..plan.pages.len() {
            let has_asset = project.assets.pages.get(i).map_or(false, Option::is_some);
            if !has_asset && !failures.pages.contains_key(&i) {
                pages.push(i);
            }
        }
    }
    (characters, pages)
}

fn expect_text(response: GenerateResponse) -> Result<String, PanelForgeError> {
    match response {
        GenerateResponse::Text(text) => Ok(text),
        GenerateResponse::Image { .. } => Err(PanelForgeError::MalformedResponse {
            message: "expected a text response, got an image".into(),
        }),
    }
}

fn expect_image(response: GenerateResponse) -> Result<ImageAsset, PanelForgeError> {
    match response {
        GenerateResponse::Image { data, mime_type } => Ok(ImageAsset::new(data, mime_type)),
        GenerateResponse::Text(_) => Err(PanelForgeError::MissingImage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CharacterSpec, PageSpec, Plan};
    use pretty_assertions::assert_eq;

    fn planned_project() -> Project {
        let plan = Plan {
            title: "T".into(),
            global_style: "noir".into(),
            characters: vec![
                CharacterSpec {
                    name: "Aya".into(),
                    description: "a".into(),
                },
                CharacterSpec {
                    name: "Ben".into(),
                    description: "b".into(),
                },
            ],
            pages: vec![
                PageSpec {
                    page_number: 1,
                    scene_description: "attic".into(),
                    composition_suggestion: None,
                    suggested_emotion: None,
                    narration: None,
                    dialogue: vec![],
                },
                PageSpec {
                    page_number: 2,
                    scene_description: "rooftop".into(),
                    composition_suggestion: None,
                    suggested_emotion: None,
                    narration: None,
                    dialogue: vec![],
                },
            ],
        };
        let mut project = Project::new("a story");
        project.assets.ensure_page_slots(plan.pages.len());
        project.plan = Some(plan);
        project
    }

    #[test]
    fn unsettled_lists_items_without_asset_or_failure() {
        let mut project = planned_project();
        project
            .assets
            .characters
            .insert("Aya".into(), ImageAsset::new(vec![1], "image/png"));
        project.failures.pages.insert(0, "blocked".into());

        let (characters, pages) = unsettled(&project);
        // Aya has an asset, page 1 a recorded failure; the rest is open
        assert_eq!(characters, vec!["Ben".to_string()]);
        assert_eq!(pages, vec![1]);
    }

    #[test]
    fn unsettled_is_empty_before_planning() {
        let (characters, pages) = unsettled(&Project::new("a story"));
        assert!(characters.is_empty());
        assert!(pages.is_empty());
    }
}
