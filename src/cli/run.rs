// src/cli/run.rs — Command handlers for the generation stages

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::EditTarget;
use crate::core::pipeline::{Pipeline, PipelineContext, StageReport};
use crate::core::types::{PlanEdit, Project};
use crate::infra::config::Config;
use crate::infra::errors::PanelForgeError;
use crate::infra::store::ProjectStore;
use crate::notify::Notifier;
use crate::provider::classify::ErrorClassifier;
use crate::provider::dispatch::Dispatcher;
use crate::provider::google::GoogleBackend;
use crate::provider::pool::SharedPool;

/// Everything a command handler needs, built once in main.
pub struct App {
    pub config: Config,
    pub store: Arc<dyn ProjectStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl App {
    fn pipeline(&self) -> Result<(Pipeline, SharedPool), PanelForgeError> {
        let pool = SharedPool::load(self.store.clone())?;
        let backend = Arc::new(GoogleBackend::new(
            self.config.models.clone(),
            Duration::from_secs(self.config.dispatch.request_timeout_secs),
        ));
        let dispatcher = Dispatcher::new(
            backend,
            pool.clone(),
            ErrorClassifier::new(self.config.classifier.clone()),
            self.config.dispatch.clone(),
            self.notifier.clone(),
        );
        let pipeline = Pipeline::new(dispatcher, self.config.safety.preamble.clone());
        Ok((pipeline, pool))
    }

    fn load_context(&self, pool: SharedPool) -> Result<PipelineContext, PanelForgeError> {
        let project = self
            .store
            .load_project()?
            .ok_or(PanelForgeError::NoProject)?;
        Ok(PipelineContext::new(
            project,
            pool,
            self.store.clone(),
            self.notifier.clone(),
        ))
    }
}

pub async fn run_plan(app: &App, story: &[String], stdin: bool) -> anyhow::Result<()> {
    let story = if stdin {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        story.join(" ")
    };
    if story.trim().is_empty() {
        anyhow::bail!("empty story; pass it as arguments or via --stdin");
    }

    let (pipeline, pool) = app.pipeline()?;

    // Reuse a project whose planning never finished; a planned project
    // must be reset first (the plan is written exactly once).
    let project = match app.store.load_project()? {
        Some(p) if p.plan.is_none() => {
            let mut p = p;
            p.story = story;
            p
        }
        Some(_) => anyhow::bail!(
            "a planned project already exists; use `improve`/`edit-plan`, or `reset` to start over"
        ),
        None => Project::new(story),
    };

    let mut ctx = PipelineContext::new(project, pool, app.store.clone(), app.notifier.clone());
    ctx.checkpoint()?;
    pipeline.run_planning(&mut ctx).await?;

    let plan = ctx.project.plan()?;
    println!(
        "plan ready: \"{}\" — {} characters, {} pages",
        plan.title,
        plan.characters.len(),
        plan.pages.len()
    );
    Ok(())
}

pub async fn run_improve(app: &App) -> anyhow::Result<()> {
    let (pipeline, pool) = app.pipeline()?;
    let mut ctx = app.load_context(pool)?;
    pipeline.improve_plan(&mut ctx).await?;
    println!("plan improved: \"{}\"", ctx.project.plan()?.title);
    Ok(())
}

pub async fn run_characters(app: &App) -> anyhow::Result<()> {
    let (pipeline, pool) = app.pipeline()?;
    let mut ctx = app.load_context(pool)?;
    let report = pipeline.run_characters(&mut ctx).await?;
    print_report("characters", report);
    Ok(())
}

pub async fn run_pages(app: &App) -> anyhow::Result<()> {
    let (pipeline, pool) = app.pipeline()?;
    let mut ctx = app.load_context(pool)?;
    let report = pipeline.run_pages(&mut ctx).await?;
    print_report("pages", report);
    Ok(())
}

pub async fn run_edit(app: &App, target: &EditTarget) -> anyhow::Result<()> {
    let (pipeline, pool) = app.pipeline()?;
    let mut ctx = app.load_context(pool)?;
    match target {
        EditTarget::Character { name, instruction } => {
            pipeline
                .edit_character(&mut ctx, name, &instruction.join(" "))
                .await?;
            println!("updated portrait for {}", name);
        }
        EditTarget::Page {
            number,
            instruction,
        } => {
            if *number == 0 {
                anyhow::bail!("page numbers start at 1");
            }
            pipeline
                .edit_page(&mut ctx, number - 1, &instruction.join(" "))
                .await?;
            println!("updated page {}", number);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn run_edit_plan(
    app: &App,
    title: Option<String>,
    style: Option<String>,
    character: Option<String>,
    description: Option<String>,
    page: Option<usize>,
    scene: Option<String>,
    composition: Option<String>,
    emotion: Option<String>,
    narration: Option<String>,
) -> anyhow::Result<()> {
    let pool = SharedPool::load(app.store.clone())?;
    let mut ctx = app.load_context(pool)?;

    let mut edits: Vec<PlanEdit> = Vec::new();
    if let Some(v) = title {
        edits.push(PlanEdit::Title(v));
    }
    if let Some(v) = style {
        edits.push(PlanEdit::GlobalStyle(v));
    }
    if let (Some(name), Some(value)) = (character, description) {
        edits.push(PlanEdit::CharacterDescription { name, value });
    }
    if let Some(number) = page {
        if number == 0 {
            anyhow::bail!("page numbers start at 1");
        }
        let page = number - 1;
        if let Some(v) = scene {
            edits.push(PlanEdit::SceneDescription { page, value: v });
        }
        if let Some(v) = composition {
            edits.push(PlanEdit::CompositionSuggestion {
                page,
                value: Some(v),
            });
        }
        if let Some(v) = emotion {
            edits.push(PlanEdit::SuggestedEmotion {
                page,
                value: Some(v),
            });
        }
        if let Some(v) = narration {
            edits.push(PlanEdit::Narration {
                page,
                value: Some(v),
            });
        }
    }

    if edits.is_empty() {
        anyhow::bail!("nothing to edit; see `panelforge edit-plan --help`");
    }

    // One persisted write per edit, through the single entry point.
    let count = edits.len();
    for edit in edits {
        ctx.apply_plan_edit(edit)?;
    }
    println!("applied {} plan edit(s)", count);
    Ok(())
}

pub fn run_reset(app: &App, yes: bool) -> anyhow::Result<()> {
    if app.store.load_project()?.is_none() {
        println!("nothing to reset");
        return Ok(());
    }
    if !yes {
        anyhow::bail!("this deletes the plan and every generated image; re-run with --yes");
    }
    let pool = SharedPool::load(app.store.clone())?;
    let mut ctx = app.load_context(pool)?;
    ctx.reset()?;
    println!("project reset");
    Ok(())
}

fn print_report(stage: &str, report: StageReport) {
    println!(
        "{}: {} generated, {} skipped (already present), {} failed",
        stage, report.generated, report.skipped, report.failed
    );
    if report.failed > 0 {
        println!("inspect failures with `panelforge status`, then re-run to retry them");
    }
}
