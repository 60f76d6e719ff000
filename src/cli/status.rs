// src/cli/status.rs — Project status display

use std::sync::Arc;

use crate::cli::progress::status_label;
use crate::core::pipeline::unsettled;
use crate::infra::store::ProjectStore;
use crate::provider::pool::SharedPool;

pub fn show_status(store: Arc<dyn ProjectStore>) -> anyhow::Result<()> {
    let pool = SharedPool::load(store.clone())?;
    println!("keys: {} (cursor at {})", pool.len(), pool.cursor() + 1);

    let Some(project) = store.load_project()? else {
        println!("no project; start one with `panelforge plan <story>`");
        return Ok(());
    };

    println!("project: {} ({})", project.id, status_label(project.status));
    let Some(ref plan) = project.plan else {
        println!("plan: none yet");
        return Ok(());
    };

    println!("plan: \"{}\" — style: {}", plan.title, plan.global_style);

    println!("characters:");
    for c in &plan.characters {
        let mark = if project.assets.characters.contains_key(&c.name) {
            "✓".to_string()
        } else if let Some(reason) = project.failures.characters.get(&c.name) {
            format!("✗ {}", reason)
        } else {
            "·".to_string()
        };
        println!("  {} {}", mark, c.name);
    }

    println!("pages:");
    for (i, page) in plan.pages.iter().enumerate() {
        let has_asset = project.assets.pages.get(i).map_or(false, Option::is_some);
        let mark = if has_asset {
            "✓".to_string()
        } else if let Some(reason) = project.failures.pages.get(&i) {
            format!("✗ {}", reason)
        } else {
            "·".to_string()
        };
        println!("  {} page {}", mark, page.page_number);
    }

    let (open_characters, open_pages) = unsettled(&project);
    if !open_characters.is_empty() || !open_pages.is_empty() {
        println!(
            "unfinished: {} character(s), {} page(s); re-run `panelforge characters` / `panelforge pages` to continue",
            open_characters.len(),
            open_pages.len()
        );
    }

    Ok(())
}
