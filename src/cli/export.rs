// src/cli/export.rs — Write generated images to disk

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::infra::store::ProjectStore;

pub fn run_export(store: Arc<dyn ProjectStore>, output: &str) -> anyhow::Result<()> {
    let Some(project) = store.load_project()? else {
        anyhow::bail!("no project to export");
    };
    let Some(ref plan) = project.plan else {
        anyhow::bail!("no plan yet; nothing to export");
    };

    let dir = Path::new(output);
    fs::create_dir_all(dir)?;

    let mut written = 0;
    for (name, asset) in &project.assets.characters {
        let file = dir.join(format!("character_{}.{}", sanitize(name), asset.extension()));
        fs::write(&file, &asset.data)?;
        written += 1;
    }
    for (i, slot) in project.assets.pages.iter().enumerate() {
        if let Some(asset) = slot {
            let file = dir.join(format!("page_{:03}.{}", i + 1, asset.extension()));
            fs::write(&file, &asset.data)?;
            written += 1;
        }
    }

    let manifest = serde_json::json!({
        "title": plan.title,
        "global_style": plan.global_style,
        "pages": plan.pages.len(),
        "characters": plan.characters.iter().map(|c| &c.name).collect::<Vec<_>>(),
    });
    fs::write(
        dir.join("manifest.json"),
        serde_json::to_string_pretty(&manifest)?,
    )?;

    println!("wrote {} image(s) to {}", written, dir.display());
    Ok(())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_non_alphanumerics() {
        assert_eq!(sanitize("Aya / the Swift"), "Aya___the_Swift");
    }
}
