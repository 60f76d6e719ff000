// src/infra/paths.rs — Path management
//
// All paths respect the PANELFORGE_HOME environment variable for isolation.
// When unset, everything lives under ~/.panelforge/.

use std::path::PathBuf;

/// Returns the PANELFORGE_HOME override, if set.
fn panelforge_home() -> Option<PathBuf> {
    std::env::var_os("PANELFORGE_HOME").map(PathBuf::from)
}

fn dirs_home() -> PathBuf {
    directories::BaseDirs::new()
        .expect("Could not determine home directory")
        .home_dir()
        .to_path_buf()
}

/// App home: $PANELFORGE_HOME/ or ~/.panelforge/
pub fn home_dir() -> PathBuf {
    if let Some(home) = panelforge_home() {
        return home;
    }
    dirs_home().join(".panelforge")
}

/// Config file path
pub fn config_path() -> PathBuf {
    home_dir().join("config.toml")
}

/// Directory holding keys.json and project.json
pub fn store_dir() -> PathBuf {
    home_dir()
}
