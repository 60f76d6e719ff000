// src/infra/logger.rs — Structured logging with tracing
//
// Quiet by default: the fallback filter scopes the level to this crate so
// dependency noise never reaches the terminal. RUST_LOG overrides it.

use tracing_subscriber::{fmt, EnvFilter};

fn default_directives(level: &str) -> String {
    format!("panelforge={level}")
}

pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_filter_is_crate_scoped() {
        assert_eq!(default_directives("warn"), "panelforge=warn");
        assert_eq!(default_directives("debug"), "panelforge=debug");
    }
}
