// src/main.rs — PanelForge entry point

use clap::Parser;
use std::sync::Arc;

use panelforge::cli::{run, Cli, Commands, KeysAction};
use panelforge::infra::config::Config;
use panelforge::infra::logger;
use panelforge::infra::store::JsonFileStore;
use panelforge::notify::{Notifier, NoopNotifier};

#[tokio::main]
async fn main() {
    // Respects RUST_LOG
    logger::init_logging("warn");

    if let Err(e) = try_main().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn try_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    let store = Arc::new(JsonFileStore::at_default_location());
    let notifier: Arc<dyn Notifier> = if cli.quiet {
        Arc::new(NoopNotifier)
    } else {
        Arc::new(panelforge::cli::progress::TerminalNotifier)
    };

    let app = run::App {
        config,
        store: store.clone(),
        notifier,
    };

    match cli.command {
        Commands::Keys { action } => match action {
            KeysAction::Add { keys } => panelforge::cli::keys::run_add(store, &keys),
            KeysAction::List => panelforge::cli::keys::run_list(store),
        },
        Commands::Plan { story, stdin } => run::run_plan(&app, &story, stdin).await,
        Commands::Improve => run::run_improve(&app).await,
        Commands::EditPlan {
            title,
            style,
            character,
            description,
            page,
            scene,
            composition,
            emotion,
            narration,
        } => run::run_edit_plan(
            &app,
            title,
            style,
            character,
            description,
            page,
            scene,
            composition,
            emotion,
            narration,
        ),
        Commands::Characters => run::run_characters(&app).await,
        Commands::Pages => run::run_pages(&app).await,
        Commands::Edit { target } => run::run_edit(&app, &target).await,
        Commands::Status => panelforge::cli::status::show_status(store),
        Commands::Export { output } => panelforge::cli::export::run_export(store, &output),
        Commands::Reset { yes } => run::run_reset(&app, yes),
    }
}
