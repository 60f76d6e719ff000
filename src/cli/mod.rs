// src/cli/mod.rs — CLI definition (clap derive)

pub mod export;
pub mod keys;
pub mod progress;
pub mod run;
pub mod status;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "panelforge", about = "Comic generation pipeline for Gemini", version)]
pub struct Cli {
    /// Config file path
    #[arg(long)]
    pub config: Option<String>,

    /// Suppress progress output
    #[arg(long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the API key pool
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
    /// Generate the comic plan from a story
    Plan {
        /// The story to plan from
        #[arg(trailing_var_arg = true)]
        story: Vec<String>,
        /// Read the story from stdin instead
        #[arg(long)]
        stdin: bool,
    },
    /// One AI refinement pass over the current plan
    Improve,
    /// Edit plan text fields
    EditPlan {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        style: Option<String>,
        /// Character whose description to replace (with --description)
        #[arg(long)]
        character: Option<String>,
        #[arg(long, requires = "character")]
        description: Option<String>,
        /// Page number (1-based) for the page-field options below
        #[arg(long)]
        page: Option<usize>,
        #[arg(long, requires = "page")]
        scene: Option<String>,
        #[arg(long, requires = "page")]
        composition: Option<String>,
        #[arg(long, requires = "page")]
        emotion: Option<String>,
        #[arg(long, requires = "page")]
        narration: Option<String>,
    },
    /// Generate character reference portraits
    Characters,
    /// Generate the comic pages
    Pages,
    /// Edit one generated image with a free-text instruction
    Edit {
        #[command(subcommand)]
        target: EditTarget,
    },
    /// Show project, pool, and failure status
    Status,
    /// Write generated images to a directory
    Export {
        /// Output directory
        #[arg(short, long, default_value = "export")]
        output: String,
    },
    /// Delete the project and all generated assets
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum KeysAction {
    /// Append API keys to the pool (duplicates are ignored)
    Add {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Show pool size and cursor position
    List,
}

#[derive(Subcommand)]
pub enum EditTarget {
    /// Edit a character portrait
    Character {
        name: String,
        #[arg(trailing_var_arg = true, required = true)]
        instruction: Vec<String>,
    },
    /// Edit a page image (1-based page number)
    Page {
        number: usize,
        #[arg(trailing_var_arg = true, required = true)]
        instruction: Vec<String>,
    },
}
