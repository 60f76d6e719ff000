// src/lib.rs — Library root for PanelForge

pub mod cli;
pub mod core;
pub mod infra;
pub mod notify;
pub mod provider;
