// src/core/mod.rs

pub mod pipeline;
pub mod prompt;
pub mod schema;
pub mod types;
