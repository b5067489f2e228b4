//! CLI command handlers

pub mod commands;

pub use commands::{dynamicize, preview, run, RunOptions};
