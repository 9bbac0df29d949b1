// src/cli/mod.rs
//! Command-line interface definitions

/// Clap command and option structs
pub mod commands;

pub use commands::{Action, BenchmarkOptions, Commands, ConfigOptions, StartOptions};
