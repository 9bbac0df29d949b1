// src/config/mod.rs
//! Configuration management for the miner
//!
//! This module handles loading the TOML configuration file and generating a
//! commented template. Command-line options override file values.

/// Core configuration implementation
///
/// Contains the [`Config`] struct and its defaults.
pub mod config;

// Re-export key items for easy access
pub use config::Config;

use crate::utils::error::MinerError;
use std::path::PathBuf;

/// Loads the TOML configuration at `path` if the file exists
///
/// Returns `Ok(None)` for a missing file so the caller can fall back to
/// defaults once logging is up.
///
/// # Arguments
/// * `path` - Path to the configuration file (anything convertible to PathBuf)
pub fn load_if_present(path: impl Into<PathBuf>) -> Result<Option<Config>, MinerError> {
    let path = path.into();
    if !path.exists() {
        return Ok(None);
    }
    Config::load(path).map(Some)
}

/// Generates a commented configuration template
pub fn generate_template() -> String {
    Config::generate_template()
}
