// src/utils/mod.rs
//! Utilities module for common functionality
//!
//! Error handling and logging infrastructure shared by the library and the
//! host binary.

/// Error types and handling utilities
///
/// Contains the [`MinerError`] enum, covering job validation, worker
/// session failures and host-side configuration errors.
pub mod error;

/// Logging configuration and utilities
pub mod logging;

// Re-export for easier access
pub use error::MinerError;
pub use logging::init_logging;
