//! Common types and utilities shared across the narrate crates.
//!
//! This crate holds the shared error type and the tracing initialisation used
//! by the binary and by integration tests. It stays dependency‑light so every
//! crate in the workspace can depend on it.
//!
//! - [`NarrateError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use narrate_common::{NarrateError, Result};
//!
//! fn pick(index: usize, len: usize) -> Result<usize> {
//!     if index < len {
//!         Ok(index)
//!     } else {
//!         Err(NarrateError::Input(format!("option {index} out of range")))
//!     }
//! }
//!
//! assert!(pick(7, 5).is_err());
//! ```

pub mod observability;

/// Error types used across the narrate workspace.
#[derive(thiserror::Error, Debug)]
pub enum NarrateError {
    /// The navigation loop could not complete a step.
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// The browser driver reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The speech engine could not be started or used.
    #[error("Speech error: {0}")]
    Speech(String),

    /// The input source failed or was closed unexpectedly.
    #[error("Input error: {0}")]
    Input(String),

    /// Operation exceeded its deadline.
    #[error("Timeout occurred")]
    Timeout,
}

/// Convenient alias for results that use [`NarrateError`].
pub type Result<T> = std::result::Result<T, NarrateError>;
