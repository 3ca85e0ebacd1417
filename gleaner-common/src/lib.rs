//! Common types and utilities shared across Gleaner crates.
//!
//! This crate holds the shared error type and the observability helpers
//! used by every other crate in the workspace. It stays small so that the
//! HTTP client, the config loader, and the scraping pipeline can all depend
//! on it without pulling in each other.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`GleanerError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use gleaner_common::GleanerError;
//!
//! let err = GleanerError::Config("delay.max_secs < delay.min_secs".into());
//! assert!(err.to_string().starts_with("Configuration error"));
//! ```
use std::path::PathBuf;

pub mod observability;

/// Error types used across the Gleaner workspace.
#[derive(thiserror::Error, Debug)]
pub enum GleanerError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The sitemap could not be fetched or parsed.
    #[error("Sitemap error: {0}")]
    Sitemap(String),

    /// Writing an output artifact failed.
    #[error("Output error at {path}: {message}")]
    Output { path: PathBuf, message: String },
}

/// Convenient alias for results that use [`GleanerError`].
pub type Result<T> = std::result::Result<T, GleanerError>;
