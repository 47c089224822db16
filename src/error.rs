//! Error types
//!
//! One enum per layer. Anticipated per-item failures never surface here; they are
//! absorbed by the builder as skipped items or empty fields. What remains are the
//! fatal tiers: bad configuration, bad target, sink failures, and cancellation.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration could not be loaded or failed validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid glob pattern '{pattern}': {message}")]
    Glob { pattern: String, message: String },

    #[error("Invalid sidecar pattern '{pattern}' for type '{sidecar_type}': {message}")]
    SidecarPattern {
        sidecar_type: String,
        pattern: String,
        message: String,
    },
}

/// A directory listing could not be produced.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Failed to read directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures from an output sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to write output stream: {0}")]
    Stream(#[source] std::io::Error),
}

/// Errors that abort a tree build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Build cancelled")]
    Cancelled,

    #[error("Target could not be indexed: {path} ({reason})")]
    Skipped { path: PathBuf, reason: String },

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Top-level errors for a complete indexing run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid target {path}: {reason}")]
    InvalidTarget { path: PathBuf, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
