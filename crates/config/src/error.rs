//! Errors raised while locating, reading, writing and validating provider
//! configuration and the JSON documents stored next to it.

use std::path::PathBuf;

/// Configuration and document errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A document could not be read.
    #[error("cannot read {path}: {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A document could not be written.
    #[error("cannot write {path}: {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A document is not valid JSON5 (or does not match the expected shape).
    #[error("malformed document: {0}")]
    ParseJson5(#[from] serde_json5::Error),

    /// A value could not be rendered as JSON.
    #[error("cannot serialize document: {0}")]
    SerializeJson(#[from] serde_json::Error),

    /// The API base URL is not usable.
    #[error("invalid base URL '{0}': expected an http:// or https:// URL")]
    InvalidBaseUrl(String),

    /// Two mutually exclusive settings were both given.
    #[error("conflicting settings: {0}")]
    Conflict(String),

    /// GitHub App authentication settings are incomplete.
    #[error("invalid app_auth: {reason}")]
    InvalidAppAuth {
        /// The reason the settings are invalid.
        reason: String,
    },

    /// No per-user configuration directory exists on this platform.
    #[error("no user configuration directory available")]
    NoHomeDirectory,

    /// `gh` could not be started.
    #[error("cannot run gh to resolve a token: {0}")]
    GhAuthFailed(#[source] std::io::Error),

    /// `gh auth token` exited unsuccessfully.
    #[error("gh auth token exited with {code:?}: {stderr}")]
    GhAuthError {
        /// Exit code, absent when killed by a signal.
        code: Option<i32>,
        /// What `gh` printed to stderr.
        stderr: String,
    },
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, ConfigError>;
