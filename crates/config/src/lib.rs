//! Provider configuration for hubform.
//!
//! This crate handles loading, validating, and persisting the provider
//! configuration from files, environment variables and defaults.
//!
//! # Overview
//!
//! - [`config`]: the [`Config`] struct and loading logic
//! - [`app_auth`]: GitHub App installation credentials
//! - [`auth`]: personal access token resolution
//! - [`persistence`]: JSON5/JSON document reading and writing
//! - [`error`]: error types for configuration operations
//!
//! # Configuration Sources (Priority)
//!
//! 1. Environment variables (`GITHUB_TOKEN`, `GITHUB_OWNER`, ...)
//! 2. `$HUBFORM_CONFIG`, or local config (`./hubform.json5` / `./hubform.json`)
//! 3. User config (`~/.config/hubform/config.json5` / `config.json`)
//! 4. Built-in defaults
//!
//! # Examples
//!
//! ```no_run
//! use hubform_config::Config;
//!
//! # async fn example() -> hubform_config::Result<()> {
//! let config = Config::load().await?;
//! if let Some(owner) = &config.owner {
//!     println!("Managing objects owned by {owner}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod app_auth;
pub mod auth;
pub mod config;
pub mod error;
pub mod persistence;

// Re-export primary types at crate root for convenience
pub use app_auth::AppAuth;
pub use config::{Config, DEFAULT_BASE_URL};
pub use error::{ConfigError, Result};
