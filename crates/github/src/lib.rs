//! GitHub resources and data sources for hubform.
//!
//! This crate turns GitHub's REST and GraphQL APIs into declarative
//! resources with a create / read / delete / import lifecycle, and into
//! read-only data sources.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - [`GitHubClient`]: the shared API client, built once and passed into
//!   every operation
//! - [`Provider`]: the registry of every [`Resource`] and [`DataSource`],
//!   which validates configuration before any remote call
//! - [`crypto::encrypt_secret`]: sealed-box encryption of Actions secrets
//! - [`pagination`]: draining page-numbered and cursor listings
//! - [`graphql`]: the closed set of GraphQL queries
//! - [`app_token`]: GitHub App installation tokens
//! - [`Error`]: error types for every operation
//!
//! # Reading and reconciling
//!
//! A read either repopulates a record, or clears its identity because the
//! remote object is gone or was changed out of band. Neither is an error:
//!
//! ```no_run
//! use hubform_github::{GitHubClient, Provider};
//! use hubform_protocol::{ReadOutcome, Record};
//!
//! # async fn example() -> hubform_github::Result<()> {
//! let client = GitHubClient::builder().owner("octo-org").build()?;
//! let provider = Provider::new();
//!
//! let mut record = Record::new("hello-world:DEPLOY_KEY");
//! match provider.read(&client, "github_actions_secret", &mut record).await? {
//!     ReadOutcome::Refreshed => println!("still there"),
//!     ReadOutcome::Removed | ReadOutcome::Drifted => assert!(!record.exists()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Authentication
//!
//! Clients are usually built from provider configuration, which resolves a
//! personal token, a `gh` CLI token, or GitHub App credentials:
//!
//! ```no_run
//! use hubform_config::Config;
//! use hubform_github::GitHubClient;
//!
//! # async fn example() -> hubform_github::Result<()> {
//! let config = Config::load().await?;
//! let client = GitHubClient::from_config(&config).await?;
//! println!("managing {}", client.owner()?);
//! # Ok(())
//! # }
//! ```
//!
//! Tokens are held as [`secrecy::SecretString`] and never logged.

pub mod app_token;
pub mod client;
pub mod crypto;
pub mod data_sources;
pub mod error;
pub mod graphql;
pub mod pagination;
pub mod provider;
pub mod resources;

pub use client::{ClientBuilder, GitHubClient};
pub use error::{Error, Result};
pub use provider::{DataSource, Provider, Resource};
pub use resources::secret::PublicKey;
