//! Core configuration struct and loading logic.
//!
//! This module provides the main [`Config`] struct which aggregates the
//! provider settings: credentials, the target owner and the API endpoint.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app_auth::AppAuth;
use crate::error::{ConfigError, Result};
use crate::persistence::{find_config_file, read_json_file, write_json_file};

/// The public GitHub REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com/";

/// Provider configuration.
///
/// # Examples
///
/// ```
/// use hubform_config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.base_url(), "https://api.github.com/");
/// assert!(config.validate().is_ok());
///
/// let config = Config {
///     owner: Some("octo-org".to_string()),
///     github_token: Some("ghp_xxx".to_string()),
///     ..Default::default()
/// };
/// assert_eq!(config.owner.as_deref(), Some("octo-org"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Personal access token.
    ///
    /// If neither this nor [`app_auth`](Self::app_auth) is set, the token is
    /// taken from the `gh` CLI when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// The user or organization that owns the managed objects.
    ///
    /// When unset, the authenticated user is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// REST API base URL. Set this for GitHub Enterprise Server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// GitHub App installation credentials, as an alternative to a token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_auth: Option<AppAuth>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_token: None,
            owner: None,
            base_url: default_base_url(),
            app_auth: None,
        }
    }
}

impl Config {
    /// Loads configuration from the default file locations, then applies
    /// environment overrides.
    ///
    /// If no configuration file is found, the defaults are used.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is found but cannot be
    /// read or parsed, or if the result fails validation.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hubform_config::Config;
    ///
    /// # async fn example() -> hubform_config::Result<()> {
    /// let config = Config::load().await?;
    /// println!("Talking to {}", config.base_url());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load() -> Result<Self> {
        let mut config = match find_config_file() {
            Some(path) => {
                debug!(path = %path.display(), "loading provider configuration");
                read_json_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a specific file, without environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// result fails validation.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let config: Config = read_json_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        write_json_file(path, self)
    }

    /// Applies overrides from the process environment.
    ///
    /// See [`apply_env_with`](Self::apply_env_with) for the variables read.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Applies overrides from an environment lookup function.
    ///
    /// | Variable | Setting |
    /// |----------|---------|
    /// | `GITHUB_TOKEN` | `github_token` |
    /// | `GITHUB_OWNER`, then `GITHUB_ORGANIZATION` | `owner` |
    /// | `GITHUB_BASE_URL` | `base_url` |
    /// | `GITHUB_APP_ID`, `GITHUB_APP_INSTALLATION_ID`, `GITHUB_APP_PEM_FILE` | `app_auth` (all three required) |
    ///
    /// Empty values are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use hubform_config::Config;
    ///
    /// let mut config = Config::default();
    /// config.apply_env_with(|name| match name {
    ///     "GITHUB_ORGANIZATION" => Some("octo-org".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.owner.as_deref(), Some("octo-org"));
    /// ```
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(token) = var("GITHUB_TOKEN") {
            self.github_token = Some(token);
        }
        if let Some(owner) = var("GITHUB_OWNER").or_else(|| var("GITHUB_ORGANIZATION")) {
            self.owner = Some(owner);
        }
        if let Some(base_url) = var("GITHUB_BASE_URL") {
            self.base_url = base_url;
        }
        if let (Some(id), Some(installation_id), Some(pem_file)) = (
            var("GITHUB_APP_ID"),
            var("GITHUB_APP_INSTALLATION_ID"),
            var("GITHUB_APP_PEM_FILE"),
        ) {
            self.app_auth = Some(AppAuth {
                id,
                installation_id,
                pem_file,
            });
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s), if both a token and
    /// app credentials are configured, or if app credentials are incomplete.
    ///
    /// # Examples
    ///
    /// ```
    /// use hubform_config::Config;
    ///
    /// let config = Config {
    ///     base_url: "ftp://example.com".to_string(),
    ///     ..Default::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| ConfigError::InvalidBaseUrl(self.base_url.clone()))?;
        if rest.trim_end_matches('/').is_empty() {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }

        if let Some(app) = &self.app_auth {
            if self.github_token.is_some() {
                return Err(ConfigError::Conflict(
                    "github_token and app_auth cannot both be set".to_string(),
                ));
            }
            app.validate()?;
        }

        if self.owner.as_deref().is_some_and(|o| o.trim().is_empty()) {
            return Err(ConfigError::Conflict("owner cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Returns the base URL with exactly one trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}/", self.base_url.trim().trim_end_matches('/'))
    }

    /// Returns the GitHub hostname the base URL belongs to.
    ///
    /// `api.github.com` maps to `github.com`; Enterprise hosts are returned
    /// as-is.
    ///
    /// # Examples
    ///
    /// ```
    /// use hubform_config::Config;
    ///
    /// assert_eq!(Config::default().hostname(), "github.com");
    ///
    /// let ghes = Config {
    ///     base_url: "https://ghe.example.com/api/v3/".to_string(),
    ///     ..Default::default()
    /// };
    /// assert_eq!(ghes.hostname(), "ghe.example.com");
    /// ```
    #[must_use]
    pub fn hostname(&self) -> String {
        let url = self.base_url.trim();
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url);
        let host = rest.split('/').next().unwrap_or(rest);
        match host {
            "api.github.com" => "github.com".to_string(),
            other => other.to_string(),
        }
    }
}
