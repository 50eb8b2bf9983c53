//! GitHub token resolution.
//!
//! A token is resolved in the following order:
//!
//! 1. `github_token` from the configuration (or `GITHUB_TOKEN`)
//! 2. `gh auth token --hostname <host>` (GitHub CLI)
//! 3. Unauthenticated (returns `None`)
//!
//! App installation credentials are exchanged for a token by the GitHub
//! client, not here.

use tracing::debug;

use crate::Config;
use crate::error::{ConfigError, Result};

/// Resolves the personal access token to use for `config`.
///
/// Failures of the `gh` CLI are logged and treated as "no token".
///
/// # Examples
///
/// ```no_run
/// use hubform_config::{Config, auth::resolve_token};
///
/// # async fn example() {
/// let config = Config {
///     github_token: Some("ghp_explicit".to_string()),
///     ..Default::default()
/// };
/// assert_eq!(resolve_token(&config).await.as_deref(), Some("ghp_explicit"));
/// # }
/// ```
pub async fn resolve_token(config: &Config) -> Option<String> {
    if let Some(token) = config.github_token.as_deref().filter(|t| !t.trim().is_empty()) {
        return Some(token.to_string());
    }

    if config.app_auth.is_some() {
        return None;
    }

    match get_gh_token(&config.hostname()).await {
        Ok(token) => token,
        Err(e) => {
            debug!(error = %e, "gh CLI did not provide a token");
            None
        }
    }
}

/// Gets a GitHub token for `hostname` from the `gh` CLI.
///
/// # Returns
///
/// - `Ok(Some(token))` if the command succeeds and returns a token
/// - `Ok(None)` if `gh` is not installed or not logged in
/// - `Err(...)` if the command exists but fails otherwise
///
/// # Errors
///
/// Returns [`ConfigError::GhAuthFailed`] if the command cannot be run, and
/// [`ConfigError::GhAuthError`] if it exits with an unexpected failure.
pub async fn get_gh_token(hostname: &str) -> Result<Option<String>> {
    use tokio::process::Command;

    let output = match Command::new("gh")
        .args(["auth", "token", "--hostname", hostname])
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConfigError::GhAuthFailed(e)),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if stderr.contains("not logged in") || stderr.contains("no oauth token") {
            return Ok(None);
        }
        return Err(ConfigError::GhAuthError {
            code: output.status.code(),
            stderr,
        });
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(Some(token).filter(|t| !t.is_empty()))
}
