//! GitHub App installation tokens.
//!
//! An app authenticates with a short-lived RS256 JWT (`iss` is the app id)
//! and exchanges it for an installation token through
//! `POST /app/installations/{id}/access_tokens`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::GitHubClient;
use crate::error::{Error, Result};

/// Clock skew allowance applied to `iat`.
const ISSUED_AT_SKEW: Duration = Duration::seconds(60);

/// JWT lifetime. GitHub rejects anything above ten minutes.
const JWT_LIFETIME: Duration = Duration::seconds(600);

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iat: i64,
    exp: i64,
    iss: String,
}

/// An installation access token.
#[derive(Debug)]
pub struct InstallationToken {
    /// The token itself.
    pub token: SecretString,
    /// When GitHub expires the token.
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

/// Signs an app JWT valid from a minute before `now` for ten minutes.
///
/// # Errors
///
/// Returns [`Error::AppToken`] if the PEM is not an RSA private key.
pub fn app_jwt(app_id: &str, pem: &str, now: DateTime<Utc>) -> Result<String> {
    let claims = Claims {
        iat: (now - ISSUED_AT_SKEW).timestamp(),
        exp: (now + JWT_LIFETIME).timestamp(),
        iss: app_id.to_string(),
    };
    let key = EncodingKey::from_rsa_pem(pem.as_bytes())?;
    Ok(jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)?)
}

/// Exchanges app credentials for an installation token.
///
/// # Errors
///
/// Returns an error if the JWT cannot be signed or GitHub rejects it.
#[instrument(skip(pem), fields(base_url = %base_url))]
pub async fn installation_token(
    base_url: &str,
    app_id: &str,
    installation_id: &str,
    pem: &str,
) -> Result<InstallationToken> {
    let jwt = app_jwt(app_id, pem, Utc::now())?;
    let app_client = GitHubClient::builder()
        .base_url(base_url)
        .token(SecretString::from(jwt))
        .build()?;

    let route = format!("/app/installations/{installation_id}/access_tokens");
    let response: AccessTokenResponse = app_client.post(&route, &serde_json::json!({})).await?;
    debug!(expires_at = ?response.expires_at, "obtained installation token");

    if response.token.is_empty() {
        return Err(Error::config("GitHub returned an empty installation token"));
    }

    Ok(InstallationToken {
        token: SecretString::from(response.token),
        expires_at: response.expires_at,
    })
}
