//! GitHub API client implementation.
//!
//! This module provides the [`GitHubClient`] struct shared by every resource
//! and data source. It wraps octocrab with the handful of call shapes the
//! provider needs:
//!
//! - typed `GET`/`POST`/`PATCH` calls
//! - [`GitHubClient::find`], which maps a 404 to `None` for reads
//! - [`GitHubClient::put_empty`] and [`GitHubClient::delete`] for endpoints
//!   answering `204 No Content`
//!
//! Every failure is tagged with the route that was called.

use hubform_config::Config;
use octocrab::{FromResponse, Octocrab};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::app_token;
use crate::error::{Error, Result, is_not_found};

/// GitHub API client bound to an owner (user or organization).
///
/// One client is built when the provider is configured and passed by
/// reference into every operation.
///
/// # Security
///
/// Tokens are stored using [`SecretString`] to prevent accidental logging
/// or exposure in debug output.
///
/// # Examples
///
/// ```no_run
/// use secrecy::SecretString;
/// use hubform_github::GitHubClient;
///
/// # async fn example() -> hubform_github::Result<()> {
/// let client = GitHubClient::builder()
///     .token(SecretString::from("ghp_your_token".to_string()))
///     .owner("octo-org")
///     .build()?;
///
/// let is_valid = client.validate_token().await?;
/// println!("Token valid: {}", is_valid);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GitHubClient {
    /// The underlying octocrab client.
    inner: Octocrab,
    /// The account resources are addressed under.
    owner: Option<String>,
    /// REST base URL, with a trailing slash.
    base_url: String,
    /// Whether this client is authenticated.
    authenticated: bool,
}

/// Builder for [`GitHubClient`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    token: Option<SecretString>,
    owner: Option<String>,
}

impl ClientBuilder {
    /// Sets the REST base URL (defaults to `https://api.github.com/`).
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the token sent as a bearer credential.
    #[must_use]
    pub fn token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Sets the owner resources are addressed under.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or octocrab fails to
    /// initialize.
    #[instrument(skip(self), fields(authenticated = self.token.is_some()))]
    pub fn build(self) -> Result<GitHubClient> {
        let base_url = normalize_base_url(
            self.base_url
                .as_deref()
                .unwrap_or(hubform_config::DEFAULT_BASE_URL),
        );

        let builder = Octocrab::builder()
            .base_uri(base_url.as_str())
            .map_err(|e| Error::api(&base_url, e))?;

        let (inner, authenticated) = match self.token {
            Some(token) => {
                debug!(base_url = %base_url, "creating authenticated GitHub client");
                let client = builder
                    .personal_token(token.expose_secret())
                    .build()
                    .map_err(|e| Error::api(&base_url, e))?;
                (client, true)
            }
            None => {
                debug!(base_url = %base_url, "creating unauthenticated GitHub client");
                let client = builder.build().map_err(|e| Error::api(&base_url, e))?;
                (client, false)
            }
        };

        Ok(GitHubClient {
            inner,
            owner: self.owner.filter(|o| !o.is_empty()),
            base_url,
            authenticated,
        })
    }
}

fn normalize_base_url(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}

/// Minimal view of `GET /user`.
#[derive(Debug, serde::Deserialize)]
struct AuthenticatedUser {
    login: String,
}

impl GitHubClient {
    /// Returns a builder for a client.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Builds a client from provider configuration.
    ///
    /// Credentials are resolved in this order: an installation token when
    /// `app_auth` is configured, the explicit token, then the `gh` CLI. When
    /// no owner is configured, the login of the authenticated user is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the installation
    /// token exchange fails, or the owner lookup fails.
    #[instrument(skip(config), fields(base_url = %config.base_url()))]
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let base_url = config.base_url();

        let token = match &config.app_auth {
            Some(app) => {
                debug!(app_id = %app.id, "exchanging GitHub App credentials for an installation token");
                let token =
                    app_token::installation_token(&base_url, &app.id, &app.installation_id, &app.pem())
                        .await?;
                Some(token.token)
            }
            None => hubform_config::auth::resolve_token(config)
                .await
                .map(SecretString::from),
        };

        let mut builder = Self::builder().base_url(base_url);
        if let Some(token) = token {
            builder = builder.token(token);
        }
        if let Some(owner) = &config.owner {
            builder = builder.owner(owner.clone());
        }
        let mut client = builder.build()?;

        if client.owner.is_none() && client.authenticated {
            let user: AuthenticatedUser = client.get("/user").await?;
            debug!(login = %user.login, "no owner configured, using authenticated user");
            client.owner = Some(user.login);
        }

        Ok(client)
    }

    /// Validates the current token by calling `/user`.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if authenticated and token is valid
    /// - `Ok(false)` if not authenticated (no token provided)
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenValidation`] if the token is rejected and
    /// [`Error::Api`] for other API errors.
    #[instrument(skip(self))]
    pub async fn validate_token(&self) -> Result<bool> {
        if !self.authenticated {
            debug!("client is not authenticated, skipping validation");
            return Ok(false);
        }

        debug!("validating token by calling /user endpoint");
        match self.inner.get::<AuthenticatedUser, _, _>("/user", None::<&()>).await {
            Ok(user) => {
                debug!(login = %user.login, "token validated successfully");
                Ok(true)
            }
            Err(octocrab::Error::GitHub { source, .. }) => {
                warn!(message = %source.message, "token validation failed");
                Err(Error::TokenValidation {
                    reason: source.message,
                })
            }
            Err(e) => {
                warn!(error = %e, "API error during token validation");
                Err(Error::api("/user", e))
            }
        }
    }

    /// Returns whether this client is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Returns the owner resources are addressed under.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if no owner is configured.
    pub fn owner(&self) -> Result<&str> {
        self.owner.as_deref().ok_or_else(|| {
            Error::config("an owner is required: set `owner` or GITHUB_OWNER")
        })
    }

    /// Returns the REST base URL, with a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches and decodes a resource.
    pub(crate) async fn get<R: FromResponse>(&self, route: &str) -> Result<R> {
        self.inner
            .get(route, None::<&()>)
            .await
            .map_err(|e| Error::api(route, e))
    }

    /// Fetches and decodes a resource with query parameters.
    pub(crate) async fn get_with<R, P>(&self, route: &str, params: &P) -> Result<R>
    where
        R: FromResponse,
        P: Serialize + ?Sized,
    {
        self.inner
            .get(route, Some(params))
            .await
            .map_err(|e| Error::api(route, e))
    }

    /// Fetches a resource, returning `None` when it does not exist.
    #[instrument(skip(self))]
    pub(crate) async fn find<R: FromResponse>(&self, route: &str) -> Result<Option<R>> {
        match self.inner.get(route, None::<&()>).await {
            Ok(found) => Ok(Some(found)),
            Err(e) if is_not_found(&e) => {
                debug!("remote object not found");
                Ok(None)
            }
            Err(e) => Err(Error::api(route, e)),
        }
    }

    pub(crate) async fn post<R, B>(&self, route: &str, body: &B) -> Result<R>
    where
        R: FromResponse,
        B: Serialize + ?Sized,
    {
        self.inner
            .post(route, Some(body))
            .await
            .map_err(|e| Error::api(route, e))
    }

    /// Sends a `PATCH` whose response body is ignored.
    pub(crate) async fn patch_empty<B: Serialize + ?Sized>(&self, route: &str, body: &B) -> Result<()> {
        let response = self
            .inner
            ._patch(route, Some(body))
            .await
            .map_err(|e| Error::api(route, e))?;
        octocrab::map_github_error(response)
            .await
            .map_err(|e| Error::api(route, e))?;
        Ok(())
    }

    /// Sends a `PUT` whose response body is ignored.
    pub(crate) async fn put_empty<B: Serialize + ?Sized>(&self, route: &str, body: &B) -> Result<()> {
        let response = self
            .inner
            ._put(route, Some(body))
            .await
            .map_err(|e| Error::api(route, e))?;
        octocrab::map_github_error(response)
            .await
            .map_err(|e| Error::api(route, e))?;
        Ok(())
    }

    /// Deletes a resource. A 404 counts as already deleted.
    #[instrument(skip(self))]
    pub(crate) async fn delete(&self, route: &str) -> Result<()> {
        let result = match self.inner._delete(route, None::<&()>).await {
            Ok(response) => octocrab::map_github_error(response).await.map(drop),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!("remote object already deleted");
                Ok(())
            }
            Err(e) => Err(Error::api(route, e)),
        }
    }

    /// Posts a GraphQL payload and decodes the whole `{data, errors}` body.
    ///
    /// Goes through the plain REST `post` so partial errors reach the caller
    /// instead of failing the request.
    pub(crate) async fn graphql_raw<R, B>(&self, payload: &B) -> Result<R>
    where
        R: FromResponse,
        B: Serialize + ?Sized,
    {
        self.post("/graphql", payload).await
    }
}
