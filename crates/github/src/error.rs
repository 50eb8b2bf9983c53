//! Error types for GitHub resource operations.
//!
//! The variants follow the provider's error taxonomy:
//!
//! - remote errors ([`Error::Api`], [`Error::GraphQl`]) carry the endpoint
//!   and the underlying cause; "not found" never reaches callers of reads
//! - local configuration problems ([`Error::Validation`],
//!   [`Error::Configuration`], [`Error::Protocol`], [`Error::UnknownType`],
//!   [`Error::UpdateNotSupported`]) are raised before any remote call
//! - encoding problems ([`Error::Encryption`], [`Error::AppToken`],
//!   [`Error::Decode`]) are local and fatal

use hubform_protocol::{Diagnostics, ProtocolError};

/// Errors that can occur during GitHub resource operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A REST call failed.
    #[error("GitHub API error calling {endpoint}: {source}")]
    Api {
        /// The route that was called.
        endpoint: String,
        /// The underlying octocrab error.
        #[source]
        source: octocrab::Error,
    },

    /// A GraphQL query returned errors.
    #[error("GitHub GraphQL error: {}", .messages.join("; "))]
    GraphQl {
        /// The error messages returned by the server.
        messages: Vec<String>,
    },

    /// Token validation failed.
    #[error("token validation failed: {reason}")]
    TokenValidation {
        /// A description of why validation failed.
        reason: String,
    },

    /// Attribute validation failed.
    #[error("invalid configuration: {0}")]
    Validation(Diagnostics),

    /// A configuration problem not expressible as a schema rule.
    #[error("invalid configuration: {reason}")]
    Configuration {
        /// What is wrong.
        reason: String,
    },

    /// A record or identity could not be interpreted.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Provider configuration could not be loaded or resolved.
    #[error(transparent)]
    Config(#[from] hubform_config::ConfigError),

    /// The requested type is not registered.
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// The resource only supports replacement.
    #[error("{resource} does not support in-place updates: every change forces replacement")]
    UpdateNotSupported {
        /// The resource type name.
        resource: &'static str,
    },

    /// An object that was just created or imported could not be read.
    #[error("{resource} '{id}' does not exist")]
    Missing {
        /// The resource type name.
        resource: &'static str,
        /// The identity that was looked up.
        id: String,
    },

    /// A secret could not be encrypted.
    #[error("secret encryption failed: {reason}")]
    Encryption {
        /// What went wrong.
        reason: String,
    },

    /// A GitHub App JWT could not be built.
    #[error("failed to sign GitHub App JWT: {0}")]
    AppToken(#[from] jsonwebtoken::errors::Error),

    /// A response payload did not have the expected shape.
    #[error("failed to decode GitHub response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Wraps an octocrab error with the endpoint it came from.
    pub(crate) fn api(endpoint: &str, source: octocrab::Error) -> Self {
        Self::Api {
            endpoint: endpoint.to_string(),
            source,
        }
    }

    /// Shorthand for [`Error::Configuration`].
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a remote 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { source, .. } => is_not_found(source),
            _ => false,
        }
    }
}

/// Returns `true` if an octocrab error is a GitHub 404 response.
#[must_use]
pub fn is_not_found(e: &octocrab::Error) -> bool {
    matches!(e, octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 404)
}

/// A specialized Result type for GitHub resource operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_update_not_supported() {
        let err = Error::UpdateNotSupported {
            resource: "github_actions_secret",
        };
        assert_eq!(
            err.to_string(),
            "github_actions_secret does not support in-place updates: every change forces replacement"
        );
    }

    #[test]
    fn error_display_graphql_joins_messages() {
        let err = Error::GraphQl {
            messages: vec!["first".to_string(), "second".to_string()],
        };
        assert_eq!(err.to_string(), "GitHub GraphQL error: first; second");
    }

    #[test]
    fn error_display_validation() {
        let mut diags = Diagnostics::new();
        diags.error("name", "attribute is required");
        let err = Error::Validation(diags);
        assert_eq!(
            err.to_string(),
            "invalid configuration: name: attribute is required"
        );
    }

    #[test]
    fn protocol_errors_convert() {
        let err: Error = ProtocolError::NotAnObject.into();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn error_display_token_validation() {
        let err = Error::TokenValidation {
            reason: "token expired".to_string(),
        };
        assert_eq!(err.to_string(), "token validation failed: token expired");
    }
}
