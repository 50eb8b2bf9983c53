//! GraphQL queries.
//!
//! Queries come from a closed [`Query`] enum: the text is static (or built
//! from a bounded template, for the aliased user lookup) and every input
//! travels as a variable, never interpolated into the text.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument, warn};

use crate::client::GitHubClient;
use crate::error::{Error, Result};

/// Page size requested from GraphQL connections.
pub const CONNECTION_PAGE_SIZE: u32 = 100;

const EXTERNAL_IDENTITIES: &str = "\
query($login: String!, $first: Int!, $after: String) {
  organization(login: $login) {
    samlIdentityProvider {
      externalIdentities(first: $first, after: $after) {
        pageInfo { hasNextPage endCursor }
        edges {
          node {
            guid
            user { login }
            samlIdentity { nameId username givenName familyName }
            scimIdentity { username givenName familyName }
          }
        }
      }
    }
  }
}";

/// A query the provider knows how to send.
#[derive(Debug, Clone, Copy)]
pub enum Query<'a> {
    /// Looks up several users at once, one aliased `user` field per login
    /// (`user0`, `user1`, ...).
    Users {
        /// Logins to resolve.
        logins: &'a [String],
    },
    /// One page of an organization's SAML external identities.
    ExternalIdentities {
        /// Organization login.
        organization: &'a str,
        /// Cursor of the previous page.
        after: Option<&'a str>,
    },
}

/// A rendered request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    /// Query text.
    pub query: String,
    /// Variable values.
    pub variables: Map<String, Value>,
}

impl Query<'_> {
    /// Renders the query text and its variables.
    #[must_use]
    pub fn to_request(&self) -> Request {
        match *self {
            Self::Users { logins } => {
                let mut params = Vec::with_capacity(logins.len());
                let mut fields = String::new();
                let mut variables = Map::new();
                for (i, login) in logins.iter().enumerate() {
                    params.push(format!("$login{i}: String!"));
                    fields.push_str(&format!(
                        "  user{i}: user(login: $login{i}) {{ login id email }}\n"
                    ));
                    variables.insert(format!("login{i}"), Value::String(login.clone()));
                }
                Request {
                    query: format!("query({}) {{\n{fields}}}", params.join(", ")),
                    variables,
                }
            }
            Self::ExternalIdentities {
                organization,
                after,
            } => {
                let variables = json!({
                    "login": organization,
                    "first": CONNECTION_PAGE_SIZE,
                    "after": after,
                });
                Request {
                    query: EXTERNAL_IDENTITIES.to_string(),
                    variables: match variables {
                        Value::Object(map) => map,
                        _ => Map::new(),
                    },
                }
            }
        }
    }
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    /// Human-readable message.
    pub message: String,
    /// Error classification, such as `NOT_FOUND`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl GraphQlError {
    /// Returns `true` for `NOT_FOUND` errors.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind.as_deref() == Some("NOT_FOUND")
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

impl GitHubClient {
    /// Sends a query and decodes its `data`.
    ///
    /// Errors for which `tolerate` returns `true` are logged and dropped;
    /// any other error in the response is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphQl`] if the response carries untolerated errors
    /// or no data, and [`Error::Api`] if the request itself fails.
    #[instrument(skip(self, tolerate))]
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &Query<'_>,
        tolerate: fn(&GraphQlError) -> bool,
    ) -> Result<T> {
        let request = query.to_request();
        let envelope: Envelope<T> = self.graphql_raw(&request).await?;

        let (tolerated, fatal): (Vec<_>, Vec<_>) = envelope.errors.into_iter().partition(|e| tolerate(e));
        for error in &tolerated {
            debug!(message = %error.message, "ignoring tolerated GraphQL error");
        }
        if !fatal.is_empty() {
            warn!(count = fatal.len(), "GraphQL query returned errors");
            return Err(Error::GraphQl {
                messages: fatal.into_iter().map(|e| e.message).collect(),
            });
        }

        envelope.data.ok_or_else(|| Error::GraphQl {
            messages: vec!["response carried no data".to_string()],
        })
    }
}

/// Tolerates nothing.
#[must_use]
pub fn strict(_: &GraphQlError) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_query_aliases_each_login() {
        let logins = vec!["octocat".to_string(), "hubot".to_string()];
        let request = Query::Users { logins: &logins }.to_request();

        assert!(request.query.starts_with("query($login0: String!, $login1: String!) {"));
        assert!(request.query.contains("user0: user(login: $login0)"));
        assert!(request.query.contains("user1: user(login: $login1)"));
        assert_eq!(request.variables["login0"], "octocat");
        assert_eq!(request.variables["login1"], "hubot");
    }

    #[test]
    fn logins_never_reach_the_query_text() {
        let logins = vec!["evil\") { viewer { login } }".to_string()];
        let request = Query::Users { logins: &logins }.to_request();
        assert!(!request.query.contains("evil"));
    }

    #[test]
    fn external_identities_first_page_has_null_cursor() {
        let request = Query::ExternalIdentities {
            organization: "octo-org",
            after: None,
        }
        .to_request();
        assert_eq!(request.variables["login"], "octo-org");
        assert_eq!(request.variables["first"], 100);
        assert_eq!(request.variables["after"], Value::Null);
        assert!(request.query.contains("externalIdentities(first: $first, after: $after)"));
    }

    #[test]
    fn error_kind_is_optional() {
        let errors: Vec<GraphQlError> = serde_json::from_value(json!([
            {"message": "Could not resolve to a User", "type": "NOT_FOUND"},
            {"message": "Something else"}
        ]))
        .unwrap();
        assert!(errors[0].is_not_found());
        assert!(!errors[1].is_not_found());
        assert!(!strict(&errors[0]));
    }
}
