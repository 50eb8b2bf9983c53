//! Pieces shared by repository and organization Actions secrets.

use hubform_protocol::validation::Rule;
use hubform_protocol::{AttrType, Attribute, DefaultValue, DriftPolicy, ReadOutcome, Record};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::GitHubClient;
use crate::crypto::encrypt_secret;
use crate::error::{Error, Result};

pub(crate) const ENCRYPTED_VALUE: Attribute = Attribute::optional("encrypted_value", AttrType::String)
    .sensitive()
    .force_new()
    .with_rules(&[
        Rule::Base64,
        Rule::ConflictsWith(&["plaintext_value"]),
        Rule::ExactlyOneOf(&["encrypted_value", "plaintext_value"]),
    ])
    .describe("Value already sealed to the public key, base64 encoded.");

pub(crate) const PLAINTEXT_VALUE: Attribute = Attribute::optional("plaintext_value", AttrType::String)
    .sensitive()
    .force_new()
    .with_rules(&[Rule::ConflictsWith(&["encrypted_value"])])
    .describe("Plaintext value, sealed before upload.");

pub(crate) const DESTROY_ON_DRIFT: Attribute = Attribute::optional("destroy_on_drift", AttrType::Bool)
    .default_value(DefaultValue::Bool(true))
    .describe("Recreate the secret when it was changed outside of hubform.");

pub(crate) const CREATED_AT: Attribute = Attribute::computed("created_at", AttrType::String);

pub(crate) const UPDATED_AT: Attribute =
    Attribute::computed("updated_at", AttrType::String).describe("Drift marker.");

/// A repository or organization public key for sealing secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    /// Identifier sent back along with sealed values.
    pub key_id: String,
    /// Base64 encoded X25519 public key.
    pub key: String,
}

/// Secret metadata; GitHub never returns the value.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SecretMetadata {
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub visibility: Option<String>,
}

/// Body of a secret `PUT`.
#[derive(Debug, Serialize)]
pub(crate) struct PutSecret<'a> {
    pub encrypted_value: &'a str,
    pub key_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_repository_ids: Option<&'a [i64]>,
}

impl GitHubClient {
    /// Fetches the public key of a repository's Actions secrets.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    #[instrument(skip(self))]
    pub async fn repository_public_key(&self, owner: &str, repo: &str) -> Result<PublicKey> {
        self.get(&format!("/repos/{owner}/{repo}/actions/secrets/public-key"))
            .await
    }

    /// Fetches the public key of an organization's Actions secrets.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    #[instrument(skip(self))]
    pub async fn organization_public_key(&self, org: &str) -> Result<PublicKey> {
        self.get(&format!("/orgs/{org}/actions/secrets/public-key"))
            .await
    }
}

/// Returns the value to upload: the pre-sealed value as is, or the plaintext
/// sealed to `key`.
pub(crate) fn sealed_value(
    encrypted: Option<&str>,
    plaintext: Option<&str>,
    key: &PublicKey,
) -> Result<String> {
    match (encrypted, plaintext) {
        (Some(sealed), _) => {
            debug!("using pre-encrypted value");
            Ok(sealed.to_string())
        }
        (None, Some(plaintext)) => encrypt_secret(plaintext, &key.key),
        (None, None) => Err(Error::config(
            "one of `encrypted_value` or `plaintext_value` must be set",
        )),
    }
}

/// Records observed metadata and checks the drift marker.
pub(crate) fn reconcile(record: &mut Record, metadata: &SecretMetadata) -> ReadOutcome {
    record.set("created_at", metadata.created_at.as_str());
    let policy = DriftPolicy::from_destroy_on_drift(record.get_bool("destroy_on_drift").unwrap_or(true));
    record.reconcile_marker("updated_at", &metadata.updated_at, policy)
}
