//! `github_actions_organization_secret`: an organization Actions secret.
//!
//! Identity is the secret name. With `visibility = "selected"` the secret is
//! shared with an explicit list of repositories, read back page by page.

use async_trait::async_trait;
use hubform_protocol::validation::Rule;
use hubform_protocol::{AttrType, Attribute, Attributes, Diagnostics, ReadOutcome, Record, Schema};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::secret::{
    self, CREATED_AT, DESTROY_ON_DRIFT, ENCRYPTED_VALUE, PLAINTEXT_VALUE, PutSecret, SecretMetadata,
    UPDATED_AT,
};
use super::{decode, default_true};
use crate::client::GitHubClient;
use crate::error::Result;
use crate::provider::Resource;

const SELECTED: &str = "selected";

static SCHEMA: Schema = Schema {
    description: "An encrypted secret shared by the repositories of an organization.",
    attributes: &[
        Attribute::required("secret_name", AttrType::String).force_new(),
        ENCRYPTED_VALUE,
        PLAINTEXT_VALUE,
        Attribute::required("visibility", AttrType::String)
            .force_new()
            .with_rules(&[Rule::OneOf(&["all", "private", SELECTED])])
            .describe("Which repositories can use the secret."),
        Attribute::optional("selected_repository_ids", AttrType::Set(&AttrType::Int))
            .force_new()
            .describe("Repositories granted access when visibility is `selected`."),
        DESTROY_ON_DRIFT,
        CREATED_AT,
        UPDATED_AT,
    ],
};

#[derive(Debug, Deserialize)]
struct Config {
    secret_name: String,
    #[serde(default)]
    encrypted_value: Option<String>,
    #[serde(default)]
    plaintext_value: Option<String>,
    visibility: String,
    #[serde(default)]
    selected_repository_ids: Option<Vec<i64>>,
    #[serde(default = "default_true")]
    destroy_on_drift: bool,
}

#[derive(Debug, Deserialize)]
struct SelectedRepositories {
    total_count: u64,
    repositories: Vec<RepositoryRef>,
}

#[derive(Debug, Deserialize)]
struct RepositoryRef {
    id: i64,
}

fn secret_route(org: &str, name: &str) -> String {
    format!("/orgs/{org}/actions/secrets/{name}")
}

impl GitHubClient {
    /// Lists the ids of the repositories a selected-visibility secret is
    /// shared with.
    #[instrument(skip(self))]
    pub(crate) async fn organization_secret_repositories(&self, org: &str, name: &str) -> Result<Vec<i64>> {
        let route = format!("{}/repositories", secret_route(org, name));
        let repositories = self
            .list_counted(&route, |page: SelectedRepositories| {
                (page.total_count, page.repositories)
            })
            .await?;
        Ok(repositories.into_iter().map(|r| r.id).collect())
    }
}

/// The `github_actions_organization_secret` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionsOrganizationSecret;

#[async_trait]
impl Resource for ActionsOrganizationSecret {
    fn type_name(&self) -> &'static str {
        "github_actions_organization_secret"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn check(&self, config: &Attributes, diags: &mut Diagnostics) {
        let selected = config.get("visibility").and_then(|v| v.as_str()) == Some(SELECTED);
        let has_ids = config
            .get("selected_repository_ids")
            .is_some_and(|v| !v.is_null());
        if has_ids && !selected {
            diags.error(
                "selected_repository_ids",
                "can only be set when `visibility` is \"selected\"",
            );
        }
    }

    #[instrument(skip_all)]
    async fn create(&self, client: &GitHubClient, config: &Attributes) -> Result<Record> {
        let cfg: Config = decode(config)?;
        let org = client.owner()?;

        let key = client.organization_public_key(org).await?;
        let value = secret::sealed_value(
            cfg.encrypted_value.as_deref(),
            cfg.plaintext_value.as_deref(),
            &key,
        )?;

        let ids = if cfg.visibility == SELECTED {
            Some(cfg.selected_repository_ids.as_deref().unwrap_or_default())
        } else {
            None
        };

        debug!(secret = %cfg.secret_name, visibility = %cfg.visibility, "writing organization secret");
        client
            .put_empty(
                &secret_route(org, &cfg.secret_name),
                &PutSecret {
                    encrypted_value: &value,
                    key_id: &key.key_id,
                    visibility: Some(cfg.visibility.as_str()),
                    selected_repository_ids: ids,
                },
            )
            .await?;

        let mut record = Record::with_attributes(cfg.secret_name.clone(), config.clone());
        record.set("destroy_on_drift", cfg.destroy_on_drift);
        Ok(record)
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn read(&self, client: &GitHubClient, record: &mut Record) -> Result<ReadOutcome> {
        let org = client.owner()?;
        let name = record.id.clone();

        let Some(metadata): Option<SecretMetadata> = client.find(&secret_route(org, &name)).await? else {
            record.clear_identity();
            return Ok(ReadOutcome::Removed);
        };

        if metadata.visibility.as_deref() == Some(SELECTED) {
            let ids = client.organization_secret_repositories(org, &name).await?;
            record.set("selected_repository_ids", ids);
        } else {
            record.attributes.remove("selected_repository_ids");
        }
        if let Some(visibility) = &metadata.visibility {
            record.set("visibility", visibility.as_str());
        }
        record.set("secret_name", name);
        Ok(secret::reconcile(record, &metadata))
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn delete(&self, client: &GitHubClient, record: &Record) -> Result<()> {
        client.delete(&secret_route(client.owner()?, &record.id)).await
    }

    fn import_state(&self, _client: &GitHubClient, import_id: &str) -> Result<Record> {
        let name = import_id.trim();
        if name.is_empty() || name.contains('/') {
            return Err(hubform_protocol::ProtocolError::InvalidIdentity {
                id: import_id.to_string(),
                expected: "<secret_name>".to_string(),
            }
            .into());
        }
        let mut record = Record::new(name);
        record.set("secret_name", name);
        record.set("destroy_on_drift", true);
        Ok(record)
    }
}
