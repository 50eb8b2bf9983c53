//! `github_actions_secret`: a repository Actions secret.
//!
//! Identity is `<repository>:<secret_name>`; imports use
//! `<repository>/<secret_name>`. The value is write-only, so drift is
//! detected through `updated_at`.

use async_trait::async_trait;
use hubform_protocol::identity::{PATH_SEPARATOR, TWO_PART_SEPARATOR, compose, parse_two};
use hubform_protocol::{AttrType, Attribute, Attributes, ReadOutcome, Record, Schema};
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

static SCHEMA: Schema = Schema {
    description: "An encrypted secret available to the workflows of one repository.",
    attributes: &[
        Attribute::required("repository", AttrType::String).force_new(),
        Attribute::required("secret_name", AttrType::String).force_new(),
        ENCRYPTED_VALUE,
        PLAINTEXT_VALUE,
        DESTROY_ON_DRIFT,
        CREATED_AT,
        UPDATED_AT,
    ],
};

#[derive(Debug, Deserialize)]
struct Config {
    repository: String,
    secret_name: String,
    #[serde(default)]
    encrypted_value: Option<String>,
    #[serde(default)]
    plaintext_value: Option<String>,
    #[serde(default = "default_true")]
    destroy_on_drift: bool,
}

fn secret_route(owner: &str, repo: &str, name: &str) -> String {
    format!("/repos/{owner}/{repo}/actions/secrets/{name}")
}

impl GitHubClient {
    /// Fetches a repository secret's metadata, or `None` if it is gone.
    #[instrument(skip(self))]
    pub(crate) async fn repository_secret(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
    ) -> Result<Option<SecretMetadata>> {
        self.find(&secret_route(owner, repo, name)).await
    }
}

/// The `github_actions_secret` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionsSecret;

#[async_trait]
impl Resource for ActionsSecret {
    fn type_name(&self) -> &'static str {
        "github_actions_secret"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    #[instrument(skip_all)]
    async fn create(&self, client: &GitHubClient, config: &Attributes) -> Result<Record> {
        let cfg: Config = decode(config)?;
        let owner = client.owner()?;

        let key = client.repository_public_key(owner, &cfg.repository).await?;
        let value = secret::sealed_value(
            cfg.encrypted_value.as_deref(),
            cfg.plaintext_value.as_deref(),
            &key,
        )?;

        debug!(repository = %cfg.repository, secret = %cfg.secret_name, "writing secret");
        client
            .put_empty(
                &secret_route(owner, &cfg.repository, &cfg.secret_name),
                &PutSecret {
                    encrypted_value: &value,
                    key_id: &key.key_id,
                    visibility: None,
                    selected_repository_ids: None,
                },
            )
            .await?;

        let mut record = Record::with_attributes(
            compose(&[&cfg.repository, &cfg.secret_name], TWO_PART_SEPARATOR),
            config.clone(),
        );
        record.set("destroy_on_drift", cfg.destroy_on_drift);
        Ok(record)
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn read(&self, client: &GitHubClient, record: &mut Record) -> Result<ReadOutcome> {
        let (repository, name) = parse_two(&record.id, TWO_PART_SEPARATOR)?;
        let (repository, name) = (repository.to_string(), name.to_string());

        let Some(metadata) = client.repository_secret(client.owner()?, &repository, &name).await? else {
            record.clear_identity();
            return Ok(ReadOutcome::Removed);
        };

        record.set("repository", repository);
        record.set("secret_name", name);
        Ok(secret::reconcile(record, &metadata))
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn delete(&self, client: &GitHubClient, record: &Record) -> Result<()> {
        let (repository, name) = parse_two(&record.id, TWO_PART_SEPARATOR)?;
        client
            .delete(&secret_route(client.owner()?, repository, name))
            .await
    }

    fn import_state(&self, _client: &GitHubClient, import_id: &str) -> Result<Record> {
        let (repository, name) = parse_two(import_id, PATH_SEPARATOR)?;
        let mut record = Record::new(compose(&[repository, name], TWO_PART_SEPARATOR));
        record.set("repository", repository);
        record.set("secret_name", name);
        record.set("destroy_on_drift", true);
        Ok(record)
    }
}
