//! `github_actions_repository_permissions`: which Actions a repository may
//! run.
//!
//! This is a singleton setting of the repository, so "deleting" it restores
//! GitHub's default: Actions enabled, all actions allowed.

use async_trait::async_trait;
use hubform_protocol::validation::Rule;
use hubform_protocol::{
    AttrType, Attribute, Attributes, DefaultValue, Diagnostics, ProtocolError, ReadOutcome, Record,
    Schema,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{decode, default_true};
use crate::client::GitHubClient;
use crate::error::Result;
use crate::provider::Resource;

const SELECTED: &str = "selected";

static ALLOWED_ACTIONS_CONFIG: [Attribute; 3] = [
    Attribute::required("github_owned_allowed", AttrType::Bool),
    Attribute::optional("verified_allowed", AttrType::Bool),
    Attribute::optional("patterns_allowed", AttrType::Set(&AttrType::String)),
];

static SCHEMA: Schema = Schema {
    description: "GitHub Actions permissions of one repository.",
    attributes: &[
        Attribute::required("repository", AttrType::String).force_new(),
        Attribute::optional("enabled", AttrType::Bool)
            .force_new()
            .default_value(DefaultValue::Bool(true)),
        Attribute::optional_computed("allowed_actions", AttrType::String)
            .force_new()
            .with_rules(&[Rule::OneOf(&["all", "local_only", SELECTED])]),
        Attribute::optional("allowed_actions_config", AttrType::Object(&ALLOWED_ACTIONS_CONFIG))
            .force_new()
            .describe("Allow list used when `allowed_actions` is \"selected\"."),
    ],
};

#[derive(Debug, Deserialize)]
struct Config {
    repository: String,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    allowed_actions: Option<String>,
    #[serde(default)]
    allowed_actions_config: Option<SelectedActions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Permissions {
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allowed_actions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SelectedActions {
    github_owned_allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    verified_allowed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    patterns_allowed: Option<Vec<String>>,
}

fn permissions_route(owner: &str, repo: &str) -> String {
    format!("/repos/{owner}/{repo}/actions/permissions")
}

/// The `github_actions_repository_permissions` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionsRepositoryPermissions;

#[async_trait]
impl Resource for ActionsRepositoryPermissions {
    fn type_name(&self) -> &'static str {
        "github_actions_repository_permissions"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn check(&self, config: &Attributes, diags: &mut Diagnostics) {
        let allowed = config.get("allowed_actions").and_then(Value::as_str);
        let has_config = config
            .get("allowed_actions_config")
            .is_some_and(|v| !v.is_null());
        if has_config && allowed != Some(SELECTED) {
            diags.error(
                "allowed_actions_config",
                "can only be set when `allowed_actions` is \"selected\"",
            );
        }
        if config.get("enabled").and_then(Value::as_bool) == Some(false) && allowed.is_some() {
            diags.error("allowed_actions", "cannot be set when Actions are disabled");
        }
    }

    #[instrument(skip_all)]
    async fn create(&self, client: &GitHubClient, config: &Attributes) -> Result<Record> {
        let cfg: Config = decode(config)?;
        let owner = client.owner()?;
        let route = permissions_route(owner, &cfg.repository);

        debug!(repository = %cfg.repository, enabled = cfg.enabled, "setting Actions permissions");
        client
            .put_empty(
                &route,
                &Permissions {
                    enabled: cfg.enabled,
                    allowed_actions: cfg.allowed_actions.clone(),
                },
            )
            .await?;

        if cfg.allowed_actions.as_deref() == Some(SELECTED)
            && let Some(selected) = &cfg.allowed_actions_config
        {
            client
                .put_empty(&format!("{route}/selected-actions"), selected)
                .await?;
        }

        Ok(Record::with_attributes(cfg.repository, config.clone()))
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn read(&self, client: &GitHubClient, record: &mut Record) -> Result<ReadOutcome> {
        let route = permissions_route(client.owner()?, &record.id);
        let Some(permissions) = client.find::<Permissions>(&route).await? else {
            record.clear_identity();
            return Ok(ReadOutcome::Removed);
        };

        if permissions.allowed_actions.as_deref() == Some(SELECTED) {
            let selected: SelectedActions = client.get(&format!("{route}/selected-actions")).await?;
            record.set("allowed_actions_config", serde_json::to_value(selected)?);
        } else {
            record.attributes.remove("allowed_actions_config");
        }

        let repository = record.id.clone();
        record.set("repository", repository);
        record.set("enabled", permissions.enabled);
        match permissions.allowed_actions {
            Some(allowed) if permissions.enabled => record.set("allowed_actions", allowed),
            _ => {
                record.attributes.remove("allowed_actions");
            }
        }
        Ok(ReadOutcome::Refreshed)
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn delete(&self, client: &GitHubClient, record: &Record) -> Result<()> {
        debug!("restoring default Actions permissions");
        client
            .put_empty(
                &permissions_route(client.owner()?, &record.id),
                &Permissions {
                    enabled: true,
                    allowed_actions: Some("all".to_string()),
                },
            )
            .await
    }

    fn import_state(&self, _client: &GitHubClient, import_id: &str) -> Result<Record> {
        let repository = import_id.trim();
        if repository.is_empty() || repository.contains('/') {
            return Err(ProtocolError::InvalidIdentity {
                id: import_id.to_string(),
                expected: "<repository>".to_string(),
            }
            .into());
        }
        let mut record = Record::new(repository);
        record.set("repository", repository);
        Ok(record)
    }
}
