//! `github_repository_webhook`: a repository webhook.
//!
//! Identity is the numeric hook id; the repository is kept as an attribute.
//! GitHub masks a configured secret as `********` on reads, so the secret in
//! state is kept as is.

use async_trait::async_trait;
use hubform_protocol::identity::{PATH_SEPARATOR, parse_two};
use hubform_protocol::validation::Rule;
use hubform_protocol::{
    AttrType, Attribute, Attributes, DefaultValue, ProtocolError, ReadOutcome, Record, Schema,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use super::{addressing, decode, default_true};
use crate::client::GitHubClient;
use crate::error::Result;
use crate::provider::Resource;

const MASKED_SECRET: &str = "********";

static CONFIGURATION: [Attribute; 4] = [
    Attribute::required("url", AttrType::String).force_new(),
    Attribute::optional_computed("content_type", AttrType::String)
        .force_new()
        .with_rules(&[Rule::OneOf(&["json", "form"])]),
    Attribute::optional("secret", AttrType::String).sensitive().force_new(),
    Attribute::optional_computed("insecure_ssl", AttrType::Bool).force_new(),
];

static SCHEMA: Schema = Schema {
    description: "A webhook delivering repository events to a URL.",
    attributes: &[
        Attribute::required("repository", AttrType::String).force_new(),
        Attribute::optional("configuration", AttrType::Object(&CONFIGURATION)).force_new(),
        Attribute::required("events", AttrType::Set(&AttrType::String))
            .force_new()
            .with_rules(&[Rule::SizeAtLeast(1)]),
        Attribute::optional("active", AttrType::Bool)
            .force_new()
            .default_value(DefaultValue::Bool(true)),
        Attribute::computed("url", AttrType::String).describe("API URL of the hook."),
    ],
};

#[derive(Debug, Deserialize)]
struct Config {
    repository: String,
    #[serde(default)]
    configuration: Option<HookConfig>,
    events: Vec<String>,
    #[serde(default = "default_true")]
    active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct HookConfig {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret: Option<String>,
    #[serde(default, deserialize_with = "flag", skip_serializing_if = "Option::is_none")]
    insecure_ssl: Option<bool>,
}

/// GitHub encodes `insecure_ssl` as `"0"`/`"1"`, sometimes as a number.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<bool>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => Some(s == "1"),
        Some(Value::Number(n)) => Some(n.as_i64() == Some(1)),
        _ => None,
    })
}

#[derive(Debug, Deserialize)]
struct Hook {
    id: u64,
    #[serde(default)]
    url: Option<String>,
    active: bool,
    #[serde(default)]
    events: Vec<String>,
    #[serde(default)]
    config: HookConfig,
}

fn hooks_route(owner: &str, repo: &str) -> String {
    format!("/repos/{owner}/{repo}/hooks")
}

/// Request body for creating a hook.
fn create_body(cfg: &Config) -> Value {
    let mut config = Map::new();
    if let Some(c) = &cfg.configuration {
        if let Some(url) = &c.url {
            config.insert("url".to_string(), json!(url));
        }
        if let Some(content_type) = &c.content_type {
            config.insert("content_type".to_string(), json!(content_type));
        }
        if let Some(secret) = &c.secret {
            config.insert("secret".to_string(), json!(secret));
        }
        if let Some(insecure) = c.insecure_ssl {
            config.insert("insecure_ssl".to_string(), json!(if insecure { "1" } else { "0" }));
        }
    }
    json!({
        "name": "web",
        "config": config,
        "events": cfg.events,
        "active": cfg.active,
    })
}

/// The `github_repository_webhook` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepositoryWebhook;

#[async_trait]
impl Resource for RepositoryWebhook {
    fn type_name(&self) -> &'static str {
        "github_repository_webhook"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    #[instrument(skip_all)]
    async fn create(&self, client: &GitHubClient, config: &Attributes) -> Result<Record> {
        let cfg: Config = decode(config)?;
        let hook: Hook = client
            .post(&hooks_route(client.owner()?, &cfg.repository), &create_body(&cfg))
            .await?;
        debug!(hook_id = hook.id, "created webhook");
        Ok(Record::with_attributes(hook.id.to_string(), config.clone()))
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn read(&self, client: &GitHubClient, record: &mut Record) -> Result<ReadOutcome> {
        let repository = addressing(record, "repository")?.to_string();
        let route = format!("{}/{}", hooks_route(client.owner()?, &repository), record.id);

        let Some(hook) = client.find::<Hook>(&route).await? else {
            record.clear_identity();
            return Ok(ReadOutcome::Removed);
        };

        let stored_secret = record
            .get("configuration")
            .and_then(|c| c.get("secret"))
            .cloned();

        let mut observed = hook.config;
        match (observed.secret.as_deref(), stored_secret) {
            (Some(MASKED_SECRET), Some(Value::String(secret))) => observed.secret = Some(secret),
            (Some(MASKED_SECRET), _) => observed.secret = None,
            _ => {}
        }

        record.set("configuration", serde_json::to_value(&observed)?);
        record.set("events", hook.events);
        record.set("active", hook.active);
        if let Some(url) = hook.url {
            record.set("url", url);
        }
        Ok(ReadOutcome::Refreshed)
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn delete(&self, client: &GitHubClient, record: &Record) -> Result<()> {
        let repository = addressing(record, "repository")?;
        client
            .delete(&format!("{}/{}", hooks_route(client.owner()?, repository), record.id))
            .await
    }

    fn import_state(&self, _client: &GitHubClient, import_id: &str) -> Result<Record> {
        let (repository, id) = parse_two(import_id, PATH_SEPARATOR)?;
        if id.parse::<u64>().is_err() {
            return Err(ProtocolError::InvalidIdentity {
                id: import_id.to_string(),
                expected: "<repository>/<numeric hook id>".to_string(),
            }
            .into());
        }
        let mut record = Record::new(id);
        record.set("repository", repository);
        Ok(record)
    }
}
