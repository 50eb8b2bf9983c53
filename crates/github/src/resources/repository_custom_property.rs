//! `github_repository_custom_property`: the value of an organization-defined
//! custom property on one repository.
//!
//! Identity is `<owner>/<repository>/<property_name>`. Deleting clears the
//! value; a property without a value reads as removed. The property type
//! comes from the organization's property definition.

use async_trait::async_trait;
use hubform_protocol::identity::{PATH_SEPARATOR, compose, parse_three};
use hubform_protocol::validation::Rule;
use hubform_protocol::{AttrType, Attribute, Attributes, Diagnostics, ReadOutcome, Record, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::decode;
use crate::client::GitHubClient;
use crate::error::Result;
use crate::provider::Resource;

const MULTI_SELECT: &str = "multi_select";
const TRUE_FALSE: &str = "true_false";

static SCHEMA: Schema = Schema {
    description: "A custom property value set on a repository.",
    attributes: &[
        Attribute::required("repository", AttrType::String).force_new(),
        Attribute::required("property_name", AttrType::String).force_new(),
        Attribute::required("property_type", AttrType::String)
            .force_new()
            .with_rules(&[Rule::OneOf(&["string", "single_select", MULTI_SELECT, TRUE_FALSE])]),
        Attribute::required("property_value", AttrType::List(&AttrType::String))
            .force_new()
            .with_rules(&[Rule::SizeAtLeast(1)]),
    ],
};

#[derive(Debug, Deserialize)]
struct Config {
    repository: String,
    property_name: String,
    property_type: String,
    property_value: Vec<String>,
}

/// A property value as GitHub returns it: a string, a list of strings for
/// multi-select properties, or `null` when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum PropertyValue {
    Single(String),
    Multiple(Vec<String>),
}

impl PropertyValue {
    fn into_list(self) -> Vec<String> {
        match self {
            Self::Single(s) => vec![s],
            Self::Multiple(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PropertyEntry {
    property_name: String,
    #[serde(default)]
    value: Option<PropertyValue>,
}

/// The organization-level definition of a property.
#[derive(Debug, Deserialize)]
struct PropertyDefinition {
    value_type: String,
}

fn values_route(owner: &str, repo: &str) -> String {
    format!("/repos/{owner}/{repo}/properties/values")
}

impl GitHubClient {
    /// Sets (or, with `None`, clears) one custom property value.
    #[instrument(skip(self, value))]
    async fn set_custom_property(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        value: Option<&PropertyValue>,
    ) -> Result<()> {
        let body = json!({
            "properties": [{"property_name": name, "value": value}],
        });
        self.patch_empty(&values_route(owner, repo), &body).await
    }

    /// Fetches one custom property value; `None` when the repository is gone
    /// or the property has no value.
    #[instrument(skip(self))]
    async fn custom_property(&self, owner: &str, repo: &str, name: &str) -> Result<Option<PropertyValue>> {
        let entries: Option<Vec<PropertyEntry>> = self.find(&values_route(owner, repo)).await?;
        Ok(entries
            .unwrap_or_default()
            .into_iter()
            .find(|e| e.property_name == name)
            .and_then(|e| e.value))
    }

    /// Looks up the value type an organization declares for a property.
    #[instrument(skip(self))]
    async fn custom_property_type(&self, owner: &str, name: &str) -> Result<Option<String>> {
        let definition: Option<PropertyDefinition> = self
            .find(&format!("/orgs/{owner}/properties/schema/{name}"))
            .await?;
        Ok(definition.map(|d| d.value_type))
    }
}

/// The `github_repository_custom_property` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepositoryCustomProperty;

#[async_trait]
impl Resource for RepositoryCustomProperty {
    fn type_name(&self) -> &'static str {
        "github_repository_custom_property"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn check(&self, config: &Attributes, diags: &mut Diagnostics) {
        let kind = config.get("property_type").and_then(Value::as_str);
        let Some(values) = config.get("property_value").and_then(Value::as_array) else {
            return;
        };
        if kind != Some(MULTI_SELECT) && values.len() > 1 {
            diags.error(
                "property_value",
                format!("exactly one value is allowed unless `property_type` is \"{MULTI_SELECT}\", got {}", values.len()),
            );
        }
        if kind == Some(TRUE_FALSE) {
            for v in values.iter().filter_map(Value::as_str) {
                if v != "true" && v != "false" {
                    diags.error("property_value", format!("expected \"true\" or \"false\", got {v:?}"));
                }
            }
        }
    }

    #[instrument(skip_all)]
    async fn create(&self, client: &GitHubClient, config: &Attributes) -> Result<Record> {
        let cfg: Config = decode(config)?;
        let owner = client.owner()?;

        let value = if cfg.property_type == MULTI_SELECT {
            PropertyValue::Multiple(cfg.property_value.clone())
        } else {
            PropertyValue::Single(cfg.property_value.first().cloned().unwrap_or_default())
        };

        debug!(repository = %cfg.repository, property = %cfg.property_name, "setting custom property");
        client
            .set_custom_property(owner, &cfg.repository, &cfg.property_name, Some(&value))
            .await?;

        Ok(Record::with_attributes(
            compose(&[owner, &cfg.repository, &cfg.property_name], PATH_SEPARATOR),
            config.clone(),
        ))
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn read(&self, client: &GitHubClient, record: &mut Record) -> Result<ReadOutcome> {
        let (owner, repository, name) = parse_three(&record.id, PATH_SEPARATOR)?;
        let (owner, repository, name) = (owner.to_string(), repository.to_string(), name.to_string());

        let Some(value) = client.custom_property(&owner, &repository, &name).await? else {
            record.clear_identity();
            return Ok(ReadOutcome::Removed);
        };
        let Some(property_type) = client.custom_property_type(&owner, &name).await? else {
            debug!(property = %name, "property definition is gone");
            record.clear_identity();
            return Ok(ReadOutcome::Removed);
        };

        record.set("repository", repository);
        record.set("property_name", name);
        record.set("property_type", property_type);
        record.set("property_value", value.into_list());
        Ok(ReadOutcome::Refreshed)
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn delete(&self, client: &GitHubClient, record: &Record) -> Result<()> {
        let (owner, repository, name) = parse_three(&record.id, PATH_SEPARATOR)?;
        client.set_custom_property(owner, repository, name, None).await
    }

    fn import_state(&self, _client: &GitHubClient, import_id: &str) -> Result<Record> {
        let (_, repository, name) = parse_three(import_id, PATH_SEPARATOR)?;
        let mut record = Record::new(import_id);
        record.set("repository", repository);
        record.set("property_name", name);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(value: Value) -> Diagnostics {
        let config = value.as_object().cloned().unwrap();
        let mut diags = SCHEMA.validate(&config);
        RepositoryCustomProperty.check(&config, &mut diags);
        diags
    }

    #[test]
    fn single_valued_types_take_one_value() {
        let diags = validate(json!({
            "repository": "repo",
            "property_name": "team",
            "property_type": "single_select",
            "property_value": ["a", "b"],
        }));
        assert!(diags.mentions("property_value"));

        let diags = validate(json!({
            "repository": "repo",
            "property_name": "teams",
            "property_type": "multi_select",
            "property_value": ["a", "b"],
        }));
        assert!(diags.is_empty(), "{diags}");
    }

    #[test]
    fn true_false_values_are_checked() {
        let diags = validate(json!({
            "repository": "repo",
            "property_name": "public",
            "property_type": "true_false",
            "property_value": ["yes"],
        }));
        assert!(diags.mentions("property_value"));
    }

    #[test]
    fn empty_value_list_is_rejected() {
        let diags = validate(json!({
            "repository": "repo",
            "property_name": "team",
            "property_type": "string",
            "property_value": [],
        }));
        assert!(diags.mentions("property_value"));
    }

    #[test]
    fn property_values_decode_both_shapes() {
        let entries: Vec<PropertyEntry> = serde_json::from_value(json!([
            {"property_name": "team", "value": "platform"},
            {"property_name": "langs", "value": ["rust", "go"]},
            {"property_name": "unset", "value": null},
        ]))
        .unwrap();
        assert_eq!(entries[0].value.clone().unwrap().into_list(), vec!["platform"]);
        assert_eq!(entries[1].value.clone().unwrap().into_list(), vec!["rust", "go"]);
        assert!(entries[2].value.is_none());
    }

    #[tokio::test]
    async fn import_keeps_three_part_identity() {
        let client = GitHubClient::builder().build().unwrap();
        let record = RepositoryCustomProperty
            .import_state(&client, "octo-org/repo/team")
            .unwrap();
        assert_eq!(record.id, "octo-org/repo/team");
        assert_eq!(record.get_str("property_name"), Some("team"));
        assert!(RepositoryCustomProperty.import_state(&client, "repo/team").is_err());
    }
}
