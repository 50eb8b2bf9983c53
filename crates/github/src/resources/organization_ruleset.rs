//! `github_organization_ruleset`: an organization-wide repository ruleset.
//!
//! Configuration describes rules as one object of flags; the REST API takes
//! a list of `{type, parameters}` entries; rule types this resource does
//! not manage are ignored on read. `updated_at` is the drift marker.

use async_trait::async_trait;
use hubform_protocol::validation::Rule;
use hubform_protocol::{
    AttrType, Attribute, Attributes, DriftPolicy, ProtocolError, ReadOutcome, Record, Schema,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use super::decode;
use crate::client::GitHubClient;
use crate::error::Result;
use crate::provider::Resource;

const STRINGS: AttrType = AttrType::List(&AttrType::String);

static BYPASS_ACTOR: [Attribute; 3] = [
    Attribute::optional("actor_id", AttrType::Int),
    Attribute::required("actor_type", AttrType::String).with_rules(&[Rule::OneOf(&[
        "RepositoryRole",
        "Team",
        "Integration",
        "OrganizationAdmin",
        "DeployKey",
    ])]),
    Attribute::required("bypass_mode", AttrType::String)
        .with_rules(&[Rule::OneOf(&["always", "pull_request"])]),
];

static BYPASS_ACTOR_OBJECT: AttrType = AttrType::Object(&BYPASS_ACTOR);

static REF_NAME: [Attribute; 2] = [
    Attribute::required("include", STRINGS),
    Attribute::required("exclude", STRINGS),
];

static REPOSITORY_NAME: [Attribute; 3] = [
    Attribute::required("include", STRINGS),
    Attribute::required("exclude", STRINGS),
    Attribute::optional("protected", AttrType::Bool),
];

static CONDITIONS: [Attribute; 3] = [
    Attribute::optional("ref_name", AttrType::Object(&REF_NAME)),
    Attribute::optional("repository_name", AttrType::Object(&REPOSITORY_NAME))
        .with_rules(&[Rule::ConflictsWith(&["repository_id"])]),
    Attribute::optional("repository_id", AttrType::List(&AttrType::Int)),
];

// The API needs every parameter, so omitted ones are sent as their
// defaults and read back.
static PULL_REQUEST: [Attribute; 5] = [
    Attribute::optional_computed("required_approving_review_count", AttrType::Int),
    Attribute::optional_computed("dismiss_stale_reviews_on_push", AttrType::Bool),
    Attribute::optional_computed("require_code_owner_review", AttrType::Bool),
    Attribute::optional_computed("require_last_push_approval", AttrType::Bool),
    Attribute::optional_computed("required_review_thread_resolution", AttrType::Bool),
];

static RULES: [Attribute; 7] = [
    Attribute::optional("creation", AttrType::Bool),
    Attribute::optional("update", AttrType::Bool),
    Attribute::optional("deletion", AttrType::Bool),
    Attribute::optional("required_linear_history", AttrType::Bool),
    Attribute::optional("required_signatures", AttrType::Bool),
    Attribute::optional("non_fast_forward", AttrType::Bool),
    Attribute::optional("pull_request", AttrType::Object(&PULL_REQUEST)),
];

static SCHEMA: Schema = Schema {
    description: "A ruleset applied to the repositories of an organization.",
    attributes: &[
        Attribute::required("name", AttrType::String).force_new(),
        Attribute::required("target", AttrType::String)
            .force_new()
            .with_rules(&[Rule::OneOf(&["branch", "tag", "push"])]),
        Attribute::required("enforcement", AttrType::String)
            .force_new()
            .with_rules(&[Rule::OneOf(&["disabled", "active", "evaluate"])]),
        Attribute::optional("bypass_actors", AttrType::List(&BYPASS_ACTOR_OBJECT)).force_new(),
        Attribute::optional("conditions", AttrType::Object(&CONDITIONS)).force_new(),
        Attribute::required("rules", AttrType::Object(&RULES)).force_new(),
        Attribute::computed("ruleset_id", AttrType::Int),
        Attribute::computed("node_id", AttrType::String),
        Attribute::computed("updated_at", AttrType::String).describe("Drift marker."),
    ],
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BypassActor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actor_id: Option<i64>,
    actor_type: String,
    bypass_mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct RefName {
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct RepositoryName {
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protected: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Conditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ref_name: Option<RefName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repository_name: Option<RepositoryName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repository_id: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct PullRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    required_approving_review_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dismiss_stale_reviews_on_push: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    require_code_owner_review: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    require_last_push_approval: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    required_review_thread_resolution: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Rules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    creation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deletion: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    required_linear_history: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    required_signatures: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    non_fast_forward: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pull_request: Option<PullRequest>,
}

/// One entry of the REST `rules` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ApiRule {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

impl ApiRule {
    fn flag(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            parameters: None,
        }
    }
}

impl Rules {
    fn flags(&self) -> [(&'static str, Option<bool>); 6] {
        [
            ("creation", self.creation),
            ("update", self.update),
            ("deletion", self.deletion),
            ("required_linear_history", self.required_linear_history),
            ("required_signatures", self.required_signatures),
            ("non_fast_forward", self.non_fast_forward),
        ]
    }

    fn to_api(&self) -> Vec<ApiRule> {
        let mut rules: Vec<ApiRule> = self
            .flags()
            .into_iter()
            .filter(|(_, on)| *on == Some(true))
            .map(|(kind, _)| ApiRule::flag(kind))
            .collect();

        if let Some(pr) = &self.pull_request {
            rules.push(ApiRule {
                kind: "pull_request".to_string(),
                parameters: Some(json!({
                    "required_approving_review_count": pr.required_approving_review_count.unwrap_or(0),
                    "dismiss_stale_reviews_on_push": pr.dismiss_stale_reviews_on_push.unwrap_or(false),
                    "require_code_owner_review": pr.require_code_owner_review.unwrap_or(false),
                    "require_last_push_approval": pr.require_last_push_approval.unwrap_or(false),
                    "required_review_thread_resolution": pr.required_review_thread_resolution.unwrap_or(false),
                })),
            });
        }
        rules
    }

    fn from_api(rules: &[ApiRule]) -> Self {
        let mut out = Self::default();
        for rule in rules {
            match rule.kind.as_str() {
                "creation" => out.creation = Some(true),
                "update" => out.update = Some(true),
                "deletion" => out.deletion = Some(true),
                "required_linear_history" => out.required_linear_history = Some(true),
                "required_signatures" => out.required_signatures = Some(true),
                "non_fast_forward" => out.non_fast_forward = Some(true),
                "pull_request" => {
                    out.pull_request = Some(
                        rule.parameters
                            .clone()
                            .map(serde_json::from_value)
                            .transpose()
                            .unwrap_or_else(|e| {
                                warn!(error = %e, "unreadable pull_request rule parameters");
                                None
                            })
                            .unwrap_or_default(),
                    );
                }
                other => debug!(rule = other, "ignoring unmanaged rule type"),
            }
        }
        out
    }
}

/// Conditions as the REST API shapes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ApiConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ref_name: Option<RefName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repository_name: Option<RepositoryName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repository_id: Option<RepositoryIds>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RepositoryIds {
    #[serde(default)]
    repository_ids: Vec<i64>,
}

impl From<Conditions> for ApiConditions {
    fn from(c: Conditions) -> Self {
        Self {
            ref_name: c.ref_name,
            repository_name: c.repository_name,
            repository_id: c.repository_id.map(|repository_ids| RepositoryIds { repository_ids }),
        }
    }
}

impl From<ApiConditions> for Conditions {
    fn from(c: ApiConditions) -> Self {
        Self {
            ref_name: c.ref_name,
            repository_name: c.repository_name,
            repository_id: c.repository_id.map(|r| r.repository_ids),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Config {
    name: String,
    target: String,
    enforcement: String,
    #[serde(default)]
    bypass_actors: Vec<BypassActor>,
    #[serde(default)]
    conditions: Option<Conditions>,
    rules: Rules,
}

#[derive(Debug, Serialize)]
struct RulesetRequest {
    name: String,
    target: String,
    enforcement: String,
    bypass_actors: Vec<BypassActor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conditions: Option<ApiConditions>,
    rules: Vec<ApiRule>,
}

impl From<Config> for RulesetRequest {
    fn from(cfg: Config) -> Self {
        Self {
            rules: cfg.rules.to_api(),
            name: cfg.name,
            target: cfg.target,
            enforcement: cfg.enforcement,
            bypass_actors: cfg.bypass_actors,
            conditions: cfg.conditions.map(ApiConditions::from),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Ruleset {
    id: i64,
    #[serde(default)]
    node_id: Option<String>,
    name: String,
    #[serde(default)]
    target: Option<String>,
    enforcement: String,
    #[serde(default)]
    bypass_actors: Vec<BypassActor>,
    #[serde(default)]
    conditions: Option<ApiConditions>,
    #[serde(default)]
    rules: Vec<ApiRule>,
    #[serde(default)]
    updated_at: Option<String>,
}

fn rulesets_route(org: &str) -> String {
    format!("/orgs/{org}/rulesets")
}

/// The `github_organization_ruleset` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrganizationRuleset;

#[async_trait]
impl Resource for OrganizationRuleset {
    fn type_name(&self) -> &'static str {
        "github_organization_ruleset"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    #[instrument(skip_all)]
    async fn create(&self, client: &GitHubClient, config: &Attributes) -> Result<Record> {
        let cfg: Config = decode(config)?;
        let request = RulesetRequest::from(cfg);
        debug!(name = %request.name, rules = request.rules.len(), "creating ruleset");

        let created: Ruleset = client
            .post(&rulesets_route(client.owner()?), &request)
            .await?;
        Ok(Record::with_attributes(created.id.to_string(), config.clone()))
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn read(&self, client: &GitHubClient, record: &mut Record) -> Result<ReadOutcome> {
        let route = format!("{}/{}", rulesets_route(client.owner()?), record.id);
        let Some(ruleset) = client.find::<Ruleset>(&route).await? else {
            record.clear_identity();
            return Ok(ReadOutcome::Removed);
        };

        if let Some(updated_at) = &ruleset.updated_at
            && record.reconcile_marker("updated_at", updated_at, DriftPolicy::Replace)
                == ReadOutcome::Drifted
        {
            return Ok(ReadOutcome::Drifted);
        }

        record.set("ruleset_id", ruleset.id);
        if let Some(node_id) = ruleset.node_id {
            record.set("node_id", node_id);
        }
        record.set("name", ruleset.name);
        if let Some(target) = ruleset.target {
            record.set("target", target);
        }
        record.set("enforcement", ruleset.enforcement);
        record.set("bypass_actors", serde_json::to_value(&ruleset.bypass_actors)?);
        match ruleset.conditions {
            Some(c) => record.set("conditions", serde_json::to_value(Conditions::from(c))?),
            None => {
                record.attributes.remove("conditions");
            }
        }
        record.set("rules", serde_json::to_value(Rules::from_api(&ruleset.rules))?);
        Ok(ReadOutcome::Refreshed)
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn delete(&self, client: &GitHubClient, record: &Record) -> Result<()> {
        client
            .delete(&format!("{}/{}", rulesets_route(client.owner()?), record.id))
            .await
    }

    fn import_state(&self, _client: &GitHubClient, import_id: &str) -> Result<Record> {
        let id = import_id.trim();
        if id.parse::<i64>().is_err() {
            return Err(ProtocolError::InvalidIdentity {
                id: import_id.to_string(),
                expected: "<numeric ruleset id>".to_string(),
            }
            .into());
        }
        Ok(Record::new(id))
    }
}
