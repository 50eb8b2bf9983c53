//! `github_collaborators`: the collaborators of one repository.

use async_trait::async_trait;
use hubform_protocol::identity::{PATH_SEPARATOR, compose};
use hubform_protocol::validation::Rule;
use hubform_protocol::{AttrType, Attribute, Attributes, DefaultValue, Record, Schema};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::GitHubClient;
use crate::error::Result;
use crate::provider::DataSource;
use crate::resources::decode;

static COLLABORATOR: [Attribute; 7] = [
    Attribute::computed("login", AttrType::String),
    Attribute::computed("id", AttrType::Int),
    Attribute::computed("url", AttrType::String),
    Attribute::computed("html_url", AttrType::String),
    Attribute::computed("type", AttrType::String),
    Attribute::computed("site_admin", AttrType::Bool),
    Attribute::computed("permission", AttrType::String),
];

static COLLABORATOR_OBJECT: AttrType = AttrType::Object(&COLLABORATOR);

static SCHEMA: Schema = Schema {
    description: "Lists the collaborators of a repository.",
    attributes: &[
        Attribute::required("owner", AttrType::String),
        Attribute::required("repository", AttrType::String),
        Attribute::optional("affiliation", AttrType::String)
            .default_value(DefaultValue::Str("all"))
            .with_rules(&[Rule::OneOf(&["all", "direct", "outside"])]),
        Attribute::optional("permission", AttrType::String)
            .with_rules(&[Rule::OneOf(&["pull", "triage", "push", "maintain", "admin"])]),
        Attribute::computed("collaborator", AttrType::List(&COLLABORATOR_OBJECT)),
    ],
};

#[derive(Debug, Deserialize)]
struct Config {
    owner: String,
    repository: String,
    #[serde(default)]
    affiliation: Option<String>,
    #[serde(default)]
    permission: Option<String>,
}

/// Filter sent with every page request.
#[derive(Debug, Serialize)]
struct CollaboratorFilter<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    affiliation: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    permission: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct Permissions {
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    maintain: bool,
    #[serde(default)]
    push: bool,
    #[serde(default)]
    triage: bool,
    #[serde(default)]
    pull: bool,
}

impl Permissions {
    /// Highest level granted.
    fn highest(&self) -> Option<&'static str> {
        [
            (self.admin, "admin"),
            (self.maintain, "maintain"),
            (self.push, "push"),
            (self.triage, "triage"),
            (self.pull, "pull"),
        ]
        .into_iter()
        .find_map(|(granted, name)| granted.then_some(name))
    }
}

#[derive(Debug, Deserialize)]
struct ApiCollaborator {
    login: String,
    id: i64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    html_url: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    site_admin: bool,
    #[serde(default)]
    role_name: Option<String>,
    #[serde(default)]
    permissions: Permissions,
}

#[derive(Debug, PartialEq, Serialize)]
struct Collaborator {
    login: String,
    id: i64,
    url: String,
    html_url: String,
    #[serde(rename = "type")]
    kind: String,
    site_admin: bool,
    permission: String,
}

impl From<ApiCollaborator> for Collaborator {
    fn from(api: ApiCollaborator) -> Self {
        // Custom roles only show up in `role_name`.
        let permission = api
            .role_name
            .filter(|r| !r.is_empty())
            .or_else(|| api.permissions.highest().map(str::to_string))
            .unwrap_or_default();
        Self {
            login: api.login,
            id: api.id,
            url: api.url,
            html_url: api.html_url,
            kind: api.kind,
            site_admin: api.site_admin,
            permission,
        }
    }
}

/// The `github_collaborators` data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collaborators;

#[async_trait]
impl DataSource for Collaborators {
    fn type_name(&self) -> &'static str {
        "github_collaborators"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    #[instrument(skip_all)]
    async fn read(&self, client: &GitHubClient, config: &Attributes) -> Result<Record> {
        let cfg: Config = decode(config)?;
        let route = format!("/repos/{}/{}/collaborators", cfg.owner, cfg.repository);
        let filter = CollaboratorFilter {
            affiliation: cfg.affiliation.as_deref(),
            permission: cfg.permission.as_deref(),
        };

        let collaborators: Vec<Collaborator> = client
            .list_all::<ApiCollaborator, _>(&route, &filter)
            .await?
            .into_iter()
            .map(Collaborator::from)
            .collect();
        debug!(count = collaborators.len(), "listed collaborators");

        let mut record = Record::with_attributes(
            compose(&[&cfg.owner, &cfg.repository], PATH_SEPARATOR),
            config.clone(),
        );
        record.set("collaborator", serde_json::to_value(collaborators)?);
        Ok(record)
    }
}
