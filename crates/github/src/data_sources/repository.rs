//! `github_repository`: details of one repository, addressed by
//! `full_name` (`owner/name`) or by `name` within the configured owner.

use async_trait::async_trait;
use hubform_protocol::identity::FullName;
use hubform_protocol::validation::Rule;
use hubform_protocol::{AttrType, Attribute, Attributes, Record, Schema};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::client::GitHubClient;
use crate::error::{Error, Result};
use crate::provider::DataSource;
use crate::resources::decode;

static SCHEMA: Schema = Schema {
    description: "Looks up a repository.",
    attributes: &[
        Attribute::optional_computed("full_name", AttrType::String).with_rules(&[
            Rule::ConflictsWith(&["name"]),
            Rule::ExactlyOneOf(&["full_name", "name"]),
        ]),
        Attribute::optional_computed("name", AttrType::String)
            .with_rules(&[Rule::ConflictsWith(&["full_name"])]),
        Attribute::computed("description", AttrType::String),
        Attribute::computed("homepage_url", AttrType::String),
        Attribute::computed("visibility", AttrType::String),
        Attribute::computed("private", AttrType::Bool),
        Attribute::computed("archived", AttrType::Bool),
        Attribute::computed("fork", AttrType::Bool),
        Attribute::computed("is_template", AttrType::Bool),
        Attribute::computed("has_issues", AttrType::Bool),
        Attribute::computed("has_wiki", AttrType::Bool),
        Attribute::computed("has_projects", AttrType::Bool),
        Attribute::computed("has_discussions", AttrType::Bool),
        Attribute::computed("allow_merge_commit", AttrType::Bool),
        Attribute::computed("allow_squash_merge", AttrType::Bool),
        Attribute::computed("allow_rebase_merge", AttrType::Bool),
        Attribute::computed("allow_auto_merge", AttrType::Bool),
        Attribute::computed("default_branch", AttrType::String),
        Attribute::computed("html_url", AttrType::String),
        Attribute::computed("ssh_clone_url", AttrType::String),
        Attribute::computed("http_clone_url", AttrType::String),
        Attribute::computed("git_clone_url", AttrType::String),
        Attribute::computed("node_id", AttrType::String),
        Attribute::computed("repo_id", AttrType::Int),
        Attribute::computed("topics", AttrType::List(&AttrType::String)),
    ],
};

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRepository {
    id: i64,
    node_id: String,
    name: String,
    full_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    visibility: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    is_template: bool,
    #[serde(default)]
    has_issues: bool,
    #[serde(default)]
    has_wiki: bool,
    #[serde(default)]
    has_projects: bool,
    #[serde(default)]
    has_discussions: bool,
    #[serde(default)]
    allow_merge_commit: bool,
    #[serde(default)]
    allow_squash_merge: bool,
    #[serde(default)]
    allow_rebase_merge: bool,
    #[serde(default)]
    allow_auto_merge: bool,
    #[serde(default)]
    default_branch: Option<String>,
    html_url: String,
    #[serde(default)]
    ssh_url: Option<String>,
    #[serde(default)]
    clone_url: Option<String>,
    #[serde(default)]
    git_url: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
}

/// Attributes written to the record.
#[derive(Debug, Serialize)]
struct Observed {
    full_name: String,
    name: String,
    description: String,
    homepage_url: String,
    visibility: String,
    private: bool,
    archived: bool,
    fork: bool,
    is_template: bool,
    has_issues: bool,
    has_wiki: bool,
    has_projects: bool,
    has_discussions: bool,
    allow_merge_commit: bool,
    allow_squash_merge: bool,
    allow_rebase_merge: bool,
    allow_auto_merge: bool,
    default_branch: String,
    html_url: String,
    ssh_clone_url: String,
    http_clone_url: String,
    git_clone_url: String,
    node_id: String,
    repo_id: i64,
    topics: Vec<String>,
}

impl From<ApiRepository> for Observed {
    fn from(r: ApiRepository) -> Self {
        let visibility = r
            .visibility
            .unwrap_or_else(|| if r.private { "private" } else { "public" }.to_string());
        Self {
            full_name: r.full_name,
            name: r.name,
            description: r.description.unwrap_or_default(),
            homepage_url: r.homepage.unwrap_or_default(),
            visibility,
            private: r.private,
            archived: r.archived,
            fork: r.fork,
            is_template: r.is_template,
            has_issues: r.has_issues,
            has_wiki: r.has_wiki,
            has_projects: r.has_projects,
            has_discussions: r.has_discussions,
            allow_merge_commit: r.allow_merge_commit,
            allow_squash_merge: r.allow_squash_merge,
            allow_rebase_merge: r.allow_rebase_merge,
            allow_auto_merge: r.allow_auto_merge,
            default_branch: r.default_branch.unwrap_or_default(),
            html_url: r.html_url,
            ssh_clone_url: r.ssh_url.unwrap_or_default(),
            http_clone_url: r.clone_url.unwrap_or_default(),
            git_clone_url: r.git_url.unwrap_or_default(),
            node_id: r.node_id,
            repo_id: r.id,
            topics: r.topics,
        }
    }
}

/// The `github_repository` data source.
///
/// A repository that does not exist yields a record with an empty id rather
/// than an error, so configurations can look up optional repositories.
#[derive(Debug, Clone, Copy, Default)]
pub struct Repository;

#[async_trait]
impl DataSource for Repository {
    fn type_name(&self) -> &'static str {
        "github_repository"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    #[instrument(skip_all)]
    async fn read(&self, client: &GitHubClient, config: &Attributes) -> Result<Record> {
        let cfg: Config = decode(config)?;
        let full_name = match (cfg.full_name, cfg.name) {
            (Some(full_name), _) => FullName::parse(&full_name)?,
            (None, Some(name)) => FullName {
                owner: client.owner()?.to_string(),
                name,
            },
            (None, None) => return Err(Error::config("one of `full_name` or `name` must be set")),
        };

        let route = format!("/repos/{}/{}", full_name.owner, full_name.name);
        let mut record = Record::with_attributes(String::new(), config.clone());
        let Some(repository) = client.find::<ApiRepository>(&route).await? else {
            warn!(repository = %full_name, "repository not found");
            return Ok(record);
        };

        record.id = repository.name.clone();
        record.merge(&Observed::from(repository))?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(value: serde_json::Value) -> hubform_protocol::Diagnostics {
        SCHEMA.validate(value.as_object().unwrap())
    }

    #[test]
    fn full_name_and_name_conflict() {
        let diags = validate(json!({"full_name": "octo-org/hello", "name": "hello"}));
        assert!(diags.mentions("full_name"));
        assert!(diags.mentions("name"));
    }

    #[test]
    fn one_of_full_name_or_name_is_required() {
        assert!(!validate(json!({})).is_empty());
        assert!(validate(json!({"name": "hello"})).is_empty());
        assert!(validate(json!({"full_name": "octo-org/hello"})).is_empty());
    }

    #[test]
    fn visibility_falls_back_to_private_flag() {
        let api: ApiRepository = serde_json::from_value(json!({
            "id": 7,
            "node_id": "R_kgDO",
            "name": "hello",
            "full_name": "octo-org/hello",
            "private": true,
            "html_url": "https://github.com/octo-org/hello",
        }))
        .unwrap();
        let observed = Observed::from(api);
        assert_eq!(observed.visibility, "private");
        assert_eq!(observed.repo_id, 7);
        assert_eq!(observed.description, "");
    }
}
