//! `github_issue_label`: a repository issue label.
//!
//! Identity is `<repository>:<name>`; imports use `<repository>/<name>`.
//! Label names may themselves contain `/` or `:`, so identities are split at
//! the first separator only and names are percent-encoded in URLs.
//!
//! # Example
//!
//! ```no_run
//! use hubform_github::{GitHubClient, Provider};
//! use serde_json::json;
//!
//! # async fn example() -> hubform_github::Result<()> {
//! let client = GitHubClient::builder().owner("octo-org").build()?;
//! let provider = Provider::new();
//!
//! let config = json!({"repository": "hello-world", "name": "triage/needs-info", "color": "d4c5f9"});
//! let record = provider
//!     .create(&client, "github_issue_label", config.as_object().unwrap())
//!     .await?;
//! println!("created {}", record.id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use hubform_protocol::identity::{PATH_SEPARATOR, TWO_PART_SEPARATOR, split_first};
use hubform_protocol::{AttrType, Attribute, Attributes, Diagnostics, ReadOutcome, Record, Schema};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::decode;
use crate::client::GitHubClient;
use crate::error::Result;
use crate::provider::Resource;

static SCHEMA: Schema = Schema {
    description: "An issue label of one repository.",
    attributes: &[
        Attribute::required("repository", AttrType::String).force_new(),
        Attribute::required("name", AttrType::String).force_new(),
        Attribute::required("color", AttrType::String)
            .force_new()
            .describe("Hex color code, without the leading `#`."),
        Attribute::optional("description", AttrType::String).force_new(),
        Attribute::computed("url", AttrType::String),
    ],
};

/// A GitHub label as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubLabel {
    /// The label name.
    pub name: String,
    /// The hex color code (without `#`).
    pub color: String,
    /// The label description.
    #[serde(default)]
    pub description: Option<String>,
    /// API URL of the label.
    #[serde(default)]
    pub url: Option<String>,
}

/// Request body for creating a label.
#[derive(Debug, Serialize)]
struct CreateLabelRequest<'a> {
    name: &'a str,
    color: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct Config {
    repository: String,
    name: String,
    color: String,
    #[serde(default)]
    description: Option<String>,
}

fn label_route(owner: &str, repo: &str, name: &str) -> String {
    // Names may contain characters such as '/'.
    let encoded = utf8_percent_encode(name, NON_ALPHANUMERIC);
    format!("/repos/{owner}/{repo}/labels/{encoded}")
}

impl GitHubClient {
    /// Fetches one label, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails for any reason other than
    /// "not found".
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn find_label(&self, owner: &str, repo: &str, name: &str) -> Result<Option<GitHubLabel>> {
        self.find(&label_route(owner, repo, name)).await
    }

    /// Creates a new label in a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the label already exists or the API call fails.
    #[instrument(skip(self, color, description), fields(owner = %owner, repo = %repo))]
    pub async fn create_label(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        color: &str,
        description: Option<&str>,
    ) -> Result<GitHubLabel> {
        debug!("creating label");
        let body = CreateLabelRequest {
            name,
            color: color.trim_start_matches('#'),
            description,
        };
        let label: GitHubLabel = self
            .post(&format!("/repos/{owner}/{repo}/labels"), &body)
            .await?;
        debug!("created label");
        Ok(label)
    }
}

/// The `github_issue_label` resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct IssueLabel;

#[async_trait]
impl Resource for IssueLabel {
    fn type_name(&self) -> &'static str {
        "github_issue_label"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    fn check(&self, config: &Attributes, diags: &mut Diagnostics) {
        if let Some(color) = config.get("color").and_then(Value::as_str) {
            if color.starts_with('#') {
                diags.error("color", format!("drop the leading '#' from {color:?}"));
            } else if color.len() != 6 || !color.chars().all(|c| c.is_ascii_hexdigit()) {
                diags.error("color", format!("expected a 6-digit hex color, got {color:?}"));
            }
        }
    }

    #[instrument(skip_all)]
    async fn create(&self, client: &GitHubClient, config: &Attributes) -> Result<Record> {
        let cfg: Config = decode(config)?;
        let label = client
            .create_label(
                client.owner()?,
                &cfg.repository,
                &cfg.name,
                &cfg.color,
                cfg.description.as_deref(),
            )
            .await?;
        let id = format!("{}{TWO_PART_SEPARATOR}{}", cfg.repository, label.name);
        Ok(Record::with_attributes(id, config.clone()))
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn read(&self, client: &GitHubClient, record: &mut Record) -> Result<ReadOutcome> {
        let (repository, name) = split_first(&record.id, TWO_PART_SEPARATOR)?;
        let (repository, name) = (repository.to_string(), name.to_string());

        let Some(label) = client.find_label(client.owner()?, &repository, &name).await? else {
            record.clear_identity();
            return Ok(ReadOutcome::Removed);
        };

        record.set("repository", repository);
        record.set("name", label.name);
        record.set("color", label.color);
        match label.description.filter(|d| !d.is_empty()) {
            Some(description) => record.set("description", description),
            None => {
                record.attributes.remove("description");
            }
        }
        if let Some(url) = label.url {
            record.set("url", url);
        }
        Ok(ReadOutcome::Refreshed)
    }

    #[instrument(skip_all, fields(id = %record.id))]
    async fn delete(&self, client: &GitHubClient, record: &Record) -> Result<()> {
        let (repository, name) = split_first(&record.id, TWO_PART_SEPARATOR)?;
        client
            .delete(&label_route(client.owner()?, repository, name))
            .await
    }

    fn import_state(&self, _client: &GitHubClient, import_id: &str) -> Result<Record> {
        let (repository, name) = split_first(import_id, PATH_SEPARATOR)?;
        let mut record = Record::new(format!("{repository}{TWO_PART_SEPARATOR}{name}"));
        record.set("repository", repository);
        record.set("name", name);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn label_route_encodes_name() {
        assert_eq!(
            label_route("octo-org", "repo", "triage/needs info"),
            "/repos/octo-org/repo/labels/triage%2Fneeds%20info"
        );
    }

    #[test]
    fn color_must_be_hex() {
        let config = json!({"repository": "r", "name": "bug", "color": "red"});
        let mut diags = Diagnostics::new();
        IssueLabel.check(config.as_object().unwrap(), &mut diags);
        assert!(diags.mentions("color"));

        let config = json!({"repository": "r", "name": "bug", "color": "d73a4a"});
        let mut diags = Diagnostics::new();
        IssueLabel.check(config.as_object().unwrap(), &mut diags);
        assert!(diags.is_empty());
    }

    #[test]
    fn color_with_leading_hash_is_rejected() {
        let config = json!({"repository": "r", "name": "bug", "color": "#d73a4a"});
        let mut diags = Diagnostics::new();
        IssueLabel.check(config.as_object().unwrap(), &mut diags);
        assert!(diags.mentions("color"));
    }

    #[test]
    fn github_label_deserializes_without_description() {
        let label: GitHubLabel =
            serde_json::from_value(json!({"name": "bug", "color": "d73a4a"})).unwrap();
        assert_eq!(label.description, None);
        assert_eq!(label.url, None);
    }

    #[tokio::test]
    async fn import_keeps_slashes_in_names() {
        let client = GitHubClient::builder().owner("octo-org").build().unwrap();
        let record = IssueLabel.import_state(&client, "repo/triage/needs-info").unwrap();
        assert_eq!(record.id, "repo:triage/needs-info");
        assert_eq!(record.get_str("name"), Some("triage/needs-info"));
    }
}
