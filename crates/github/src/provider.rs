//! The resource and data-source contracts and the provider registry.
//!
//! Every managed GitHub object implements [`Resource`]; every lookup
//! implements [`DataSource`]. The [`Provider`] owns one instance of each,
//! addresses them by type name, and wraps the raw operations with the
//! lifecycle every type shares:
//!
//! - configuration is validated before any remote call
//! - defaults are applied before create
//! - create and import finish with a read, so the record is fully populated
//! - reads of records without identity are skipped

use async_trait::async_trait;
use hubform_protocol::{Attributes, Diagnostics, PlanAction, ReadOutcome, Record, Schema};
use tracing::{debug, info, instrument};

use crate::client::GitHubClient;
use crate::data_sources;
use crate::error::{Error, Result};
use crate::resources;

/// A managed GitHub object.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name, such as `github_actions_secret`.
    fn type_name(&self) -> &'static str;

    /// Attribute schema.
    fn schema(&self) -> &'static Schema;

    /// Cross-attribute checks the schema cannot express.
    fn check(&self, _config: &Attributes, _diags: &mut Diagnostics) {}

    /// Creates the remote object and returns a record addressing it.
    async fn create(&self, client: &GitHubClient, config: &Attributes) -> Result<Record>;

    /// Reads the remote object back into `record`.
    async fn read(&self, client: &GitHubClient, record: &mut Record) -> Result<ReadOutcome>;

    /// Updates the remote object in place.
    ///
    /// Every attribute forces replacement, so the default refuses.
    async fn update(&self, _client: &GitHubClient, _prior: &Record, _config: &Attributes) -> Result<Record> {
        Err(Error::UpdateNotSupported {
            resource: self.type_name(),
        })
    }

    /// Deletes the remote object.
    async fn delete(&self, client: &GitHubClient, record: &Record) -> Result<()>;

    /// Turns an import identifier into a record the next read can populate.
    fn import_state(&self, client: &GitHubClient, import_id: &str) -> Result<Record>;
}

/// A read-only lookup.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Type name, such as `github_collaborators`.
    fn type_name(&self) -> &'static str;

    /// Attribute schema.
    fn schema(&self) -> &'static Schema;

    /// Cross-attribute checks the schema cannot express.
    fn check(&self, _config: &Attributes, _diags: &mut Diagnostics) {}

    /// Performs the lookup.
    async fn read(&self, client: &GitHubClient, config: &Attributes) -> Result<Record>;
}

/// Registry of every resource and data source.
pub struct Provider {
    resources: Vec<Box<dyn Resource>>,
    data_sources: Vec<Box<dyn DataSource>>,
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("resources", &self.resource_types().collect::<Vec<_>>())
            .field("data_sources", &self.data_source_types().collect::<Vec<_>>())
            .finish()
    }
}

impl Provider {
    /// Creates a provider with every built-in type registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resources: resources::all(),
            data_sources: data_sources::all(),
        }
    }

    /// Names of the registered resource types.
    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.iter().map(|r| r.type_name())
    }

    /// Names of the registered data-source types.
    pub fn data_source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.iter().map(|d| d.type_name())
    }

    /// Looks up a resource type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if no resource has this name.
    pub fn resource(&self, type_name: &str) -> Result<&dyn Resource> {
        self.resources
            .iter()
            .find(|r| r.type_name() == type_name)
            .map(|r| &**r)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))
    }

    /// Looks up a data-source type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if no data source has this name.
    pub fn data_source(&self, type_name: &str) -> Result<&dyn DataSource> {
        self.data_sources
            .iter()
            .find(|d| d.type_name() == type_name)
            .map(|r| &**r)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))
    }

    /// Returns the schema of a resource or data source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if neither kind has this name.
    pub fn schema(&self, type_name: &str) -> Result<&'static Schema> {
        self.resource(type_name)
            .map(|r| r.schema())
            .or_else(|_| self.data_source(type_name).map(|d| d.schema()))
    }

    /// Validates resource configuration without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] with every violation found.
    pub fn validate_resource(&self, type_name: &str, config: &Attributes) -> Result<()> {
        let resource = self.resource(type_name)?;
        let mut diags = resource.schema().validate(config);
        resource.check(config, &mut diags);
        finish_validation(diags)
    }

    /// Validates data-source configuration without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] with every violation found.
    pub fn validate_data_source(&self, type_name: &str, config: &Attributes) -> Result<()> {
        let source = self.data_source(type_name)?;
        let mut diags = source.schema().validate(config);
        source.check(config, &mut diags);
        finish_validation(diags)
    }

    /// Computes what applying `config` over `prior` would do.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown or the configuration invalid.
    pub fn plan(&self, type_name: &str, prior: Option<&Record>, config: &Attributes) -> Result<PlanAction> {
        self.validate_resource(type_name, config)?;
        let schema = self.resource(type_name)?.schema();
        Ok(hubform_protocol::plan(schema, prior, config))
    }

    /// Validates, creates and reads back a resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] before any remote call if the
    /// configuration is invalid, or the first remote error.
    #[instrument(skip(self, client, config))]
    pub async fn create(&self, client: &GitHubClient, type_name: &str, config: &Attributes) -> Result<Record> {
        self.validate_resource(type_name, config)?;
        let resource = self.resource(type_name)?;

        let mut config = config.clone();
        resource.schema().apply_defaults(&mut config);

        let mut record = resource.create(client, &config).await?;
        info!(id = %record.id, "created");
        let id = record.id.clone();
        match resource.read(client, &mut record).await? {
            ReadOutcome::Refreshed => Ok(record),
            ReadOutcome::Removed | ReadOutcome::Drifted => Err(Error::Missing {
                resource: resource.type_name(),
                id,
            }),
        }
    }

    /// Refreshes a record from the remote object.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown types and remote failures other than
    /// "not found".
    #[instrument(skip(self, client, record), fields(id = %record.id))]
    pub async fn read(&self, client: &GitHubClient, type_name: &str, record: &mut Record) -> Result<ReadOutcome> {
        let resource = self.resource(type_name)?;
        if !record.exists() {
            debug!("record has no identity, nothing to read");
            return Ok(ReadOutcome::Removed);
        }
        let outcome = resource.read(client, record).await?;
        if outcome == ReadOutcome::Removed {
            info!("remote object is gone, removing from state");
        }
        Ok(outcome)
    }

    /// Updates a resource in place.
    ///
    /// # Errors
    ///
    /// Built-in resources always return [`Error::UpdateNotSupported`].
    #[instrument(skip(self, client, prior, config), fields(id = %prior.id))]
    pub async fn update(
        &self,
        client: &GitHubClient,
        type_name: &str,
        prior: &Record,
        config: &Attributes,
    ) -> Result<Record> {
        self.resource(type_name)?.update(client, prior, config).await
    }

    /// Deletes a resource. Records without identity are skipped.
    ///
    /// # Errors
    ///
    /// Returns the remote error, except for "not found".
    #[instrument(skip(self, client, record), fields(id = %record.id))]
    pub async fn delete(&self, client: &GitHubClient, type_name: &str, record: &Record) -> Result<()> {
        let resource = self.resource(type_name)?;
        if !record.exists() {
            debug!("record has no identity, nothing to delete");
            return Ok(());
        }
        resource.delete(client, record).await?;
        info!("deleted");
        Ok(())
    }

    /// Imports an existing remote object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for malformed import identifiers and
    /// [`Error::Missing`] if nothing exists under it.
    #[instrument(skip(self, client))]
    pub async fn import(&self, client: &GitHubClient, type_name: &str, import_id: &str) -> Result<Record> {
        let resource = self.resource(type_name)?;
        let mut record = resource.import_state(client, import_id)?;
        let id = record.id.clone();
        match resource.read(client, &mut record).await? {
            ReadOutcome::Refreshed => Ok(record),
            ReadOutcome::Removed | ReadOutcome::Drifted => Err(Error::Missing {
                resource: resource.type_name(),
                id,
            }),
        }
    }

    /// Validates and performs a data-source lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] before any remote call if the
    /// configuration is invalid, or the first remote error.
    #[instrument(skip(self, client, config))]
    pub async fn read_data(&self, client: &GitHubClient, type_name: &str, config: &Attributes) -> Result<Record> {
        self.validate_data_source(type_name, config)?;
        let source = self.data_source(type_name)?;
        let mut config = config.clone();
        source.schema().apply_defaults(&mut config);
        source.read(client, &config).await
    }
}

fn finish_validation(diags: Diagnostics) -> Result<()> {
    if diags.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(diags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Attributes {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn registry_lists_every_type_once() {
        let provider = Provider::new();
        let mut resources: Vec<_> = provider.resource_types().collect();
        let count = resources.len();
        resources.sort_unstable();
        resources.dedup();
        assert_eq!(resources.len(), count);
        assert!(resources.contains(&"github_actions_secret"));
        assert!(resources.contains(&"github_issue_label"));

        let sources: Vec<_> = provider.data_source_types().collect();
        assert!(sources.contains(&"github_collaborators"));
        assert!(sources.contains(&"github_users"));
    }

    #[test]
    fn unknown_type_is_reported() {
        let provider = Provider::new();
        assert!(matches!(
            provider.resource("github_nope"),
            Err(Error::UnknownType(name)) if name == "github_nope"
        ));
        assert!(provider.schema("github_nope").is_err());
    }

    #[test]
    fn schema_resolves_data_sources_too() {
        let provider = Provider::new();
        assert!(provider.schema("github_actions_public_key").is_ok());
    }

    #[test]
    fn plan_validates_first() {
        let provider = Provider::new();
        let err = provider
            .plan("github_actions_secret", None, &attrs(json!({"repository": "repo"})))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn plan_create_for_new_resource() {
        let provider = Provider::new();
        let config = attrs(json!({
            "repository": "repo",
            "secret_name": "TOKEN",
            "plaintext_value": "hunter2",
        }));
        assert_eq!(
            provider.plan("github_actions_secret", None, &config).unwrap(),
            PlanAction::Create
        );
    }

    #[tokio::test]
    async fn update_is_refused_for_every_resource() {
        let provider = Provider::new();
        let client = GitHubClient::builder().owner("octo-org").build().unwrap();
        for name in provider.resource_types() {
            let err = provider
                .update(&client, name, &Record::new("id"), &Attributes::new())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::UpdateNotSupported { resource } if resource == name));
        }
    }

    #[tokio::test]
    async fn read_without_identity_skips_remote() {
        let provider = Provider::new();
        let client = GitHubClient::builder()
            .base_url("http://127.0.0.1:9")
            .owner("octo-org")
            .build()
            .unwrap();
        let mut record = Record::default();
        let outcome = provider
            .read(&client, "github_issue_label", &mut record)
            .await
            .unwrap();
        assert_eq!(outcome, ReadOutcome::Removed);
    }
}
