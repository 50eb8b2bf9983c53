//! `github_actions_public_key`: the key Actions secrets of a repository are
//! sealed to.

use async_trait::async_trait;
use hubform_protocol::{AttrType, Attribute, Attributes, Record, Schema};
use serde::Deserialize;
use tracing::instrument;

use crate::client::GitHubClient;
use crate::error::Result;
use crate::provider::DataSource;
use crate::resources::decode;

static SCHEMA: Schema = Schema {
    description: "The Actions public key of a repository.",
    attributes: &[
        Attribute::required("repository", AttrType::String),
        Attribute::computed("key_id", AttrType::String),
        Attribute::computed("key", AttrType::String),
    ],
};

#[derive(Debug, Deserialize)]
struct Config {
    repository: String,
}

/// The `github_actions_public_key` data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionsPublicKey;

#[async_trait]
impl DataSource for ActionsPublicKey {
    fn type_name(&self) -> &'static str {
        "github_actions_public_key"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    #[instrument(skip_all)]
    async fn read(&self, client: &GitHubClient, config: &Attributes) -> Result<Record> {
        let cfg: Config = decode(config)?;
        let key = client
            .repository_public_key(client.owner()?, &cfg.repository)
            .await?;

        let mut record = Record::with_attributes(key.key_id.clone(), config.clone());
        record.merge(&key)?;
        Ok(record)
    }
}
