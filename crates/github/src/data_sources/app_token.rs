//! `github_app_token`: an installation token for a GitHub App.

use async_trait::async_trait;
use hubform_protocol::identity::{TWO_PART_SEPARATOR, compose};
use hubform_protocol::{AttrType, Attribute, Attributes, Record, Schema};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use crate::app_token::installation_token;
use crate::client::GitHubClient;
use crate::error::Result;
use crate::provider::DataSource;
use crate::resources::decode;

static SCHEMA: Schema = Schema {
    description: "Exchanges GitHub App credentials for an installation token.",
    attributes: &[
        Attribute::required("app_id", AttrType::String),
        Attribute::required("installation_id", AttrType::String),
        Attribute::required("pem_file", AttrType::String)
            .sensitive()
            .describe("PEM encoded private key; literal `\\n` sequences are read as newlines."),
        Attribute::computed("token", AttrType::String).sensitive(),
        Attribute::computed("expires_at", AttrType::String),
    ],
};

#[derive(Debug, Deserialize)]
struct Config {
    app_id: String,
    installation_id: String,
    pem_file: String,
}

/// The `github_app_token` data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppToken;

#[async_trait]
impl DataSource for AppToken {
    fn type_name(&self) -> &'static str {
        "github_app_token"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    #[instrument(skip_all)]
    async fn read(&self, client: &GitHubClient, config: &Attributes) -> Result<Record> {
        let cfg: Config = decode(config)?;
        let pem = cfg.pem_file.replace("\\n", "\n");
        let token =
            installation_token(client.base_url(), &cfg.app_id, &cfg.installation_id, &pem).await?;

        let mut record = Record::with_attributes(
            compose(&[&cfg.app_id, &cfg.installation_id], TWO_PART_SEPARATOR),
            config.clone(),
        );
        record.set("token", token.token.expose_secret());
        if let Some(expires_at) = token.expires_at {
            record.set("expires_at", expires_at.to_rfc3339());
        }
        Ok(record)
    }
}
