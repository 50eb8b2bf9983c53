//! `github_users`: resolves logins to node ids and public emails with one
//! GraphQL round trip.

use std::collections::HashMap;

use async_trait::async_trait;
use hubform_protocol::{AttrType, Attribute, Attributes, Record, Schema};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::GitHubClient;
use crate::error::Result;
use crate::graphql::{GraphQlError, Query};
use crate::provider::DataSource;
use crate::resources::decode;

const STRINGS: AttrType = AttrType::List(&AttrType::String);

static SCHEMA: Schema = Schema {
    description: "Looks up several users by login.",
    attributes: &[
        Attribute::required("usernames", STRINGS),
        Attribute::computed("logins", STRINGS),
        Attribute::computed("node_ids", STRINGS),
        Attribute::computed("emails", STRINGS),
        Attribute::computed("unknown_logins", STRINGS),
    ],
};

#[derive(Debug, Deserialize)]
struct Config {
    usernames: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// What the lookup found, in input order.
#[derive(Debug, Default, PartialEq, Serialize)]
struct Found {
    logins: Vec<String>,
    node_ids: Vec<String>,
    emails: Vec<String>,
    unknown_logins: Vec<String>,
}

impl Found {
    /// Sorts the aliased `userN` fields back into input order.
    fn collect(usernames: &[String], mut data: HashMap<String, Option<User>>) -> Self {
        let mut found = Self::default();
        for (i, username) in usernames.iter().enumerate() {
            match data.remove(&format!("user{i}")).flatten() {
                Some(user) => {
                    found.logins.push(user.login);
                    found.node_ids.push(user.id);
                    found.emails.push(user.email.unwrap_or_default());
                }
                None => found.unknown_logins.push(username.clone()),
            }
        }
        found
    }
}

fn missing_user(error: &GraphQlError) -> bool {
    error.is_not_found()
}

/// The `github_users` data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct Users;

#[async_trait]
impl DataSource for Users {
    fn type_name(&self) -> &'static str {
        "github_users"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    #[instrument(skip_all)]
    async fn read(&self, client: &GitHubClient, config: &Attributes) -> Result<Record> {
        let cfg: Config = decode(config)?;

        let found = if cfg.usernames.is_empty() {
            Found::default()
        } else {
            let data = client
                .query(&Query::Users { logins: &cfg.usernames }, missing_user)
                .await?;
            Found::collect(&cfg.usernames, data)
        };
        debug!(
            found = found.logins.len(),
            unknown = found.unknown_logins.len(),
            "resolved users"
        );

        let mut record = Record::with_attributes(cfg.usernames.join(","), config.clone());
        record.merge(&found)?;
        Ok(record)
    }
}
