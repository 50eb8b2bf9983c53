//! Managed GitHub objects.
//!
//! Each module declares one resource: its schema, the REST calls it makes
//! (as methods on [`GitHubClient`](crate::GitHubClient)), and its
//! [`Resource`] implementation.

use hubform_protocol::{Attributes, ProtocolError};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;
use crate::provider::Resource;

pub mod actions_organization_secret;
pub mod actions_repository_permissions;
pub mod actions_secret;
pub mod issue_label;
pub mod organization_ruleset;
pub mod repository_custom_property;
pub mod repository_webhook;
pub mod secret;

pub use actions_organization_secret::ActionsOrganizationSecret;
pub use actions_repository_permissions::ActionsRepositoryPermissions;
pub use actions_secret::ActionsSecret;
pub use issue_label::IssueLabel;
pub use organization_ruleset::OrganizationRuleset;
pub use repository_custom_property::RepositoryCustomProperty;
pub use repository_webhook::RepositoryWebhook;

/// Every built-in resource.
pub(crate) fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(ActionsSecret),
        Box::new(ActionsOrganizationSecret),
        Box::new(RepositoryWebhook),
        Box::new(RepositoryCustomProperty),
        Box::new(OrganizationRuleset),
        Box::new(ActionsRepositoryPermissions),
        Box::new(IssueLabel),
    ]
}

/// Decodes validated configuration into a typed model.
pub(crate) fn decode<T: DeserializeOwned>(attributes: &Attributes) -> Result<T> {
    serde_json::from_value(Value::Object(attributes.clone()))
        .map_err(|e| ProtocolError::Decode(e).into())
}

/// Fetches an attribute a read needs to address the remote object.
pub(crate) fn addressing<'a>(record: &'a hubform_protocol::Record, name: &str) -> Result<&'a str> {
    record.get_str(name).ok_or_else(|| {
        crate::Error::config(format!(
            "record '{}' is missing the `{name}` attribute",
            record.id
        ))
    })
}

fn default_true() -> bool {
    true
}
