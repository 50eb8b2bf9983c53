//! `github_organization_external_identities`: the SAML/SCIM identities
//! linked to members of the configured organization.
//!
//! Organizations without a SAML identity provider have no identities; that
//! reads as an empty list, not an error.

use async_trait::async_trait;
use hubform_protocol::{AttrType, Attribute, Attributes, Record, Schema};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::GitHubClient;
use crate::error::Result;
use crate::graphql::{Query, strict};
use crate::pagination::{Page, PageToken, collect_pages};
use crate::provider::DataSource;

static SAML_IDENTITY: [Attribute; 4] = [
    Attribute::computed("name_id", AttrType::String),
    Attribute::computed("username", AttrType::String),
    Attribute::computed("given_name", AttrType::String),
    Attribute::computed("family_name", AttrType::String),
];

static SCIM_IDENTITY: [Attribute; 3] = [
    Attribute::computed("username", AttrType::String),
    Attribute::computed("given_name", AttrType::String),
    Attribute::computed("family_name", AttrType::String),
];

static IDENTITY: [Attribute; 4] = [
    Attribute::computed("guid", AttrType::String),
    Attribute::computed("login", AttrType::String),
    Attribute::computed("saml_identity", AttrType::Object(&SAML_IDENTITY)),
    Attribute::computed("scim_identity", AttrType::Object(&SCIM_IDENTITY)),
];

static IDENTITY_OBJECT: AttrType = AttrType::Object(&IDENTITY);

static SCHEMA: Schema = Schema {
    description: "Lists the external identities of the organization's members.",
    attributes: &[Attribute::computed("identities", AttrType::List(&IDENTITY_OBJECT))],
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Data {
    organization: Option<Organization>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Organization {
    saml_identity_provider: Option<IdentityProvider>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityProvider {
    external_identities: Connection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection {
    page_info: PageInfo,
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    node: Node,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Node {
    guid: String,
    #[serde(default)]
    user: Option<Login>,
    #[serde(default)]
    saml_identity: Option<SamlIdentity>,
    #[serde(default)]
    scim_identity: Option<ScimIdentity>,
}

#[derive(Debug, Deserialize)]
struct Login {
    login: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
struct SamlIdentity {
    #[serde(default)]
    name_id: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
struct ScimIdentity {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
}

#[derive(Debug, PartialEq, Serialize)]
struct Identity {
    guid: String,
    login: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    saml_identity: Option<SamlIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scim_identity: Option<ScimIdentity>,
}

impl From<Node> for Identity {
    fn from(node: Node) -> Self {
        Self {
            guid: node.guid,
            // Identities not linked to an account have no user.
            login: node.user.map(|u| u.login).unwrap_or_default(),
            saml_identity: node.saml_identity,
            scim_identity: node.scim_identity,
        }
    }
}

/// Splits one response into a page of identities.
fn page(data: Data) -> Page<Identity> {
    let Some(connection) = data
        .organization
        .and_then(|o| o.saml_identity_provider)
        .map(|p| p.external_identities)
    else {
        return Page {
            items: Vec::new(),
            next: None,
        };
    };
    let next = match connection.page_info {
        PageInfo {
            has_next_page: true,
            end_cursor: Some(cursor),
        } => Some(PageToken::Cursor(cursor)),
        _ => None,
    };
    Page {
        items: connection.edges.into_iter().map(|e| e.node.into()).collect(),
        next,
    }
}

/// The `github_organization_external_identities` data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrganizationExternalIdentities;

#[async_trait]
impl DataSource for OrganizationExternalIdentities {
    fn type_name(&self) -> &'static str {
        "github_organization_external_identities"
    }

    fn schema(&self) -> &'static Schema {
        &SCHEMA
    }

    #[instrument(skip_all)]
    async fn read(&self, client: &GitHubClient, config: &Attributes) -> Result<Record> {
        let organization = client.owner()?;
        let identities = collect_pages(|token| async move {
            let after = match &token {
                Some(PageToken::Cursor(cursor)) => Some(cursor.as_str()),
                _ => None,
            };
            let data: Data = client
                .query(&Query::ExternalIdentities { organization, after }, strict)
                .await?;
            Ok(page(data))
        })
        .await?;
        debug!(count = identities.len(), "listed external identities");

        let mut record = Record::with_attributes(organization, config.clone());
        record.set("identities", serde_json::to_value(identities)?);
        Ok(record)
    }
}
