//! Read-only lookups.
//!
//! A data source validates its inputs, performs one lookup and returns a
//! [`Record`](hubform_protocol::Record) holding the inputs next to the
//! computed outputs. Nothing is persisted between reads.

use crate::provider::DataSource;

pub mod actions_public_key;
pub mod app_token;
pub mod collaborators;
pub mod external_identities;
pub mod repository;
pub mod users;

pub use actions_public_key::ActionsPublicKey;
pub use app_token::AppToken;
pub use collaborators::Collaborators;
pub use external_identities::OrganizationExternalIdentities;
pub use repository::Repository;
pub use users::Users;

/// Every built-in data source.
pub(crate) fn all() -> Vec<Box<dyn DataSource>> {
    vec![
        Box::new(Collaborators),
        Box::new(Repository),
        Box::new(ActionsPublicKey),
        Box::new(Users),
        Box::new(AppToken),
        Box::new(OrganizationExternalIdentities),
    ]
}
