//! Shared protocol types for hubform.
//!
//! This crate defines the framework-agnostic building blocks every GitHub
//! resource and data source is made of.
//!
//! # Overview
//!
//! - [`record`]: the [`Record`] persisted per resource instance, and the
//!   read-and-reconcile helpers ([`ReadOutcome`], [`DriftPolicy`])
//! - [`identity`]: composing and parsing opaque identities
//! - [`schema`]: attribute classification (required/optional/computed,
//!   sensitive, forces replacement)
//! - [`validation`]: the closed set of validation [`Rule`]s and [`Diagnostics`]
//! - [`plan`]: create / no-op / replace plans for replace-only resources
//! - [`error`]: error types for protocol operations
//!
//! # Examples
//!
//! ```
//! use hubform_protocol::{PlanAction, Record, plan};
//! use hubform_protocol::schema::{AttrType, Attribute, Schema};
//! use serde_json::json;
//!
//! static SCHEMA: Schema = Schema {
//!     description: "A label",
//!     attributes: &[
//!         Attribute::required("name", AttrType::String).force_new(),
//!         Attribute::required("color", AttrType::String).force_new(),
//!     ],
//! };
//!
//! let config = json!({"name": "bug", "color": "d73a4a"});
//! let config = config.as_object().unwrap();
//! assert!(SCHEMA.validate(config).is_empty());
//!
//! let mut state = Record::new("repo:bug");
//! state.set("name", "bug");
//! state.set("color", "ffffff");
//! assert!(matches!(plan(&SCHEMA, Some(&state), config), PlanAction::Replace { .. }));
//! ```

pub mod error;
pub mod identity;
pub mod plan;
pub mod record;
pub mod schema;
pub mod validation;

// Re-export primary types at crate root for convenience
pub use error::{ProtocolError, Result};
pub use plan::{PlanAction, plan};
pub use record::{Attributes, DriftPolicy, REDACTED, ReadOutcome, Record};
pub use schema::{AttrType, Attribute, DefaultValue, Mode, Schema};
pub use validation::{Diagnostic, Diagnostics, Rule};
