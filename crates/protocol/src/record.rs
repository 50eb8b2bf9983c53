//! Managed records and the read-and-reconcile contract.
//!
//! A [`Record`] is the locally persisted representation of one remote GitHub
//! object: an opaque identity plus a JSON object of declared and observed
//! attributes. Reads either refresh the observed attributes or clear the
//! identity, which tells the host to plan a recreate.
//!
//! # Examples
//!
//! ```
//! use hubform_protocol::{DriftPolicy, ReadOutcome, Record};
//!
//! let mut record = Record::new("my-repo:API_KEY");
//! record.set("updated_at", "2024-01-20T14:45:00Z");
//!
//! // Same timestamp: the record stays.
//! let outcome = record.reconcile_marker("updated_at", "2024-01-20T14:45:00Z", DriftPolicy::Replace);
//! assert_eq!(outcome, ReadOutcome::Refreshed);
//!
//! // Changed out of band: the identity is cleared.
//! let outcome = record.reconcile_marker("updated_at", "2024-02-01T08:00:00Z", DriftPolicy::Replace);
//! assert_eq!(outcome, ReadOutcome::Drifted);
//! assert!(!record.exists());
//! ```

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{ProtocolError, Result};
use crate::schema::Schema;

/// A JSON object of attribute values.
pub type Attributes = serde_json::Map<String, Value>;

/// Placeholder written in place of sensitive values in displayed records.
pub const REDACTED: &str = "(sensitive value)";

/// The locally persisted state of one remote object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque identity; empty once the remote object is gone or drifted.
    #[serde(default)]
    pub id: String,
    /// Declared and observed attributes.
    #[serde(default)]
    pub attributes: Attributes,
}

/// What a read did to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadOutcome {
    /// Observed attributes were repopulated.
    Refreshed,
    /// The remote object no longer exists; identity was cleared.
    Removed,
    /// The remote object changed out of band; identity was cleared.
    Drifted,
}

/// What to do when a drift marker changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftPolicy {
    /// Clear the identity so the object gets recreated.
    Replace,
    /// Accept the new marker and keep the record.
    Accept,
}

impl DriftPolicy {
    /// Maps a `destroy_on_drift` flag to a policy.
    #[must_use]
    pub fn from_destroy_on_drift(destroy: bool) -> Self {
        if destroy { Self::Replace } else { Self::Accept }
    }
}

impl Record {
    /// Creates a record with the given identity and no attributes.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Attributes::new(),
        }
    }

    /// Creates a record from an identity and an attribute object.
    #[must_use]
    pub fn with_attributes(id: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }

    /// Returns `true` while the record still addresses a remote object.
    #[must_use]
    pub fn exists(&self) -> bool {
        !self.id.is_empty()
    }

    /// Clears the identity, marking the remote object as gone.
    pub fn clear_identity(&mut self) {
        self.id.clear();
    }

    /// Returns an attribute, treating `null` as absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| !v.is_null())
    }

    /// Returns a string attribute.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Returns a boolean attribute.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Sets an attribute.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    /// Decodes the attributes into a typed model.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] if the attributes do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.attributes.clone())).map_err(ProtocolError::Decode)
    }

    /// Writes every field of a typed model into the attributes, replacing
    /// existing values of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` does not serialize to a JSON object.
    pub fn merge<T: Serialize>(&mut self, model: &T) -> Result<()> {
        match serde_json::to_value(model).map_err(ProtocolError::Decode)? {
            Value::Object(map) => {
                self.attributes.extend(map);
                Ok(())
            }
            _ => Err(ProtocolError::NotAnObject),
        }
    }

    /// Compares a freshly observed drift marker with the stored one.
    ///
    /// When no marker is stored yet (first read after create or import) the
    /// new value is recorded. When the stored value differs, the identity is
    /// cleared under [`DriftPolicy::Replace`], or the new value is accepted
    /// under [`DriftPolicy::Accept`].
    pub fn reconcile_marker(
        &mut self,
        name: &str,
        observed: &str,
        policy: DriftPolicy,
    ) -> ReadOutcome {
        let drifted = self
            .get_str(name)
            .is_some_and(|stored| !stored.is_empty() && !same_instant(stored, observed));

        if drifted {
            match policy {
                DriftPolicy::Replace => {
                    info!(id = %self.id, marker = name, "remote object changed out of band, forcing replacement");
                    self.clear_identity();
                    return ReadOutcome::Drifted;
                }
                DriftPolicy::Accept => {
                    info!(id = %self.id, marker = name, "remote object changed out of band, accepting new state");
                }
            }
        }

        self.set(name, observed);
        ReadOutcome::Refreshed
    }

    /// Returns a copy with every sensitive top-level attribute masked.
    #[must_use]
    pub fn redacted(&self, schema: &Schema) -> Self {
        let mut copy = self.clone();
        for name in schema.sensitive_attributes() {
            if let Some(value) = copy.attributes.get_mut(name)
                && !value.is_null()
            {
                *value = Value::String(REDACTED.to_string());
            }
        }
        copy
    }
}

/// Compares two timestamps as instants when both parse as RFC 3339, and as
/// raw strings otherwise.
fn same_instant(a: &str, b: &str) -> bool {
    match (
        DateTime::<FixedOffset>::parse_from_rfc3339(a),
        DateTime::<FixedOffset>::parse_from_rfc3339(b),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
