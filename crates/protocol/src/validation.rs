//! Declarative attribute validation rules and diagnostics.
//!
//! Validation runs before any remote call. Every violation found is reported,
//! not just the first one, through a single [`Diagnostics`] value.
//!
//! # Examples
//!
//! ```
//! use hubform_protocol::validation::{Diagnostics, Rule};
//! use serde_json::json;
//!
//! let mut diags = Diagnostics::new();
//! Rule::OneOf(&["all", "private", "selected"]).check_value("visibility", &json!("public"), &mut diags);
//! assert_eq!(diags.len(), 1);
//! ```

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ProtocolError, Result};
use crate::record::Attributes;

/// A validation rule attached to an attribute.
///
/// Rules are a closed set composed per attribute in a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "args", rename_all = "snake_case")]
pub enum Rule {
    /// The value (or each element of a list) must be one of these strings.
    OneOf(&'static [&'static str]),
    /// The attribute must not be set together with any of these siblings.
    ConflictsWith(&'static [&'static str]),
    /// Exactly one attribute of this group (which includes the attribute
    /// itself) must be set.
    ExactlyOneOf(&'static [&'static str]),
    /// The value must be standard, padded base64.
    Base64,
    /// The value must have at least this many elements (or characters).
    SizeAtLeast(usize),
}

impl Rule {
    /// Checks a rule that only looks at the attribute's own value.
    ///
    /// Sibling rules ([`Rule::ConflictsWith`], [`Rule::ExactlyOneOf`]) are
    /// ignored here; see [`Rule::check_siblings`].
    pub fn check_value(&self, path: &str, value: &Value, diags: &mut Diagnostics) {
        match self {
            Self::OneOf(allowed) => {
                let values: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for v in values {
                    let ok = v.as_str().is_some_and(|s| allowed.contains(&s));
                    if !ok {
                        diags.error(
                            path,
                            format!("expected one of [{}], got {v}", allowed.join(", ")),
                        );
                    }
                }
            }
            Self::Base64 => {
                if let Some(s) = value.as_str()
                    && STANDARD.decode(s).is_err()
                {
                    diags.error(path, "value is not valid base64");
                }
            }
            Self::SizeAtLeast(min) => {
                let size = match value {
                    Value::Array(items) => items.len(),
                    Value::String(s) => s.chars().count(),
                    Value::Object(map) => map.len(),
                    _ => return,
                };
                if size < *min {
                    diags.error(
                        path,
                        format!("expected at least {min} element(s), got {size}"),
                    );
                }
            }
            Self::ConflictsWith(_) | Self::ExactlyOneOf(_) => {}
        }
    }

    /// Checks a rule that relates the attribute `name` to its siblings in
    /// `object`.
    pub fn check_siblings(
        &self,
        prefix: &str,
        name: &str,
        object: &Attributes,
        diags: &mut Diagnostics,
    ) {
        match self {
            Self::ConflictsWith(others) => {
                if !is_set(object, name) {
                    return;
                }
                for other in others.iter().filter(|o| is_set(object, o)) {
                    diags.error(
                        &join_path(prefix, name),
                        format!("conflicts with `{}`", join_path(prefix, other)),
                    );
                }
            }
            Self::ExactlyOneOf(group) => {
                let set = group.iter().filter(|g| is_set(object, g)).count();
                if set != 1 {
                    let names: Vec<String> = group
                        .iter()
                        .map(|g| format!("`{}`", join_path(prefix, g)))
                        .collect();
                    let path = if prefix.is_empty() { "<root>" } else { prefix };
                    diags.error(
                        path,
                        format!("exactly one of {} must be set, got {set}", names.join(", ")),
                    );
                }
            }
            Self::OneOf(_) | Self::Base64 | Self::SizeAtLeast(_) => {}
        }
    }
}

/// Returns whether `name` is present in `object` with a non-null value.
#[must_use]
pub fn is_set(object: &Attributes, name: &str) -> bool {
    object.get(name).is_some_and(|v| !v.is_null())
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Dotted path of the offending attribute (`configuration.url`,
    /// `bypass_actors[0].actor_type`).
    pub path: String,
    /// What went wrong.
    pub summary: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.summary)
    }
}

/// An ordered, duplicate-free collection of validation findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finding, unless an identical one is already present.
    pub fn error(&mut self, path: &str, summary: impl Into<String>) {
        let diag = Diagnostic {
            path: path.to_string(),
            summary: summary.into(),
        };
        if !self.0.contains(&diag) {
            self.0.push(diag);
        }
    }

    /// Returns `true` if nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of findings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the findings in the order they were reported.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Returns `true` if any finding concerns the given path.
    #[must_use]
    pub fn mentions(&self, path: &str) -> bool {
        self.0.iter().any(|d| d.path == path)
    }

    /// Moves all findings from `other` into `self`.
    pub fn extend(&mut self, other: Diagnostics) {
        for diag in other.0 {
            if !self.0.contains(&diag) {
                self.0.push(diag);
            }
        }
    }

    /// Converts the collection into a result.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Validation`] if any finding was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::Validation(self))
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diag) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{diag}")?;
        }
        Ok(())
    }
}
