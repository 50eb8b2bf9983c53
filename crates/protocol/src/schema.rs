//! Attribute schemas.
//!
//! A [`Schema`] lists the attributes of one resource or data-source type
//! together with their classification: required, optional or computed,
//! sensitive, and whether a change forces replacement. Schemas are plain
//! `static` data so that every type declares its surface in one place.
//!
//! # Examples
//!
//! ```
//! use hubform_protocol::schema::{AttrType, Attribute, Schema};
//! use hubform_protocol::validation::Rule;
//! use serde_json::json;
//!
//! static SCHEMA: Schema = Schema {
//!     description: "A demo resource",
//!     attributes: &[
//!         Attribute::required("name", AttrType::String).force_new(),
//!         Attribute::optional("visibility", AttrType::String)
//!             .with_rules(&[Rule::OneOf(&["all", "private"])]),
//!         Attribute::computed("created_at", AttrType::String),
//!     ],
//! };
//!
//! let config = json!({"name": "demo", "visibility": "public"});
//! let diags = SCHEMA.validate(config.as_object().unwrap());
//! assert!(diags.mentions("visibility"));
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::record::Attributes;
use crate::validation::{Diagnostics, Rule, is_set, join_path};

/// The value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrType {
    /// A UTF-8 string.
    String,
    /// A boolean.
    Bool,
    /// A 64-bit signed integer.
    Int,
    /// An ordered list.
    List(&'static AttrType),
    /// An unordered collection without duplicates.
    Set(&'static AttrType),
    /// A nested object with its own attributes.
    Object(&'static [Attribute]),
}

/// How an attribute is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Must be set in configuration.
    Required,
    /// May be set in configuration.
    Optional,
    /// Set only by reads; configuration cannot set it.
    Computed,
    /// May be set in configuration; filled by reads otherwise.
    OptionalComputed,
}

impl Mode {
    /// Returns `true` if configuration may supply this attribute.
    #[must_use]
    pub const fn is_declared(self) -> bool {
        !matches!(self, Self::Computed)
    }
}

/// A default applied to an optional attribute missing from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// A boolean default.
    Bool(bool),
    /// A string default.
    Str(&'static str),
}

impl DefaultValue {
    /// Converts the default into a JSON value.
    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(b),
            Self::Str(s) => Value::String(s.to_string()),
        }
    }
}

/// One attribute of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Attribute {
    /// Attribute name as it appears in configuration and state.
    pub name: &'static str,
    /// Value type.
    #[serde(rename = "type")]
    pub ty: AttrType,
    /// Required, optional or computed.
    pub mode: Mode,
    /// Whether the value must be redacted from output.
    pub sensitive: bool,
    /// Whether a change forces the resource to be replaced.
    pub force_new: bool,
    /// Default applied when configuration omits the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Validation rules.
    #[serde(skip_serializing_if = "<[Rule]>::is_empty")]
    pub rules: &'static [Rule],
    /// Human-readable description.
    pub description: &'static str,
}

impl Attribute {
    const fn new(name: &'static str, ty: AttrType, mode: Mode) -> Self {
        Self {
            name,
            ty,
            mode,
            sensitive: false,
            force_new: false,
            default: None,
            rules: &[],
            description: "",
        }
    }

    /// A required attribute.
    #[must_use]
    pub const fn required(name: &'static str, ty: AttrType) -> Self {
        Self::new(name, ty, Mode::Required)
    }

    /// An optional attribute.
    #[must_use]
    pub const fn optional(name: &'static str, ty: AttrType) -> Self {
        Self::new(name, ty, Mode::Optional)
    }

    /// A computed attribute.
    #[must_use]
    pub const fn computed(name: &'static str, ty: AttrType) -> Self {
        Self::new(name, ty, Mode::Computed)
    }

    /// An optional attribute that reads fill in when omitted.
    #[must_use]
    pub const fn optional_computed(name: &'static str, ty: AttrType) -> Self {
        Self::new(name, ty, Mode::OptionalComputed)
    }

    /// Marks the attribute sensitive.
    #[must_use]
    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Marks the attribute as forcing replacement when changed.
    #[must_use]
    pub const fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Sets a default value.
    #[must_use]
    pub const fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Attaches validation rules.
    #[must_use]
    pub const fn with_rules(mut self, rules: &'static [Rule]) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the description.
    #[must_use]
    pub const fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }
}

/// The attribute surface of a resource or data-source type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Schema {
    /// Human-readable description of the type.
    pub description: &'static str,
    /// Top-level attributes.
    pub attributes: &'static [Attribute],
}

impl Schema {
    /// Looks up a top-level attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Validates a configuration object against the schema.
    ///
    /// Returns every violation found: missing required attributes, computed
    /// attributes that were set, unknown attributes, type mismatches and
    /// rule failures, recursing into nested objects and lists.
    #[must_use]
    pub fn validate(&self, config: &Attributes) -> Diagnostics {
        let mut diags = Diagnostics::new();
        validate_object("", self.attributes, config, &mut diags);
        diags
    }

    /// Fills in defaults for top-level attributes that configuration omits.
    pub fn apply_defaults(&self, config: &mut Attributes) {
        for attr in self.attributes {
            if let Some(default) = attr.default
                && !is_set(config, attr.name)
            {
                config.insert(attr.name.to_string(), default.to_value());
            }
        }
    }

    /// Returns the names of top-level sensitive attributes.
    pub fn sensitive_attributes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes
            .iter()
            .filter(|a| a.sensitive)
            .map(|a| a.name)
    }
}

fn validate_object(
    prefix: &str,
    attributes: &'static [Attribute],
    object: &Attributes,
    diags: &mut Diagnostics,
) {
    for key in object.keys() {
        if !attributes.iter().any(|a| a.name == key) {
            diags.error(&join_path(prefix, key), "unsupported attribute");
        }
    }

    for attr in attributes {
        let path = join_path(prefix, attr.name);
        for rule in attr.rules {
            rule.check_siblings(prefix, attr.name, object, diags);
        }

        let Some(value) = object.get(attr.name).filter(|v| !v.is_null()) else {
            if attr.mode == Mode::Required {
                diags.error(&path, "attribute is required");
            }
            continue;
        };

        if attr.mode == Mode::Computed {
            diags.error(&path, "attribute is computed and cannot be set");
            continue;
        }

        if check_type(&path, &attr.ty, value, diags) {
            for rule in attr.rules {
                rule.check_value(&path, value, diags);
            }
        }
    }
}

/// Checks `value` against `ty`, returning `true` when it matches.
fn check_type(path: &str, ty: &AttrType, value: &Value, diags: &mut Diagnostics) -> bool {
    match (ty, value) {
        (AttrType::String, Value::String(_)) | (AttrType::Bool, Value::Bool(_)) => true,
        (AttrType::Int, Value::Number(n)) if n.is_i64() => true,
        (AttrType::List(inner), Value::Array(items)) => {
            let mut ok = true;
            for (i, item) in items.iter().enumerate() {
                ok &= check_type(&format!("{path}[{i}]"), inner, item, diags);
            }
            ok
        }
        (AttrType::Set(inner), Value::Array(items)) => {
            let mut ok = true;
            for (i, item) in items.iter().enumerate() {
                ok &= check_type(&format!("{path}[{i}]"), inner, item, diags);
                if items[..i].contains(item) {
                    diags.error(path, format!("duplicate set element {item}"));
                    ok = false;
                }
            }
            ok
        }
        (AttrType::Object(attributes), Value::Object(map)) => {
            let before = diags.len();
            validate_object(path, attributes, map, diags);
            diags.len() == before
        }
        _ => {
            diags.error(path, format!("expected {}, got {value}", type_name(ty)));
            false
        }
    }
}

fn type_name(ty: &AttrType) -> &'static str {
    match ty {
        AttrType::String => "a string",
        AttrType::Bool => "a boolean",
        AttrType::Int => "an integer",
        AttrType::List(_) => "a list",
        AttrType::Set(_) => "a set",
        AttrType::Object(_) => "an object",
    }
}
