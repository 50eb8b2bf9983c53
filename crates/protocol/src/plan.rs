//! Plan computation for replace-only resources.
//!
//! Every declared attribute of a managed resource forces replacement, so a
//! plan is one of three things: create a missing object, leave a matching
//! object alone, or replace an object whose declared attributes changed.

use serde::Serialize;
use serde_json::Value;

use crate::record::{Attributes, Record};
use crate::schema::{AttrType, Attribute, Mode, Schema};

/// The action a plan proposes for one resource instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanAction {
    /// No prior state, or the prior identity was cleared.
    Create,
    /// State already matches configuration.
    NoOp,
    /// Declared attributes changed; destroy and recreate.
    Replace {
        /// Names of the attributes whose desired value differs.
        attributes: Vec<String>,
    },
}

/// Computes the plan for `config` against `prior` state.
///
/// Defaults are applied to `config` before comparing. Optional-computed
/// attributes that configuration omits are ignored at any depth, sets are
/// compared without regard to order, and nested objects only on their
/// declared fields. `false`, empty lists and `null` count as unset.
#[must_use]
pub fn plan(schema: &Schema, prior: Option<&Record>, config: &Attributes) -> PlanAction {
    let Some(prior) = prior.filter(|p| p.exists()) else {
        return PlanAction::Create;
    };

    let mut desired = config.clone();
    schema.apply_defaults(&mut desired);

    let changed: Vec<String> = schema
        .attributes
        .iter()
        .filter(|a| a.mode.is_declared())
        .filter(|a| !attribute_matches(a, desired.get(a.name), prior.get(a.name)))
        .map(|a| a.name.to_string())
        .collect();

    if changed.is_empty() {
        PlanAction::NoOp
    } else {
        PlanAction::Replace { attributes: changed }
    }
}

/// Compares one attribute, treating an omitted optional-computed value as
/// whatever the remote chose.
fn attribute_matches(attribute: &Attribute, want: Option<&Value>, have: Option<&Value>) -> bool {
    let want = want.filter(|v| !v.is_null());
    if want.is_none() && attribute.mode == Mode::OptionalComputed {
        return true;
    }
    equivalent(&attribute.ty, want, have)
}

fn equivalent(ty: &AttrType, want: Option<&Value>, have: Option<&Value>) -> bool {
    let want = want.filter(|v| !v.is_null());
    let have = have.filter(|v| !v.is_null());
    match (want, have) {
        (None, None) => true,
        (Some(v), None) | (None, Some(v)) => is_empty(v),
        (Some(w), Some(h)) => match (ty, w, h) {
            (AttrType::Set(_), Value::Array(w), Value::Array(h)) => {
                w.len() == h.len() && w.iter().all(|item| h.contains(item))
            }
            (AttrType::List(inner), Value::Array(w), Value::Array(h)) => {
                w.len() == h.len()
                    && w.iter().zip(h).all(|(w, h)| equivalent(inner, Some(w), Some(h)))
            }
            (AttrType::Object(attributes), Value::Object(w), Value::Object(h)) => attributes
                .iter()
                .filter(|a| a.mode.is_declared())
                .all(|a| attribute_matches(a, w.get(a.name), h.get(a.name))),
            _ => w == h,
        },
    }
}

/// Values an omitted attribute is indistinguishable from.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.values().all(is_empty),
        _ => false,
    }
}
