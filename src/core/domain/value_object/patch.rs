//! Tri-state request fields.
//!
//! A field in an update payload can be left alone, reset, or set. The remote
//! reads an omitted key as "no change", so an unset field must never reach
//! the payload, while a value equal to the type's zero (`0`, `""`, `false`)
//! is a real value and must be sent.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

/// Name of the parameter listing fields to reset to their defaults.
pub const DELETE_PARAM: &str = "delete";

/// A request field with three distinguishable states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Not part of the request; the remote keeps its current value.
    Unchanged,
    /// Reset the remote field to its default.
    Clear,
    /// Set the remote field to this value, even if it is a zero value.
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Unchanged
    }
}

impl<T> Patch<T> {
    /// `Some` sets the value, `None` clears it.
    pub fn set_or_clear(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        }
    }

    /// Returns `true` when the field must be left out of the payload.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Patch::Unchanged)
    }

    /// Returns the value if one is being set.
    #[must_use]
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            _ => None,
        }
    }

    /// Maps the inner value, keeping the state.
    pub fn map<U, F>(self, f: F) -> Patch<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Patch::Unchanged => Patch::Unchanged,
            Patch::Clear => Patch::Clear,
            Patch::Set(value) => Patch::Set(f(value)),
        }
    }
}

impl<T> From<T> for Patch<T> {
    fn from(value: T) -> Self {
        Patch::Set(value)
    }
}

/// `Clear` serializes as `null`; [`into_payload`] turns those nulls into the
/// `delete` parameter. `Unchanged` must be skipped by the containing struct
/// with `skip_serializing_if = "Patch::is_unchanged"`.
impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Set(value) => value.serialize(serializer),
            Patch::Clear | Patch::Unchanged => serializer.serialize_none(),
        }
    }
}

/// Serializes a request and moves every cleared field into the `delete`
/// parameter, which is how the remote expects resets to be expressed.
///
/// Names already listed in an explicit `delete` entry are kept.
pub fn into_payload<R: Serialize>(request: &R) -> serde_json::Result<Map<String, Value>> {
    let mut payload = match serde_json::to_value(request)? {
        Value::Object(map) => map,
        other => {
            return Err(serde::ser::Error::custom(format!(
                "request must serialize to an object, got {}",
                other
            )));
        }
    };

    let mut cleared: Vec<String> = match payload.remove(DELETE_PARAM) {
        Some(Value::String(list)) if !list.is_empty() => {
            list.split(',').map(str::to_string).collect()
        }
        _ => Vec::new(),
    };
    payload.retain(|key, value| {
        if value.is_null() {
            cleared.push(key.clone());
            false
        } else {
            true
        }
    });

    if !cleared.is_empty() {
        debug!(fields = %cleared.join(","), "clearing fields");
        payload.insert(DELETE_PARAM.to_string(), Value::String(cleared.join(",")));
    }
    Ok(payload)
}

/// Serializes a request for a create call, where nothing exists to clear:
/// cleared fields are dropped instead of being listed in `delete`.
pub fn into_create_payload<R: Serialize>(request: &R) -> serde_json::Result<Map<String, Value>> {
    let mut payload = into_payload(request)?;
    if let Some(cleared) = payload.remove(DELETE_PARAM) {
        debug!(fields = %cleared, "ignoring cleared fields on create");
    }
    Ok(payload)
}

/// Serializes a `Patch<bool>` as the remote's `0`/`1` integers.
pub mod int_bool {
    use super::Patch;
    use serde::Serializer;

    pub fn serialize<S>(value: &Patch<bool>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Patch::Set(flag) => serializer.serialize_u8(u8::from(*flag)),
            Patch::Clear | Patch::Unchanged => serializer.serialize_none(),
        }
    }
}
