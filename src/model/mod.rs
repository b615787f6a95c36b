//! Record models and their JSON payload mapping.
//!
//! A [`Model`] exposes its fields as an ordered list of [`FieldValue`]s and
//! accepts payload fields one at a time. On top of that the module provides
//! the two directions of the mapping:
//!
//! - [`from_payload`]: shallow-merge defaults and then values (JSON text or
//!   an already parsed object) into a record. Later sources win.
//! - [`to_payload`]: deep, non-mutating transform of a record into JSON text
//!   or a plain value, controlled by [`SerializeOptions`].

mod options;
mod serializer;
mod value;

pub use options::{IgnorePredicate, NestedPolicy, SerializeOptions};
pub use serializer::{Serialized, serialize_fields, to_payload};
pub use value::{FieldValue, Fields, ToField};

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// A structured record that can be hydrated from and flattened to payloads.
pub trait Model: Default {
    /// The record's fields in declaration order.
    fn fields(&self) -> Fields;

    /// Merge one payload field into the record.
    ///
    /// Returns `Ok(false)` for a name the record does not know.
    fn assign(&mut self, field: &str, value: &Value) -> Result<bool>;

    /// Merge `defaults` and then `values` into this record.
    fn set<'a>(
        &mut self,
        values: impl Into<Payload<'a>>,
        defaults: Option<&Map<String, Value>>,
    ) -> Result<()> {
        from_payload(self, values, defaults)
    }

    /// Create a default record and merge `values` and `defaults` into it.
    fn create<'a>(
        values: impl Into<Payload<'a>>,
        defaults: Option<&Map<String, Value>>,
    ) -> Result<Self> {
        let mut model = Self::default();
        model.set(values, defaults)?;
        Ok(model)
    }

    fn to_payload(&self, options: &SerializeOptions) -> Result<Serialized> {
        to_payload(self, options)
    }

    /// Compact JSON text with every field included.
    fn to_json(&self) -> Result<String> {
        to_payload(self, &SerializeOptions::default())?.into_text()
    }
}

/// Values handed to [`from_payload`].
#[derive(Debug, Clone, Copy, Default)]
pub enum Payload<'a> {
    #[default]
    None,
    /// JSON text, parsed before merging.
    Text(&'a str),
    Json(&'a Value),
}

impl<'a> From<&'a str> for Payload<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a String> for Payload<'a> {
    fn from(text: &'a String) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a Value> for Payload<'a> {
    fn from(value: &'a Value) -> Self {
        Self::Json(value)
    }
}

impl<'a> Payload<'a> {
    fn resolve(self) -> Result<Option<Cow<'a, Value>>> {
        match self {
            Self::None | Self::Text("") | Self::Json(Value::Null) => Ok(None),
            Self::Text(text) => serde_json::from_str(text)
                .map(|value| Some(Cow::Owned(value)))
                .map_err(Error::Parse),
            Self::Json(value) => Ok(Some(Cow::Borrowed(value))),
        }
    }
}

/// Shallow-merge `defaults` and then `values` into `record`.
///
/// Text values are parsed first, so invalid JSON fails with
/// [`Error::Parse`] before any field changes. Fields absent from both
/// sources keep their current value. Unknown names are skipped.
pub fn from_payload<'a, M: Model>(
    record: &mut M,
    values: impl Into<Payload<'a>>,
    defaults: Option<&Map<String, Value>>,
) -> Result<()> {
    let values = values.into().resolve()?;
    let values = match values.as_deref() {
        None => None,
        Some(Value::Object(object)) => Some(object),
        Some(other) => {
            return Err(Error::invalid_payload(format!(
                "expected a JSON object, got {}",
                json_kind(other)
            )));
        }
    };

    for source in [defaults, values].into_iter().flatten() {
        for (name, value) in source {
            if !record.assign(name, value)? {
                tracing::debug!(field = %name, "ignoring unknown payload field");
            }
        }
    }
    Ok(())
}

/// Deserialize `value` into `slot`, for use in [`Model::assign`].
pub fn assign_field<T: DeserializeOwned>(slot: &mut T, field: &str, value: &Value) -> Result<()> {
    *slot = <T as serde::Deserialize>::deserialize(value).map_err(|source| Error::Field {
        field: field.to_string(),
        source,
    })?;
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
