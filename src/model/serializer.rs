//! Recursive model-to-payload transform.

use super::{FieldValue, Fields, Model, NestedPolicy, SerializeOptions};
use crate::error::Result;

/// Output of [`to_payload`].
#[derive(Debug, Clone, PartialEq)]
pub enum Serialized {
    /// Rendered JSON text.
    Text(String),
    /// Plain value: only primitives, dates, lists and plain objects.
    Value(FieldValue),
}

impl Serialized {
    /// Rendered JSON text, rendering compactly if this is a plain value.
    pub fn into_text(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Value(value) => Ok(serde_json::to_string(&value)?),
        }
    }

    pub fn into_value(self) -> Option<FieldValue> {
        match self {
            Self::Value(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Value(_) => None,
        }
    }
}

/// Serialize a record according to `options`.
///
/// The record is read through [`Model::fields`] and never modified. Sets
/// become lists, maps and nested records become plain objects, dates and
/// primitives are copied as they are.
pub fn to_payload<M: Model>(record: &M, options: &SerializeOptions) -> Result<Serialized> {
    serialize_fields(&record.fields(), options)
}

/// Serialize a list of named values as if they were the fields of a record.
pub fn serialize_fields(
    fields: &[(String, FieldValue)],
    options: &SerializeOptions,
) -> Result<Serialized> {
    let plain = FieldValue::Object(clone_fields(fields, options, true));
    if !options.stringify {
        return Ok(Serialized::Value(plain));
    }
    let text = if options.format {
        serde_json::to_string_pretty(&plain)?
    } else {
        serde_json::to_string(&plain)?
    };
    Ok(Serialized::Text(text))
}

fn clone_fields(
    fields: &[(String, FieldValue)],
    options: &SerializeOptions,
    apply_skips: bool,
) -> Fields {
    let mut clone = Fields::with_capacity(fields.len());
    for (name, value) in fields {
        if apply_skips && options.skips(name, value) {
            continue;
        }
        clone.push((name.clone(), clone_value(value, options)));
    }
    clone
}

fn clone_value(value: &FieldValue, options: &SerializeOptions) -> FieldValue {
    let nested_skips = options.nested == NestedPolicy::Inherit;
    match value {
        FieldValue::List(items) | FieldValue::Set(items) => {
            FieldValue::List(items.iter().map(|item| clone_value(item, options)).collect())
        }
        FieldValue::Map(entries) | FieldValue::Object(entries) | FieldValue::Record(entries) => {
            FieldValue::Object(clone_fields(entries, options, nested_skips))
        }
        primitive => primitive.clone(),
    }
}
