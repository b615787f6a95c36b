//! Options controlling model serialization.

use super::FieldValue;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether a field is left out of the output.
pub type IgnorePredicate = Arc<dyn Fn(&str, &FieldValue) -> bool + Send + Sync>;

/// How the field-skip options apply below the top level of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestedPolicy {
    /// Nested records and list elements only get structural conversion.
    #[default]
    StructuralOnly,
    /// `ignore_if`, `ignore_empty` and `ignore_properties` apply at every depth.
    Inherit,
}

/// Options for [`to_payload`](super::to_payload).
#[derive(Clone)]
pub struct SerializeOptions {
    ignore_if: Option<IgnorePredicate>,
    /// Skip undefined, null, `""`, and empty lists, sets, maps and plain objects.
    pub ignore_empty: bool,
    /// Skip any field with one of these names.
    pub ignore_properties: HashSet<String>,
    /// Render JSON text rather than a plain value.
    pub stringify: bool,
    /// Indent rendered JSON with two spaces.
    pub format: bool,
    /// Depth at which the skip options apply.
    pub nested: NestedPolicy,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            ignore_if: None,
            ignore_empty: false,
            ignore_properties: HashSet::new(),
            stringify: true,
            format: false,
            nested: NestedPolicy::default(),
        }
    }
}

impl fmt::Debug for SerializeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializeOptions")
            .field("ignore_if", &self.ignore_if.is_some())
            .field("ignore_empty", &self.ignore_empty)
            .field("ignore_properties", &self.ignore_properties)
            .field("stringify", &self.stringify)
            .field("format", &self.format)
            .field("nested", &self.nested)
            .finish()
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip every field for which `predicate(name, value)` returns true.
    pub fn ignore_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, &FieldValue) -> bool + Send + Sync + 'static,
    {
        self.ignore_if = Some(Arc::new(predicate));
        self
    }

    pub fn ignore_empty(mut self, ignore: bool) -> Self {
        self.ignore_empty = ignore;
        self
    }

    pub fn ignore_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_properties.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn stringify(mut self, stringify: bool) -> Self {
        self.stringify = stringify;
        self
    }

    pub fn format(mut self, format: bool) -> Self {
        self.format = format;
        self
    }

    pub fn nested(mut self, policy: NestedPolicy) -> Self {
        self.nested = policy;
        self
    }

    /// Whether a field is left out. Checks run in the order
    /// `ignore_if`, `ignore_empty`, `ignore_properties`.
    pub(crate) fn skips(&self, name: &str, value: &FieldValue) -> bool {
        if let Some(predicate) = &self.ignore_if {
            if predicate(name, value) {
                return true;
            }
        }
        if self.ignore_empty && value.is_empty_value() {
            return true;
        }
        self.ignore_properties.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SerializeOptions::default();
        assert!(options.stringify);
        assert!(!options.format);
        assert!(!options.ignore_empty);
        assert!(options.ignore_properties.is_empty());
        assert_eq!(options.nested, NestedPolicy::StructuralOnly);
    }

    #[test]
    fn test_skips_in_order() {
        let options = SerializeOptions::new()
            .ignore_if(|name, _| name.starts_with('_'))
            .ignore_empty(true)
            .ignore_properties(["secret"]);

        assert!(options.skips("_private", &FieldValue::from(1)));
        assert!(options.skips("name", &FieldValue::from("")));
        assert!(options.skips("secret", &FieldValue::from("hunter2")));
        assert!(!options.skips("name", &FieldValue::from("AAPL")));
        assert!(!options.skips("qty", &FieldValue::from(0)));
    }
}
