//! In-memory field values walked by the serializer.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::{IndexMap, IndexSet};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Number, Value};
use std::hash::Hash;

use super::Model;

/// Ordered `(name, value)` pairs of a record or mapping.
pub type Fields = Vec<(String, FieldValue)>;

/// A single field value of a record.
///
/// Collections keep the distinction the serializer cares about: a `Set` or a
/// `Map` is converted structurally on output, a `Record` is a nested model
/// instance (never counted as empty), and an `Object` is a plain mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// A field that holds nothing at all. Dropped from rendered objects.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Date(DateTime<Utc>),
    /// Ordered sequence.
    List(Vec<FieldValue>),
    /// Insertion-ordered set of distinct values.
    Set(Vec<FieldValue>),
    /// Key-value collection.
    Map(Fields),
    /// Plain object.
    Object(Fields),
    /// Nested model instance.
    Record(Fields),
}

impl FieldValue {
    /// Build a set, keeping the first occurrence of each distinct value.
    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FieldValue>,
    {
        let mut distinct: Vec<FieldValue> = Vec::new();
        for item in items {
            let item = item.into();
            if !distinct.contains(&item) {
                distinct.push(item);
            }
        }
        Self::Set(distinct)
    }

    /// Build a plain object from named values.
    pub fn object<I, K, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<FieldValue>,
    {
        Self::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a key-value collection from named values.
    pub fn map<I, K, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<FieldValue>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Wrap a nested model instance.
    pub fn record<M: Model>(model: &M) -> Self {
        Self::Record(model.fields())
    }

    /// Wrap a sequence of nested model instances.
    pub fn records<'a, M, I>(models: I) -> Self
    where
        M: Model + 'a,
        I: IntoIterator<Item = &'a M>,
    {
        Self::List(models.into_iter().map(Self::record).collect())
    }

    /// Returns true if the value counts as empty and may be elided.
    ///
    /// Undefined, null, `""`, and empty lists, sets, maps and plain objects
    /// are empty. The check is shallow: an object holding only empty
    /// children is not itself empty. Dates and nested records never are.
    pub fn is_empty_value(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::List(items) | Self::Set(items) => items.is_empty(),
            Self::Map(entries) | Self::Object(entries) => entries.is_empty(),
            Self::Bool(_) | Self::Number(_) | Self::Date(_) | Self::Record(_) => false,
        }
    }

    /// Look up a named entry of an object, map or record.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        match self {
            Self::Map(entries) | Self::Object(entries) | Self::Record(entries) => entries
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Undefined | Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Date(d) => {
                serializer.serialize_str(&d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Self::List(items) | Self::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) | Self::Object(entries) | Self::Record(entries) => {
                let mut map = serializer.serialize_map(None)?;
                for (name, value) in entries {
                    if matches!(value, Self::Undefined) {
                        continue;
                    }
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

/// Conversion of a Rust value into a [`FieldValue`], used by `Model::fields`.
pub trait ToField {
    fn to_field(&self) -> FieldValue;
}

impl ToField for FieldValue {
    fn to_field(&self) -> FieldValue {
        self.clone()
    }
}

impl ToField for bool {
    fn to_field(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }
}

macro_rules! integer_to_field {
    ($($ty:ty),*) => {
        $(
            impl ToField for $ty {
                fn to_field(&self) -> FieldValue {
                    FieldValue::Number(Number::from(*self))
                }
            }
        )*
    };
}

integer_to_field!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

/// Largest magnitude up to which every whole `f64` is exactly an `i64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl ToField for f64 {
    /// Whole numbers render without a fraction (`187`, not `187.0`).
    /// Non-finite numbers have no JSON form and become null.
    fn to_field(&self) -> FieldValue {
        if self.fract() == 0.0 && self.abs() <= MAX_SAFE_INTEGER {
            return FieldValue::Number(Number::from(*self as i64));
        }
        Number::from_f64(*self)
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Null)
    }
}

impl ToField for Decimal {
    fn to_field(&self) -> FieldValue {
        let text = self.normalize().to_string();
        text.parse::<Number>()
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Text(text))
    }
}

impl ToField for str {
    fn to_field(&self) -> FieldValue {
        FieldValue::Text(self.to_string())
    }
}

impl ToField for String {
    fn to_field(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }
}

impl ToField for DateTime<Utc> {
    fn to_field(&self) -> FieldValue {
        FieldValue::Date(*self)
    }
}

impl ToField for uuid::Uuid {
    fn to_field(&self) -> FieldValue {
        FieldValue::Text(self.to_string())
    }
}

impl<T: ToField + ?Sized> ToField for &T {
    fn to_field(&self) -> FieldValue {
        (**self).to_field()
    }
}

impl<T: ToField> ToField for Option<T> {
    fn to_field(&self) -> FieldValue {
        self.as_ref().map_or(FieldValue::Null, ToField::to_field)
    }
}

impl<T: ToField> ToField for Vec<T> {
    fn to_field(&self) -> FieldValue {
        FieldValue::List(self.iter().map(ToField::to_field).collect())
    }
}

impl<T: ToField + Eq + Hash> ToField for IndexSet<T> {
    fn to_field(&self) -> FieldValue {
        FieldValue::Set(self.iter().map(ToField::to_field).collect())
    }
}

impl<T: ToField> ToField for IndexMap<String, T> {
    fn to_field(&self) -> FieldValue {
        FieldValue::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_field()))
                .collect(),
        )
    }
}

impl<T: ToField + ?Sized> From<&T> for FieldValue {
    fn from(value: &T) -> Self {
        value.to_field()
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        value.to_field()
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(value: Vec<FieldValue>) -> Self {
        Self::List(value)
    }
}

/// JSON payload values map onto plain shapes: objects become plain objects
/// and arrays become lists.
impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(entries) => {
                Self::Object(entries.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_values() {
        assert!(FieldValue::Undefined.is_empty_value());
        assert!(FieldValue::Null.is_empty_value());
        assert!(FieldValue::from("").is_empty_value());
        assert!(FieldValue::List(vec![]).is_empty_value());
        assert!(FieldValue::Set(vec![]).is_empty_value());
        assert!(FieldValue::Map(vec![]).is_empty_value());
        assert!(FieldValue::Object(vec![]).is_empty_value());
    }

    #[test]
    fn test_non_empty_values() {
        assert!(!FieldValue::from(false).is_empty_value());
        assert!(!0i64.to_field().is_empty_value());
        assert!(!FieldValue::from("0").is_empty_value());
        assert!(!FieldValue::List(vec![FieldValue::Null]).is_empty_value());
        let date = Utc.with_ymd_and_hms(2021, 1, 4, 14, 30, 0).unwrap();
        assert!(!FieldValue::Date(date).is_empty_value());
        // A record with no fields is not a plain object.
        assert!(!FieldValue::Record(vec![]).is_empty_value());
    }

    #[test]
    fn test_emptiness_is_shallow() {
        let meta = FieldValue::object([("empty", FieldValue::Object(vec![]))]);
        assert!(!meta.is_empty_value());
    }

    #[test]
    fn test_set_keeps_first_occurrence() {
        let set = FieldValue::set(["tech", "growth", "tech"]);
        assert_eq!(
            set,
            FieldValue::Set(vec![FieldValue::from("tech"), FieldValue::from("growth")])
        );
    }

    #[test]
    fn test_decimal_to_field() {
        assert_eq!(dec!(187.50).to_field().as_f64(), Some(187.5));
        assert_eq!(
            serde_json::to_string(&dec!(100).to_field()).unwrap(),
            "100"
        );
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert_eq!(f64::NAN.to_field(), FieldValue::Null);
        assert_eq!(f64::INFINITY.to_field(), FieldValue::Null);
    }

    #[test]
    fn test_whole_floats_render_as_integers() {
        let fields = FieldValue::object([
            ("price", 187.0),
            ("zero", 0.0),
            ("negative", -3.0),
            ("fraction", 99.25),
        ]);
        assert_eq!(
            serde_json::to_string(&fields).unwrap(),
            r#"{"price":187,"zero":0,"negative":-3,"fraction":99.25}"#
        );
        assert_eq!(1e300.to_field().as_f64(), Some(1e300));
    }

    #[test]
    fn test_render_keeps_field_order_and_drops_undefined() {
        let value = FieldValue::object([
            ("zeta", FieldValue::from(1)),
            ("alpha", FieldValue::Undefined),
            ("mid", FieldValue::List(vec![FieldValue::Undefined])),
        ]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"zeta":1,"mid":[null]}"#
        );
    }

    #[test]
    fn test_date_renders_as_iso_string() {
        let date = Utc.with_ymd_and_hms(2021, 1, 4, 14, 30, 0).unwrap();
        assert_eq!(
            serde_json::to_string(&FieldValue::Date(date)).unwrap(),
            r#""2021-01-04T14:30:00.000Z""#
        );
    }

    #[test]
    fn test_from_json_value() {
        let json = serde_json::json!({"symbol": "AAPL", "sizes": [1, 2]});
        let value = FieldValue::from(json);
        assert_eq!(value.get("symbol").and_then(FieldValue::as_str), Some("AAPL"));
        assert_eq!(
            value.get("sizes"),
            Some(&FieldValue::List(vec![FieldValue::from(1), FieldValue::from(2)]))
        );
    }
}
