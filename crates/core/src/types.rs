//! Core data types for the agrimarket pipeline.

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Default label of the per-hundred-kilogram basis.
pub const PER_HUNDRED_KG_LABEL: &str = "€/100kg";

/// Default placeholder unit for priced records that carry no unit field.
///
/// Contains a space and no currency sign, so it never collides with a unit
/// string sent by the API.
pub const UNKNOWN_UNIT_PLACEHOLDER: &str = "unit unknown";

/// A single field value of a raw record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// JSON null.
    Null,
    /// JSON number.
    Number(f64),
    /// JSON string. Booleans and nested values are kept here as JSON text.
    Text(String),
}

impl FieldValue {
    /// Convert a decoded JSON value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Number)
                .unwrap_or_else(|| FieldValue::Text(n.to_string())),
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Bool(b) => FieldValue::Text(b.to_string()),
            other => FieldValue::Text(other.to_string()),
        }
    }

    /// Convert back into a JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
        }
    }

    /// Text rendering of the value; `None` for null.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::Null => None,
            FieldValue::Number(n) => Some(Cow::Owned(format_number(*n))),
            FieldValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
        }
    }

    /// Integer reading of the value: whole numbers or numeric text.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Null => None,
            FieldValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    Some(*n as i64)
                } else {
                    None
                }
            }
            FieldValue::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A record as received from the API: an open mapping from field name to value.
///
/// Fields are stored in sorted key order, so lookups and iteration never
/// depend on the order the provider emitted them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl RawRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON object.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        object
            .iter()
            .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
            .collect()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a field by exact name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Does the record carry this field (null included)?
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Find a field: `preferred` if present, otherwise the first field (sorted
    /// order) whose lowercase name contains `needle`.
    pub fn find_field(&self, preferred: &str, needle: &str) -> Option<(&str, &FieldValue)> {
        if let Some((name, value)) = self.fields.get_key_value(preferred) {
            return Some((name.as_str(), value));
        }
        self.fields
            .iter()
            .find(|(name, _)| name.to_lowercase().contains(needle))
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Iterate fields in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Is the record empty?
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Outcome of price parsing for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceStatus {
    /// A numeric price was extracted.
    Parsed,
    /// A price field exists but holds no number.
    Unparseable,
    /// The record has no price field.
    Missing,
}

/// The unit a normalized price is expressed in.
///
/// Each variant carries the label it is displayed with, taken from the
/// normalizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalUnit {
    /// Currency per hundred kilograms, with its configured label.
    PerHundredKg(String),
    /// Unrecognized unit, kept verbatim.
    Other(String),
    /// Priced record without a unit field, with the configured placeholder.
    Unknown(String),
}

impl CanonicalUnit {
    /// Display label.
    pub fn label(&self) -> &str {
        match self {
            CanonicalUnit::PerHundredKg(label)
            | CanonicalUnit::Other(label)
            | CanonicalUnit::Unknown(label) => label.as_str(),
        }
    }

    /// Is the unit confirmed by the source?
    pub fn is_known(&self) -> bool {
        !matches!(self, CanonicalUnit::Unknown(_))
    }
}

impl fmt::Display for CanonicalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which raw fields produced a time point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSource {
    /// A field whose name contains "date".
    ExplicitDate,
    /// Year + ISO week number (Monday of that week).
    IsoWeek,
    /// Year + month number (first of the month).
    Month,
}

/// A point on the single linear time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimePoint {
    /// Calendar date.
    pub date: NaiveDate,
    /// Where it came from.
    pub source: TimeSource,
}

impl TimePoint {
    /// Create a time point.
    pub fn new(date: NaiveDate, source: TimeSource) -> Self {
        Self { date, source }
    }
}

/// A raw record plus the attributes derived by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// The record as received, untouched.
    pub raw: RawRecord,
    /// Parsed and converted price.
    pub price_value: Option<f64>,
    /// Price parsing outcome.
    pub price_status: PriceStatus,
    /// Unit of `price_value`; absent when the record has no price field.
    pub unit_canonical: Option<CanonicalUnit>,
    /// True when a per-kg rate was scaled to the per-100kg basis.
    pub conversion_applied: bool,
    /// Resolved time point.
    pub time_point: Option<TimePoint>,
}

impl NormalizedRecord {
    /// Country code read from the given field, if present and non-null.
    pub fn country<'a>(&'a self, field: &str) -> Option<Cow<'a, str>> {
        self.raw.get(field).and_then(FieldValue::as_text)
    }

    /// Flatten into one JSON object for table display or export.
    ///
    /// Raw fields come first; derived attributes use the `price_value`,
    /// `unit_canonical`, `conversion_applied` and `time_point` columns.
    pub fn to_json_row(&self) -> Value {
        let mut row: Map<String, Value> = self
            .raw
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect();
        row.insert(
            "price_value".to_string(),
            self.price_value
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        );
        row.insert(
            "unit_canonical".to_string(),
            self.unit_canonical
                .as_ref()
                .map(|u| Value::String(u.label().to_string()))
                .unwrap_or(Value::Null),
        );
        row.insert(
            "conversion_applied".to_string(),
            Value::Bool(self.conversion_applied),
        );
        row.insert(
            "time_point".to_string(),
            self.time_point
                .map(|tp| Value::String(tp.date.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Null),
        );
        Value::Object(row)
    }
}

/// One component of a natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyPart {
    /// Field absent or null.
    Null,
    /// Numeric field.
    Number(OrderedFloat<f64>),
    /// Text field.
    Text(String),
    /// Resolved date.
    Date(NaiveDate),
}

impl KeyPart {
    /// Key part for an optional raw field.
    pub fn from_field(value: Option<&FieldValue>) -> Self {
        match value {
            None | Some(FieldValue::Null) => KeyPart::Null,
            Some(FieldValue::Number(n)) => KeyPart::Number(OrderedFloat(*n)),
            Some(FieldValue::Text(s)) => KeyPart::Text(s.clone()),
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Null => f.write_str("-"),
            KeyPart::Number(n) => f.write_str(&format_number(n.0)),
            KeyPart::Text(s) => f.write_str(s),
            KeyPart::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Identity of an observation within one batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey(pub Vec<KeyPart>);

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// Quality report produced for every processed batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Records received.
    pub input_count: usize,
    /// Records returned after duplicate removal.
    pub output_count: usize,
    /// Records dropped as duplicates.
    pub duplicates_removed: usize,
    /// Key of each dropped record, in batch order.
    pub removed_keys: Vec<NaturalKey>,
    /// Records whose price field held no number.
    pub unparseable_prices: usize,
    /// Records without any price field.
    pub missing_prices: usize,
    /// Records with no resolvable time point.
    pub unresolved_times: usize,
    /// Records converted from a per-kg rate.
    pub converted_units: usize,
    /// Priced records without a unit field.
    pub unknown_units: usize,
    /// Some price texts carry a currency symbol and others do not.
    pub mixed_currency_formats: bool,
}

impl BatchSummary {
    /// Did any record need attention?
    pub fn has_anomalies(&self) -> bool {
        self.duplicates_removed > 0
            || self.unparseable_prices > 0
            || self.unresolved_times > 0
            || self.unknown_units > 0
            || self.mixed_currency_formats
    }
}
