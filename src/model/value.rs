//! Dynamically typed field values and records.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

use super::field::{FieldDataType, FieldSchema};

static NULL: FieldValue = FieldValue::Null;

/// A single field value.
///
/// Serialized adjacently tagged so every variant survives a round trip
/// through the codec unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    #[default]
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    List(Vec<FieldValue>),
    NumberRange { min: f64, max: f64 },
    DateRange { start: DateTime<Utc>, end: DateTime<Utc> },
}

impl FieldValue {
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Text(_) => "Text",
            Self::Number(_) => "Number",
            Self::Bool(_) => "Bool",
            Self::Date(_) => "Date",
            Self::List(_) => "List",
            Self::NumberRange { .. } => "NumberRange",
            Self::DateRange { .. } => "DateRange",
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(date) => Some(*date),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// False when any contained number is NaN or infinite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Number(n) => n.is_finite(),
            Self::NumberRange { min, max } => min.is_finite() && max.is_finite(),
            Self::List(items) => items.iter().all(Self::is_finite),
            _ => true,
        }
    }

    /// String form used by substring, prefix, regex and fuzzy criteria.
    #[must_use]
    pub fn display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(text) => text.clone(),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => b.to_string(),
            Self::Date(date) => format_date(date),
            Self::List(items) => items
                .iter()
                .map(Self::display_string)
                .collect::<Vec<_>>()
                .join(", "),
            Self::NumberRange { min, max } => {
                format!("{}..{}", format_number(*min), format_number(*max))
            }
            Self::DateRange { start, end } => {
                format!("{}..{}", format_date(start), format_date(end))
            }
        }
    }

    /// Convert to the canonical representation of `data_type`.
    ///
    /// Returns `None` when the value cannot represent that type. `Null`
    /// coerces to `Null` for every type.
    #[must_use]
    pub fn coerce_to(&self, data_type: FieldDataType) -> Option<Self> {
        if self.is_null() {
            return Some(Self::Null);
        }
        match data_type {
            FieldDataType::Text | FieldDataType::Select => match self {
                Self::Text(_) => Some(self.clone()),
                _ => None,
            },
            FieldDataType::Number => self.as_number().map(Self::Number),
            FieldDataType::Boolean => self.as_bool().map(Self::Bool),
            FieldDataType::Date => coerce_date(self).map(Self::Date),
            FieldDataType::MultiSelect => match self {
                Self::Text(_) => Some(Self::List(vec![self.clone()])),
                Self::List(items) if items.iter().all(|item| item.as_text().is_some()) => {
                    Some(self.clone())
                }
                _ => None,
            },
            FieldDataType::NumericRange => match self {
                Self::NumberRange { min, max } if min <= max => Some(self.clone()),
                Self::List(items) if items.len() == 2 => {
                    let min = items[0].as_number()?;
                    let max = items[1].as_number()?;
                    (min <= max).then_some(Self::NumberRange { min, max })
                }
                _ => None,
            },
            FieldDataType::DateRange => match self {
                Self::DateRange { start, end } if start <= end => Some(self.clone()),
                Self::List(items) if items.len() == 2 => {
                    let start = coerce_date(&items[0])?;
                    let end = coerce_date(&items[1])?;
                    (start <= end).then_some(Self::DateRange { start, end })
                }
                _ => None,
            },
        }
    }

    /// Equality with optional case folding for text.
    #[must_use]
    pub fn equals(&self, other: &Self, case_sensitive: bool) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => {
                if case_sensitive {
                    a == b
                } else {
                    a.to_lowercase() == b.to_lowercase()
                }
            }
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(left, right)| left.equals(right, case_sensitive))
            }
            _ => self == other,
        }
    }

    /// Ordering between two values of the same variant.
    ///
    /// `None` when the variants differ or a number is NaN.
    #[must_use]
    pub fn partial_compare(&self, other: &Self, case_sensitive: bool) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Text(a), Self::Text(b)) => Some(if case_sensitive {
                a.cmp(b)
            } else {
                a.to_lowercase().cmp(&b.to_lowercase())
            }),
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::List(a), Self::List(b)) => {
                for (left, right) in a.iter().zip(b) {
                    match left.partial_compare(right, case_sensitive)? {
                        Ordering::Equal => {}
                        other => return Some(other),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            (
                Self::NumberRange { min: a_min, max: a_max },
                Self::NumberRange { min: b_min, max: b_max },
            ) => match a_min.partial_cmp(b_min)? {
                Ordering::Equal => a_max.partial_cmp(b_max),
                other => Some(other),
            },
            (
                Self::DateRange { start: a_start, end: a_end },
                Self::DateRange { start: b_start, end: b_end },
            ) => Some(a_start.cmp(b_start).then(a_end.cmp(b_end))),
            _ => None,
        }
    }

    /// Total ordering used by the sort engine.
    ///
    /// Both values are coerced to `data_type` first; nulls compare greater
    /// than everything; values that still cannot be compared fall back to
    /// their string form.
    #[must_use]
    pub fn sort_compare(&self, other: &Self, data_type: FieldDataType) -> Ordering {
        let left = self.coerce_to(data_type).unwrap_or_else(|| self.clone());
        let right = other.coerce_to(data_type).unwrap_or_else(|| other.clone());
        match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => left.partial_compare(&right, false).unwrap_or_else(|| {
                left.display_string()
                    .to_lowercase()
                    .cmp(&right.display_string().to_lowercase())
            }),
        }
    }

    /// Key used by the equality postings map.
    ///
    /// Text keys are lowercased so case-insensitive lookups can use them;
    /// callers re-check candidates with the full comparison.
    #[must_use]
    pub fn index_key(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(format!("t:{}", text.to_lowercase())),
            Self::Number(n) => {
                let n = if *n == 0.0 { 0.0 } else { *n };
                Some(format!("n:{n}"))
            }
            Self::Bool(b) => Some(format!("b:{b}")),
            Self::Date(date) => Some(format!(
                "d:{}",
                date.to_rfc3339_opts(SecondsFormat::Nanos, true)
            )),
            _ => None,
        }
    }

    /// Build a value from JSON without a declared type.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => {
                if let (Some(min), Some(max)) = (
                    map.get("min").and_then(Value::as_f64),
                    map.get("max").and_then(Value::as_f64),
                ) {
                    return Self::NumberRange { min, max };
                }
                if let (Some(start), Some(end)) = (
                    map.get("start").and_then(Value::as_str).and_then(parse_date),
                    map.get("end").and_then(Value::as_str).and_then(parse_date),
                ) {
                    return Self::DateRange { start, end };
                }
                Self::Text(value.to_string())
            }
        }
    }

    /// Build a value from JSON, typed by the field's declared data type
    /// when the conversion is possible.
    #[must_use]
    pub fn from_json_typed(value: &serde_json::Value, data_type: FieldDataType) -> Self {
        let raw = Self::from_json(value);
        raw.coerce_to(data_type).unwrap_or(raw)
    }

    /// Plain JSON form, the inverse of [`FieldValue::from_json`].
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{Value, json};

        match self {
            Self::Null => Value::Null,
            Self::Text(text) => Value::String(text.clone()),
            Self::Number(n) => json!(n),
            Self::Bool(b) => Value::Bool(*b),
            Self::Date(date) => Value::String(format_date(date)),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::NumberRange { min, max } => json!({ "min": min, "max": max }),
            Self::DateRange { start, end } => {
                json!({ "start": format_date(start), "end": format_date(end) })
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for FieldValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A record: field name to value.
///
/// Keys are kept sorted so serialized records are deterministic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field_name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field_name, value);
        self
    }

    pub fn insert(
        &mut self,
        field_name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(field_name.into(), value.into())
    }

    pub fn remove(&mut self, field_name: &str) -> Option<FieldValue> {
        self.fields.remove(field_name)
    }

    #[must_use]
    pub fn get(&self, field_name: &str) -> Option<&FieldValue> {
        self.fields.get(field_name)
    }

    /// Value of a field, `Null` when absent.
    #[must_use]
    pub fn value(&self, field_name: &str) -> &FieldValue {
        self.fields.get(field_name).unwrap_or(&NULL)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert any serializable struct or map into a record, typing each
    /// declared field by the schema.
    pub fn from_serializable<T: Serialize>(value: &T, schema: &FieldSchema) -> Result<Self> {
        let json = serde_json::to_value(value)?;
        let serde_json::Value::Object(map) = json else {
            return Err(EngineError::Validation(
                "only structs and maps can be converted into records".into(),
            ));
        };

        let fields = map
            .iter()
            .map(|(name, value)| {
                let converted = match schema.get(name) {
                    Some(field) => FieldValue::from_json_typed(value, field.data_type),
                    None => FieldValue::from_json(value),
                };
                (name.clone(), converted)
            })
            .filter(|(_, value)| !value.is_null())
            .collect();
        Ok(Self { fields })
    }

    /// Plain JSON object form of the record.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }

    /// Deserialize the record into a caller-defined type.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Parse RFC 3339 timestamps, `YYYY-MM-DD` dates and naive date-times (UTC).
#[must_use]
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|dt| dt.and_utc())
}

fn coerce_date(value: &FieldValue) -> Option<DateTime<Utc>> {
    match value {
        FieldValue::Date(date) => Some(*date),
        FieldValue::Text(text) => parse_date(text),
        _ => None,
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}
