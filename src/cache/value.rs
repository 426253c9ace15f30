//! Typed cell values and index keys
//!
//! `Value` is what rows and lookup bounds carry. `IndexKey` is the normalized,
//! totally ordered form stored in a field index. The conversion between the two
//! is fixed per field at build time by a `KeyEncoder`.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{CacheError, CacheResult};

/// Declared type of a key field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Date,
    Boolean,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the value's type, as used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
        }
    }

    /// Convert an untyped JSON value.
    ///
    /// Arrays and objects are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        }
    }

    /// Render as JSON. Dates become RFC 3339 strings, non-finite numbers null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Number(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
        }
    }

    /// Coerce into the representation a field of `field_type` expects.
    ///
    /// Strings parse into dates (RFC 3339 or `YYYY-MM-DD`), integers widen to
    /// numbers. Returns `None` when no lossless conversion exists.
    pub fn coerce_to(&self, field_type: FieldType) -> Option<Value> {
        match (self, field_type) {
            (Value::Null, _) => Some(Value::Null),
            (Value::Boolean(_), FieldType::Boolean)
            | (Value::Integer(_), FieldType::Integer)
            | (Value::Number(_), FieldType::Number)
            | (Value::String(_), FieldType::String)
            | (Value::Date(_), FieldType::Date) => Some(self.clone()),
            (Value::Integer(i), FieldType::Number) => Some(Value::Number(*i as f64)),
            (Value::String(s), FieldType::Date) => parse_date(s).map(Value::Date),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    day.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive))
}

/// Normalized, totally ordered index key.
///
/// A single field only ever holds one variant, so the cross-variant order
/// (Bool < Int < Float < String < Date) never decides a lookup.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    Bool(bool),
    Int(i64),
    /// f64 bits remapped so integer order equals numeric order
    Float(u64),
    String(String),
    Date(DateTime<Utc>),
}

impl IndexKey {
    /// `-0.0` is stored as `0.0`, so the two compare equal.
    pub fn from_float(v: f64) -> Self {
        let v = if v == 0.0 { 0.0 } else { v };
        let bits = v.to_bits();
        let ordered = if bits >> 63 == 1 { !bits } else { bits ^ (1 << 63) };
        IndexKey::Float(ordered)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            IndexKey::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Value-to-key conversion for one field, resolved once at build time.
#[derive(Debug, Clone)]
pub struct KeyEncoder {
    field: String,
    field_type: FieldType,
    case_sensitive: bool,
}

impl KeyEncoder {
    pub fn new(field: impl Into<String>, field_type: FieldType, case_sensitive: bool) -> Self {
        Self {
            field: field.into(),
            field_type,
            case_sensitive,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Encode a value into this field's key space.
    ///
    /// Returns `Ok(None)` for null. Integers are accepted by number fields;
    /// any other type difference is a `TypeMismatch`.
    pub fn encode(&self, value: &Value) -> CacheResult<Option<IndexKey>> {
        let key = match (self.field_type, value) {
            (_, Value::Null) => return Ok(None),
            (FieldType::Boolean, Value::Boolean(b)) => IndexKey::Bool(*b),
            (FieldType::Integer, Value::Integer(i)) => IndexKey::Int(*i),
            (FieldType::Number, Value::Number(f)) => IndexKey::from_float(*f),
            (FieldType::Number, Value::Integer(i)) => IndexKey::from_float(*i as f64),
            (FieldType::String, Value::String(s)) => IndexKey::String(self.fold(s)),
            (FieldType::Date, Value::Date(d)) => IndexKey::Date(*d),
            (expected, found) => {
                return Err(CacheError::type_mismatch(
                    self.field.clone(),
                    expected.as_str(),
                    found.type_name(),
                ))
            }
        };
        Ok(Some(key))
    }

    /// Apply this field's case folding to a string
    pub fn fold(&self, s: &str) -> String {
        if self.case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    }
}
