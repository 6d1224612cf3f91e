//! Runtime value types exchanged with query executors.

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::error::Error;
use crate::key::KeyValue;

/// A runtime value as returned by the backend for one column of one row.
///
/// Array variants exist mainly for join markers: a grouped child row that
/// links to several parent rows carries all parent values in one array.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Timestamp as microseconds since Unix epoch.
    Timestamp(i64),
    /// UUID as 16 bytes.
    Uuid([u8; 16]),
    /// Array of 64-bit integers.
    Int64Array(Vec<i64>),
    /// Array of strings.
    StringArray(Vec<String>),
    /// Array of UUIDs.
    UuidArray(Vec<[u8; 16]>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is an array type.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Value::Int64Array(_) | Value::StringArray(_) | Value::UuidArray(_)
        )
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(i) => Some(*i),
            Value::Int32(i) => Some(*i as i64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Hashable key for a scalar value. Arrays have no single key.
    pub fn to_key(&self) -> Option<KeyValue> {
        let key = match self {
            Value::Null => KeyValue::Null,
            Value::Bool(b) => KeyValue::Bool(*b),
            Value::Int32(i) => KeyValue::Int(*i as i64),
            Value::Int64(i) | Value::Timestamp(i) => KeyValue::Int(*i),
            Value::Float64(f) => KeyValue::from_f64(*f),
            Value::String(s) => KeyValue::from_text(s),
            Value::Bytes(b) => KeyValue::Bytes(b.clone()),
            Value::Uuid(u) => KeyValue::Uuid(*u),
            Value::Int64Array(_) | Value::StringArray(_) | Value::UuidArray(_) => return None,
        };
        Some(key)
    }

    /// Every non-null key carried by this value.
    ///
    /// Scalars yield at most one key, arrays yield one key per element.
    pub fn link_keys(&self) -> Vec<KeyValue> {
        match self {
            Value::Null => Vec::new(),
            Value::Int64Array(items) => items.iter().map(|i| KeyValue::Int(*i)).collect(),
            Value::StringArray(items) => items.iter().map(|s| KeyValue::from_text(s)).collect(),
            Value::UuidArray(items) => items.iter().map(|u| KeyValue::Uuid(*u)).collect(),
            scalar => scalar.to_key().into_iter().collect(),
        }
    }

    /// Interpret this value as a row count.
    ///
    /// Backends disagree on the type of `COUNT(*)`: some return integers,
    /// others numeric strings.
    pub fn to_count(&self) -> Result<u64, Error> {
        let parsed = match self {
            Value::Int32(i) => u64::try_from(*i).ok(),
            Value::Int64(i) => u64::try_from(*i).ok(),
            Value::Float64(f) if f.fract() == 0.0 && *f >= 0.0 => Some(*f as u64),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };

        parsed.ok_or_else(|| Error::TypeMismatch {
            expected: "non-negative integer",
            actual: format!("{:?}", self),
        })
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int32(i) => serializer.serialize_i32(*i),
            Value::Int64(i) | Value::Timestamp(i) => serializer.serialize_i64(*i),
            Value::Float64(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Uuid(u) => serializer.serialize_str(&format_uuid(u)),
            Value::Int64Array(items) => items.serialize(serializer),
            Value::StringArray(items) => items.serialize(serializer),
            Value::UuidArray(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&format_uuid(item))?;
                }
                seq.end()
            }
        }
    }
}

fn format_uuid(bytes: &[u8; 16]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::Int64Array(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StringArray(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
