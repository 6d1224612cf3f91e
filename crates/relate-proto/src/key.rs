//! Hashable keys derived from values.
//!
//! Floats and the two integer widths do not hash consistently as [`Value`]s,
//! so record sets index and deduplicate on [`KeyValue`] instead.
//!
//! [`Value`]: crate::Value

use std::fmt;

/// A normalized, hashable form of a scalar value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    Null,
    Bool(bool),
    /// All integer widths and timestamps, plus integral floats.
    Int(i64),
    /// Non-integral floats, by bit pattern.
    Float(u64),
    String(String),
    Bytes(Vec<u8>),
    Uuid([u8; 16]),
}

impl KeyValue {
    /// Normalize a float so `1.0` and `1` produce the same key.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite()
            && value.fract() == 0.0
            && value >= i64::MIN as f64
            && value <= i64::MAX as f64
        {
            KeyValue::Int(value as i64)
        } else {
            KeyValue::Float(value.to_bits())
        }
    }

    /// Key for a text value. Canonical integer text such as `"42"` keys as
    /// the integer, so ids returned as strings still join against numeric ids.
    pub fn from_text(value: &str) -> Self {
        match value.parse::<i64>() {
            Ok(i) if i.to_string() == value => KeyValue::Int(i),
            _ => KeyValue::String(value.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, KeyValue::Null)
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Null => write!(f, "null"),
            KeyValue::Bool(b) => write!(f, "{}", b),
            KeyValue::Int(i) => write!(f, "{}", i),
            KeyValue::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            KeyValue::String(s) => write!(f, "{}", s),
            KeyValue::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            KeyValue::Uuid(u) => {
                for byte in u {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int(v)
    }
}

impl From<i32> for KeyValue {
    fn from(v: i32) -> Self {
        KeyValue::Int(v as i64)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::from_text(v)
    }
}

/// Identity of a row: its primary-key values in declared key order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowIdentity(pub Vec<KeyValue>);

impl RowIdentity {
    /// True when every key column was null or missing.
    pub fn is_unknown(&self) -> bool {
        self.0.iter().all(KeyValue::is_null)
    }
}

impl fmt::Display for RowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            write!(f, "{}", key)?;
        }
        Ok(())
    }
}
