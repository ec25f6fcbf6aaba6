//! Dialect-neutral values bound into statements and read back from rows.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// A single bindable or readable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    #[cfg(feature = "rust_decimal")]
    Decimal(rust_decimal::Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
}

impl Value {
    /// Short name of the variant, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            #[cfg(feature = "rust_decimal")]
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric values are rendered inline instead of being bound.
    pub fn is_numeric(&self) -> bool {
        match self {
            Value::Int(_) | Value::Float(_) => true,
            #[cfg(feature = "rust_decimal")]
            Value::Decimal(_) => true,
            _ => false,
        }
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Value::Date(_) | Value::Time(_) | Value::DateTime(_))
    }

    /// Numeric text for inline rendering (`None` for non-numeric values).
    pub fn numeric_text(&self) -> Option<String> {
        match self {
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) if v.is_finite() => Some(v.to_string()),
            #[cfg(feature = "rust_decimal")]
            Value::Decimal(v) => Some(v.to_string()),
            _ => None,
        }
    }

    /// Stable textual key, used to deduplicate foreign-key lookups.
    pub fn key_text(&self) -> String {
        format!("{}:{:?}", self.kind(), self)
    }
}

/// Conversion failure between a [`Value`] and a Rust type.
#[derive(Debug, Clone, Error)]
#[error("expected {expected}, got {got}")]
pub struct ValueError {
    pub expected: &'static str,
    pub got: &'static str,
}

impl ValueError {
    fn new(expected: &'static str, value: &Value) -> Self {
        Self {
            expected,
            got: value.kind(),
        }
    }
}

/// Conversion from a [`Value`] read out of a row.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(v) => Ok(v),
            // SQLite and MySQL report booleans as integers.
            Value::Int(v) => Ok(v != 0),
            other => Err(ValueError::new("bool", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Int(v) => Ok(v),
            Value::Bool(v) => Ok(v as i64),
            other => Err(ValueError::new("int", &other)),
        }
    }
}

macro_rules! from_value_narrow_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ValueError> {
                    let wide = i64::from_value(value)?;
                    <$ty>::try_from(wide).map_err(|_| ValueError {
                        expected: stringify!($ty),
                        got: "out-of-range int",
                    })
                }
            }
        )*
    };
}

from_value_narrow_int!(i8, i16, i32, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            #[cfg(feature = "rust_decimal")]
            Value::Decimal(v) => {
                use rust_decimal::prelude::ToPrimitive;
                v.to_f64().ok_or(ValueError {
                    expected: "float",
                    got: "decimal",
                })
            }
            other => Err(ValueError::new("float", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Text(v) => Ok(v),
            Value::Uuid(v) => Ok(v.to_string()),
            Value::Json(v) => Ok(v.to_string()),
            other => Err(ValueError::new("text", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bytes(v) => Ok(v),
            other => Err(ValueError::new("bytes", &other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::DateTime(v) => Ok(v),
            Value::Date(v) => Ok(v.and_time(NaiveTime::MIN)),
            Value::Text(ref s) => parse_datetime(s).ok_or(ValueError::new("datetime", &value)),
            other => Err(ValueError::new("datetime", &other)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Date(v) => Ok(v),
            Value::DateTime(v) => Ok(v.date()),
            Value::Text(ref s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| parse_datetime(s).map(|dt| dt.date()))
                .ok_or(ValueError::new("date", &value)),
            other => Err(ValueError::new("date", &other)),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Time(v) => Ok(v),
            Value::DateTime(v) => Ok(v.time()),
            Value::Text(ref s) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .map_err(|_| ValueError::new("time", &value)),
            other => Err(ValueError::new("time", &other)),
        }
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Uuid(v) => Ok(v),
            Value::Text(ref s) => s.parse().map_err(|_| ValueError::new("uuid", &value)),
            Value::Bytes(ref b) => {
                uuid::Uuid::from_slice(b).map_err(|_| ValueError::new("uuid", &value))
            }
            other => Err(ValueError::new("uuid", &other)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Json(v) => Ok(v),
            Value::Text(ref s) => {
                serde_json::from_str(s).map_err(|_| ValueError::new("json", &value))
            }
            other => Err(ValueError::new("json", &other)),
        }
    }
}

#[cfg(feature = "rust_decimal")]
impl FromValue for rust_decimal::Decimal {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Decimal(v) => Ok(v),
            Value::Int(v) => Ok(v.into()),
            Value::Float(v) => {
                rust_decimal::Decimal::try_from(v).map_err(|_| ValueError::new("decimal", &value))
            }
            Value::Text(ref s) => s.parse().map_err(|_| ValueError::new("decimal", &value)),
            other => Err(ValueError::new("decimal", &other)),
        }
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

// ==================== Into Value ====================

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

value_from!(
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    uuid::Uuid => Uuid,
    serde_json::Value => Json,
);

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl<Tz: chrono::TimeZone> From<chrono::DateTime<Tz>> for Value {
    fn from(value: chrono::DateTime<Tz>) -> Self {
        Value::DateTime(value.naive_utc())
    }
}

#[cfg(feature = "rust_decimal")]
impl From<rust_decimal::Decimal> for Value {
    fn from(value: rust_decimal::Decimal) -> Self {
        Value::Decimal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_none_is_null() {
        let v: Value = Option::<i32>::None.into();
        assert!(v.is_null());
        let v: Value = Some("x").into();
        assert_eq!(v, Value::Text("x".into()));
    }

    #[test]
    fn narrow_int_out_of_range() {
        let err = i8::from_value(Value::Int(1000)).unwrap_err();
        assert_eq!(err.expected, "i8");
    }

    #[test]
    fn sqlite_text_datetime_decodes() {
        let dt = NaiveDateTime::from_value(Value::Text("2024-03-01 10:20:30".into())).unwrap();
        assert_eq!(dt.to_string(), "2024-03-01 10:20:30");
    }

    #[test]
    fn int_decodes_as_bool() {
        assert!(bool::from_value(Value::Int(1)).unwrap());
        assert!(!bool::from_value(Value::Int(0)).unwrap());
    }

    #[test]
    fn null_into_non_option_fails() {
        let err = String::from_value(Value::Null).unwrap_err();
        assert_eq!(err.got, "null");
    }
}
