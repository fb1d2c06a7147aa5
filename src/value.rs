//! An opaque, driver-agnostic scalar value.
//!
//! The engine does not parse or validate column types (spec: "read-agnostic
//! to column types — values pass through the driver"). `Value` is a closed
//! set of the scalar families Postgres drivers commonly bind, modeled after
//! quaint's `Value` enum (see `Value::text`, `Value::int32`, `Value::null_int64`
//! used throughout quaint's test suite).

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int32(Option<i32>),
    Int64(Option<i64>),
    Text(Option<String>),
    Boolean(Option<bool>),
    Float(Option<f64>),
    Date(Option<NaiveDate>),
    DateTime(Option<DateTime<Utc>>),
    Uuid(Option<uuid::Uuid>),
    Json(Option<serde_json::Value>),
}

impl Value {
    pub fn int32(v: impl Into<i32>) -> Self {
        Value::Int32(Some(v.into()))
    }

    pub fn null_int32() -> Self {
        Value::Int32(None)
    }

    pub fn int64(v: impl Into<i64>) -> Self {
        Value::Int64(Some(v.into()))
    }

    pub fn null_int64() -> Self {
        Value::Int64(None)
    }

    pub fn text(v: impl Into<String>) -> Self {
        Value::Text(Some(v.into()))
    }

    pub fn null_text() -> Self {
        Value::Text(None)
    }

    pub fn boolean(v: impl Into<bool>) -> Self {
        Value::Boolean(Some(v.into()))
    }

    pub fn float(v: impl Into<f64>) -> Self {
        Value::Float(Some(v.into()))
    }

    pub fn uuid(v: uuid::Uuid) -> Self {
        Value::Uuid(Some(v))
    }

    pub fn json(v: serde_json::Value) -> Self {
        Value::Json(Some(v))
    }

    /// True for any of the `Value::null_*` constructors, i.e. a SQL NULL.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Int32(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::Text(v) => v.is_none(),
            Value::Boolean(v) => v.is_none(),
            Value::Float(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::DateTime(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
            Value::Json(v) => v.is_none(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(Some(v)) => write!(f, "{v}"),
            Value::Int64(Some(v)) => write!(f, "{v}"),
            Value::Text(Some(v)) => write!(f, "{v}"),
            Value::Boolean(Some(v)) => write!(f, "{v}"),
            Value::Float(Some(v)) => write!(f, "{v}"),
            Value::Date(Some(v)) => write!(f, "{v}"),
            Value::DateTime(Some(v)) => write!(f, "{v}"),
            Value::Uuid(Some(v)) => write!(f, "{v}"),
            Value::Json(Some(v)) => write!(f, "{v}"),
            _ => write!(f, "NULL"),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::text(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::text(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::int64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::boolean(v)
    }
}

#[cfg(feature = "postgres-native")]
mod to_sql {
    use super::Value;
    use bytes::BytesMut;
    use postgres_types::{IsNull, ToSql, Type};
    use std::error::Error as StdError;

    impl ToSql for Value {
        fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
            match self {
                Value::Int32(v) => v.to_sql(ty, out),
                Value::Int64(v) => v.to_sql(ty, out),
                Value::Text(v) => v.to_sql(ty, out),
                Value::Boolean(v) => v.to_sql(ty, out),
                Value::Float(v) => v.to_sql(ty, out),
                Value::Date(v) => v.to_sql(ty, out),
                Value::DateTime(v) => v.to_sql(ty, out),
                Value::Uuid(v) => v.to_sql(ty, out),
                Value::Json(v) => v.to_sql(ty, out),
            }
        }

        fn accepts(_ty: &Type) -> bool {
            true
        }

        postgres_types::to_sql_checked!();
    }
}
