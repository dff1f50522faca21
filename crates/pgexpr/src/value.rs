//! Scalar values and their two SQL renderings.
//!
//! A [`ScalarValue`] reaches SQL either baked into the statement text as an
//! inline literal (table defaults, forced literals) or through the parameter
//! channel as a [`ParamValue`] bound to a `$n` placeholder.

use bytes::BytesMut;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::error::Error as StdError;
use tokio_postgres::types::{Format, IsNull, ToSql, Type};

/// A typed scalar as supplied by calling code.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Integer(i64),
    BigInteger(i128),
    Decimal(Decimal),
    Text(String),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
}

impl ScalarValue {
    /// Whether this value must travel through the parameter channel even when
    /// it appears as a bare top-level literal.
    pub fn is_always_bound(&self) -> bool {
        matches!(self, ScalarValue::Text(_) | ScalarValue::Json(_))
    }
}

/// A value on the driver's parameter channel.
///
/// Decimals, timestamps and JSON have already been normalized to text by
/// [`serialize`]; integers travel as numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    BigInt(i128),
    Text(String),
}

/// Output of [`serialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Serialized {
    /// SQL literal text, safe to splice into a statement.
    Literal(String),
    /// A value for the parameter channel.
    Param(ParamValue),
}

/// Serialize a scalar either as an inline literal (`inline = true`) or as a
/// driver value (`inline = false`).
pub fn serialize(value: &ScalarValue, inline: bool) -> Serialized {
    if inline {
        Serialized::Literal(to_literal(value))
    } else {
        Serialized::Param(to_param(value))
    }
}

/// Render a scalar as inline SQL literal text.
pub fn to_literal(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Null => "NULL".to_string(),
        ScalarValue::Boolean(true) => "TRUE".to_string(),
        ScalarValue::Boolean(false) => "FALSE".to_string(),
        ScalarValue::Integer(n) => n.to_string(),
        ScalarValue::BigInteger(n) => n.to_string(),
        ScalarValue::Decimal(d) => quote_literal(&decimal_text(d)),
        ScalarValue::Text(s) => quote_literal(s),
        ScalarValue::DateTime(ts) => quote_literal(&timestamp_text(ts)),
        ScalarValue::Json(json) => format!("{}::JSONB", quote_literal(&json.to_string())),
    }
}

/// Convert a scalar into a parameter-channel value.
pub fn to_param(value: &ScalarValue) -> ParamValue {
    match value {
        ScalarValue::Null => ParamValue::Null,
        ScalarValue::Boolean(b) => ParamValue::Bool(*b),
        ScalarValue::Integer(n) => ParamValue::Int(*n),
        ScalarValue::BigInteger(n) => ParamValue::BigInt(*n),
        ScalarValue::Decimal(d) => ParamValue::Text(decimal_text(d)),
        ScalarValue::Text(s) => ParamValue::Text(s.clone()),
        ScalarValue::DateTime(ts) => ParamValue::Text(timestamp_text(ts)),
        ScalarValue::Json(json) => ParamValue::Text(json.to_string()),
    }
}

fn decimal_text(d: &Decimal) -> String {
    d.normalize().to_string()
}

/// ISO-8601 in UTC with millisecond precision and a `Z` suffix.
fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn quote_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

// ─── conversions ────────────────────────────────────────────────────────────

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Boolean(v)
    }
}

impl From<i16> for ScalarValue {
    fn from(v: i16) -> Self {
        ScalarValue::Integer(i64::from(v))
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        ScalarValue::Integer(i64::from(v))
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Integer(v)
    }
}

impl From<i128> for ScalarValue {
    fn from(v: i128) -> Self {
        ScalarValue::BigInteger(v)
    }
}

impl From<Decimal> for ScalarValue {
    fn from(v: Decimal) -> Self {
        ScalarValue::Decimal(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Text(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        ScalarValue::Text(v)
    }
}

impl From<DateTime<Utc>> for ScalarValue {
    fn from(v: DateTime<Utc>) -> Self {
        ScalarValue::DateTime(v)
    }
}

impl From<serde_json::Value> for ScalarValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => ScalarValue::Null,
            other => ScalarValue::Json(other),
        }
    }
}

// ─── driver encoding ────────────────────────────────────────────────────────

/// Parameters are sent in the text wire format so the server parses each one
/// according to the type it inferred for the placeholder (numeric, jsonb,
/// timestamptz, ...).
impl ToSql for ParamValue {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        match self {
            ParamValue::Null => return Ok(IsNull::Yes),
            ParamValue::Bool(b) => out.extend_from_slice(if *b { b"t" } else { b"f" }),
            ParamValue::Int(n) => out.extend_from_slice(n.to_string().as_bytes()),
            ParamValue::BigInt(n) => out.extend_from_slice(n.to_string().as_bytes()),
            ParamValue::Text(s) => out.extend_from_slice(s.as_bytes()),
        }
        Ok(IsNull::No)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    tokio_postgres::types::to_sql_checked!();
}
