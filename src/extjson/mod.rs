//! Extended JSON handling
//!
//! The database speaks BSON; callers speak plain JSON. This module converts in both
//! directions:
//! - [`parse_command`]: caller-supplied command text → BSON command document
//! - [`reply_to_json`] + [`normalize`]: BSON reply → plain JSON values
//!
//! # Normalization Rules
//! Only objects with exactly one key are candidates:
//! - `{"$numberLong": "123"}` → `123`
//! - `{"$oid": "507f..."}` → `"507f..."`
//! - `{"$date": 0}` → `"1970-01-01T00:00:00Z"` (payload in epoch milliseconds)
//! - `{"$numberDecimal": "1.10"}` → `1.10` (every digit kept)
//!
//! Everything else is rebuilt with its children normalized. Payloads are normalized
//! before the wrapper is inspected, so `normalize` is idempotent.

use bson::{Bson, Document};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

use crate::error::{ConnectorError, Result};

pub mod shell;

const NUMBER_LONG: &str = "$numberLong";
const OBJECT_ID: &str = "$oid";
const DATE: &str = "$date";
const NUMBER_DECIMAL: &str = "$numberDecimal";

/// Collapse extended JSON scalar wrappers into plain values
///
/// Returns a new value; the input is left untouched. Key and element order is preserved.
#[must_use]
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let normalized: Map<String, Value> =
                map.iter().map(|(key, child)| (key.clone(), normalize(child))).collect();

            if normalized.len() == 1 {
                if let Some(collapsed) =
                    normalized.iter().next().and_then(|(key, payload)| collapse(key, payload))
                {
                    return collapsed;
                }
            }

            Value::Object(normalized)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        scalar => scalar.clone(),
    }
}

/// Replacement for a single-key wrapper, or None when the key is not reserved
/// or its payload cannot be interpreted
fn collapse(key: &str, payload: &Value) -> Option<Value> {
    match key {
        NUMBER_LONG => integer_payload(payload).map(Value::Number),
        OBJECT_ID => payload.as_str().map(|hex| Value::String(hex.to_string())),
        DATE => date_payload(payload).map(Value::String),
        NUMBER_DECIMAL => decimal_payload(payload),
        _ => None,
    }
}

fn integer_payload(payload: &Value) -> Option<Number> {
    match payload {
        Value::String(text) => {
            let text = text.trim();
            let digits = text.strip_prefix('-').unwrap_or(text);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            // Beyond i64 the digits are kept verbatim
            text.parse::<i64>().map(Number::from).ok().or_else(|| text.parse::<Number>().ok())
        }
        Value::Number(number) => {
            number.as_i64().map(Number::from).or_else(|| number.as_u64().map(Number::from))
        }
        _ => None,
    }
}

fn date_payload(payload: &Value) -> Option<String> {
    match payload {
        Value::Number(number) => {
            let millis = number.as_i64().or_else(|| {
                number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)
            })?;
            format_epoch_millis(millis)
        }
        // Relaxed extended JSON renders in-range dates as RFC 3339 strings
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|instant| format_instant(&instant.with_timezone(&Utc))),
        _ => None,
    }
}

fn decimal_payload(payload: &Value) -> Option<Value> {
    match payload {
        Value::String(text) => match text.trim().parse::<Number>() {
            Ok(number) => Some(Value::Number(number)),
            // NaN and the infinities have no JSON number form
            Err(_) => Some(Value::String(text.clone())),
        },
        Value::Number(number) => Some(Value::Number(number.clone())),
        _ => None,
    }
}

/// ISO-8601 instant for milliseconds since the Unix epoch
///
/// Fractional seconds are printed in groups of three digits and only when non-zero.
#[must_use]
pub fn format_epoch_millis(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|instant| format_instant(&instant))
}

fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Render a BSON reply as relaxed extended JSON
///
/// Int32/Int64/Double become plain numbers; ObjectId, Decimal128 and out-of-range
/// dates keep their `$` wrappers for [`normalize`] to collapse.
#[must_use]
pub fn reply_to_json(reply: Document) -> Value {
    Bson::Document(reply).into_relaxed_extjson()
}

/// Parse caller-supplied command text into a BSON command document
///
/// Shell constructor syntax (`ObjectId("…")`, `NumberLong(1)`, `new Date("…")`, …)
/// is rewritten to extended JSON first. Key order is kept, since the first key
/// names the command.
pub fn parse_command(body: &str) -> Result<Document> {
    let text = shell::rewrite(body)?;

    let value: Value = serde_json::from_str(&text).map_err(|e| {
        ConnectorError::malformed_command(format!("Command body is not valid JSON: {e}"))
    })?;

    if !value.is_object() {
        return Err(ConnectorError::malformed_command("Command body must be a JSON object"));
    }

    match Bson::try_from(value) {
        Ok(Bson::Document(command)) => Ok(command),
        Ok(other) => Err(ConnectorError::malformed_command(format!(
            "Command body must be a document, got {:?}",
            other.element_type()
        ))),
        Err(e) => Err(ConnectorError::malformed_command(format!(
            "Command body is not valid extended JSON: {e}"
        ))),
    }
}
