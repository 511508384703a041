//! Command Execution
//!
//! Runs a caller-supplied command body against a database and turns the reply into
//! an [`ExecutionResult`].
//!
//! # Reply Interpretation
//! The reply's `ok` field decides success. When `ok == 1`, the body is taken from
//! (later rules overwrite earlier ones):
//! 1. `value` (findAndModify and friends); the body is the document itself, not
//!    `{"value": <document>}`
//! 2. `cursor.firstBatch` (find, aggregate, list*)
//! 3. `n` → `{"n": n}`, also recorded as a header
//! 4. `nModified` → `{"nModified": m}`, also recorded as a header
//!
//! A `{"ok": status}` header is always appended last.
//!
//! # Failures
//! Server-side command errors are results, not errors: `success` is false and the
//! body carries `code`, `codeName` and `errmsg` (only `errmsg` when the failure has
//! no server code). Connection problems, timeouts and serialization failures are
//! returned as errors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::engine::DocumentStore;
use crate::error::{ConnectorError, Result};
use crate::extjson::{normalize, parse_command, reply_to_json};

/// Outcome of a single command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// True iff the reply's `ok` status was 1
    pub success: bool,

    /// Command output (documents, a count, or failure details)
    pub body: Option<Value>,

    /// Auxiliary status entries, in the order they were produced
    pub headers: Vec<Value>,
}

impl ExecutionResult {
    /// Result for a command the server rejected
    #[must_use]
    pub fn command_failure(code: i32, code_name: &str, message: &str) -> Self {
        let mut details = Map::new();
        details.insert("code".to_string(), Value::from(code));
        details.insert("codeName".to_string(), Value::from(code_name));
        details.insert("errmsg".to_string(), Value::from(message));

        Self { success: false, body: Some(Value::Object(details)), headers: vec![entry("ok", 0)] }
    }

    /// Result for a command that failed without a server error code
    #[must_use]
    pub fn command_error(message: &str) -> Self {
        Self { success: false, body: Some(entry("errmsg", message)), headers: vec![entry("ok", 0)] }
    }

    /// Number of documents in the body, when the body is a document list
    #[must_use]
    pub fn documents_returned(&self) -> Option<usize> {
        self.body.as_ref().and_then(Value::as_array).map(Vec::len)
    }
}

/// Execute a command body against `database`
///
/// The body is JSON (extended JSON and shell constructors accepted) whose first key
/// names the command. A missing handle fails with `ConnectionFailed` before anything
/// is parsed; the caller must acquire a new connection.
pub async fn execute<S: DocumentStore>(
    store: Option<&S>,
    database: &str,
    body: &str,
) -> Result<ExecutionResult> {
    let Some(store) = store else {
        info!("Encountered missing connection handle, reporting back");
        return Err(ConnectorError::connection_failed(
            "Connection handle is missing or stale; acquire a new connection",
        ));
    };

    let command = parse_command(body)?;
    debug!(database, command = command.keys().next().map_or("", String::as_str), "Running command");

    match store.run_command(database, command).await {
        Ok(reply) => interpret_reply(&reply_to_json(reply)),
        Err(ConnectorError::CommandFailed { code, code_name, message }) => {
            debug!(code, code_name = %code_name, "Command failed");
            Ok(ExecutionResult::command_failure(code, &code_name, &message))
        }
        Err(ConnectorError::AuthorizationAmbiguous(message)) => {
            Ok(ExecutionResult::command_failure(13, "Unauthorized", &message))
        }
        Err(
            e @ (ConnectorError::ConnectionFailed(_)
            | ConnectorError::Timeout(_)
            | ConnectorError::Serialization(_)),
        ) => Err(e),
        Err(e) => {
            debug!(error_code = e.error_code(), "Command failed in the driver");
            Ok(ExecutionResult::command_error(&e.message()))
        }
    }
}

/// Interpret a command reply rendered as (relaxed) extended JSON
pub fn interpret_reply(reply: &Value) -> Result<ExecutionResult> {
    let fields = reply
        .as_object()
        .ok_or_else(|| ConnectorError::serialization("Command reply is not a document"))?;

    let status = integer_field(fields, "ok")?
        .ok_or_else(|| ConnectorError::serialization("Command reply has no 'ok' status"))?;

    let mut result = ExecutionResult { success: status == 1, body: None, headers: Vec::new() };

    if result.success {
        if let Some(value) = fields.get("value") {
            result.body = Some(normalize(value));
        }

        if let Some(batch) = fields
            .get("cursor")
            .and_then(|cursor| cursor.get("firstBatch"))
            .and_then(Value::as_array)
        {
            result.body = Some(Value::Array(batch.iter().map(normalize).collect()));
        }

        for key in ["n", "nModified"] {
            if let Some(count) = integer_field(fields, key)? {
                let header = entry(key, count);
                result.body = Some(header.clone());
                result.headers.push(header);
            }
        }
    } else {
        result.body = failure_details(fields);
    }

    result.headers.push(entry("ok", status));
    Ok(result)
}

/// Integer value of a reply field; fractional values are truncated
fn integer_field(fields: &Map<String, Value>, key: &str) -> Result<Option<i64>> {
    let Some(raw) = fields.get(key) else {
        return Ok(None);
    };

    let value = normalize(raw);
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        .map(Some)
        .ok_or_else(|| ConnectorError::serialization(format!("Reply field '{key}' is not numeric: {raw}")))
}

/// `code`, `codeName` and `errmsg` from a failed reply, if any are present
fn failure_details(fields: &Map<String, Value>) -> Option<Value> {
    let details: Map<String, Value> = ["code", "codeName", "errmsg"]
        .into_iter()
        .filter_map(|key| fields.get(key).map(|value| (key.to_string(), normalize(value))))
        .collect();

    (!details.is_empty()).then_some(Value::Object(details))
}

fn entry(key: &str, value: impl Into<Value>) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value.into());
    Value::Object(map)
}
