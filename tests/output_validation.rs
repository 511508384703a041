//! Output Validation Tests
//!
//! Validates that everything the connector emits has a stable JSON shape:
//! - Success and error envelopes carry exactly their documented fields
//! - Execution results serialize as `{success, body, headers}`
//! - Structure listings serialize as `{tables: [{name, kind, columns, templates}]}`
//! - Output contains no extended JSON wrappers

mod common;

use bson::{doc, oid::ObjectId, Decimal128};
use common::FakeStore;
use mongo_connector::{
    execute, infer_structure, ConnectorError, ErrorEnvelope, ErrorInfo, ExecutionResult, Metadata,
    SuccessEnvelope,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn top_level_keys(value: &Value) -> Vec<&str> {
    value.as_object().map(|obj| obj.keys().map(String::as_str).collect()).unwrap_or_default()
}

/// True if any object key anywhere starts with `$`
fn has_wrapper_keys(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.iter().any(|(key, child)| key.starts_with('$') || has_wrapper_keys(child)),
        Value::Array(items) => items.iter().any(has_wrapper_keys),
        _ => false,
    }
}

// ============================================================================
// Envelope Structure Tests
// ============================================================================

#[test]
fn test_success_envelope_structure() {
    let envelope = SuccessEnvelope::new("uri", json!("mongodb://localhost:27017/"), Metadata::new(3));

    let json_str = serde_json::to_string(&envelope).expect("Should serialize");
    let json_value: Value = serde_json::from_str(&json_str).expect("Should deserialize");

    assert_eq!(top_level_keys(&json_value), ["ok", "engine", "command", "data", "meta"]);
    assert_eq!(json_value["ok"], true);
    assert_eq!(json_value["engine"], "mongodb");
    assert_eq!(json_value["command"], "uri");
    assert_eq!(json_value["meta"], json!({"execution_ms": 3}));
}

#[test]
fn test_error_envelope_structure() {
    let envelope = ErrorEnvelope::new("query", ErrorInfo::new("MALFORMED_COMMAND", "bad body"));
    let json_value = serde_json::to_value(&envelope).expect("Should serialize");

    assert_eq!(top_level_keys(&json_value), ["ok", "engine", "command", "error"]);
    assert_eq!(json_value["ok"], false);
    assert_eq!(json_value["error"], json!({"code": "MALFORMED_COMMAND", "message": "bad body"}));
}

#[test]
fn test_every_error_has_a_stable_code() {
    let errors = [
        ConnectorError::connection_failed("x"),
        ConnectorError::timeout("x"),
        ConnectorError::authorization_ambiguous("x"),
        ConnectorError::malformed_command("x"),
        ConnectorError::serialization("x"),
        ConnectorError::command_failed(1, "InternalError", "x"),
        ConnectorError::invalid_input("x"),
        ConnectorError::engine_error("mongodb", "x"),
        ConnectorError::config_error("x"),
    ];

    for err in &errors {
        let envelope = ErrorEnvelope::from_error("test", err);
        let code = envelope.error.code.as_str();
        assert!(
            code.chars().all(|c| c.is_ascii_uppercase() || c == '_'),
            "code {code} is not SCREAMING_SNAKE_CASE"
        );
        assert!(!envelope.error.message.is_empty());
    }
}

// ============================================================================
// Execution Result Tests
// ============================================================================

#[test]
fn test_execution_result_fields() {
    let result = ExecutionResult { success: true, body: None, headers: vec![json!({"ok": 1})] };

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"success": true, "body": null, "headers": [{"ok": 1}]})
    );
}

#[tokio::test]
async fn test_execution_output_has_no_wrappers() {
    let store = FakeStore::new().with_reply(doc! {
        "cursor": {
            "firstBatch": [{
                "_id": ObjectId::new(),
                "price": Decimal128::from_bytes([0; 16]),
                "big": i64::MAX,
                "when": bson::DateTime::from_millis(1_561_939_200_000),
                "nested": { "ref": ObjectId::new(), "list": [ObjectId::new()] },
            }],
            "id": 0_i64,
            "ns": "shop.orders",
        },
        "ok": 1.0,
    });

    let result = execute(Some(&store), "shop", r#"{"find": "orders"}"#).await.unwrap();
    let output = serde_json::to_value(&result).unwrap();

    assert!(!has_wrapper_keys(&output), "wrapper survived: {output}");
    assert_eq!(output["body"][0]["when"], "2019-07-01T00:00:00Z");
    assert_eq!(output["body"][0]["big"].to_string(), i64::MAX.to_string());
}

// ============================================================================
// Structure Output Tests
// ============================================================================

#[tokio::test]
async fn test_structure_output_shape() {
    let store = FakeStore::new()
        .with_collection("b", Some(doc! { "title": "x" }))
        .with_collection("a", None);

    let structure = infer_structure(Some(&store), "app").await.unwrap();
    let output = serde_json::to_value(&structure).unwrap();

    assert_eq!(top_level_keys(&output), ["tables"]);
    assert_eq!(output["tables"][0], json!({"name": "a", "kind": "COLLECTION", "columns": [], "templates": []}));

    let table = &output["tables"][1];
    assert_eq!(top_level_keys(table), ["name", "kind", "columns", "templates"]);
    assert_eq!(table["columns"], json!([{"name": "title", "type": "String"}]));
    assert_eq!(top_level_keys(&table["templates"][0]), ["title", "commandText"]);
}
