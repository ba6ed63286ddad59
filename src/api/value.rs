//! Firestore typed-value encoding
//!
//! The REST API wraps every field in a typed value (`{"stringValue": ..}`,
//! `{"integerValue": "42"}`, ...). Records are serialized with serde into a
//! JSON object first, then converted field by field.

use serde_json::{Map, Value};

/// Encode a JSON object into a Firestore `fields` map.
pub fn encode_fields(object: &Map<String, Value>) -> Value {
    Value::Object(
        object
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => serde_json::json!({ "nullValue": null }),
        Value::Bool(b) => serde_json::json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // 64-bit integers travel as strings.
            Some(i) => serde_json::json!({ "integerValue": i.to_string() }),
            None => serde_json::json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => serde_json::json!({ "stringValue": s }),
        Value::Array(items) => serde_json::json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => serde_json::json!({
            "mapValue": { "fields": encode_fields(map) }
        }),
    }
}

/// Decode a Firestore `fields` map back into a plain JSON object.
pub fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), decode_value(v)))
        .collect()
}

fn decode_value(value: &Value) -> Value {
    let Some(typed) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = typed.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "booleanValue" | "doubleValue" => inner.clone(),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "mapValue" => inner
            .get("fields")
            .and_then(Value::as_object)
            .map(|f| Value::Object(decode_fields(f)))
            .unwrap_or_else(|| Value::Object(Map::new())),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vals| vals.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}
