//! Conversion between plain JSON and Firestore's typed value encoding.
//!
//! | JSON | Firestore |
//! |------|-----------|
//! | `null` | `{"nullValue": null}` |
//! | bool | `{"booleanValue": b}` |
//! | integer | `{"integerValue": "n"}` (int64 as a string) |
//! | float | `{"doubleValue": x}` |
//! | string | `{"stringValue": s}` |
//! | array | `{"arrayValue": {"values": [...]}}` |
//! | object | `{"mapValue": {"fields": {...}}}` |
//!
//! Decoding also accepts `timestampValue`, `referenceValue`, and
//! `bytesValue` (all surfaced as strings) and `geoPointValue` (an object
//! with `latitude` and `longitude`).

use serde_json::{json, Map, Number, Value};

use crate::store::StoreError;

/// Encode a document body as Firestore `fields`.
pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode(v)))
        .collect()
}

/// Encode one JSON value.
pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Decode Firestore `fields` into a plain document body.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, StoreError> {
    fields
        .iter()
        .map(|(k, v)| decode(v).map(|decoded| (k.clone(), decoded)))
        .collect()
}

/// Decode one typed value.
pub fn decode(value: &Value) -> Result<Value, StoreError> {
    let Some((kind, inner)) = value.as_object().and_then(|obj| obj.iter().next()) else {
        return Err(StoreError::Encoding(format!("not a typed value: {value}")));
    };
    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| bad(kind, inner)),
        "integerValue" => {
            // int64 arrives as a string, but tolerate a bare number.
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed.map(Value::from).ok_or_else(|| bad(kind, inner))
        }
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| bad(kind, inner)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| bad(kind, inner)),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = inner.get("values").and_then(Value::as_array);
            values
                .map(|items| items.iter().map(decode).collect::<Result<Vec<_>, _>>())
                .transpose()
                .map(|items| Value::Array(items.unwrap_or_default()))
        }
        "mapValue" => match inner.get("fields").and_then(Value::as_object) {
            Some(fields) => decode_fields(fields).map(Value::Object),
            None => Ok(Value::Object(Map::new())),
        },
        other => Err(StoreError::Encoding(format!("unsupported value type {other}"))),
    }
}

fn bad(kind: &str, inner: &Value) -> StoreError {
    StoreError::Encoding(format!("malformed {kind}: {inner}"))
}
