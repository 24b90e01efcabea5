//! Canonical text encoding for record payloads.
//!
//! Compact JSON. Object keys come out sorted because `serde_json::Map` is
//! ordered by key, so equal values always encode to equal text. A missing
//! payload encodes to `None` (SQL `NULL`), which stays distinct from an
//! empty array (`[]`) or object (`{}`).

use serde::Serialize;
use serde_json::Value;

/// Encode a JSON value.
pub fn encode(value: &Value) -> String {
    value.to_string()
}

/// Encode an optional payload, keeping absence explicit.
pub fn encode_optional(value: Option<&Value>) -> Option<String> {
    value.map(encode)
}

/// Encode statement parameters as a JSON array.
pub fn encode_parameters(params: &[Value]) -> String {
    encode(&Value::Array(params.to_vec()))
}

/// Encode any serializable structure.
pub fn encode_struct<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Decode text produced by [`encode`].
pub fn decode(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parameters_round_trip() {
        let params = vec![json!(42), json!("alice"), json!(null), json!({"b": [1, 2], "a": true})];
        let text = encode_parameters(&params);
        assert_eq!(decode(&text).unwrap(), Value::Array(params));
    }

    #[test]
    fn test_payload_round_trip() {
        let payload = json!({"service": "billing", "tags": ["x", "y"], "shard": 3.5});
        let text = encode_optional(Some(&payload)).unwrap();
        assert_eq!(decode(&text).unwrap(), payload);
    }

    #[test]
    fn test_encoding_is_key_order_independent() {
        let a: Value = serde_json::from_str(r#"{"b": 1, "a": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": 2, "b": 1}"#).unwrap();
        assert_eq!(encode(&a), encode(&b));
        assert_eq!(encode(&a), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn test_absent_is_distinct_from_empty() {
        assert_eq!(encode_optional(None), None);
        assert_eq!(encode_parameters(&[]), "[]");
        assert_eq!(encode_optional(Some(&json!({}))), Some("{}".to_string()));
    }
}
