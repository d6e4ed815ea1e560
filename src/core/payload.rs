//! Purpose: Decode a double-encoded JSON payload cell and render its values as text.
//! Exports: `Payload`, `decode_cell`, `render_value`.
//! Role: Single JSON seam for the flattener; callsites attach row/field context.
//! Invariants: `JSON.parse(JSON.parse(cell))` must be an object; key order follows the text.
//! Invariants: Numbers render with their source digits (no float round-trip).
use serde_json::{Map, Value};

use super::error::{Error, ErrorKind};

pub type Payload = Map<String, Value>;

/// Decode `cell` as a JSON string, then decode that string as a JSON object.
///
/// Key order follows the inner JSON text. Errors are `ErrorKind::Decode`
/// without row or field context; callers attach it.
pub fn decode_cell(cell: &str) -> Result<Payload, Error> {
    let outer: Value = serde_json::from_str(cell).map_err(|err| {
        Error::new(ErrorKind::Decode)
            .with_message("payload cell is not valid JSON")
            .with_source(err)
    })?;
    let inner = match outer {
        Value::String(inner) => inner,
        other => {
            return Err(Error::new(ErrorKind::Decode).with_message(format!(
                "payload cell decodes to a JSON {}, expected a string",
                type_name(&other)
            )));
        }
    };

    let value: Value = serde_json::from_str(&inner).map_err(|err| {
        Error::new(ErrorKind::Decode)
            .with_message("payload string does not contain valid JSON")
            .with_source(err)
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::new(ErrorKind::Decode).with_message(format!(
            "payload decodes to a JSON {}, expected an object",
            type_name(&other)
        ))),
    }
}

/// Text form of a payload value in the output file.
///
/// Strings are written as-is; everything else uses compact JSON text.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_cell, render_value};
    use crate::core::error::ErrorKind;
    use serde_json::{Value, json};

    fn encode_twice(value: &Value) -> String {
        let inner = serde_json::to_string(value).expect("inner");
        serde_json::to_string(&inner).expect("outer")
    }

    #[test]
    fn decodes_double_encoded_object_in_key_order() {
        let cell = r#""{\"zeta\": 1, \"alpha\": \"x\", \"mid\": true}""#;
        let payload = decode_cell(cell).expect("payload");
        let keys: Vec<&str> = payload.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(payload["alpha"], json!("x"));
    }

    #[test]
    fn decodes_cell_built_by_encoding_twice() {
        let cell = encode_twice(&json!({"speed": 5, "mode": "fast"}));
        let payload = decode_cell(&cell).expect("payload");
        assert_eq!(payload["speed"], json!(5));
        assert_eq!(payload["mode"], json!("fast"));
    }

    #[test]
    fn rejects_invalid_outer_json() {
        let err = decode_cell("{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn rejects_single_encoded_object() {
        let err = decode_cell(r#"{"speed": 5}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.message().unwrap().contains("expected a string"));
    }

    #[test]
    fn rejects_invalid_inner_json() {
        let err = decode_cell(r#""{speed: 5}""#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.message().unwrap().contains("valid JSON"));
    }

    #[test]
    fn rejects_inner_non_object() {
        let err = decode_cell(r#""[1, 2]""#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.message().unwrap().contains("array"));
    }

    #[test]
    fn renders_numbers_with_source_digits() {
        let cell = r#""{\"seed\": 123456789012345678901234567890, \"scale\": 1e400, \"ratio\": 0.1}""#;
        let payload = decode_cell(cell).expect("payload");
        assert_eq!(
            render_value(&payload["seed"]),
            "123456789012345678901234567890"
        );
        assert_eq!(render_value(&payload["scale"]), "1e400");
        assert_eq!(render_value(&payload["ratio"]), "0.1");
    }

    #[test]
    fn renders_scalars_canonically() {
        assert_eq!(render_value(&json!("fast")), "fast");
        assert_eq!(render_value(&json!(5)), "5");
        assert_eq!(render_value(&json!(2.5)), "2.5");
        assert_eq!(render_value(&json!(true)), "true");
        assert_eq!(render_value(&Value::Null), "null");
        assert_eq!(render_value(&json!({"a": [1, 2]})), r#"{"a":[1,2]}"#);
    }
}
