//! Purpose: Define a stable, structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`.
//! Role: Shared contract helper for CLI diagnostics (skipped rows).
//! Invariants: Notices are non-fatal and never alter the output file or stdout summary.
//! Invariants: JSON schema is stable once published; fields are additive-only.
use serde_json::{Map, Value, json};

use crate::api::SkippedRow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub input: String,
    pub row: usize,
    pub message: String,
    pub details: Map<String, Value>,
}

impl Notice {
    pub fn skipped(input: &str, skipped: &SkippedRow) -> Self {
        let mut details = Map::new();
        details.insert("error_kind".to_string(), json!(skipped.kind));
        Self {
            kind: "skip".to_string(),
            input: input.to_string(),
            row: skipped.row,
            message: skipped.message.clone(),
            details,
        }
    }
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind));
    inner.insert("input".to_string(), json!(notice.input));
    inner.insert("row".to_string(), json!(notice.row));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

#[cfg(test)]
mod tests {
    use super::{Notice, notice_json};
    use crate::api::SkippedRow;

    #[test]
    fn notice_json_has_required_fields() {
        let skipped = SkippedRow {
            row: 7,
            kind: "Decode".to_string(),
            message: "payload cell is not valid JSON".to_string(),
        };
        let notice = Notice::skipped("aggregated.tsv", &skipped);

        let value = notice_json(&notice);
        let obj = value
            .get("notice")
            .and_then(|v| v.as_object())
            .expect("notice object");

        assert_eq!(obj.get("kind").and_then(|v| v.as_str()), Some("skip"));
        assert_eq!(
            obj.get("input").and_then(|v| v.as_str()),
            Some("aggregated.tsv")
        );
        assert_eq!(obj.get("row").and_then(|v| v.as_u64()), Some(7));
        assert_eq!(
            obj.get("message").and_then(|v| v.as_str()),
            Some("payload cell is not valid JSON")
        );
        assert_eq!(obj["details"]["error_kind"], "Decode");
    }
}
