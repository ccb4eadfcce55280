//! Document representation.
//!
//! Documents are open maps of variant-typed values, exactly the shape
//! `serde_json::Value` already gives us, so we reuse it rather than invent a
//! parallel tagged sum.

use serde_json::Value;

/// An open mapping from field name to value. The `documentID` key is
/// reserved and always present and string-typed once a document is stored.
pub type Document = serde_json::Map<String, Value>;

pub const DOCUMENT_ID_FIELD: &str = "documentID";

/// Extracts the searchable text contributed by a single field value.
///
/// - string -> itself
/// - array of strings -> space-joined
/// - array of mixed values -> string elements joined with space, others skipped
/// - anything else -> no text
pub fn extract_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            if joined.is_empty() {
                None
            } else {
                Some(joined)
            }
        }
        _ => None,
    }
}

/// Whitespace-separated word count, used for BM25 document length.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn stringify_for_distinct(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_text_from_string() {
        assert_eq!(extract_text(&json!("hello world")), Some("hello world".to_string()));
    }

    #[test]
    fn extract_text_from_list_of_strings() {
        assert_eq!(extract_text(&json!(["a", "b", "c"])), Some("a b c".to_string()));
    }

    #[test]
    fn extract_text_from_mixed_list_skips_non_strings() {
        assert_eq!(extract_text(&json!(["a", 1, "b", true])), Some("a b".to_string()));
    }

    #[test]
    fn extract_text_from_number_is_none() {
        assert_eq!(extract_text(&json!(42)), None);
    }

    #[test]
    fn extract_text_from_whitespace_only_is_none() {
        assert_eq!(extract_text(&json!("   ")), Some("   ".to_string()));
    }
}
