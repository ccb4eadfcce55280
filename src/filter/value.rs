//! Typed value comparison semantics shared by both filter surface forms.

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering3 {
    Less,
    Equal,
    Greater,
}

/// Attempts to parse `s` as a timestamp using, in order: RFC 3339 (with or
/// without nanoseconds), an ISO local date-time, a date-only value, or a
/// unix timestamp (integer or float seconds encoded as a string).
pub fn parse_timestamp(s: &str) -> Option<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(dt);
    }
    let local_fmt = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(primitive) = time::PrimitiveDateTime::parse(s, &local_fmt) {
        return Some(primitive.assume_utc());
    }
    let date_only_fmt = format_description!("[year]-[month]-[day]");
    if let Ok(date) = time::Date::parse(s, &date_only_fmt) {
        return Some(date.midnight().assume_utc());
    }
    if let Ok(secs) = s.parse::<i64>() {
        return OffsetDateTime::from_unix_timestamp(secs).ok();
    }
    if let Ok(secs) = s.parse::<f64>() {
        return OffsetDateTime::from_unix_timestamp(secs as i64).ok();
    }
    None
}

fn timestamp_from_value(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_i64().and_then(|s| OffsetDateTime::from_unix_timestamp(s).ok()).or_else(|| {
            n.as_f64().and_then(|s| OffsetDateTime::from_unix_timestamp(s as i64).ok())
        }),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Typed equality: strings compare case-sensitively; numerics coerce across
/// integer/float widths and numeric strings; booleans compare directly;
/// everything else falls back to structural equality.
pub fn values_equal(doc_value: &Value, filter_value: &Value) -> bool {
    match (doc_value, filter_value) {
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (a, b) if a.is_number() || b.is_number() => {
            match (as_f64(a), as_f64(b)) {
                (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
                _ => a == b,
            }
        }
        _ => doc_value == filter_value,
    }
}

/// Lexicographic/natural-order comparison used by `_gt`/`_gte`/`_lt`/`_lte`.
/// Returns `None` on a type mismatch that can't be bridged (e.g. bool vs
/// string) — callers treat `None` as "the comparison fails".
pub fn compare_values(doc_value: &Value, filter_value: &Value) -> Option<Ordering3> {
    if let (Value::String(a), Value::String(b)) = (doc_value, filter_value) {
        // Try timestamps first so date-like strings compare chronologically
        // rather than lexicographically, falling back to plain string order.
        if let (Some(da), Some(db)) = (parse_timestamp(a), parse_timestamp(b)) {
            return Some(ord3(da.cmp(&db)));
        }
        return Some(ord3(a.cmp(b)));
    }
    if doc_value.is_number() || filter_value.is_number() {
        if let (Some(a), Some(b)) = (as_f64(doc_value), as_f64(filter_value)) {
            return a.partial_cmp(&b).map(ord3);
        }
    }
    if let (Some(a), Some(b)) = (timestamp_from_value(doc_value), timestamp_from_value(filter_value)) {
        return Some(ord3(a.cmp(&b)));
    }
    None
}

fn ord3(o: std::cmp::Ordering) -> Ordering3 {
    match o {
        std::cmp::Ordering::Less => Ordering3::Less,
        std::cmp::Ordering::Equal => Ordering3::Equal,
        std::cmp::Ordering::Greater => Ordering3::Greater,
    }
}

/// Case-insensitive substring match for `_contains` on a scalar string
/// field.
pub fn string_contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_equality_is_case_sensitive() {
        assert!(values_equal(&json!("Paris"), &json!("Paris")));
        assert!(!values_equal(&json!("Paris"), &json!("paris")));
    }

    #[test]
    fn numeric_equality_coerces_widths_and_numeric_strings() {
        assert!(values_equal(&json!(10), &json!(10.0)));
        assert!(values_equal(&json!(10), &json!("10")));
    }

    #[test]
    fn string_contains_is_case_insensitive() {
        assert!(string_contains("The Matrix", "matrix"));
        assert!(!string_contains("The Matrix", "Avatar"));
    }

    #[test]
    fn compare_numeric_orders_by_value() {
        assert_eq!(compare_values(&json!(5), &json!(10)), Some(Ordering3::Less));
    }

    #[test]
    fn compare_strings_lexicographic_when_not_timestamps() {
        assert_eq!(compare_values(&json!("apple"), &json!("banana")), Some(Ordering3::Less));
    }

    #[test]
    fn compare_rfc3339_timestamps_chronologically() {
        let a = json!("2020-01-01T00:00:00Z");
        let b = json!("2021-01-01T00:00:00Z");
        assert_eq!(compare_values(&a, &b), Some(Ordering3::Less));
    }

    #[test]
    fn compare_mixed_bool_and_string_fails() {
        assert_eq!(compare_values(&json!(true), &json!("true")), None);
    }

    #[test]
    fn parse_timestamp_accepts_date_only_and_unix() {
        assert!(parse_timestamp("2024-05-01").is_some());
        assert!(parse_timestamp("1700000000").is_some());
    }
}
