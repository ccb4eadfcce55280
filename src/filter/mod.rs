//! Filter evaluator: map form and expression-tree form over documents.

pub mod value;

use serde_json::Value;
use tracing::warn;

use crate::document::Document;
use crate::settings::IndexSettings;
use value::{compare_values, string_contains, values_equal, Ordering3};

/// Recognized filter operators. Suffix strings are ordered longest-first so
/// that map-form key parsing matches `_contains_any_of` before the shorter
/// `_contains` suffix it would otherwise also match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Exact,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    NContains,
    ContainsAnyOf,
}

const OPERATOR_TABLE: &[(&str, Operator)] = &[
    ("_contains_any_of", Operator::ContainsAnyOf),
    ("_ncontains", Operator::NContains),
    ("_contains", Operator::Contains),
    ("_gte", Operator::Gte),
    ("_lte", Operator::Lte),
    ("_gt", Operator::Gt),
    ("_lt", Operator::Lt),
    ("_ne", Operator::Ne),
    ("_exact", Operator::Exact),
];

/// Splits a map-form key into `(field, operator)`, matching the longest
/// known operator suffix first. Defaults to `Exact` with the key taken
/// verbatim as the field name when no suffix matches.
pub fn parse_map_key(key: &str) -> (&str, Operator) {
    for (suffix, op) in OPERATOR_TABLE {
        if let Some(field) = key.strip_suffix(suffix) {
            if !field.is_empty() {
                return (field, *op);
            }
        }
    }
    (key, Operator::Exact)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    /// Unknown operator strings fall back to `Or`.
    pub fn from_str_lenient(s: &str) -> BoolOp {
        match s.to_ascii_uppercase().as_str() {
            "AND" => BoolOp::And,
            _ => BoolOp::Or,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field: String,
    pub op: Option<Operator>,
    pub value: Value,
    pub score: f64,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: Operator, value: Value) -> Self {
        FieldFilter { field: field.into(), op: Some(op), value, score: 0.0 }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// Resolves the auto-operator: `Contains` when the filter value is a
    /// JSON array, `Exact` otherwise.
    fn resolved_op(&self) -> Operator {
        self.op.unwrap_or_else(|| if self.value.is_array() { Operator::Contains } else { Operator::Exact })
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterExpr {
    pub operator: BoolOp,
    pub filters: Vec<FieldFilter>,
    pub groups: Vec<FilterExpr>,
}

impl Default for BoolOp {
    fn default() -> Self {
        BoolOp::Or
    }
}

impl FilterExpr {
    pub fn and(filters: Vec<FieldFilter>) -> Self {
        FilterExpr { operator: BoolOp::And, filters, groups: Vec::new() }
    }

    pub fn or(filters: Vec<FieldFilter>) -> Self {
        FilterExpr { operator: BoolOp::Or, filters, groups: Vec::new() }
    }

    pub fn with_groups(mut self, groups: Vec<FilterExpr>) -> Self {
        self.groups = groups;
        self
    }

    /// Builds an AND-of-exact-match expression from the legacy map form,
    /// resolving each key's operator suffix.
    pub fn from_map(map: &serde_json::Map<String, Value>) -> Self {
        let filters = map
            .iter()
            .map(|(key, value)| {
                let (field, op) = parse_map_key(key);
                FieldFilter::new(field, op, value.clone())
            })
            .collect();
        FilterExpr::and(filters)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.groups.is_empty()
    }
}

/// Evaluates `expr` against `doc`. Returns `(matched, accumulated_score)`.
/// Non-filterable fields warn and are skipped (treated as pass: they
/// neither block a match nor contribute score).
pub fn evaluate(expr: &FilterExpr, doc: &Document, settings: &IndexSettings) -> (bool, f64) {
    if expr.is_empty() {
        return (true, 0.0);
    }

    let mut field_results = Vec::with_capacity(expr.filters.len());
    for f in &expr.filters {
        if !settings.is_filterable(&f.field) {
            warn!(field = %f.field, "filter references a non-filterable field, skipping");
            continue;
        }
        field_results.push(evaluate_field_filter(f, doc));
    }
    for g in &expr.groups {
        field_results.push(evaluate(g, doc, settings));
    }

    match expr.operator {
        BoolOp::Or => {
            let matched = field_results.iter().any(|(m, _)| *m);
            let score = field_results.iter().filter(|(m, _)| *m).map(|(_, s)| s).sum();
            (matched, score)
        }
        BoolOp::And => {
            if field_results.is_empty() {
                return (true, 0.0);
            }
            let matched = field_results.iter().all(|(m, _)| *m);
            let score = field_results.iter().map(|(_, s)| s).sum();
            (matched, score)
        }
    }
}

fn evaluate_field_filter(filter: &FieldFilter, doc: &Document) -> (bool, f64) {
    let Some(doc_value) = doc.get(&filter.field) else {
        return (false, 0.0);
    };
    let op = filter.resolved_op();
    let matched = match op {
        Operator::Exact => matches_any(doc_value, &filter.value, values_equal),
        Operator::Ne => !matches_any(doc_value, &filter.value, values_equal),
        Operator::Gt => compare_values(doc_value, &filter.value) == Some(Ordering3::Greater),
        Operator::Gte => {
            matches!(compare_values(doc_value, &filter.value), Some(Ordering3::Greater) | Some(Ordering3::Equal))
        }
        Operator::Lt => compare_values(doc_value, &filter.value) == Some(Ordering3::Less),
        Operator::Lte => {
            matches!(compare_values(doc_value, &filter.value), Some(Ordering3::Less) | Some(Ordering3::Equal))
        }
        Operator::Contains => contains(doc_value, &filter.value),
        Operator::NContains => !contains(doc_value, &filter.value),
        Operator::ContainsAnyOf => contains_any_of(doc_value, &filter.value),
    };
    (matched, if matched { filter.score } else { 0.0 })
}

/// Applies `eq` directly for scalar fields; for list-valued fields, matches
/// if any element satisfies `eq`.
fn matches_any(doc_value: &Value, filter_value: &Value, eq: impl Fn(&Value, &Value) -> bool) -> bool {
    match doc_value {
        Value::Array(items) => items.iter().any(|item| eq(item, filter_value)),
        other => eq(other, filter_value),
    }
}

fn contains(doc_value: &Value, filter_value: &Value) -> bool {
    match doc_value {
        Value::Array(items) => items.iter().any(|item| contains_scalar(item, filter_value)),
        other => contains_scalar(other, filter_value),
    }
}

fn contains_scalar(doc_value: &Value, filter_value: &Value) -> bool {
    match (doc_value, filter_value) {
        (Value::String(haystack), Value::String(needle)) => string_contains(haystack, needle),
        _ => values_equal(doc_value, filter_value),
    }
}

/// `_contains_any_of` expects an array filter value; matches if any
/// document element (or the scalar value itself) equals any filter
/// element.
fn contains_any_of(doc_value: &Value, filter_value: &Value) -> bool {
    let Value::Array(candidates) = filter_value else { return false };
    match doc_value {
        Value::Array(items) => items.iter().any(|item| candidates.iter().any(|c| values_equal(item, c))),
        other => candidates.iter().any(|c| values_equal(other, c)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::IndexSettings;
    use serde_json::json;

    fn settings() -> IndexSettings {
        IndexSettings::new("movies", vec!["title".to_string()])
            .unwrap()
            .with_filterable_fields(vec!["genre".to_string(), "year".to_string(), "tags".to_string()])
    }

    fn doc() -> Document {
        let mut d = Document::new();
        d.insert("genre".to_string(), json!("scifi"));
        d.insert("year".to_string(), json!(1999));
        d.insert("tags".to_string(), json!(["action", "cult"]));
        d
    }

    #[test]
    fn map_key_parses_longest_suffix_first() {
        assert_eq!(parse_map_key("tags_contains_any_of"), ("tags", Operator::ContainsAnyOf));
        assert_eq!(parse_map_key("tags_contains"), ("tags", Operator::Contains));
        assert_eq!(parse_map_key("year"), ("year", Operator::Exact));
    }

    #[test]
    fn exact_match_on_map_form() {
        let expr = FilterExpr::from_map(&serde_json::from_value(json!({"genre": "scifi"})).unwrap());
        let (matched, _) = evaluate(&expr, &doc(), &settings());
        assert!(matched);
    }

    #[test]
    fn gt_on_numeric_field() {
        let expr = FilterExpr::and(vec![FieldFilter::new("year", Operator::Gt, json!(1990))]);
        assert!(evaluate(&expr, &doc(), &settings()).0);
        let expr = FilterExpr::and(vec![FieldFilter::new("year", Operator::Gt, json!(2000))]);
        assert!(!evaluate(&expr, &doc(), &settings()).0);
    }

    #[test]
    fn contains_on_list_field() {
        let expr = FilterExpr::and(vec![FieldFilter::new("tags", Operator::Contains, json!("action"))]);
        assert!(evaluate(&expr, &doc(), &settings()).0);
    }

    #[test]
    fn contains_any_of_matches_list_overlap() {
        let expr =
            FilterExpr::and(vec![FieldFilter::new("tags", Operator::ContainsAnyOf, json!(["drama", "cult"]))]);
        assert!(evaluate(&expr, &doc(), &settings()).0);
    }

    #[test]
    fn non_filterable_field_is_skipped_as_pass() {
        let expr = FilterExpr::and(vec![FieldFilter::new("title", Operator::Exact, json!("nope"))]);
        let (matched, _) = evaluate(&expr, &doc(), &settings());
        assert!(matched);
    }

    #[test]
    fn or_group_sums_matched_scores_only() {
        let expr = FilterExpr::or(vec![
            FieldFilter::new("genre", Operator::Exact, json!("scifi")).with_score(5.0),
            FieldFilter::new("genre", Operator::Exact, json!("horror")).with_score(3.0),
        ]);
        let (matched, score) = evaluate(&expr, &doc(), &settings());
        assert!(matched);
        assert_eq!(score, 5.0);
    }

    #[test]
    fn and_group_requires_all_matched() {
        let expr = FilterExpr::and(vec![
            FieldFilter::new("genre", Operator::Exact, json!("scifi")),
            FieldFilter::new("genre", Operator::Exact, json!("horror")),
        ]);
        assert!(!evaluate(&expr, &doc(), &settings()).0);
    }

    #[test]
    fn empty_expression_matches_with_zero_score() {
        let expr = FilterExpr::default();
        assert_eq!(evaluate(&expr, &doc(), &settings()), (true, 0.0));
    }

    #[test]
    fn auto_operator_uses_contains_for_array_value_and_exact_otherwise() {
        let list_filter = FieldFilter { field: "tags".to_string(), op: None, value: json!(["action"]), score: 0.0 };
        assert_eq!(list_filter.resolved_op(), Operator::Contains);
        let scalar_filter = FieldFilter { field: "genre".to_string(), op: None, value: json!("scifi"), score: 0.0 };
        assert_eq!(scalar_filter.resolved_op(), Operator::Exact);
    }
}
