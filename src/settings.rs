//! Per-index configuration.

use std::collections::HashSet;

use crate::error::{Error, Result};

pub const SCORE_PSEUDO_FIELD: &str = "~score";
pub const FILTERS_PSEUDO_FIELD: &str = "~filters";

const OPERATOR_SUFFIXES: &[&str] = &[
    "_exact",
    "_ne",
    "_gt",
    "_gte",
    "_lt",
    "_lte",
    "_contains",
    "_ncontains",
    "_contains_any_of",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingCriterion {
    pub field: String,
    pub order: SortOrder,
}

/// Recognized per-index options, installed once at index creation.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub name: String,
    pub searchable_fields: Vec<String>,
    pub filterable_fields: HashSet<String>,
    pub ranking_criteria: Vec<RankingCriterion>,
    pub fields_without_prefix_search: HashSet<String>,
    pub min_word_size_for_1_typo: usize,
    pub min_word_size_for_2_typos: usize,
    pub non_typo_tolerant_words: HashSet<String>,
    pub distinct_field: Option<String>,
}

impl IndexSettings {
    pub fn new(name: impl Into<String>, searchable_fields: Vec<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Validation("index name must not be empty".into()));
        }
        Ok(IndexSettings {
            name,
            searchable_fields,
            filterable_fields: HashSet::new(),
            ranking_criteria: vec![RankingCriterion {
                field: SCORE_PSEUDO_FIELD.to_string(),
                order: SortOrder::Desc,
            }],
            fields_without_prefix_search: HashSet::new(),
            min_word_size_for_1_typo: 4,
            min_word_size_for_2_typos: 8,
            non_typo_tolerant_words: HashSet::new(),
            distinct_field: None,
        })
    }

    pub fn with_filterable_fields(mut self, fields: impl IntoIterator<Item = String>) -> Self {
        self.filterable_fields = fields.into_iter().collect();
        self
    }

    pub fn with_ranking_criteria(mut self, criteria: Vec<RankingCriterion>) -> Self {
        self.ranking_criteria = criteria;
        self
    }

    pub fn with_fields_without_prefix_search(
        mut self,
        fields: impl IntoIterator<Item = String>,
    ) -> Self {
        self.fields_without_prefix_search = fields.into_iter().collect();
        self
    }

    pub fn with_typo_tolerance(mut self, min_1: usize, min_2: usize) -> Self {
        self.min_word_size_for_1_typo = min_1;
        self.min_word_size_for_2_typos = min_2;
        self
    }

    pub fn with_non_typo_tolerant_words(mut self, words: impl IntoIterator<Item = String>) -> Self {
        self.non_typo_tolerant_words = words.into_iter().map(|w| w.to_lowercase()).collect();
        self
    }

    pub fn with_distinct_field(mut self, field: impl Into<String>) -> Self {
        self.distinct_field = Some(field.into());
        self
    }

    pub fn is_searchable(&self, field: &str) -> bool {
        self.searchable_fields.iter().any(|f| f == field)
    }

    pub fn is_filterable(&self, field: &str) -> bool {
        self.filterable_fields.contains(field)
    }

    pub fn uses_prefix_search(&self, field: &str) -> bool {
        !self.fields_without_prefix_search.contains(field)
    }

    /// Field names ending in a recognized operator suffix are reported as a
    /// potential filter-parsing conflict. Non-fatal: returns the offending
    /// names for the caller to log as a warning.
    pub fn conflicting_field_names(&self) -> Vec<String> {
        let mut names: Vec<&str> = self.searchable_fields.iter().map(|s| s.as_str()).collect();
        names.extend(self.filterable_fields.iter().map(|s| s.as_str()));
        if let Some(d) = &self.distinct_field {
            names.push(d.as_str());
        }
        names
            .into_iter()
            .filter(|name| OPERATOR_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
            .map(|s| s.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert!(IndexSettings::new("  ", vec![]).is_err());
    }

    #[test]
    fn flags_searchable_field_with_operator_suffix() {
        let settings = IndexSettings::new("movies", vec!["title_contains".to_string()]).unwrap();
        assert_eq!(settings.conflicting_field_names(), vec!["title_contains".to_string()]);
    }

    #[test]
    fn default_ranking_is_score_desc() {
        let settings = IndexSettings::new("movies", vec!["title".to_string()]).unwrap();
        assert_eq!(settings.ranking_criteria[0].field, SCORE_PSEUDO_FIELD);
        assert_eq!(settings.ranking_criteria[0].order, SortOrder::Desc);
    }
}
