//! Query evaluation: term intersection, typo expansion, filtering, ranking,
//! deduplication, and pagination.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use ordered_float::OrderedFloat;
use tracing::instrument;
use uuid::Uuid;

use crate::bm25::Bm25Scorer;
use crate::document::{extract_text, stringify_for_distinct, Document};
use crate::error::{Error, Result};
use crate::filter::value::{compare_values, Ordering3};
use crate::filter::{evaluate, FilterExpr};
use crate::index::Index;
use crate::inverted_index::{DocId, InvertedIndex};
use crate::settings::{IndexSettings, SortOrder, FILTERS_PSEUDO_FIELD, SCORE_PSEUDO_FIELD};
use crate::store::DocumentStore;
use crate::tokenizer::tokenize;

const TYPO1_PENALTY: f64 = 0.8;
const TYPO2_PENALTY: f64 = 0.6;
const TYPO_PREFIX_EXCLUSION_MIN_LEN: usize = 3;

#[derive(Debug, Clone)]
pub struct Query {
    pub query_string: String,
    pub restrict_searchable_fields: Option<Vec<String>>,
    pub retrievable_fields: Option<Vec<String>>,
    pub filters: Option<FilterExpr>,
    pub page: usize,
    pub page_size: usize,
    pub min_word_size_for_1_typo: Option<usize>,
    pub min_word_size_for_2_typos: Option<usize>,
}

impl Default for Query {
    fn default() -> Self {
        Query {
            query_string: String::new(),
            restrict_searchable_fields: None,
            retrievable_fields: None,
            filters: None,
            page: 1,
            page_size: 10,
            min_word_size_for_1_typo: None,
            min_word_size_for_2_typos: None,
        }
    }
}

impl Query {
    pub fn new(query_string: impl Into<String>) -> Self {
        Query { query_string: query_string.into(), ..Default::default() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HitInfo {
    pub num_typos: usize,
    pub number_exact_words: usize,
    pub filter_score: f64,
}

#[derive(Debug, Clone)]
pub struct Hit {
    pub document: Document,
    pub score: f64,
    pub field_matches: HashMap<String, Vec<String>>,
    pub info: HitInfo,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub hits: Vec<Hit>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub took_ms: u64,
    pub query_id: String,
}

impl SearchResult {
    fn empty(page: usize, page_size: usize, start: Instant) -> Self {
        SearchResult {
            hits: Vec::new(),
            total: 0,
            page,
            page_size,
            took_ms: start.elapsed().as_millis() as u64,
            query_id: Uuid::new_v4().to_string(),
        }
    }
}

/// A single token match contributed to one document by one query token,
/// either the exact token or a typo candidate at a known edit distance.
#[derive(Debug, Clone)]
struct TokenMatch {
    field: String,
    score: f64,
    matched_term: String,
    is_typo: bool,
}

#[instrument(skip(index, query))]
pub fn search(index: &Index, query: &Query) -> Result<SearchResult> {
    let start = Instant::now();
    let settings = &index.settings;

    let allowed_fields = resolve_allowed_fields(settings, query.restrict_searchable_fields.as_deref())?;

    let query_tokens = tokenize(&query.query_string);
    if query_tokens.is_empty() {
        return Ok(SearchResult::empty(query.page.max(1), query.page_size.max(1), start));
    }

    let store = index.store.read();
    let inverted = index.inverted.read();

    let min1 = query.min_word_size_for_1_typo.unwrap_or(settings.min_word_size_for_1_typo);
    let min2 = query.min_word_size_for_2_typos.unwrap_or(settings.min_word_size_for_2_typos);

    let total_docs = store.len();
    let average_doc_length = Bm25Scorer::average_document_length(&store, &settings.searchable_fields);

    // For each query token, a map of docID -> the matches it contributed.
    let mut per_token_matches: Vec<HashMap<DocId, Vec<TokenMatch>>> = Vec::with_capacity(query_tokens.len());
    for token in &query_tokens {
        per_token_matches.push(resolve_token_matches(
            index,
            &store,
            &inverted,
            token,
            &allowed_fields,
            settings,
            min1,
            min2,
            total_docs,
            average_doc_length,
        ));
    }

    // Intersection: a document is a candidate iff every query token matched it.
    let mut candidates: Option<HashSet<DocId>> = None;
    for matches in &per_token_matches {
        let doc_ids: HashSet<DocId> = matches.keys().copied().collect();
        candidates = Some(match candidates {
            None => doc_ids,
            Some(prev) => prev.intersection(&doc_ids).copied().collect(),
        });
        if candidates.as_ref().is_some_and(HashSet::is_empty) {
            break;
        }
    }
    let candidates = candidates.unwrap_or_default();

    let mut hits = Vec::new();
    for doc_id in candidates {
        let Some(doc) = store.get(doc_id) else { continue };

        let filter_score = if let Some(filters) = &query.filters {
            match evaluate(filters, doc, settings) {
                (true, score) => score,
                (false, _) => continue,
            }
        } else {
            0.0
        };

        let hit = build_hit(doc, doc_id, &query_tokens, &per_token_matches, filter_score, query.retrievable_fields.as_deref());
        hits.push(hit);
    }

    sort_hits(&mut hits, &settings.ranking_criteria);

    let hits = deduplicate(hits, settings.distinct_field.as_deref());
    let total = hits.len();

    let page = query.page.max(1);
    let page_size = query.page_size.max(1);
    let start_idx = (page - 1) * page_size;
    let page_hits: Vec<Hit> = hits.into_iter().skip(start_idx).take(page_size).collect();

    Ok(SearchResult {
        hits: page_hits,
        total,
        page,
        page_size,
        took_ms: start.elapsed().as_millis() as u64,
        query_id: Uuid::new_v4().to_string(),
    })
}

/// Executes every `(name, query)` pair against `index` in parallel and
/// aggregates the results into a name-keyed map. If `cancelled` becomes
/// true (the caller is expected to flip this from another thread), pending
/// children are abandoned and the call returns a cancellation error; the
/// first child error otherwise short-circuits the whole call.
#[instrument(skip(index, queries, cancelled))]
pub fn multi_search(
    index: &Index,
    queries: &[(String, Query)],
    cancelled: &std::sync::atomic::AtomicBool,
) -> Result<HashMap<String, SearchResult>> {
    use rayon::prelude::*;
    use std::sync::atomic::Ordering as AtomicOrdering;

    for (name, _) in queries {
        if name.trim().is_empty() {
            return Err(Error::Validation("multi_search query name must not be empty".into()));
        }
    }

    let results: Vec<Result<(String, SearchResult)>> = queries
        .par_iter()
        .map(|(name, query)| {
            if cancelled.load(AtomicOrdering::Relaxed) {
                return Err(Error::Cancelled);
            }
            let result = search(index, query)?;
            Ok((name.clone(), result))
        })
        .collect();

    let mut out = HashMap::with_capacity(results.len());
    for r in results {
        let (name, result) = r?;
        out.insert(name, result);
    }
    Ok(out)
}

fn resolve_allowed_fields(settings: &IndexSettings, restrict: Option<&[String]>) -> Result<Vec<String>> {
    match restrict {
        None => Ok(settings.searchable_fields.clone()),
        Some(restrict) => {
            for field in restrict {
                if !settings.is_searchable(field) {
                    return Err(Error::Validation(format!(
                        "restrictSearchableFields field `{field}` is not a configured searchable field"
                    )));
                }
            }
            Ok(restrict.to_vec())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_token_matches(
    index: &Index,
    store: &DocumentStore,
    inverted: &InvertedIndex,
    token: &str,
    allowed_fields: &[String],
    settings: &IndexSettings,
    min1: usize,
    min2: usize,
    total_docs: usize,
    average_doc_length: f64,
) -> HashMap<DocId, Vec<TokenMatch>> {
    let mut by_doc: HashMap<DocId, Vec<TokenMatch>> = HashMap::new();
    let mut exact_doc_ids: HashSet<DocId> = HashSet::new();

    let bm25_entry_score = |term: &str, doc_id: DocId, raw_tf: f64| -> f64 {
        let idf = Bm25Scorer::idf(total_docs, inverted.document_frequency(term));
        let doc_length = Bm25Scorer::document_length(store, doc_id, &settings.searchable_fields);
        Bm25Scorer::score(raw_tf, idf, doc_length, average_doc_length)
    };

    if let Some(list) = inverted.get(token) {
        for entry in list.iter() {
            if !allowed_fields.iter().any(|f| f == &entry.field) {
                continue;
            }
            exact_doc_ids.insert(entry.doc_id);
            by_doc.entry(entry.doc_id).or_default().push(TokenMatch {
                field: entry.field.clone(),
                score: bm25_entry_score(token, entry.doc_id, entry.score),
                matched_term: token.to_string(),
                is_typo: false,
            });
        }
    }

    if settings.non_typo_tolerant_words.contains(&token.to_lowercase()) {
        return by_doc;
    }

    let token_len = token.chars().count();
    // Tracks, per docID, the best (lowest) typo distance seen so far so
    // that a farther-distance candidate never displaces a closer one.
    let mut best_distance: HashMap<DocId, usize> = HashMap::new();

    for (distance, min_size, penalty) in [(1usize, min1, TYPO1_PENALTY), (2usize, min2, TYPO2_PENALTY)] {
        if min_size == 0 || token_len < min_size {
            continue;
        }
        let candidates =
            index.typo_finder.find(token, distance, index.typo_max_results, index.typo_time_limit);
        for candidate in candidates {
            if is_excluded_typo_candidate(&candidate, token, settings) {
                continue;
            }
            let Some(list) = inverted.get(&candidate) else { continue };
            for entry in list.iter() {
                if !allowed_fields.iter().any(|f| f == &entry.field) {
                    continue;
                }
                if exact_doc_ids.contains(&entry.doc_id) {
                    continue;
                }
                match best_distance.get(&entry.doc_id) {
                    Some(&existing) if existing < distance => continue,
                    Some(&existing) if existing == distance => {
                        // equal-distance matches accumulate
                    }
                    _ => {
                        // strictly better distance: drop anything recorded so far for this doc
                        by_doc.entry(entry.doc_id).or_default().clear();
                        best_distance.insert(entry.doc_id, distance);
                    }
                }
                by_doc.entry(entry.doc_id).or_default().push(TokenMatch {
                    field: entry.field.clone(),
                    score: bm25_entry_score(&candidate, entry.doc_id, entry.score) * penalty,
                    matched_term: candidate.clone(),
                    is_typo: true,
                });
            }
        }
    }

    by_doc
}

/// Excludes a typo candidate that equals the query token, equals (case
/// insensitively) a non-typo-tolerant word, or is a length->=3
/// case-insensitive prefix of one.
fn is_excluded_typo_candidate(candidate: &str, query_token: &str, settings: &IndexSettings) -> bool {
    if candidate == query_token {
        return true;
    }
    let candidate_lower = candidate.to_lowercase();
    for word in &settings.non_typo_tolerant_words {
        if candidate_lower == *word {
            return true;
        }
        if candidate.chars().count() >= TYPO_PREFIX_EXCLUSION_MIN_LEN && word.starts_with(&candidate_lower) {
            return true;
        }
    }
    false
}

fn build_hit(
    doc: &Document,
    doc_id: DocId,
    query_tokens: &[String],
    per_token_matches: &[HashMap<DocId, Vec<TokenMatch>>],
    filter_score: f64,
    retrievable_fields: Option<&[String]>,
) -> Hit {
    let mut score = 0.0;
    let mut field_matches: HashMap<String, Vec<String>> = HashMap::new();
    let mut num_typos = 0;
    let mut number_exact_words = 0;

    for (token, matches_by_doc) in query_tokens.iter().zip(per_token_matches) {
        let Some(matches) = matches_by_doc.get(&doc_id) else { continue };
        let has_exact = matches.iter().any(|m| !m.is_typo);
        let relevant: Vec<&TokenMatch> = matches.iter().filter(|m| m.is_typo != has_exact).collect();
        let contribution: f64 = if has_exact {
            relevant.iter().map(|m| m.score).fold(f64::MIN, f64::max)
        } else if !relevant.is_empty() {
            num_typos += 1;
            relevant.iter().map(|m| m.score).sum()
        } else {
            0.0
        };
        score += contribution;

        for m in &relevant {
            let label = if m.is_typo { format!("{}(typo)", m.matched_term) } else { m.matched_term.clone() };
            let entry = field_matches.entry(m.field.clone()).or_default();
            if !entry.contains(&label) {
                entry.push(label);
            }
        }

        if relevant.iter().any(|m| {
            doc.get(&m.field)
                .and_then(extract_text)
                .map(|text| tokenize(&text).iter().any(|t| t == token))
                .unwrap_or(false)
        }) {
            number_exact_words += 1;
        }
    }

    let document = project(doc, retrievable_fields);

    Hit {
        document,
        score,
        field_matches,
        info: HitInfo { num_typos, number_exact_words, filter_score },
    }
}

fn project(doc: &Document, retrievable_fields: Option<&[String]>) -> Document {
    match retrievable_fields {
        None => doc.clone(),
        Some(fields) => {
            let mut out = Document::new();
            for field in fields {
                if let Some(v) = doc.get(field) {
                    out.insert(field.clone(), v.clone());
                }
            }
            out
        }
    }
}

fn sort_hits(hits: &mut [Hit], criteria: &[crate::settings::RankingCriterion]) {
    hits.sort_by(|a, b| {
        for criterion in criteria {
            let ord = compare_by_criterion(a, b, &criterion.field, criterion.order);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        // Final tie-break: hit score descending.
        OrderedFloat(b.score).cmp(&OrderedFloat(a.score))
    });
}

fn compare_by_criterion(a: &Hit, b: &Hit, field: &str, order: SortOrder) -> Ordering {
    let natural = if field == SCORE_PSEUDO_FIELD {
        OrderedFloat(a.score).cmp(&OrderedFloat(b.score))
    } else if field == FILTERS_PSEUDO_FIELD {
        OrderedFloat(a.info.filter_score).cmp(&OrderedFloat(b.info.filter_score))
    } else {
        match (a.document.get(field), b.document.get(field)) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => return if order == SortOrder::Desc { Ordering::Less } else { Ordering::Greater },
            (None, Some(_)) => return if order == SortOrder::Desc { Ordering::Greater } else { Ordering::Less },
            (Some(av), Some(bv)) => match compare_values(av, bv) {
                Some(Ordering3::Less) => Ordering::Less,
                Some(Ordering3::Equal) => Ordering::Equal,
                Some(Ordering3::Greater) => Ordering::Greater,
                None => Ordering::Equal,
            },
        }
    };
    match order {
        SortOrder::Desc => natural.reverse(),
        SortOrder::Asc => natural,
    }
}

fn deduplicate(hits: Vec<Hit>, distinct_field: Option<&str>) -> Vec<Hit> {
    let Some(field) = distinct_field else { return hits };
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(hits.len());
    for hit in hits {
        match hit.document.get(field) {
            None => out.push(hit),
            Some(value) => {
                let key = stringify_for_distinct(value);
                if seen.insert(key) {
                    out.push(hit);
                }
            }
        }
    }
    out
}
