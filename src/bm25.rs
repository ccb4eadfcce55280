//! Field-aware BM25 scoring.

use crate::document::{extract_text, word_count};
use crate::store::{DocumentStore, InternalId};

pub const K1: f64 = 1.2;
pub const B: f64 = 0.75;

/// Stateless scorer: every call takes the document store and inverted index
/// it needs, rather than caching anything, since term frequencies and
/// document counts shift under concurrent writes between calls.
pub struct Bm25Scorer;

impl Bm25Scorer {
    /// `N` = total document count, `df` = distinct documents in the term's
    /// posting list. Returns 0 when either is 0.
    pub fn idf(total_docs: usize, document_frequency: usize) -> f64 {
        if total_docs == 0 || document_frequency == 0 {
            return 0.0;
        }
        (total_docs as f64 / document_frequency as f64).ln()
    }

    /// Total whitespace-separated word count across a document's searchable
    /// fields.
    pub fn document_length(store: &DocumentStore, doc_id: InternalId, searchable_fields: &[String]) -> usize {
        let Some(doc) = store.get(doc_id) else { return 0 };
        searchable_fields
            .iter()
            .filter_map(|field| doc.get(field))
            .filter_map(extract_text)
            .map(|text| word_count(&text))
            .sum()
    }

    pub fn average_document_length(store: &DocumentStore, searchable_fields: &[String]) -> f64 {
        if store.is_empty() {
            return 0.0;
        }
        let total: usize = store
            .iter()
            .map(|(id, _)| Self::document_length(store, id, searchable_fields))
            .sum();
        total as f64 / store.len() as f64
    }

    pub fn score(
        term_frequency: f64,
        idf: f64,
        doc_length: usize,
        average_doc_length: f64,
    ) -> f64 {
        if average_doc_length == 0.0 {
            return 0.0;
        }
        let numerator = term_frequency * (K1 + 1.0);
        let denominator =
            term_frequency + K1 * (1.0 - B + B * (doc_length as f64 / average_doc_length));
        idf * (numerator / denominator)
    }
}
