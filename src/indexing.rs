//! Single-document and micro-batch indexing path.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use tracing::instrument;

use crate::document::{extract_text, Document, DOCUMENT_ID_FIELD};
use crate::error::{Error, InvalidDocumentError, Result};
use crate::index::Index;
use crate::inverted_index::InvertedIndex;
use crate::settings::IndexSettings;
use crate::store::DocumentStore;
use crate::tokenizer::{tokenize, tokenize_with_prefix_ngrams};

/// Micro-batches larger than this are split so that exclusive locks are
/// held only briefly at a time, letting search readers interleave.
pub const DEFAULT_MICRO_BATCH_SIZE: usize = 10;

/// How long the indexing thread yields between micro-batches. A fairness
/// mechanism for lock acquisition, not a correctness requirement.
pub const MICRO_BATCH_YIELD: Duration = Duration::from_millis(1);

/// Validates `documentID`: present, string-typed, non-empty after trimming.
pub fn validate_document_id(doc: &Document) -> Result<String> {
    let value = doc.get(DOCUMENT_ID_FIELD).ok_or(InvalidDocumentError::MissingDocumentId)?;
    let s = value.as_str().ok_or_else(|| InvalidDocumentError::WrongDocumentIdType {
        found: json_type_name(value),
    })?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidDocument(InvalidDocumentError::EmptyDocumentId));
    }
    Ok(trimmed.to_string())
}

/// Validates that every searchable field present on `doc` holds a value
/// `extract_text` can actually tokenize (string or array); a missing field
/// is skipped (non-fatal per §7), but a present field of the wrong type is
/// a caller mistake, not silently-dropped text.
pub fn validate_searchable_field_types(doc: &Document, settings: &IndexSettings) -> Result<()> {
    for field in &settings.searchable_fields {
        let Some(value) = doc.get(field) else { continue };
        if !matches!(value, serde_json::Value::String(_) | serde_json::Value::Array(_)) {
            return Err(Error::InvalidDocument(InvalidDocumentError::WrongSearchableFieldType {
                field: field.clone(),
                found: json_type_name(value),
            }));
        }
    }
    Ok(())
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Tokenizes `doc`'s searchable fields according to each field's
/// prefix-search mode. Missing fields are skipped (non-fatal per §7).
pub fn tokenize_searchable_fields(doc: &Document, settings: &IndexSettings) -> HashMap<String, Vec<String>> {
    let mut out = HashMap::new();
    for field in &settings.searchable_fields {
        let Some(value) = doc.get(field) else { continue };
        let Some(text) = extract_text(value) else { continue };
        let tokens = if settings.uses_prefix_search(field) {
            tokenize_with_prefix_ngrams(&text)
        } else {
            tokenize(&text)
        };
        if !tokens.is_empty() {
            out.insert(field.clone(), tokens);
        }
    }
    out
}

/// Per-token frequency within a single field's token stream.
pub fn term_frequencies(tokens: &[String]) -> HashMap<String, f64> {
    let mut freq = HashMap::new();
    for t in tokens {
        *freq.entry(t.clone()).or_insert(0.0) += 1.0;
    }
    freq
}

/// Removes every posting entry the prior version of `doc` contributed under
/// `internal_id`, across all of its searchable fields.
fn remove_prior_postings(
    prior: &Document,
    internal_id: u32,
    settings: &IndexSettings,
    inverted: &mut InvertedIndex,
) {
    let field_tokens = tokenize_searchable_fields(prior, settings);
    for (field, tokens) in field_tokens {
        let mut unique: Vec<&String> = tokens.iter().collect();
        unique.sort();
        unique.dedup();
        for token in unique {
            inverted.remove_doc_field(token, internal_id, &field);
        }
    }
}

/// Upserts postings for the current version of `doc` under `internal_id`.
fn upsert_postings(doc: &Document, internal_id: u32, settings: &IndexSettings, inverted: &mut InvertedIndex) {
    let field_tokens = tokenize_searchable_fields(doc, settings);
    for (field, tokens) in field_tokens {
        let freqs = term_frequencies(&tokens);
        for (token, freq) in freqs {
            inverted.upsert(&token, internal_id, &field, freq);
        }
    }
}

/// Indexes one document: validates, diffs against any prior version,
/// stores the body, and upserts fresh postings. Caller holds both write
/// locks.
fn index_one(
    doc: Document,
    settings: &IndexSettings,
    store: &mut DocumentStore,
    inverted: &mut InvertedIndex,
) -> Result<()> {
    let external_id = validate_document_id(&doc)?;
    validate_searchable_field_types(&doc, settings)?;
    let existing_internal_id = store.internal_id(&external_id);
    let internal_id = store.allocate(&external_id);

    if let Some(prior) = existing_internal_id.and_then(|id| store.get(id).cloned()) {
        remove_prior_postings(&prior, internal_id, settings, inverted);
    }

    upsert_postings(&doc, internal_id, settings, inverted);
    store.put(internal_id, doc);
    Ok(())
}

/// Splits `docs` into micro-batches, applying each under a brief exclusive
/// hold of both write locks, yielding briefly between batches so pending
/// readers can interleave. Fails at the first invalid document; prior
/// batches already applied remain applied.
#[instrument(skip(index, docs))]
pub fn add_documents(index: &Index, docs: Vec<Document>, batch_size: usize) -> Result<()> {
    let batch_size = batch_size.max(1);
    for (batch_index, batch) in docs.chunks(batch_size).enumerate() {
        {
            let mut store = index.store.write();
            let mut inverted = index.inverted.write();
            for doc in batch {
                index_one(doc.clone(), &index.settings, &mut store, &mut inverted)?;
            }
        }
        index.refresh_vocabulary();
        if batch_index + 1 < docs.len().div_ceil(batch_size) {
            thread::sleep(MICRO_BATCH_YIELD);
        }
    }
    Ok(())
}

/// Removes a document and every posting it contributed.
pub fn delete_document(index: &Index, external_id: &str) -> Result<()> {
    let mut store = index.store.write();
    let mut inverted = index.inverted.write();
    let (internal_id, doc) =
        store.remove(external_id).ok_or_else(|| Error::NotFound(external_id.to_string()))?;
    let field_tokens = tokenize_searchable_fields(&doc, &index.settings);
    for (field, tokens) in field_tokens {
        let mut unique: Vec<&String> = tokens.iter().collect();
        unique.sort();
        unique.dedup();
        for token in unique {
            inverted.remove_doc_field(token, internal_id, &field);
        }
    }
    drop(store);
    drop(inverted);
    index.refresh_vocabulary();
    Ok(())
}

pub fn delete_all(index: &Index) {
    let mut store = index.store.write();
    let mut inverted = index.inverted.write();
    store.clear();
    inverted.clear();
    drop(store);
    drop(inverted);
    index.refresh_vocabulary();
}
