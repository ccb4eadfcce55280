//! Parallel bulk indexer: worker pool, staged updates, periodic flush.
//!
//! Grounded in the teacher's indexing pipeline (`milli::update::index_documents`),
//! which fans extraction out across a rayon thread pool and streams results
//! back to a single collector over an unbounded `crossbeam_channel`, merging
//! and periodically flushing into the LMDB-backed databases. This module
//! keeps that producer/collector shape but targets the in-memory document
//! store and inverted index instead of LMDB.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use rayon::prelude::*;
use tracing::instrument;

use crate::document::Document;
use crate::error::{InternalError, Result};
use crate::index::Index;
use crate::indexing::{
    tokenize_searchable_fields, term_frequencies, validate_document_id, validate_searchable_field_types,
};
use crate::inverted_index::PostingEntry;
use crate::store::InternalId;

pub const DEFAULT_BATCH_SIZE: usize = 1_000;
pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MEMORY_THRESHOLD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct BulkProgress {
    pub documents_seen: usize,
    pub total_documents: usize,
}

/// Tunables for the bulk path: batch size, worker count, flush interval,
/// memory threshold, and an optional progress callback.
#[derive(Clone)]
pub struct BulkIndexerConfig {
    pub batch_size: usize,
    pub worker_count: usize,
    pub flush_interval: Duration,
    pub memory_threshold_bytes: usize,
    pub progress: Option<Arc<dyn Fn(BulkProgress) + Send + Sync>>,
}

impl Default for BulkIndexerConfig {
    fn default() -> Self {
        BulkIndexerConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            worker_count: DEFAULT_WORKER_COUNT,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            memory_threshold_bytes: DEFAULT_MEMORY_THRESHOLD_BYTES,
            progress: None,
        }
    }
}

impl std::fmt::Debug for BulkIndexerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkIndexerConfig")
            .field("batch_size", &self.batch_size)
            .field("worker_count", &self.worker_count)
            .field("flush_interval", &self.flush_interval)
            .field("memory_threshold_bytes", &self.memory_threshold_bytes)
            .field("progress", &self.progress.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// What one worker produces for one batch: fresh postings, document bodies,
/// and external->internal id mappings, none of which are installed until
/// flush.
struct BatchResult {
    postings: HashMap<String, Vec<PostingEntry>>,
    bodies: HashMap<InternalId, Document>,
    id_mappings: HashMap<String, InternalId>,
    doc_count: usize,
}

fn process_batch(index: &Index, batch: Vec<Document>) -> Result<BatchResult> {
    let mut postings: HashMap<String, Vec<PostingEntry>> = HashMap::new();
    let mut bodies = HashMap::new();
    let mut id_mappings = HashMap::new();
    let mut doc_count = 0;

    for doc in batch {
        let external_id = validate_document_id(&doc)?;
        validate_searchable_field_types(&doc, &index.settings)?;

        // Brief exclusive lock: reuse an already-committed mapping or
        // reserve a fresh id. Does not install the mapping yet.
        let internal_id = {
            let mut store = index.store.write();
            match store.internal_id(&external_id) {
                Some(id) => id,
                None => {
                    let id = store.reserve_id();
                    id_mappings.insert(external_id.clone(), id);
                    id
                }
            }
        };

        // Tokenization and term-frequency counting happen without holding
        // any lock.
        let field_tokens = tokenize_searchable_fields(&doc, &index.settings);
        for (field, tokens) in field_tokens {
            for (token, freq) in term_frequencies(&tokens) {
                postings.entry(token).or_default().push(PostingEntry {
                    doc_id: internal_id,
                    field: field.clone(),
                    score: freq,
                });
            }
        }
        bodies.insert(internal_id, doc);
        doc_count += 1;
    }

    Ok(BatchResult { postings, bodies, id_mappings, doc_count })
}

fn estimate_bytes(bodies: &HashMap<InternalId, Document>, postings: &HashMap<String, Vec<PostingEntry>>) -> usize {
    let body_bytes: usize = bodies.values().map(|d| serde_json::to_string(d).map(|s| s.len()).unwrap_or(0)).sum();
    let posting_bytes: usize = postings.values().map(|v| v.len() * std::mem::size_of::<PostingEntry>()).sum();
    body_bytes + posting_bytes
}

/// Acquires both write locks (document store then inverted index),
/// installs pending document bodies and id mappings, and merges each
/// pending token's posting list with the existing one, new-wins on
/// conflict.
fn flush(
    index: &Index,
    pending_bodies: &mut HashMap<InternalId, Document>,
    pending_mappings: &mut HashMap<String, InternalId>,
    pending_postings: &mut HashMap<String, Vec<PostingEntry>>,
) {
    if pending_bodies.is_empty() && pending_mappings.is_empty() && pending_postings.is_empty() {
        return;
    }
    let mut store = index.store.write();
    let mut inverted = index.inverted.write();
    for (external_id, internal_id) in pending_mappings.drain() {
        store.install_mapping(external_id, internal_id);
    }
    for (internal_id, doc) in pending_bodies.drain() {
        store.put(internal_id, doc);
    }
    inverted.merge_staged(std::mem::take(pending_postings));
}

/// Ingests `docs` through the parallel bulk path: a rayon worker pool
/// tokenizes batches concurrently and streams `BatchResult`s to this
/// function's collector loop over a crossbeam channel, which merges them
/// under its own bookkeeping and flushes into the shared index on a timer
/// or memory-threshold trigger.
#[instrument(skip(index, docs, config))]
pub fn bulk_add_documents(index: &Index, docs: Vec<Document>, config: BulkIndexerConfig) -> Result<()> {
    if docs.is_empty() {
        return Ok(());
    }
    let total_documents = docs.len();
    let batch_size = config.batch_size.max(1);
    let batches: Vec<Vec<Document>> = docs.chunks(batch_size).map(|c| c.to_vec()).collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_count.max(1))
        .build()
        .map_err(InternalError::from)?;

    let (result_tx, result_rx): (Sender<Result<BatchResult>>, Receiver<Result<BatchResult>>) = unbounded();

    let mut documents_seen = 0usize;
    let mut pending_bodies = HashMap::new();
    let mut pending_mappings = HashMap::new();
    let mut pending_postings: HashMap<String, Vec<PostingEntry>> = HashMap::new();
    let mut last_flush = Instant::now();
    let mut first_error = None;

    // `scope` lets the spawned producer task borrow `index` and `result_tx`
    // for less than 'static, while this thread runs the collector loop
    // concurrently with the worker pool processing batches.
    pool.scope(|s| {
        s.spawn(|_| {
            batches.into_par_iter().for_each_with(result_tx, |tx, batch| {
                let result = process_batch(index, batch);
                let _ = tx.send(result);
            });
        });

        loop {
            match result_rx.recv_timeout(Duration::from_millis(50)) {
                Ok(Ok(batch_result)) => {
                    documents_seen += batch_result.doc_count;
                    pending_bodies.extend(batch_result.bodies);
                    pending_mappings.extend(batch_result.id_mappings);
                    for (token, entries) in batch_result.postings {
                        pending_postings.entry(token).or_default().extend(entries);
                    }
                    if let Some(progress) = &config.progress {
                        progress(BulkProgress { documents_seen, total_documents });
                    }
                    let approx_bytes = estimate_bytes(&pending_bodies, &pending_postings);
                    if last_flush.elapsed() >= config.flush_interval || approx_bytes >= config.memory_threshold_bytes
                    {
                        flush(index, &mut pending_bodies, &mut pending_mappings, &mut pending_postings);
                        last_flush = Instant::now();
                    }
                }
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    flush(index, &mut pending_bodies, &mut pending_mappings, &mut pending_postings);
    index.refresh_vocabulary();

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Snapshots every document body under a read lock, exclusively clears the
/// document store, inverted index, and id counter, and re-ingests through
/// the bulk path.
pub fn bulk_reindex(index: &Index, config: BulkIndexerConfig) -> Result<()> {
    let snapshot: Vec<Document> = {
        let store = index.store.read();
        store.iter().map(|(_, doc)| doc.clone()).collect()
    };
    index.delete_all();
    bulk_add_documents(index, snapshot, config)
}
