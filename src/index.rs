//! Per-index facade: settings, document store, inverted index, typo finder,
//! and the synchronous mutators/query entry points that sit on top of them.

use std::time::Duration;

use parking_lot::RwLock;

use crate::bulk::{self, BulkIndexerConfig};
use crate::document::Document;
use crate::error::Result;
use crate::indexing::{self, DEFAULT_MICRO_BATCH_SIZE};
use crate::inverted_index::InvertedIndex;
use crate::search::{self, Query, SearchResult};
use crate::settings::IndexSettings;
use crate::store::DocumentStore;
use crate::typo::TypoFinder;

/// Default bounds for the typo finder's bounded-time scan, used whenever a
/// query doesn't override them.
pub const DEFAULT_TYPO_MAX_RESULTS: usize = 500;
pub const DEFAULT_TYPO_TIME_LIMIT: Duration = Duration::from_millis(50);

/// Bundles the shared state of a single index behind the lock hierarchy of
/// §5: mutators always take `store` before `inverted`; search takes both as
/// readers for the full evaluation.
pub struct Index {
    pub settings: IndexSettings,
    pub(crate) store: RwLock<DocumentStore>,
    pub(crate) inverted: RwLock<InvertedIndex>,
    pub(crate) typo_finder: TypoFinder,
    pub(crate) typo_max_results: usize,
    pub(crate) typo_time_limit: Duration,
}

impl Index {
    pub fn new(settings: IndexSettings) -> Self {
        Index::with_typo_bounds(settings, DEFAULT_TYPO_MAX_RESULTS, DEFAULT_TYPO_TIME_LIMIT)
    }

    /// Like `new`, but overrides the typo finder's result-count and
    /// wall-clock bounds, the way `Engine::create_index` does from its
    /// `EngineConfig`.
    pub fn with_typo_bounds(settings: IndexSettings, typo_max_results: usize, typo_time_limit: Duration) -> Self {
        for field in settings.conflicting_field_names() {
            tracing::warn!(field, "field name ends in a filter operator suffix and may be ambiguous to parse");
        }
        Index {
            settings,
            store: RwLock::new(DocumentStore::new()),
            inverted: RwLock::new(InvertedIndex::new()),
            typo_finder: TypoFinder::new(),
            typo_max_results,
            typo_time_limit,
        }
    }

    pub fn document_count(&self) -> usize {
        self.store.read().len()
    }

    /// Refreshes the typo finder's vocabulary snapshot from the current
    /// inverted index. Callers invoke this after completing a write batch;
    /// readers may see a transiently stale vocabulary in between.
    pub fn refresh_vocabulary(&self) {
        let vocabulary = self.inverted.read().vocabulary();
        self.typo_finder.update_vocabulary(vocabulary);
    }

    pub fn add_documents(&self, docs: Vec<Document>) -> Result<()> {
        indexing::add_documents(self, docs, DEFAULT_MICRO_BATCH_SIZE)
    }

    pub fn add_documents_with_batch_size(&self, docs: Vec<Document>, batch_size: usize) -> Result<()> {
        indexing::add_documents(self, docs, batch_size)
    }

    pub fn delete_document(&self, external_id: &str) -> Result<()> {
        indexing::delete_document(self, external_id)
    }

    pub fn delete_all(&self) {
        indexing::delete_all(self)
    }

    pub fn bulk_add_documents(&self, docs: Vec<Document>, config: BulkIndexerConfig) -> Result<()> {
        bulk::bulk_add_documents(self, docs, config)
    }

    pub fn bulk_reindex(&self, config: BulkIndexerConfig) -> Result<()> {
        bulk::bulk_reindex(self, config)
    }

    pub fn search(&self, query: Query) -> Result<SearchResult> {
        search::search(self, &query)
    }

    pub fn multi_search(
        &self,
        queries: &[(String, Query)],
        cancelled: &std::sync::atomic::AtomicBool,
    ) -> Result<std::collections::HashMap<String, SearchResult>> {
        search::multi_search(self, queries, cancelled)
    }
}
