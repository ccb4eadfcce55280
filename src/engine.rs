//! Crate-level tunables and the thin multi-index registry.
//!
//! Holding a named collection of indexes is the minimal ambient surface a
//! library consumer needs to call into the core at all; this is a registry,
//! not cross-index orchestration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::instrument;

use crate::bulk::BulkIndexerConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::index::{Index, DEFAULT_TYPO_MAX_RESULTS, DEFAULT_TYPO_TIME_LIMIT};
use crate::indexing::DEFAULT_MICRO_BATCH_SIZE;
use crate::settings::IndexSettings;

/// Cross-cutting tunables the per-index core otherwise hardcodes as
/// defaults, grouped the way the bulk indexer groups its own knobs into
/// `BulkIndexerConfig`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub micro_batch_size: usize,
    pub typo_max_results: usize,
    pub typo_time_limit: Duration,
    pub bulk: BulkIndexerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            micro_batch_size: DEFAULT_MICRO_BATCH_SIZE,
            typo_max_results: DEFAULT_TYPO_MAX_RESULTS,
            typo_time_limit: DEFAULT_TYPO_TIME_LIMIT,
            bulk: BulkIndexerConfig::default(),
        }
    }
}

/// Named-index lifecycle registry. Indexes are looked up by name behind a
/// single lock that is never touched on the per-index hot path (search,
/// indexing) — only on creation, lookup, and deletion.
pub struct Engine {
    config: EngineConfig,
    indexes: RwLock<HashMap<String, Arc<Index>>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine { config, indexes: RwLock::new(HashMap::new()) }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[instrument(skip(self, settings))]
    pub fn create_index(&self, settings: IndexSettings) -> Result<Arc<Index>> {
        let name = settings.name.clone();
        let mut indexes = self.indexes.write();
        if indexes.contains_key(&name) {
            return Err(Error::Validation(format!("index `{name}` already exists")));
        }
        let index =
            Arc::new(Index::with_typo_bounds(settings, self.config.typo_max_results, self.config.typo_time_limit));
        indexes.insert(name, index.clone());
        Ok(index)
    }

    pub fn index(&self, name: &str) -> Option<Arc<Index>> {
        self.indexes.read().get(name).cloned()
    }

    pub fn delete_index(&self, name: &str) -> Result<()> {
        self.indexes.write().remove(name).map(|_| ()).ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn index_names(&self) -> Vec<String> {
        self.indexes.read().keys().cloned().collect()
    }

    /// Indexes `docs` into the named index using this engine's configured
    /// micro-batch size.
    pub fn add_documents(&self, name: &str, docs: Vec<Document>) -> Result<()> {
        let index = self.index(name).ok_or_else(|| Error::NotFound(name.to_string()))?;
        index.add_documents_with_batch_size(docs, self.config.micro_batch_size)
    }

    /// Bulk-indexes `docs` into the named index using this engine's
    /// configured bulk indexer settings.
    pub fn bulk_add_documents(&self, name: &str, docs: Vec<Document>) -> Result<()> {
        let index = self.index(name).ok_or_else(|| Error::NotFound(name.to_string()))?;
        index.bulk_add_documents(docs, self.config.bulk.clone())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineConfig::default())
    }
}
