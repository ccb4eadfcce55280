//! In-memory, full-text search engine core: inverted index and document
//! store, the tokenization/indexing pipeline, typo-tolerant lookup, and the
//! query evaluator (term intersection, filtering, ranking, deduplication,
//! pagination).
//!
//! The HTTP/CLI surface, on-disk persistence, the async job manager, the
//! rules engine, and cross-index orchestration are out of scope: this crate
//! exposes the seams those collaborators would use (`Engine`, `Index`) but
//! does not implement them.

pub mod bm25;
pub mod bulk;
pub mod distance;
pub mod document;
pub mod engine;
pub mod error;
pub mod filter;
pub mod index;
pub mod indexing;
pub mod inverted_index;
pub mod search;
pub mod settings;
pub mod store;
pub mod tokenizer;
pub mod typo;

pub use bulk::{BulkIndexerConfig, BulkProgress};
pub use document::{Document, DOCUMENT_ID_FIELD};
pub use engine::{Engine, EngineConfig};
pub use error::{Error, InternalError, InvalidDocumentError, Result};
pub use filter::{BoolOp, FieldFilter, FilterExpr, Operator};
pub use index::Index;
pub use search::{Hit, HitInfo, Query, SearchResult};
pub use settings::{IndexSettings, RankingCriterion, SortOrder};
