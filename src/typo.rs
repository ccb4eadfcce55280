//! Cache-backed, bounded-time typo-tolerant vocabulary scan.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use crate::distance::bounded_distance;

/// Maximum number of distinct `(term, max_distance)` cache entries kept
/// before the finder stops populating the cache. Invalidated wholesale on
/// every `update_vocabulary` call, so no eviction policy is needed.
const CACHE_CAPACITY: usize = 10_000;

#[derive(Default)]
struct Inner {
    vocabulary: Vec<String>,
    cache: HashMap<(String, usize), Vec<String>>,
}

/// Scans the current vocabulary of the inverted index for terms within a
/// bounded edit distance of a query term, bounded by both a result-count cap
/// and a wall-clock deadline.
pub struct TypoFinder {
    inner: RwLock<Inner>,
}

impl TypoFinder {
    pub fn new() -> Self {
        TypoFinder { inner: RwLock::new(Inner::default()) }
    }

    /// Replaces the vocabulary snapshot and invalidates the cache atomically.
    pub fn update_vocabulary(&self, terms: Vec<String>) {
        let mut inner = self.inner.write();
        inner.vocabulary = terms;
        inner.cache.clear();
    }

    /// Finds vocabulary terms within `[1, max_distance]` edit distance of
    /// `term`, excluding `term` itself, capped at `max_results` entries and
    /// `time_limit` of wall-clock time.
    pub fn find(
        &self,
        term: &str,
        max_distance: usize,
        max_results: usize,
        time_limit: Duration,
    ) -> Vec<String> {
        if max_distance == 0 {
            return Vec::new();
        }
        let key = (term.to_string(), max_distance);
        {
            let inner = self.inner.read();
            if let Some(hits) = inner.cache.get(&key) {
                let mut hits = hits.clone();
                hits.truncate(max_results);
                return hits;
            }
        }

        let start = Instant::now();
        let term_len = term.chars().count();
        let mut hits = Vec::new();
        let mut stopped_early = false;
        let vocabulary_snapshot = { self.inner.read().vocabulary.clone() };
        let mut examined = 0;

        for candidate in &vocabulary_snapshot {
            if hits.len() >= max_results {
                break;
            }
            if start.elapsed() >= time_limit {
                stopped_early = true;
                break;
            }
            examined += 1;
            if candidate == term {
                continue;
            }
            let candidate_len = candidate.chars().count();
            if candidate_len.abs_diff(term_len) > max_distance {
                continue;
            }
            let d = bounded_distance(term, candidate, max_distance);
            if d >= 1 && d <= max_distance {
                hits.push(candidate.clone());
            }
        }

        if stopped_early {
            let unchecked = vocabulary_snapshot.len() - examined;
            debug!(term, max_distance, unchecked, "typo finder hit its time limit");
        }

        {
            let mut inner = self.inner.write();
            if inner.cache.len() < CACHE_CAPACITY {
                inner.cache.insert(key, hits.clone());
            }
        }

        hits
    }
}

impl Default for TypoFinder {
    fn default() -> Self {
        Self::new()
    }
}
