//! Token -> posting list mapping.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use ordered_float::OrderedFloat;

pub type DocId = u32;

/// A single occurrence of a token in one document field.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingEntry {
    pub doc_id: DocId,
    pub field: String,
    pub score: f64,
}

fn posting_cmp(a: &PostingEntry, b: &PostingEntry) -> Ordering {
    OrderedFloat(b.score)
        .cmp(&OrderedFloat(a.score))
        .then_with(|| a.doc_id.cmp(&b.doc_id))
        .then_with(|| a.field.cmp(&b.field))
}

/// Sorted posting list for a single token: (score desc, docID asc,
/// fieldName asc), with no two entries sharing a `(docID, fieldName)` pair.
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    entries: Vec<PostingEntry>,
}

impl PostingList {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PostingEntry> {
        self.entries.iter()
    }

    /// Removes any existing entry for `(doc_id, field)` then inserts at the
    /// position that preserves the composite sort order.
    pub fn upsert(&mut self, doc_id: DocId, field: &str, score: f64) {
        self.remove(doc_id, field);
        let entry = PostingEntry { doc_id, field: field.to_string(), score };
        let pos = self.entries.binary_search_by(|probe| posting_cmp(probe, &entry)).unwrap_or_else(|p| p);
        self.entries.insert(pos, entry);
    }

    pub fn remove(&mut self, doc_id: DocId, field: &str) {
        self.entries.retain(|e| !(e.doc_id == doc_id && e.field == field));
    }

    pub fn remove_doc(&mut self, doc_id: DocId) {
        self.entries.retain(|e| e.doc_id != doc_id);
    }

    /// Merges `new` entries into `self`: new-wins per `(docID, fieldName)`,
    /// re-sorted to the composite order. Used by the bulk flush path.
    pub fn merge_new_wins(&mut self, new: &[PostingEntry]) {
        let mut merged: HashMap<(DocId, String), f64> = self
            .entries
            .iter()
            .map(|e| ((e.doc_id, e.field.clone()), e.score))
            .collect();
        for e in new {
            merged.insert((e.doc_id, e.field.clone()), e.score);
        }
        let mut entries: Vec<PostingEntry> = merged
            .into_iter()
            .map(|((doc_id, field), score)| PostingEntry { doc_id, field, score })
            .collect();
        entries.sort_by(posting_cmp);
        self.entries = entries;
    }

    pub fn document_frequency(&self) -> usize {
        self.entries.iter().map(|e| e.doc_id).collect::<HashSet<_>>().len()
    }
}

/// Maps token -> posting list. Invariant: a token is present in the map iff
/// its posting list is non-empty.
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    lists: HashMap<String, PostingList>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        InvertedIndex { lists: HashMap::new() }
    }

    pub fn clear(&mut self) {
        self.lists.clear();
    }

    pub fn get(&self, token: &str) -> Option<&PostingList> {
        self.lists.get(token)
    }

    pub fn upsert(&mut self, token: &str, doc_id: DocId, field: &str, score: f64) {
        self.lists.entry(token.to_string()).or_default().upsert(doc_id, field, score);
        self.drop_if_empty(token);
    }

    /// Removes every `(doc_id, field)` entry for `token`, dropping the token
    /// from the map entirely if its list becomes empty.
    pub fn remove_doc_field(&mut self, token: &str, doc_id: DocId, field: &str) {
        if let Some(list) = self.lists.get_mut(token) {
            list.remove(doc_id, field);
            self.drop_if_empty(token);
        }
    }

    /// Removes every entry for `doc_id` across all fields of `token`, used
    /// by the targeted-delete path which walks searchable fields of the
    /// stored body rather than reconstructing per-field removals.
    pub fn remove_doc_all_fields(&mut self, token: &str, doc_id: DocId) {
        if let Some(list) = self.lists.get_mut(token) {
            list.remove_doc(doc_id);
            self.drop_if_empty(token);
        }
    }

    fn drop_if_empty(&mut self, token: &str) {
        if self.lists.get(token).is_some_and(|l| l.is_empty()) {
            self.lists.remove(token);
        }
    }

    /// Merges staged `token -> [entries]` updates in with new-wins
    /// semantics, used at bulk-indexer flush time.
    pub fn merge_staged(&mut self, staged: HashMap<String, Vec<PostingEntry>>) {
        for (token, entries) in staged {
            self.lists.entry(token.clone()).or_default().merge_new_wins(&entries);
            self.drop_if_empty(&token);
        }
    }

    /// Every distinct token currently present, used to refresh the typo
    /// finder's vocabulary snapshot.
    pub fn vocabulary(&self) -> Vec<String> {
        let mut v: Vec<String> = self.lists.keys().cloned().collect();
        v.sort();
        v
    }

    pub fn document_frequency(&self, token: &str) -> usize {
        self.lists.get(token).map(|l| l.document_frequency()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_maintains_sort_order() {
        let mut idx = InvertedIndex::new();
        idx.upsert("the", 2, "title", 1.0);
        idx.upsert("the", 1, "title", 2.0);
        idx.upsert("the", 3, "title", 2.0);
        let entries: Vec<_> = idx.get("the").unwrap().iter().collect();
        // score desc, then docID asc
        assert_eq!(entries[0].doc_id, 1);
        assert_eq!(entries[1].doc_id, 3);
        assert_eq!(entries[2].doc_id, 2);
    }

    #[test]
    fn same_score_breaks_tie_by_field_name() {
        let mut idx = InvertedIndex::new();
        idx.upsert("the", 1, "title", 1.0);
        idx.upsert("the", 1, "description", 1.0);
        let entries: Vec<_> = idx.get("the").unwrap().iter().collect();
        assert_eq!(entries[0].field, "description");
        assert_eq!(entries[1].field, "title");
    }

    #[test]
    fn upsert_same_doc_field_replaces_entry() {
        let mut idx = InvertedIndex::new();
        idx.upsert("the", 1, "title", 1.0);
        idx.upsert("the", 1, "title", 5.0);
        let entries: Vec<_> = idx.get("the").unwrap().iter().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].score, 5.0);
    }

    #[test]
    fn remove_drops_empty_list() {
        let mut idx = InvertedIndex::new();
        idx.upsert("the", 1, "title", 1.0);
        idx.remove_doc_field("the", 1, "title");
        assert!(idx.get("the").is_none());
        assert!(idx.vocabulary().is_empty());
    }

    #[test]
    fn merge_staged_new_wins_on_conflict() {
        let mut idx = InvertedIndex::new();
        idx.upsert("cat", 1, "title", 1.0);
        let mut staged = HashMap::new();
        staged.insert(
            "cat".to_string(),
            vec![
                PostingEntry { doc_id: 1, field: "title".to_string(), score: 9.0 },
                PostingEntry { doc_id: 2, field: "title".to_string(), score: 2.0 },
            ],
        );
        idx.merge_staged(staged);
        let entries: Vec<_> = idx.get("cat").unwrap().iter().collect();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.doc_id == 1 && e.score == 9.0));
    }

    #[test]
    fn spec_scenario_the_posting_list() {
        let mut idx = InvertedIndex::new();
        idx.upsert("the", 1, "title", 1.0);
        idx.upsert("the", 1, "description", 1.0);
        idx.upsert("the", 2, "title", 1.0);
        let mut got: Vec<(u32, String)> =
            idx.get("the").unwrap().iter().map(|e| (e.doc_id, e.field.clone())).collect();
        got.sort();
        assert_eq!(
            got,
            vec![
                (1, "description".to_string()),
                (1, "title".to_string()),
                (2, "title".to_string())
            ]
        );
    }
}
