//! External string ID <-> internal u32 ID mapping, and the document bodies.

use std::collections::HashMap;

use crate::document::Document;

pub type InternalId = u32;

/// Three collaborating pieces with a single invariant:
/// `docs[internal_id]` exists iff `external_to_internal[documentID] == internal_id`.
/// `next_id` is strictly greater than every allocated internal id and never
/// decreases except on full clear.
#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: HashMap<InternalId, Document>,
    external_to_internal: HashMap<String, InternalId>,
    next_id: InternalId,
}

impl DocumentStore {
    pub fn new() -> Self {
        DocumentStore::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn internal_id(&self, external_id: &str) -> Option<InternalId> {
        self.external_to_internal.get(external_id).copied()
    }

    pub fn get(&self, internal_id: InternalId) -> Option<&Document> {
        self.docs.get(&internal_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InternalId, &Document)> {
        self.docs.iter().map(|(&id, doc)| (id, doc))
    }

    /// Allocates a fresh internal id for `external_id`, reusing an existing
    /// mapping if present. Does not store a body — callers follow up with
    /// `put`.
    pub fn allocate(&mut self, external_id: &str) -> InternalId {
        if let Some(&id) = self.external_to_internal.get(external_id) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.external_to_internal.insert(external_id.to_string(), id);
        id
    }

    pub fn put(&mut self, internal_id: InternalId, doc: Document) {
        self.docs.insert(internal_id, doc);
    }

    /// Bumps and returns a fresh internal id without installing an
    /// external-id mapping. Used by the bulk path, which stages the mapping
    /// in a `BatchResult` and installs it only at flush time, alongside the
    /// document body, so a reader never observes a mapping without a body.
    pub fn reserve_id(&mut self) -> InternalId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Installs a previously reserved external-id -> internal-id mapping.
    pub fn install_mapping(&mut self, external_id: String, internal_id: InternalId) {
        self.external_to_internal.insert(external_id, internal_id);
    }

    pub fn remove(&mut self, external_id: &str) -> Option<(InternalId, Document)> {
        let internal_id = self.external_to_internal.remove(external_id)?;
        let doc = self.docs.remove(&internal_id);
        doc.map(|d| (internal_id, d))
    }

    pub fn clear(&mut self) {
        self.docs.clear();
        self.external_to_internal.clear();
        self.next_id = 0;
    }

    pub fn next_id_peek(&self) -> InternalId {
        self.next_id
    }
}
