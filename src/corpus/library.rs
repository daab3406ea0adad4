//! Document load registry.
//!
//! Tracks, per lowercased absolute document path, whether it is waiting to
//! be loaded, currently loading, or known to be missing, plus which loaded
//! documents still need indexing. Nothing is ever fetched again once it is
//! recorded as missing.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashSet;

use crate::base::DocId;

#[derive(Clone, Debug, Default)]
pub struct DocumentLibrary {
    /// Lowercased path to loaded document.
    all_documents: IndexMap<String, DocId>,
    /// Lowercased path to the path as first requested.
    docs_not_loaded: IndexMap<String, String>,
    docs_currently_loading: FxHashSet<String>,
    docs_not_indexed: IndexSet<DocId>,
    docs_not_found: FxHashSet<String>,
}

impl DocumentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document_path(&mut self, path: &str, doc: DocId) {
        self.all_documents.insert(path.to_lowercase(), doc);
    }

    pub fn remove_document_path(&mut self, path: &str, doc: DocId) {
        self.all_documents.shift_remove(&path.to_lowercase());
        self.docs_not_indexed.shift_remove(&doc);
    }

    pub fn fetch(&self, path: &str) -> Option<DocId> {
        self.all_documents.get(&path.to_lowercase()).copied()
    }

    pub fn list_all_documents(&self) -> Vec<DocId> {
        self.all_documents.values().copied().collect()
    }

    pub fn list_docs_not_indexed(&self) -> Vec<DocId> {
        self.docs_not_indexed.iter().copied().collect()
    }

    pub fn list_docs_not_loaded(&self) -> Vec<String> {
        self.docs_not_loaded.values().cloned().collect()
    }

    pub fn is_not_found(&self, path: &str) -> bool {
        self.docs_not_found.contains(&path.to_lowercase())
    }

    pub fn is_loading(&self, path: &str) -> bool {
        self.docs_currently_loading.contains(&path.to_lowercase())
    }

    /// Queue a path for loading unless it is already loaded or known to be
    /// missing. Returns whether it was queued.
    pub fn mark_not_loaded(&mut self, path: &str) -> bool {
        let key = path.to_lowercase();
        if self.docs_not_found.contains(&key) || self.all_documents.contains_key(&key) {
            return false;
        }
        self.docs_not_loaded.entry(key).or_insert_with(|| path.to_string());
        true
    }

    /// Claim a path for loading. Returns `false` if someone else is already
    /// loading it or it is known to be missing; the caller must not load it.
    pub fn begin_load(&mut self, path: &str) -> bool {
        let key = path.to_lowercase();
        if self.docs_not_found.contains(&key) || self.docs_currently_loading.contains(&key) {
            return false;
        }
        self.docs_not_loaded.shift_remove(&key);
        self.docs_currently_loading.insert(key);
        true
    }

    /// Finish a load started with [`begin_load`](Self::begin_load). A
    /// missing document is remembered for the rest of the session.
    pub fn complete_load(&mut self, path: &str, doc: Option<DocId>) -> bool {
        let key = path.to_lowercase();
        self.docs_currently_loading.remove(&key);
        match doc {
            Some(doc) => {
                self.docs_not_indexed.insert(doc);
                true
            }
            None => {
                self.docs_not_found.insert(key);
                false
            }
        }
    }

    pub fn mark_indexed(&mut self, doc: DocId) {
        self.docs_not_indexed.shift_remove(&doc);
    }

    pub fn mark_for_indexing(&mut self, doc: DocId) {
        self.docs_not_indexed.insert(doc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_load_claims_once() {
        let mut lib = DocumentLibrary::new();
        assert!(lib.mark_not_loaded("local:/A.cdm.json"));
        assert!(lib.begin_load("local:/A.cdm.json"));
        // Second claim while loading is refused.
        assert!(!lib.begin_load("local:/a.cdm.json"));
        assert!(lib.list_docs_not_loaded().is_empty());
    }

    #[test]
    fn test_not_found_is_permanent() {
        let mut lib = DocumentLibrary::new();
        lib.mark_not_loaded("local:/missing.cdm.json");
        assert!(lib.begin_load("local:/missing.cdm.json"));
        assert!(!lib.complete_load("local:/missing.cdm.json", None));

        assert!(lib.is_not_found("local:/missing.cdm.json"));
        assert!(!lib.mark_not_loaded("local:/missing.cdm.json"));
        assert!(!lib.begin_load("local:/missing.cdm.json"));
    }

    #[test]
    fn test_loaded_document_waits_for_indexing() {
        let mut lib = DocumentLibrary::new();
        lib.mark_not_loaded("local:/A.cdm.json");
        lib.begin_load("local:/A.cdm.json");
        lib.add_document_path("local:/A.cdm.json", DocId(1));
        assert!(lib.complete_load("local:/A.cdm.json", Some(DocId(1))));

        assert_eq!(lib.list_docs_not_indexed(), vec![DocId(1)]);
        assert!(!lib.mark_not_loaded("local:/A.cdm.json"));

        lib.mark_indexed(DocId(1));
        assert!(lib.list_docs_not_indexed().is_empty());
        lib.mark_for_indexing(DocId(1));
        assert_eq!(lib.list_docs_not_indexed(), vec![DocId(1)]);
    }
}
