//! In-memory storage adapter.

use std::time::SystemTime;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::StorageAdapter;
use crate::model::Document;

/// Holds prebuilt documents keyed by path and hands out copies on read.
///
/// Every read is counted so callers can check a path was loaded once.
/// Inserting a document stamps its modification time.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    documents: RwLock<FxHashMap<String, Document>>,
    reads: RwLock<FxHashMap<String, usize>>,
    modified: RwLock<FxHashMap<String, SystemTime>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, path: &str, doc: Document) -> Self {
        self.insert(path, doc);
        self
    }

    /// Store a document at `path` (e.g. `/folder/doc.cdm.json`).
    pub fn insert(&self, path: &str, doc: Document) {
        let key = path.to_lowercase();
        self.modified.write().insert(key.clone(), SystemTime::now());
        self.documents.write().insert(key, doc);
    }

    pub fn remove(&self, path: &str) -> Option<Document> {
        let key = path.to_lowercase();
        self.modified.write().remove(&key);
        self.documents.write().remove(&key)
    }

    /// Override the modification time recorded for `path`.
    pub fn set_last_modified_time(&self, path: &str, time: SystemTime) {
        self.modified.write().insert(path.to_lowercase(), time);
    }

    /// How many times `path` has been requested.
    pub fn read_count(&self, path: &str) -> usize {
        self.reads.read().get(&path.to_lowercase()).copied().unwrap_or(0)
    }

    fn read(&self, path: &str) -> Option<Document> {
        let key = path.to_lowercase();
        *self.reads.write().entry(key.clone()).or_default() += 1;
        self.documents.read().get(&key).cloned()
    }
}

impl StorageAdapter for MemoryAdapter {
    fn read_document<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Option<Document>> {
        async move { self.read(path) }.boxed_local()
    }

    fn compute_last_modified_time<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Option<SystemTime>> {
        async move { self.modified.read().get(&path.to_lowercase()).copied() }.boxed_local()
    }
}

impl<T: StorageAdapter + ?Sized> StorageAdapter for std::sync::Arc<T> {
    fn read_document<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Option<Document>> {
        (**self).read_document(path)
    }

    fn compute_last_modified_time<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Option<SystemTime>> {
        (**self).compute_last_modified_time(path)
    }
}
