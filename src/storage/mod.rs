//! Storage: where documents come from.
//!
//! The corpus never parses or performs I/O itself. It asks a
//! [`StorageAdapter`] mounted under a namespace for a document at a path
//! and treats "nothing" as a permanent failure for the session.

mod memory;

pub use memory::MemoryAdapter;

use std::time::SystemTime;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::base::path::split_namespace_path;
use crate::model::Document;

/// Source of documents for one namespace.
pub trait StorageAdapter {
    /// Load the document at `path` (namespace already stripped). `None`
    /// means the document does not exist or could not be read.
    fn read_document<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Option<Document>>;

    /// When the file at `path` last changed, if the adapter can tell.
    fn compute_last_modified_time<'a>(&'a self, _path: &'a str) -> LocalBoxFuture<'a, Option<SystemTime>> {
        futures::future::ready(None).boxed_local()
    }
}

/// Namespace to adapter mounts plus path normalization.
#[derive(Default)]
pub struct StorageManager {
    adapters: IndexMap<SmolStr, Box<dyn StorageAdapter>>,
    default_namespace: Option<SmolStr>,
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager")
            .field("namespaces", &self.adapters.keys().collect::<Vec<_>>())
            .field("default_namespace", &self.default_namespace)
            .finish()
    }
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount an adapter. The first mounted namespace becomes the default.
    pub fn mount(&mut self, namespace: &str, adapter: Box<dyn StorageAdapter>) {
        if self.default_namespace.is_none() {
            self.default_namespace = Some(namespace.into());
        }
        self.adapters.insert(namespace.into(), adapter);
    }

    pub fn unmount(&mut self, namespace: &str) -> bool {
        self.adapters.shift_remove(namespace).is_some()
    }

    pub fn fetch_adapter(&self, namespace: &str) -> Option<&dyn StorageAdapter> {
        self.adapters.get(namespace).map(|a| a.as_ref())
    }

    pub fn set_default_namespace(&mut self, namespace: &str) {
        self.default_namespace = Some(namespace.into());
    }

    pub fn default_namespace(&self) -> &str {
        self.default_namespace.as_deref().unwrap_or("local")
    }

    pub fn split_namespace_path<'p>(&self, path: &'p str) -> (Option<&'p str>, &'p str) {
        split_namespace_path(path)
    }

    /// Turn a path into `namespace:/absolute/path`.
    ///
    /// Relative paths are taken relative to `relative_to`, given as the
    /// namespace and folder path of the document they appear in.
    pub fn create_absolute_corpus_path(&self, path: &str, relative_to: Option<(&str, &str)>) -> String {
        let (namespace, rest) = split_namespace_path(path);
        let namespace = namespace
            .filter(|ns| !ns.is_empty())
            .or_else(|| relative_to.map(|(ns, _)| ns).filter(|ns| !ns.is_empty()))
            .unwrap_or_else(|| self.default_namespace());

        if rest.starts_with('/') {
            return format!("{namespace}:{rest}");
        }
        let rest = rest.strip_prefix("./").unwrap_or(rest);
        let folder = relative_to.map(|(_, folder)| folder).unwrap_or("/");
        format!("{namespace}:{folder}{rest}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_paths() {
        let mut storage = StorageManager::new();
        storage.mount("local", Box::new(MemoryAdapter::new()));

        assert_eq!(storage.create_absolute_corpus_path("/a/b.cdm.json", None), "local:/a/b.cdm.json");
        assert_eq!(
            storage.create_absolute_corpus_path("b.cdm.json", Some(("local", "/a/"))),
            "local:/a/b.cdm.json"
        );
        assert_eq!(
            storage.create_absolute_corpus_path("./b.cdm.json", Some(("local", "/a/"))),
            "local:/a/b.cdm.json"
        );
        assert_eq!(
            storage.create_absolute_corpus_path("cdm:/foundations.cdm.json", Some(("local", "/a/"))),
            "cdm:/foundations.cdm.json"
        );
    }

    #[test]
    fn test_first_mount_is_default() {
        let mut storage = StorageManager::new();
        storage.mount("cdm", Box::new(MemoryAdapter::new()));
        storage.mount("local", Box::new(MemoryAdapter::new()));
        assert_eq!(storage.default_namespace(), "cdm");

        storage.set_default_namespace("local");
        assert_eq!(storage.default_namespace(), "local");
        assert!(storage.fetch_adapter("cdm").is_some());
        assert!(storage.fetch_adapter("nope").is_none());
    }
}
