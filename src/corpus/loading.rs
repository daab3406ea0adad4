//! Loading documents and their import closures.
//!
//! Missing imports are loaded in rounds: every path discovered so far is
//! claimed through the registry and read concurrently, then the imports of
//! whatever arrived are queued for the next round. A path is claimed at
//! most once, so cyclic import graphs terminate.

use futures::FutureExt;
use futures::future::{LocalBoxFuture, join_all};
use rustc_hash::FxHashSet;

use super::{COMPONENT, Corpus, folder_of};
use crate::base::DocId;
use crate::base::path::{last_segment, split_namespace_path};
use crate::error::ResolveError;
use crate::model::{Document, ResolveOptions};

impl Corpus {
    /// Absolute paths of the imports of `doc`, paired with the import index.
    fn import_paths(&self, doc: DocId) -> Vec<(usize, String)> {
        let Some(d) = self.documents.get(&doc) else {
            return Vec::new();
        };
        let relative_to = Some((d.namespace.as_str(), d.folder_path.as_str()));
        d.imports
            .iter()
            .enumerate()
            .map(|(index, import)| {
                (index, self.storage.create_absolute_corpus_path(&import.corpus_path, relative_to))
            })
            .collect()
    }

    /// Queue every import in the closure of `doc` that is neither bound nor
    /// loaded yet.
    pub(crate) fn find_missing_imports(&mut self, doc: DocId) {
        let mut seen = FxHashSet::default();
        let mut stack = vec![doc];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let bound: Vec<Option<DocId>> = self
                .documents
                .get(&current)
                .map(|d| d.imports.iter().map(|i| i.doc).collect())
                .unwrap_or_default();
            for (index, path) in self.import_paths(current) {
                match bound.get(index).copied().flatten().or_else(|| self.library.fetch(&path)) {
                    Some(loaded) => stack.push(loaded),
                    None => {
                        self.library.mark_not_loaded(&path);
                    }
                }
            }
        }
    }

    /// Ask the adapter mounted for the path's namespace for a document.
    fn read_document<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Option<Document>> {
        let (namespace, rest) = split_namespace_path(path);
        let namespace = namespace.unwrap_or_else(|| self.storage.default_namespace());
        match self.storage.fetch_adapter(namespace) {
            Some(adapter) => adapter.read_document(rest),
            None => {
                let err = ResolveError::AdapterNotFound {
                    namespace: namespace.into(),
                };
                self.reporter.report_error(COMPONENT, &err, path);
                futures::future::ready(None).boxed_local()
            }
        }
    }

    /// Attach a freshly read document under the path it was read from and
    /// close its registry entry.
    fn attach_loaded(&mut self, path: &str, mut doc: Document) -> DocId {
        let (namespace, rest) = split_namespace_path(path);
        let namespace = namespace.unwrap_or_else(|| self.storage.default_namespace()).to_string();
        let name = last_segment(rest);
        if !doc.name.eq_ignore_ascii_case(name) {
            doc.name = name.into();
        }
        let id = self.attach_document(&namespace, folder_of(rest), doc);
        self.library.complete_load(path, Some(id));
        id
    }

    /// Load queued imports round by round until nothing new is discovered.
    async fn load_pending_imports(&mut self) {
        loop {
            let mut claimed = Vec::new();
            for path in self.library.list_docs_not_loaded() {
                if self.library.begin_load(&path) {
                    claimed.push(path);
                }
            }
            if claimed.is_empty() {
                break;
            }

            let reads = claimed.iter().map(|path| self.read_document(path));
            let results = join_all(reads).await;

            let mut arrived = Vec::new();
            for (path, doc) in claimed.iter().zip(results) {
                match doc {
                    Some(doc) => {
                        let id = self.attach_loaded(path, doc);
                        if let Some(d) = self.documents.get_mut(&id) {
                            d.currently_indexing = true;
                        }
                        let name = self.documents.get(&id).map(|d| d.name.to_string()).unwrap_or_default();
                        self.reporter
                            .info(COMPONENT, format!("resolved import for '{name}'"), path.as_str());
                        arrived.push(id);
                    }
                    None => {
                        self.library.complete_load(path, None);
                        let err = ResolveError::MissingImport {
                            path: path.as_str().into(),
                        };
                        self.reporter.report_error(COMPONENT, &err, path.as_str());
                    }
                }
            }
            for id in arrived {
                self.find_missing_imports(id);
            }
        }
    }

    /// Load a single document requested directly (not as an import).
    pub(crate) async fn load_document(&mut self, doc_path: &str) -> Option<DocId> {
        if let Some(id) = self.library.fetch(doc_path) {
            return Some(id);
        }
        if !self.library.mark_not_loaded(doc_path) || !self.library.begin_load(doc_path) {
            return self.library.fetch(doc_path);
        }
        match self.read_document(doc_path).await {
            Some(doc) => Some(self.attach_loaded(doc_path, doc)),
            None => {
                self.library.complete_load(doc_path, None);
                self.reporter
                    .error(COMPONENT, format!("could not read '{doc_path}'"), doc_path);
                None
            }
        }
    }

    /// Bind every import in the closure of `doc` to its loaded document and
    /// queue imported documents that were never indexed.
    pub(crate) fn set_import_documents(&mut self, doc: DocId) {
        let mut seen = FxHashSet::default();
        let mut stack = vec![doc];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let targets: Vec<(usize, DocId)> = self
                .import_paths(current)
                .into_iter()
                .filter_map(|(index, path)| {
                    let bound = self.documents.get(&current)?.imports.get(index)?.doc;
                    bound.or_else(|| self.library.fetch(&path)).map(|t| (index, t))
                })
                .collect();

            if let Some(d) = self.documents.get_mut(&current) {
                for &(index, target) in &targets {
                    if let Some(import) = d.imports.get_mut(index) {
                        import.doc = Some(target);
                    }
                }
            }
            for (_, target) in targets {
                let needs_queue = self
                    .documents
                    .get(&target)
                    .is_some_and(|t| !t.imports_indexed && !t.currently_indexing);
                if needs_queue {
                    self.mark_document_for_indexing(target);
                }
                stack.push(target);
            }
        }
    }

    /// Load the whole import closure of `doc` and bind it.
    pub async fn resolve_imports(&mut self, doc: DocId) {
        self.find_missing_imports(doc);
        self.load_pending_imports().await;
        self.set_import_documents(doc);
    }

    /// Load imports and index `doc` unless it is already indexed or being
    /// indexed as part of another document's closure.
    pub(crate) async fn index_if_needed(&mut self, doc: DocId, res_opt: &ResolveOptions) -> bool {
        let wanted = self
            .documents
            .get(&doc)
            .is_some_and(|d| d.needs_indexing && !d.currently_indexing);
        if !wanted {
            return true;
        }
        self.resolve_imports(doc).await;
        self.mark_document_for_indexing(doc);
        self.index_documents(res_opt)
    }
}
