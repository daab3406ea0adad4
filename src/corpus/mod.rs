//! The corpus: the resolution session.
//!
//! A [`Corpus`] owns every loaded document and folder, the load registry,
//! the global symbol table, and all resolution caches. Cross-document
//! relations are kept as [`DocId`]/[`ObjectId`] handles into the corpus, so
//! cyclic import graphs need no shared ownership.
//!
//! ## Flow
//!
//! ```text
//! fetch_document → load + imports (loading.rs)
//!   → index_documents: priorities, integrity, declare, references, arguments
//!   → resolve_through (pipeline.rs): traits → attributes → entity references
//!   → calculate_entity_graph (relationships.rs)
//! ```

mod arguments;
mod cache_key;
mod declare;
mod indexing;
mod library;
mod loading;
mod pipeline;
mod references;
mod relationships;
mod resolved;
mod resolved_entity;
mod symbols;

pub use arguments::ParameterCollection;
pub use cache_key::ResolvedKind;
pub use library::DocumentLibrary;
pub use pipeline::ValidationStep;
pub use relationships::E2ERelationship;
pub use resolved::{
    ParameterValueSet, ResolvedAttribute, ResolvedAttributeSet, ResolvedEntityReference,
    ResolvedEntityReferenceSet, ResolvedTrait, ResolvedTraitSet,
};
pub use symbols::{DocsResult, SymbolTable};

use std::cell::RefCell;
use std::time::SystemTime;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::base::path::{last_segment, split_document_path};
use crate::base::{DocId, ObjectId};
use crate::diagnostics::{EventCallback, Reporter, StatusEvent, StatusLevel, codes};
use crate::error::ResolveError;
use crate::model::{CdmObject, Document, Folder, ResolveOptions, SymbolSet};
use crate::storage::{StorageAdapter, StorageManager};
use resolved::ResolutionCache;

/// Component tag attached to every event the corpus raises.
pub(crate) const COMPONENT: &str = "Corpus";

/// A resolution session over a set of folders and documents.
pub struct Corpus {
    pub storage: StorageManager,
    reporter: Reporter,
    pub(crate) documents: IndexMap<DocId, Document>,
    /// Keyed by `namespace:/folder/`.
    pub(crate) folders: IndexMap<String, Folder>,
    pub(crate) library: DocumentLibrary,
    pub(crate) symbols: SymbolTable,
    /// Symbols each definition's cached results depend on.
    pub(crate) definition_reference_symbols: RefCell<FxHashMap<(ObjectId, ResolvedKind), SymbolSet>>,
    pub(crate) cache: ResolutionCache,
    pub(crate) outgoing_relationships: IndexMap<ObjectId, Vec<E2ERelationship>>,
    pub(crate) incoming_relationships: IndexMap<ObjectId, Vec<E2ERelationship>>,
    /// Entity path to the path of its resolved counterpart.
    pub res_ent_map: IndexMap<String, String>,
    next_doc_id: u32,
    pub(crate) is_currently_resolving: bool,
}

impl Default for Corpus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Corpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Corpus")
            .field("storage", &self.storage)
            .field("documents", &self.documents.len())
            .field("folders", &self.folders.len())
            .field("symbols", &self.symbols.len())
            .finish()
    }
}

impl Corpus {
    pub fn new() -> Self {
        Self {
            storage: StorageManager::new(),
            reporter: Reporter::new(),
            documents: IndexMap::new(),
            folders: IndexMap::new(),
            library: DocumentLibrary::new(),
            symbols: SymbolTable::new(),
            definition_reference_symbols: RefCell::new(FxHashMap::default()),
            cache: ResolutionCache::default(),
            outgoing_relationships: IndexMap::new(),
            incoming_relationships: IndexMap::new(),
            res_ent_map: IndexMap::new(),
            next_doc_id: 1,
            is_currently_resolving: false,
        }
    }

    /// Mount a storage adapter under a namespace.
    pub fn with_adapter(mut self, namespace: &str, adapter: impl StorageAdapter + 'static) -> Self {
        self.storage.mount(namespace, Box::new(adapter));
        self
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn set_event_callback(&mut self, callback: EventCallback, report_at_level: StatusLevel) {
        self.reporter.set_event_callback(callback, report_at_level);
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn document(&self, id: DocId) -> Option<&Document> {
        self.documents.get(&id)
    }

    #[cfg(test)]
    pub(crate) fn document_mut(&mut self, id: DocId) -> Option<&mut Document> {
        self.documents.get_mut(&id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn object(&self, id: ObjectId) -> Option<&CdmObject> {
        self.documents.get(&id.doc)?.object(id.local)
    }

    /// The declared name of an object, or the named reference of a reference.
    pub fn object_name(&self, id: ObjectId) -> Option<&str> {
        self.object(id)?.name()
    }

    pub fn object_corpus_path(&self, id: ObjectId) -> Option<String> {
        self.documents.get(&id.doc)?.object_corpus_path(id.local)
    }

    pub fn folder(&self, key: &str) -> Option<&Folder> {
        self.folders.get(key)
    }

    /// Look up a loaded document by absolute path.
    pub fn document_by_path(&self, path: &str) -> Option<DocId> {
        let abs = self.storage.create_absolute_corpus_path(path, None);
        self.library.fetch(&abs)
    }

    /// Look up a declared object in a loaded document without loading
    /// anything.
    pub fn declared_object(&self, doc: DocId, path: &str) -> Option<ObjectId> {
        let d = self.documents.get(&doc)?;
        d.declaration(path).map(|local| ObjectId::new(doc, local))
    }

    // ------------------------------------------------------------------
    // Documents and folders
    // ------------------------------------------------------------------

    fn ensure_folder(&mut self, namespace: &str, folder_path: &str) -> String {
        let mut parent: Option<String> = None;
        let mut current = String::from("/");
        let segments: Vec<&str> = folder_path.split('/').filter(|s| !s.is_empty()).collect();
        for depth in 0..=segments.len() {
            if depth > 0 {
                current.push_str(segments[depth - 1]);
                current.push('/');
            }
            let key = format!("{namespace}:{current}");
            if !self.folders.contains_key(&key) {
                self.folders.insert(key.clone(), Folder::new(namespace, current.as_str()));
                if let Some(parent) = parent.as_ref().and_then(|p| self.folders.get_mut(p)) {
                    parent.child_folders.push(current.as_str().into());
                }
            }
            parent = Some(key);
        }
        parent.unwrap_or_else(|| format!("{namespace}:/"))
    }

    /// Give a document an id, put it in its folder and register its path.
    pub(crate) fn attach_document(&mut self, namespace: &str, folder_path: &str, mut doc: Document) -> DocId {
        let id = DocId::new(self.next_doc_id);
        self.next_doc_id += 1;

        let folder_path = normalize_folder_path(folder_path);
        doc.id = id;
        doc.namespace = namespace.into();
        doc.folder_path = folder_path.as_str().into();

        let folder_key = self.ensure_folder(namespace, &folder_path);
        if let Some(folder) = self.folders.get_mut(&folder_key) {
            folder.documents.insert(doc.name.to_lowercase().into(), id);
        }
        self.library.add_document_path(&doc.at_corpus_path(), id);
        self.reporter
            .debug(COMPONENT, format!("added document '{}'", doc.name), doc.at_corpus_path());
        self.documents.insert(id, doc);
        id
    }

    /// Add an in-memory document to a folder such as `local:/sub/`. The
    /// document is indexed the next time it is fetched or validated.
    pub fn add_document(&mut self, folder: &str, doc: Document) -> DocId {
        let (namespace, folder_path) = self.storage.split_namespace_path(folder);
        let namespace = namespace.unwrap_or_else(|| self.storage.default_namespace()).to_string();
        let folder_path = folder_path.to_string();
        if let Some(existing) = self.document_by_path(&format!("{namespace}:{}{}", normalize_folder_path(&folder_path), doc.name)) {
            self.remove_document(existing);
        }
        self.attach_document(&namespace, &folder_path, doc)
    }

    /// Drop a document: unregister what it declared, unbind imports that
    /// point at it, and forget its path.
    pub fn remove_document(&mut self, id: DocId) -> bool {
        if !self.documents.contains_key(&id) {
            return false;
        }
        self.remove_object_definitions(id);

        let Some(doc) = self.documents.shift_remove(&id) else {
            return false;
        };
        let path = doc.at_corpus_path();
        self.library.remove_document_path(&path, id);
        let folder_key = format!("{}:{}", doc.namespace, doc.folder_path);
        if let Some(folder) = self.folders.get_mut(&folder_key) {
            folder.documents.shift_remove(doc.name.to_lowercase().as_str());
        }
        for other in self.documents.values_mut() {
            for import in other.imports.iter_mut().filter(|i| i.doc == Some(id)) {
                import.doc = None;
            }
        }
        self.cache.clear_results();
        self.reporter.debug(COMPONENT, "removed document", path);
        true
    }

    pub(crate) fn mark_document_for_indexing(&mut self, id: DocId) {
        if let Some(doc) = self.documents.get_mut(&id) {
            doc.currently_indexing = true;
            self.library.mark_for_indexing(id);
        }
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    /// Load (if needed) and index the document at `path`.
    pub async fn fetch_document(&mut self, path: &str) -> Option<DocId> {
        self.fetch_document_with(path, false).await
    }

    pub async fn fetch_document_with(&mut self, path: &str, shallow_validation: bool) -> Option<DocId> {
        let abs = self.storage.create_absolute_corpus_path(path, None);
        let (doc_path, _) = split_document_path(&abs);
        let id = match self.library.fetch(doc_path) {
            Some(id) => id,
            None => self.load_document(doc_path).await?,
        };
        let opt = ResolveOptions::new(Some(id)).with_shallow_validation(shallow_validation);
        if !self.index_if_needed(id, &opt).await {
            return None;
        }
        Some(id)
    }

    /// Fetch a declared object by absolute path, e.g.
    /// `local:/Customer.cdm.json/Customer`.
    pub async fn fetch_object(&mut self, path: &str) -> Option<ObjectId> {
        self.fetch_object_with(path, false).await
    }

    pub async fn fetch_object_with(&mut self, path: &str, shallow_validation: bool) -> Option<ObjectId> {
        let abs = self.storage.create_absolute_corpus_path(path, None);
        self.reporter.debug(COMPONENT, format!("request object: {abs}"), abs.as_str());
        let doc = self.fetch_document_with(&abs, shallow_validation).await?;
        let (_, object_path) = split_document_path(&abs);
        let object_path = object_path?;

        let found = self.declared_object(doc, object_path);
        if found.is_none() {
            let at = self.documents.get(&doc).map(Document::at_corpus_path).unwrap_or_default();
            self.reporter.report(
                StatusEvent::new(
                    StatusLevel::Error,
                    COMPONENT,
                    format!("Could not find symbol '{object_path}' in document [{at}]"),
                    abs.as_str(),
                )
                .with_code(codes::OBJECT_NOT_FOUND),
            );
        }
        found
    }

    // ------------------------------------------------------------------
    // Modification times
    // ------------------------------------------------------------------

    /// When the document holding the object at `path` last changed. The
    /// document is loaded if needed.
    pub async fn compute_last_modified_time(&mut self, path: &str) -> Option<SystemTime> {
        let doc = self.fetch_document(path).await?;
        let at = self.documents.get(&doc)?.at_corpus_path();
        self.adapter_last_modified_time(&at).await
    }

    /// When the document `object` lives in last changed.
    pub async fn last_modified_time_from_object(&self, object: ObjectId) -> Option<SystemTime> {
        let at = self.documents.get(&object.doc)?.at_corpus_path();
        self.adapter_last_modified_time(&at).await
    }

    /// When a partition file last changed, without reading the file.
    pub async fn last_modified_time_from_partition_path(&self, path: &str) -> Option<SystemTime> {
        let abs = self.storage.create_absolute_corpus_path(path, None);
        self.adapter_last_modified_time(&abs).await
    }

    async fn adapter_last_modified_time(&self, path: &str) -> Option<SystemTime> {
        let (namespace, rest) = self.storage.split_namespace_path(path);
        let namespace = namespace.unwrap_or_else(|| self.storage.default_namespace());
        let Some(adapter) = self.storage.fetch_adapter(namespace) else {
            let err = ResolveError::AdapterNotFound {
                namespace: namespace.into(),
            };
            self.reporter.report_error(COMPONENT, &err, path);
            return None;
        };
        adapter.compute_last_modified_time(rest).await
    }
}

/// `"a/b"` → `"/a/b/"`, `""` → `"/"`.
fn normalize_folder_path(folder_path: &str) -> String {
    let trimmed = folder_path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

/// Folder part of an in-namespace document path.
pub(crate) fn folder_of(path: &str) -> &str {
    let name = last_segment(path);
    &path[..path.len() - name.len()]
}
