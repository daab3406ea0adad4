//! Documents, imports and folders.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::kind::{AttributeContextType, ObjectKind, Slot};
use super::object::{ArgumentValue, CdmObject, Payload};
use crate::base::path::is_manifest_name;
use crate::base::{DocId, LocalId, ObjectId};

// ============================================================================
// IMPORTS
// ============================================================================

/// A reference from one document to another by corpus path.
///
/// The binding to a loaded document is filled in lazily; an import whose
/// target could not be found simply stays unbound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub corpus_path: SmolStr,
    pub moniker: Option<SmolStr>,
    pub(crate) doc: Option<DocId>,
}

impl Import {
    pub fn new(corpus_path: impl Into<SmolStr>, moniker: Option<SmolStr>) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            moniker,
            doc: None,
        }
    }

    /// The document this import is bound to, once resolved.
    pub fn document(&self) -> Option<DocId> {
        self.doc
    }
}

/// Priority entry of one document inside another's import closure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportInfo {
    pub priority: usize,
    /// Entered only because of a monikered import. Such entries are never
    /// inherited by importers of this document.
    pub is_moniker: bool,
}

/// The ranked import closure of a document (itself at rank 0) plus the
/// moniker aliases visible from it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportPriorities {
    pub priority: IndexMap<DocId, ImportInfo>,
    pub monikers: IndexMap<SmolStr, DocId>,
    pub has_circular_import: bool,
}

impl ImportPriorities {
    pub fn priority_of(&self, doc: DocId) -> Option<usize> {
        self.priority.get(&doc).map(|info| info.priority)
    }

    pub fn moniker(&self, moniker: &str) -> Option<DocId> {
        self.monikers.get(moniker).copied()
    }
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// A compilation unit: ordered definitions, imports, and the table of
/// objects it declares.
#[derive(Clone, Debug)]
pub struct Document {
    pub(crate) id: DocId,
    pub name: SmolStr,
    pub(crate) folder_path: SmolStr,
    pub(crate) namespace: SmolStr,
    pub(crate) imports: Vec<Import>,
    objects: Vec<CdmObject>,
    definitions: Vec<LocalId>,
    entities: Vec<LocalId>,
    sub_manifests: Vec<LocalId>,
    pub(crate) internal_declarations: IndexMap<SmolStr, LocalId>,
    pub(crate) import_priorities: Option<ImportPriorities>,
    pub(crate) needs_indexing: bool,
    pub(crate) currently_indexing: bool,
    pub(crate) imports_indexed: bool,
}

impl Document {
    /// Create an empty, unattached document.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            id: DocId::default(),
            name: name.into(),
            folder_path: SmolStr::new_static("/"),
            namespace: SmolStr::default(),
            imports: Vec::new(),
            objects: Vec::new(),
            definitions: Vec::new(),
            entities: Vec::new(),
            sub_manifests: Vec::new(),
            internal_declarations: IndexMap::new(),
            import_priorities: None,
            needs_indexing: true,
            currently_indexing: false,
            imports_indexed: false,
        }
    }

    pub fn with_import(mut self, corpus_path: &str) -> Self {
        self.add_import(corpus_path, None);
        self
    }

    pub fn with_moniker_import(mut self, corpus_path: &str, moniker: &str) -> Self {
        self.add_import(corpus_path, Some(moniker));
        self
    }

    pub fn add_import(&mut self, corpus_path: &str, moniker: Option<&str>) {
        self.imports.push(Import::new(corpus_path, moniker.map(SmolStr::from)));
    }

    // ------------------------------------------------------------------
    // Tree construction
    // ------------------------------------------------------------------

    fn push(&mut self, object: CdmObject) -> LocalId {
        let id = LocalId::new(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    /// Add a top-level definition.
    pub fn add_definition(&mut self, kind: ObjectKind, name: &str) -> LocalId {
        let id = self.push(CdmObject::new(kind, Some(name.into())));
        self.definitions.push(id);
        id
    }

    /// Add a top-level definition without a name.
    pub fn add_unnamed_definition(&mut self, kind: ObjectKind) -> LocalId {
        let id = self.push(CdmObject::new(kind, None));
        self.definitions.push(id);
        id
    }

    /// Add a child object under `parent` in the given slot.
    pub fn add_child(&mut self, parent: LocalId, slot: Slot, kind: ObjectKind, name: Option<&str>) -> LocalId {
        let mut object = CdmObject::new(kind, name.map(SmolStr::from));
        object.parent = Some(parent);
        let id = self.push(object);
        if let Some(p) = self.objects.get_mut(parent.index()) {
            p.children.push((slot, id));
        }
        id
    }

    /// Add a named reference under `parent`.
    pub fn add_reference(&mut self, parent: LocalId, slot: Slot, kind: ObjectKind, named: &str) -> LocalId {
        self.add_child(parent, slot, kind, Some(named))
    }

    /// Add an argument to a trait reference.
    pub fn add_argument(&mut self, trait_ref: LocalId, name: Option<&str>, value: ArgumentValue) -> LocalId {
        let id = self.add_child(trait_ref, Slot::Arguments, ObjectKind::ArgumentDef, name);
        if let Some(object) = self.objects.get_mut(id.index()) {
            object.payload = Payload::Argument {
                value: Some(value),
                resolved_parameter: None,
            };
        }
        id
    }

    /// Add a parameter to a trait definition.
    pub fn add_parameter(
        &mut self,
        trait_def: LocalId,
        name: &str,
        data_type: Option<&str>,
        required: bool,
        default_value: Option<ArgumentValue>,
    ) -> LocalId {
        let id = self.add_child(trait_def, Slot::HasParameters, ObjectKind::ParameterDef, Some(name));
        if let Some(object) = self.objects.get_mut(id.index()) {
            object.payload = Payload::Parameter { required, default_value };
        }
        if let Some(dt) = data_type {
            self.add_reference(id, Slot::DataType, ObjectKind::DataTypeRef, dt);
        }
        id
    }

    /// Add an attribute-context node. Roots hang off an entity's
    /// `attributeContext` slot, everything else off a parent's `contents`.
    pub fn add_attribute_context(
        &mut self,
        parent: LocalId,
        name: &str,
        context_type: AttributeContextType,
    ) -> LocalId {
        let slot = match self.object(parent).map(|p| p.kind) {
            Some(ObjectKind::AttributeContextDef) => Slot::Contents,
            _ => Slot::AttributeContext,
        };
        let id = self.add_child(parent, slot, ObjectKind::AttributeContextDef, Some(name));
        if let Some(object) = self.objects.get_mut(id.index()) {
            object.payload = Payload::AttributeContext { context_type };
        }
        id
    }

    /// Add a manifest entity declaration pointing at an entity path.
    pub fn add_entity_declaration(&mut self, name: &str, entity_path: &str) -> LocalId {
        let mut object = CdmObject::new(ObjectKind::LocalEntityDeclarationDef, Some(name.into()));
        object.payload = Payload::EntityDeclaration {
            entity_path: entity_path.into(),
        };
        let id = self.push(object);
        self.entities.push(id);
        id
    }

    /// Add a sub-manifest declaration.
    pub fn add_sub_manifest(&mut self, name: &str, definition: &str) -> LocalId {
        let mut object = CdmObject::new(ObjectKind::ManifestDeclarationDef, Some(name.into()));
        object.payload = Payload::ManifestDeclaration {
            definition: definition.into(),
        };
        let id = self.push(object);
        self.sub_manifests.push(id);
        id
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> DocId {
        self.id
    }

    pub fn folder_path(&self) -> &str {
        &self.folder_path
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn object(&self, id: LocalId) -> Option<&CdmObject> {
        self.objects.get(id.index())
    }

    pub(crate) fn object_mut(&mut self, id: LocalId) -> Option<&mut CdmObject> {
        self.objects.get_mut(id.index())
    }

    pub fn handle(&self, id: LocalId) -> ObjectId {
        ObjectId::new(self.id, id)
    }

    pub fn definitions(&self) -> &[LocalId] {
        &self.definitions
    }

    pub fn entity_declarations(&self) -> &[LocalId] {
        &self.entities
    }

    pub fn sub_manifests(&self) -> &[LocalId] {
        &self.sub_manifests
    }

    pub fn is_manifest(&self) -> bool {
        is_manifest_name(&self.name)
    }

    /// Look up an object declared in this document by its path.
    pub fn declaration(&self, path: &str) -> Option<LocalId> {
        self.internal_declarations.get(path).copied()
    }

    pub fn declarations(&self) -> impl Iterator<Item = (&str, LocalId)> {
        self.internal_declarations.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn import_priorities(&self) -> Option<&ImportPriorities> {
        self.import_priorities.as_ref()
    }

    pub fn needs_indexing(&self) -> bool {
        self.needs_indexing
    }

    pub fn imports_indexed(&self) -> bool {
        self.imports_indexed
    }

    pub fn currently_indexing(&self) -> bool {
        self.currently_indexing
    }

    /// `namespace:/folder/name`
    pub fn at_corpus_path(&self) -> String {
        format!("{}:{}{}", self.namespace, self.folder_path, self.name)
    }

    /// Path of an object in the document tree, as used for declarations.
    pub fn path_of(&self, id: LocalId) -> Option<String> {
        let object = self.object(id)?;
        match object.parent {
            None => Some(object.path_segment().to_string()),
            Some(parent) => {
                let parent_obj = self.object(parent)?;
                let slot = parent_obj
                    .children
                    .iter()
                    .find(|(_, child)| *child == id)
                    .map(|(slot, _)| *slot)?;
                let parent_path = self.path_of(parent)?;
                Some(format!("{}/{}/{}", parent_path, slot.segment(), object.path_segment()))
            }
        }
    }

    /// Absolute corpus path of an object in this document.
    pub fn object_corpus_path(&self, id: LocalId) -> Option<String> {
        let path = self.path_of(id)?;
        Some(format!("{}/{}", self.at_corpus_path(), path))
    }

    // ------------------------------------------------------------------
    // Resolution state updates
    // ------------------------------------------------------------------

    pub(crate) fn set_argument(&mut self, id: LocalId, value: Option<ArgumentValue>, parameter: Option<ObjectId>) {
        if let Some(object) = self.object_mut(id) {
            if let Payload::Argument { value: v, resolved_parameter } = &mut object.payload {
                *v = value;
                *resolved_parameter = parameter;
            }
        }
    }

    pub(crate) fn mark_arguments_resolved(&mut self, id: LocalId) {
        if let Some(object) = self.object_mut(id) {
            if let Payload::TraitReference { arguments_resolved } = &mut object.payload {
                *arguments_resolved = true;
            }
        }
    }

    pub(crate) fn clear_caches(&mut self) {
        self.internal_declarations.clear();
        self.import_priorities = None;
    }
}

// ============================================================================
// FOLDER
// ============================================================================

/// A namespace-tree container of documents and sub-folders.
#[derive(Clone, Debug, Default)]
pub struct Folder {
    pub namespace: SmolStr,
    /// Always starts and ends with `/`.
    pub folder_path: SmolStr,
    /// Lowercased document name to document.
    pub(crate) documents: IndexMap<SmolStr, DocId>,
    pub(crate) child_folders: Vec<SmolStr>,
}

impl Folder {
    pub fn new(namespace: impl Into<SmolStr>, folder_path: impl Into<SmolStr>) -> Self {
        Self {
            namespace: namespace.into(),
            folder_path: folder_path.into(),
            documents: IndexMap::new(),
            child_folders: Vec::new(),
        }
    }

    /// `namespace:/folder/`
    pub fn key(&self) -> String {
        format!("{}:{}", self.namespace, self.folder_path)
    }

    pub fn document(&self, name: &str) -> Option<DocId> {
        self.documents.get(name.to_lowercase().as_str()).copied()
    }

    pub fn documents(&self) -> impl Iterator<Item = DocId> + '_ {
        self.documents.values().copied()
    }

    pub fn child_folders(&self) -> &[SmolStr] {
        &self.child_folders
    }
}
