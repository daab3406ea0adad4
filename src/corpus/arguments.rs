//! Trait parameters and the trait-argument pass.
//!
//! Arguments on a trait reference bind to the referenced trait's parameters
//! by name, or by position when unnamed. Parameters are inherited along
//! `extendsTrait`, base parameters first.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::{COMPONENT, Corpus};
use crate::base::{DocId, LocalId, ObjectId};
use crate::diagnostics::StatusEvent;
use crate::error::{ResolveError, Result};
use crate::model::{ArgumentValue, Document, ObjectKind, ResolveOptions, Slot, Visitor};

// ============================================================================
// PARAMETER COLLECTION
// ============================================================================

/// The ordered, named parameters of a trait including inherited ones.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterCollection {
    parameters: IndexMap<SmolStr, ObjectId>,
}

impl ParameterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. A redeclared name takes over the inherited
    /// parameter's position.
    pub fn add(&mut self, name: &str, parameter: ObjectId) {
        self.parameters.insert(SmolStr::from(name), parameter);
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> Option<ObjectId> {
        self.parameters.get_index(ordinal).map(|(_, p)| *p)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.parameters.get_index_of(name)
    }

    pub fn index_of_parameter(&self, parameter: ObjectId) -> Option<usize> {
        self.parameters.values().position(|p| *p == parameter)
    }

    pub fn name_at(&self, ordinal: usize) -> Option<&str> {
        self.parameters.get_index(ordinal).map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ObjectId)> {
        self.parameters.iter().map(|(n, p)| (n.as_str(), *p))
    }

    /// Match an argument to a parameter: by name when the argument is
    /// named, else by position.
    pub fn resolve_parameter(&self, ordinal: usize, name: Option<&str>) -> Result<ObjectId> {
        if let Some(name) = name {
            return self
                .parameters
                .get(name)
                .copied()
                .ok_or_else(|| ResolveError::UnknownParameter { name: name.into() });
        }
        self.get(ordinal).ok_or(ResolveError::TooManyArguments)
    }
}

impl Corpus {
    /// Every parameter of `trait_def`, base trait parameters first.
    pub fn fetch_all_parameters(&self, trait_def: ObjectId, res_opt: &mut ResolveOptions) -> ParameterCollection {
        let mut seen = FxHashSet::default();
        let mut collection = ParameterCollection::new();
        self.collect_parameters(trait_def, res_opt, &mut seen, &mut collection);
        collection
    }

    fn collect_parameters(
        &self,
        trait_def: ObjectId,
        res_opt: &mut ResolveOptions,
        seen: &mut FxHashSet<ObjectId>,
        into: &mut ParameterCollection,
    ) {
        if !seen.insert(trait_def) {
            return;
        }
        let Some(object) = self.object(trait_def) else {
            return;
        };
        if object.kind != ObjectKind::TraitDef {
            return;
        }
        if let Some(base_ref) = object.child(Slot::ExtendsTrait) {
            let base_ref = ObjectId::new(trait_def.doc, base_ref);
            if let Some(base) = self.fetch_object_definition(base_ref, res_opt) {
                self.collect_parameters(base, res_opt, seen, into);
            }
        }
        for param in object.children_in(Slot::HasParameters) {
            let param = ObjectId::new(trait_def.doc, param);
            if let Some(name) = self.object_name(param) {
                into.add(name, param);
            }
        }
    }

    /// Bind every argument of every trait reference in `doc` to its
    /// parameter and type-check the value.
    pub(crate) fn resolve_trait_arguments(&mut self, doc_id: DocId, res_opt: &ResolveOptions) {
        let Some(doc) = self.documents.get(&doc_id) else {
            return;
        };
        let mut pass = TraitArgumentPass {
            corpus: self,
            res_opt: res_opt.fork(),
            scopes: Vec::new(),
            bindings: Vec::new(),
            resolved_refs: Vec::new(),
        };
        doc.visit(&mut pass);
        let TraitArgumentPass {
            bindings, resolved_refs, ..
        } = pass;

        let Some(doc) = self.documents.get_mut(&doc_id) else {
            return;
        };
        for binding in bindings {
            doc.set_argument(binding.argument, binding.value, Some(binding.parameter));
        }
        for trait_ref in resolved_refs {
            doc.mark_arguments_resolved(trait_ref);
        }
    }
}

// ============================================================================
// PASS
// ============================================================================

struct TraitScope {
    trait_def: Option<ObjectId>,
    parameters: Option<ParameterCollection>,
    current_parameter: usize,
}

struct ArgumentBinding {
    argument: LocalId,
    value: Option<ArgumentValue>,
    parameter: ObjectId,
}

struct TraitArgumentPass<'a> {
    corpus: &'a Corpus,
    res_opt: ResolveOptions,
    scopes: Vec<TraitScope>,
    bindings: Vec<ArgumentBinding>,
    resolved_refs: Vec<LocalId>,
}

impl Visitor for TraitArgumentPass<'_> {
    fn visit_pre(&mut self, doc: &Document, id: LocalId, path: &str) -> bool {
        let Some(object) = doc.object(id) else {
            return false;
        };
        match object.kind {
            ObjectKind::TraitRef => {
                let mut opt = self.res_opt.fork();
                opt.wrt_doc = Some(doc.id());
                let trait_def = self.corpus.fetch_object_definition(doc.handle(id), &mut opt);
                self.scopes.push(TraitScope {
                    trait_def,
                    parameters: None,
                    current_parameter: 0,
                });
            }
            ObjectKind::ArgumentDef => {
                let Some(scope) = self.scopes.last_mut() else {
                    return false;
                };
                let Some(trait_def) = scope.trait_def else {
                    return false;
                };
                let mut opt = self.res_opt.fork();
                opt.wrt_doc = Some(doc.id());
                let parameters = scope
                    .parameters
                    .get_or_insert_with(|| self.corpus.fetch_all_parameters(trait_def, &mut opt));

                match parameters.resolve_parameter(scope.current_parameter, object.name()) {
                    Ok(parameter) => {
                        let value = object.argument_value().cloned();
                        let value = self.corpus.const_type_check(&mut opt, doc.id(), parameter, value);
                        self.bindings.push(ArgumentBinding {
                            argument: id,
                            value,
                            parameter,
                        });
                    }
                    Err(err) => {
                        let trait_name = self.corpus.object_name(trait_def).unwrap_or_default();
                        self.corpus.reporter().report(
                            StatusEvent::new(
                                err.level(),
                                COMPONENT,
                                format!("failed to resolve parameter on trait '{trait_name}': {err}"),
                                format!("{}{}", doc.folder_path(), path),
                            )
                            .with_code(err.code()),
                        );
                    }
                }
                scope.current_parameter += 1;
            }
            _ => {}
        }
        false
    }

    fn visit_post(&mut self, doc: &Document, id: LocalId, _path: &str) -> bool {
        if doc.object(id).is_some_and(|o| o.kind == ObjectKind::TraitRef) {
            self.resolved_refs.push(id);
            self.scopes.pop();
        }
        false
    }
}
