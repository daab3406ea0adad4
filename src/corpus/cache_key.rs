//! Cache keys for resolved results.
//!
//! A key names what was computed (`kind`), for which definition, under which
//! directives, and (only when some symbol the definition depends on is
//! declared by more than one document) which of those documents won from
//! the current viewpoint. Two viewpoints that pick the same winners share
//! cache entries.

use std::fmt;

use super::Corpus;
use crate::base::ObjectId;
use crate::model::{ResolveOptions, SymbolSet};

/// What a cached result holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolvedKind {
    Traits,
    Attributes,
    EntityReferences,
}

impl ResolvedKind {
    pub const ALL: [ResolvedKind; 3] = [
        ResolvedKind::Traits,
        ResolvedKind::Attributes,
        ResolvedKind::EntityReferences,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResolvedKind::Traits => "traits",
            ResolvedKind::Attributes => "attributes",
            ResolvedKind::EntityReferences => "entityReferences",
        }
    }
}

impl fmt::Display for ResolvedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Corpus {
    /// Remember the symbols `definition`'s `kind` result was computed from.
    pub(crate) fn register_definition_reference_symbols(
        &self,
        definition: ObjectId,
        kind: ResolvedKind,
        symbols: SymbolSet,
    ) {
        self.definition_reference_symbols
            .borrow_mut()
            .insert((definition, kind), symbols);
    }

    pub(crate) fn unregister_definition_reference_symbols(&self, definition: ObjectId, kind: ResolvedKind) {
        self.definition_reference_symbols.borrow_mut().remove(&(definition, kind));
    }

    pub fn fetch_definition_reference_symbols(&self, definition: ObjectId, kind: ResolvedKind) -> Option<SymbolSet> {
        self.definition_reference_symbols
            .borrow()
            .get(&(definition, kind))
            .cloned()
    }

    /// Build the cache key for `definition`'s `kind` result.
    ///
    /// Returns `None` when the definition has no name and no recorded
    /// dependencies, in which case the result must not be cached.
    pub fn create_definition_cache_tag(
        &self,
        res_opt: &ResolveOptions,
        definition: ObjectId,
        kind: ResolvedKind,
        extra_tags: &str,
        use_name_not_id: bool,
    ) -> Option<String> {
        let name = self.object_name(definition).map(str::to_string);
        let this_id = match (&name, use_name_not_id) {
            (Some(name), true) => name.clone(),
            _ => definition.to_string(),
        };
        let mut suffix = format!("-{kind}-{this_id}-({})", res_opt.directives.tag());
        if !extra_tags.is_empty() {
            suffix.push('-');
            suffix.push_str(extra_tags);
        }

        let mut scratch = res_opt.fork();
        let definition_object = self
            .fetch_object_definition(definition, &mut scratch)
            .unwrap_or(definition);
        let mut symbols = self.fetch_definition_reference_symbols(definition_object, kind);
        if symbols.is_none() {
            if let Some(name) = &name {
                // Every definition depends at least on itself.
                let itself: SymbolSet = [name.as_str().into()].into_iter().collect();
                self.register_definition_reference_symbols(definition, kind, itself.clone());
                symbols = Some(itself);
            }
        }
        let symbols = symbols.filter(|s| !s.is_empty())?;

        let wrt_doc = res_opt.wrt_doc.unwrap_or(definition.doc);
        let priorities = self
            .documents
            .get(&wrt_doc)
            .and_then(|d| d.import_priorities.as_ref());

        let mut found_ids: Vec<u32> = Vec::new();
        if let Some(priorities) = priorities {
            for symbol in &symbols {
                let Some(docs) = self.docs_for_symbol(&mut scratch, wrt_doc, Some(definition.doc), symbol) else {
                    continue;
                };
                let Some(list) = docs.doc_list.filter(|l| l.len() > 1) else {
                    continue;
                };
                if let Some(best) = super::symbols::fetch_priority_doc(&list, &priorities.priority) {
                    found_ids.push(best.index());
                }
            }
        }
        found_ids.sort_unstable();
        found_ids.dedup();

        let prefix = found_ids.iter().map(u32::to_string).collect::<Vec<_>>().join("-");
        Some(format!("{prefix}{suffix}"))
    }
}

/// Key of the shared empty trait set for a viewpoint and directive set.
pub(crate) fn empty_trait_set_key(res_opt: &ResolveOptions) -> String {
    let wrt = res_opt.wrt_doc.map(|d| d.to_string()).unwrap_or_default();
    format!("{wrt}-{}", res_opt.directives.tag())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::DocId;
    use crate::model::{DirectiveSet, Document, ObjectKind};

    #[test]
    fn test_unambiguous_key_has_no_doc_prefix() {
        let mut corpus = Corpus::new();
        let mut doc = Document::new("A.cdm.json");
        let a = doc.add_definition(ObjectKind::EntityDef, "A");
        let id = corpus.add_document("local:/", doc);
        corpus.declare_object_definitions(id);

        let opt = ResolveOptions::new(Some(id)).with_directives(DirectiveSet::relational());
        let key = corpus.create_definition_cache_tag(&opt, ObjectId::new(id, a), ResolvedKind::Traits, "", false);
        assert_eq!(key.as_deref(), Some("-traits-1_0-(normalized referenceOnly)"));

        let by_name = corpus.create_definition_cache_tag(&opt, ObjectId::new(id, a), ResolvedKind::Attributes, "x", true);
        assert_eq!(by_name.as_deref(), Some("-attributes-A-(normalized referenceOnly)-x"));
    }

    #[test]
    fn test_unnamed_definition_is_not_cached() {
        let mut corpus = Corpus::new();
        let mut doc = Document::new("A.cdm.json");
        let anon = doc.add_unnamed_definition(ObjectKind::EntityDef);
        let id = corpus.add_document("local:/", doc);

        let opt = ResolveOptions::new(Some(id));
        assert!(corpus.create_definition_cache_tag(&opt, ObjectId::new(id, anon), ResolvedKind::Traits, "", false).is_none());
    }

    #[test]
    fn test_empty_trait_set_key() {
        let opt = ResolveOptions::new(Some(DocId(4))).with_directives(DirectiveSet::relational());
        assert_eq!(empty_trait_set_key(&opt), "4-normalized referenceOnly");
    }
}
