//! Resolution options and directive sets.

use std::collections::BTreeSet;

use indexmap::IndexSet;
use smol_str::SmolStr;

use crate::base::DocId;

/// Symbols a definition's resolution touched.
pub type SymbolSet = IndexSet<SmolStr>;

/// A set of attribute-resolution directives (e.g. `referenceOnly`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DirectiveSet {
    set: BTreeSet<SmolStr>,
}

impl DirectiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The relational default used by the validation pipeline.
    pub fn relational() -> Self {
        Self::from_iter(["referenceOnly", "normalized"])
    }

    pub fn add(&mut self, directive: impl Into<SmolStr>) {
        self.set.insert(directive.into());
    }

    pub fn has(&self, directive: &str) -> bool {
        self.set.contains(directive)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Sorted, space-separated directive names; part of every cache key.
    pub fn tag(&self) -> String {
        self.set.iter().map(SmolStr::as_str).collect::<Vec<_>>().join(" ")
    }
}

impl<S: Into<SmolStr>> FromIterator<S> for DirectiveSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            set: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Settings threaded through a resolution call.
#[derive(Clone, Debug, Default)]
pub struct ResolveOptions {
    /// The viewpoint document whose imports decide symbol priority.
    pub wrt_doc: Option<DocId>,
    pub directives: DirectiveSet,
    /// Downgrade unresolved-reference errors to warnings.
    pub shallow_validation: bool,
    /// Collects every symbol resolved while this is `Some`.
    pub symbol_ref_set: Option<SymbolSet>,
    /// Set when the last lookup was satisfied through a moniker.
    pub from_moniker: Option<SmolStr>,
    pub relationship_depth: Option<u32>,
}

impl ResolveOptions {
    pub fn new(wrt_doc: Option<DocId>) -> Self {
        Self {
            wrt_doc,
            ..Default::default()
        }
    }

    pub fn with_wrt_doc(mut self, doc: DocId) -> Self {
        self.wrt_doc = Some(doc);
        self
    }

    pub fn with_directives(mut self, directives: DirectiveSet) -> Self {
        self.directives = directives;
        self
    }

    pub fn with_shallow_validation(mut self, shallow: bool) -> Self {
        self.shallow_validation = shallow;
        self
    }

    pub fn with_relationship_depth(mut self, depth: u32) -> Self {
        self.relationship_depth = Some(depth);
        self
    }

    /// Copy with the same settings but no collected symbols.
    pub fn fork(&self) -> Self {
        Self {
            symbol_ref_set: None,
            from_moniker: None,
            ..self.clone()
        }
    }

    pub(crate) fn note_symbol(&mut self, symbol: &str) {
        self.symbol_ref_set
            .get_or_insert_with(SymbolSet::default)
            .insert(SmolStr::from(symbol));
    }
}
