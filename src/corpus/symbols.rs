//! Symbol table and priority-based symbol resolution.
//!
//! A symbol may be declared by many documents. Which declaration a
//! reference means depends on the viewpoint document: the declaring
//! document with the lowest rank in the viewpoint's import priorities wins.
//! A `moniker/` prefix instead selects one specific import by alias.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::{COMPONENT, Corpus};
use crate::base::{DocId, ObjectId};
use crate::error::ResolveError;
use crate::model::{ImportInfo, ObjectKind, ResolveOptions};

// ============================================================================
// SYMBOL TABLE
// ============================================================================

/// Global map from symbol to the documents declaring it, in declaration
/// order.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    definitions: FxHashMap<SmolStr, Vec<DocId>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, symbol: &str, doc: DocId) {
        self.definitions.entry(SmolStr::from(symbol)).or_default().push(doc);
    }

    pub fn unregister(&mut self, symbol: &str, doc: DocId) {
        if let Some(docs) = self.definitions.get_mut(symbol) {
            if let Some(at) = docs.iter().position(|d| *d == doc) {
                docs.remove(at);
            }
            if docs.is_empty() {
                self.definitions.remove(symbol);
            }
        }
    }

    /// Documents declaring `symbol`; `None` if nobody does.
    pub fn docs(&self, symbol: &str) -> Option<&[DocId]> {
        self.definitions
            .get(symbol)
            .map(Vec::as_slice)
            .filter(|docs| !docs.is_empty())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.docs(symbol).is_some()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Where a symbol might be defined, as seen from a viewpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocsResult {
    /// The symbol with any moniker prefix stripped.
    pub new_symbol: SmolStr,
    /// Set when a moniker picked the document directly.
    pub doc_best: Option<DocId>,
    /// Every document declaring `new_symbol`.
    pub doc_list: Option<Vec<DocId>>,
}

/// The lowest-ranked document of `docs` in `priority`. Documents outside
/// the ranking are ignored; rank 0 ends the search.
pub fn fetch_priority_doc(docs: &[DocId], priority: &IndexMap<DocId, ImportInfo>) -> Option<DocId> {
    let mut best: Option<(DocId, usize)> = None;
    for doc in docs {
        let Some(info) = priority.get(doc) else {
            continue;
        };
        if best.is_none_or(|(_, rank)| info.priority < rank) {
            best = Some((*doc, info.priority));
            if info.priority == 0 {
                break;
            }
        }
    }
    best.map(|(doc, _)| doc)
}

// ============================================================================
// RESOLUTION
// ============================================================================

type Visited = FxHashSet<(DocId, Option<DocId>, SmolStr)>;

impl Corpus {
    /// Find the documents that may define `symbol` when looked at from
    /// `wrt_doc`, with `from_doc` being the document the reference is
    /// written in.
    ///
    /// Returns `None` only for absolute references, which are unsupported.
    pub fn docs_for_symbol(
        &self,
        res_opt: &mut ResolveOptions,
        wrt_doc: DocId,
        from_doc: Option<DocId>,
        symbol: &str,
    ) -> Option<DocsResult> {
        let mut visited = Visited::default();
        self.docs_for_symbol_guarded(res_opt, wrt_doc, from_doc, symbol, &mut visited)
    }

    fn docs_for_symbol_guarded(
        &self,
        res_opt: &mut ResolveOptions,
        wrt_doc: DocId,
        from_doc: Option<DocId>,
        symbol: &str,
        visited: &mut Visited,
    ) -> Option<DocsResult> {
        let mut result = DocsResult {
            new_symbol: symbol.into(),
            doc_best: None,
            doc_list: self.symbols.docs(symbol).map(<[DocId]>::to_vec),
        };
        if result.doc_list.is_some() {
            return Some(result);
        }

        // Undeclared as written; maybe it starts with a moniker.
        let Some(pre_end) = symbol.find('/') else {
            return Some(result);
        };
        if pre_end == 0 {
            let err = ResolveError::UnsupportedAbsoluteReference { symbol: symbol.into() };
            self.reporter().report_error(COMPONENT, &err, symbol);
            return None;
        }

        let prefix = &symbol[..pre_end];
        let rest = &symbol[pre_end + 1..];
        result.new_symbol = rest.into();
        result.doc_list = self.symbols.docs(rest).map(<[DocId]>::to_vec);

        let moniker_of = |doc: Option<DocId>| {
            doc.and_then(|d| self.documents.get(&d))
                .and_then(|d| d.import_priorities.as_ref())
                .and_then(|p| p.moniker(prefix))
        };
        let (moniker_doc, using_wrt_doc) = match moniker_of(from_doc) {
            Some(doc) => (Some(doc), false),
            None => (moniker_of(Some(wrt_doc)), true),
        };

        let Some(moniker_doc) = moniker_doc else {
            // Unknown moniker: fail gracefully.
            result.new_symbol = symbol.into();
            result.doc_list = None;
            return Some(result);
        };

        // The recursion condition is asymmetric on purpose: a moniker found
        // through the viewpoint always keeps chasing, one found through the
        // origin only does when the remainder is undeclared.
        if rest.contains('/') && (using_wrt_doc || !self.symbols.contains(rest)) {
            if !visited.insert((wrt_doc, Some(moniker_doc), SmolStr::from(rest))) {
                return Some(DocsResult {
                    new_symbol: rest.into(),
                    ..Default::default()
                });
            }
            let current = self.docs_for_symbol_guarded(res_opt, wrt_doc, Some(moniker_doc), rest, visited)?;
            if current.doc_list.is_none() && from_doc == Some(wrt_doc) {
                // Back at the top without a hit: move the viewpoint down.
                if !visited.insert((moniker_doc, Some(moniker_doc), SmolStr::from(rest))) {
                    return Some(current);
                }
                return self.docs_for_symbol_guarded(res_opt, moniker_doc, Some(moniker_doc), rest, visited);
            }
            return Some(current);
        }

        res_opt.from_moniker = Some(prefix.into());
        result.doc_best = Some(moniker_doc);
        Some(result)
    }

    /// Resolve `symbol` to its winning declaration as seen from
    /// `res_opt.wrt_doc`.
    ///
    /// With `expected` other than [`ObjectKind::Error`] the declaration
    /// must have the matching definition kind; a mismatch is reported and
    /// treated as not found.
    pub fn resolve_symbol_reference(
        &self,
        res_opt: &mut ResolveOptions,
        from_doc: Option<DocId>,
        symbol: &str,
        expected: ObjectKind,
        retry: bool,
    ) -> Option<ObjectId> {
        let wrt_doc = res_opt.wrt_doc?;
        let result = self.docs_for_symbol(res_opt, wrt_doc, from_doc, symbol)?;
        let mut doc_best = result.doc_best;
        let symbol = result.new_symbol;

        if let Some(docs) = &result.doc_list {
            res_opt.note_symbol(&symbol);
            // Priorities exist only after indexing.
            let priorities = self.documents.get(&wrt_doc)?.import_priorities.as_ref()?;
            if priorities.priority.is_empty() {
                return None;
            }
            if doc_best.is_none() {
                doc_best = fetch_priority_doc(docs, &priorities.priority);
            }
        }

        let doc_best = doc_best?;
        let mut found = self
            .documents
            .get(&doc_best)
            .and_then(|d| d.declaration(&symbol))
            .map(|local| ObjectId::new(doc_best, local));

        if found.is_none() && retry && doc_best != wrt_doc {
            // Locatable from the winning document but not declared there.
            let saved = res_opt.wrt_doc.replace(doc_best);
            found = self.resolve_symbol_reference(res_opt, Some(doc_best), &symbol, expected, false);
            res_opt.wrt_doc = saved;
        }

        let found = found?;
        if let Some(required) = expected.required_definition() {
            let kind = self.object(found)?.kind;
            if kind != required {
                let err = ResolveError::KindMismatch {
                    symbol: symbol.clone(),
                    expected: required,
                    found: kind,
                };
                self.reporter().report_error(COMPONENT, &err, symbol.as_str());
                return None;
            }
        }
        Some(found)
    }

    /// The definition an object stands for: a reference resolves to its
    /// target, a definition is itself.
    pub fn fetch_object_definition(&self, object: ObjectId, res_opt: &mut ResolveOptions) -> Option<ObjectId> {
        let obj = self.object(object)?;
        if !obj.kind.is_reference() {
            return Some(object);
        }
        let name = obj.name.clone()?;
        let saved = res_opt.wrt_doc;
        if saved.is_none() {
            res_opt.wrt_doc = Some(object.doc);
        }
        let found = self.resolve_symbol_reference(res_opt, Some(object.doc), &name, obj.kind, true);
        res_opt.wrt_doc = saved;
        found
    }

    /// The moniker-qualified path that reaches the symbol described by `to`
    /// from `from_doc`.
    ///
    /// When several imports declare the symbol, the bare name is used only if
    /// the target holds the lowest (closest) priority among them.
    pub fn path_to_symbol(&self, symbol: &str, from_doc: DocId, to: &DocsResult) -> Option<String> {
        let mut visited = FxHashSet::default();
        self.path_to_symbol_guarded(symbol, from_doc, to, &mut visited)
    }

    fn path_to_symbol_guarded(
        &self,
        symbol: &str,
        from_doc: DocId,
        to: &DocsResult,
        visited: &mut FxHashSet<DocId>,
    ) -> Option<String> {
        let target = to.doc_best?;
        if from_doc == target {
            return Some(to.new_symbol.to_string());
        }
        if !visited.insert(from_doc) {
            return None;
        }
        let priorities = self.documents.get(&from_doc)?.import_priorities.as_ref()?;

        if let Some(pri) = priorities.priority_of(target) {
            match &to.doc_list {
                None => return Some(symbol.to_string()),
                Some(list) if list.len() <= 1 => return Some(symbol.to_string()),
                Some(list) => {
                    let best = list.iter().filter_map(|d| priorities.priority_of(*d)).min();
                    if best == Some(pri) {
                        return Some(symbol.to_string());
                    }
                }
            }
        }

        for (moniker, doc) in &priorities.monikers {
            if let Some(path) = self.path_to_symbol_guarded(symbol, *doc, to, visited) {
                return Some(format!("{moniker}/{path}"));
            }
        }
        None
    }
}
