//! Indexing: import priorities and the per-document passes.
//!
//! Pending documents are indexed together, one phase at a time, so every
//! document has its priorities and declarations in place before any
//! reference is resolved.

use rustc_hash::FxHashSet;

use super::{COMPONENT, Corpus};
use crate::base::DocId;
use crate::model::{ImportInfo, ImportPriorities, ResolveOptions};

impl Corpus {
    /// Index every document waiting for it. Returns `false` if a document
    /// failed its integrity check, in which case nothing further is done.
    pub(crate) fn index_documents(&mut self, res_opt: &ResolveOptions) -> bool {
        let waiting = self.library.list_docs_not_indexed();
        let mut pending = Vec::with_capacity(waiting.len());
        for id in waiting {
            match self.documents.get(&id) {
                Some(doc) if doc.needs_indexing => pending.push(id),
                Some(_) => self.finish_document_resolve(id),
                None => self.library.mark_indexed(id),
            }
        }
        if pending.is_empty() {
            return true;
        }

        for &id in &pending {
            if let Some(doc) = self.documents.get(&id) {
                self.reporter
                    .debug(COMPONENT, format!("index start: {}", doc.name), doc.at_corpus_path());
            }
            self.remove_object_definitions(id);
            if let Some(doc) = self.documents.get_mut(&id) {
                doc.clear_caches();
            }
            let priorities = self.compute_import_priorities(id);
            if let Some(doc) = self.documents.get_mut(&id) {
                doc.import_priorities = Some(priorities);
            }
        }

        for &id in &pending {
            if !self.check_object_integrity(id) {
                return false;
            }
        }
        for &id in &pending {
            self.declare_object_definitions(id);
        }
        for &id in &pending {
            let opt = res_opt.fork().with_wrt_doc(id);
            self.resolve_object_definitions(id, &opt);
        }
        for &id in &pending {
            let opt = res_opt.fork().with_wrt_doc(id);
            self.resolve_trait_arguments(id, &opt);
        }
        for &id in &pending {
            self.finish_document_resolve(id);
        }

        // Newly declared symbols can change what any cached result means.
        self.cache.clear_results();
        true
    }

    pub(crate) fn finish_document_resolve(&mut self, id: DocId) {
        if let Some(doc) = self.documents.get_mut(&id) {
            doc.needs_indexing = false;
            doc.imports_indexed = true;
            doc.currently_indexing = false;
        }
        self.library.mark_indexed(id);
    }

    /// Mark every loaded document as done after a pipeline run.
    pub(crate) fn finish_resolve(&mut self) {
        self.reporter.debug(COMPONENT, "finishing...", "");
        for id in self.library.list_all_documents() {
            self.finish_document_resolve(id);
        }
    }

    // ========================================================================
    // IMPORT PRIORITIES
    // ========================================================================

    /// The ranked import closure of `doc`: itself at 0, then its direct
    /// imports in reverse order, then theirs.
    pub fn compute_import_priorities(&self, doc: DocId) -> ImportPriorities {
        let mut priorities = ImportPriorities::default();
        priorities.priority.insert(
            doc,
            ImportInfo {
                priority: 0,
                is_moniker: false,
            },
        );
        let mut processed = FxHashSet::default();
        let mut sequence = 1;
        self.prioritize_imports(doc, &mut processed, &mut priorities, &mut sequence, false);

        // Monikered imports are reachable, but only through their alias.
        if let Some(d) = self.documents.get(&doc) {
            for import in d.imports.iter().filter(|i| i.moniker.is_some()) {
                let Some(target) = import.doc else {
                    continue;
                };
                if !priorities.priority.contains_key(&target) {
                    priorities.priority.insert(
                        target,
                        ImportInfo {
                            priority: sequence,
                            is_moniker: true,
                        },
                    );
                    sequence += 1;
                }
            }
        }
        priorities
    }

    fn prioritize_imports(
        &self,
        doc: DocId,
        processed: &mut FxHashSet<DocId>,
        priorities: &mut ImportPriorities,
        sequence: &mut usize,
        skip_monikered: bool,
    ) {
        if !processed.insert(doc) {
            if priorities.priority_of(doc) == Some(0) {
                priorities.has_circular_import = true;
            }
            return;
        }
        let Some(d) = self.documents.get(&doc) else {
            return;
        };
        let reversed: Vec<_> = d.imports.iter().rev().collect();

        // This level first.
        for import in &reversed {
            let Some(target) = import.doc else {
                continue;
            };
            if import.moniker.is_none() && !priorities.priority.contains_key(&target) {
                priorities.priority.insert(
                    target,
                    ImportInfo {
                        priority: *sequence,
                        is_moniker: false,
                    },
                );
                *sequence += 1;
            }
        }

        // Then the imports of the imports.
        for import in &reversed {
            let Some(target) = import.doc else {
                continue;
            };
            let is_moniker = import.moniker.is_some();
            let computed = self
                .documents
                .get(&target)
                .and_then(|t| t.import_priorities.as_ref())
                .filter(|p| !p.has_circular_import);

            match computed {
                Some(sub) => {
                    for (sub_doc, info) in &sub.priority {
                        if *sub_doc == target || info.is_moniker {
                            continue;
                        }
                        if !priorities.priority.contains_key(sub_doc) {
                            priorities.priority.insert(
                                *sub_doc,
                                ImportInfo {
                                    priority: *sequence,
                                    is_moniker: false,
                                },
                            );
                            *sequence += 1;
                        }
                    }
                    if !is_moniker {
                        for (moniker, moniker_doc) in &sub.monikers {
                            priorities.monikers.insert(moniker.clone(), *moniker_doc);
                        }
                    }
                }
                None => self.prioritize_imports(target, processed, priorities, sequence, is_moniker),
            }
        }

        // The use of a moniker closest to the starting document wins.
        if !skip_monikered {
            for import in &d.imports {
                if let (Some(moniker), Some(target)) = (&import.moniker, import.doc) {
                    priorities.monikers.insert(moniker.clone(), target);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Document;

    fn bind(corpus: &mut Corpus, from: DocId, index: usize, to: DocId) {
        corpus.document_mut(from).unwrap().imports[index].doc = Some(to);
    }

    #[test]
    fn test_direct_imports_rank_in_reverse() {
        let mut corpus = Corpus::new();
        let b = corpus.add_document("local:/", Document::new("B.cdm.json"));
        let c = corpus.add_document("local:/", Document::new("C.cdm.json"));
        let a = corpus.add_document(
            "local:/",
            Document::new("A.cdm.json").with_import("B.cdm.json").with_import("C.cdm.json"),
        );
        bind(&mut corpus, a, 0, b);
        bind(&mut corpus, a, 1, c);

        let p = corpus.compute_import_priorities(a);
        assert_eq!(p.priority_of(a), Some(0));
        assert_eq!(p.priority_of(c), Some(1));
        assert_eq!(p.priority_of(b), Some(2));
        assert!(!p.has_circular_import);
    }

    #[test]
    fn test_transitive_and_circular_imports() {
        let mut corpus = Corpus::new();
        let a = corpus.add_document("local:/", Document::new("A.cdm.json").with_import("B.cdm.json"));
        let b = corpus.add_document(
            "local:/",
            Document::new("B.cdm.json").with_import("C.cdm.json").with_import("A.cdm.json"),
        );
        let c = corpus.add_document("local:/", Document::new("C.cdm.json"));
        bind(&mut corpus, a, 0, b);
        bind(&mut corpus, b, 0, c);
        bind(&mut corpus, b, 1, a);

        let p = corpus.compute_import_priorities(a);
        assert_eq!(p.priority_of(b), Some(1));
        assert_eq!(p.priority_of(c), Some(2));
        assert!(p.has_circular_import);
    }

    #[test]
    fn test_moniker_imports_stay_out_of_ranking_chain() {
        let mut corpus = Corpus::new();
        let m = corpus.add_document("local:/", Document::new("M.cdm.json"));
        let a = corpus.add_document("local:/", Document::new("A.cdm.json").with_moniker_import("M.cdm.json", "m"));
        bind(&mut corpus, a, 0, m);

        let p = corpus.compute_import_priorities(a);
        assert_eq!(p.moniker("m"), Some(m));
        assert_eq!(
            p.priority.get(&m),
            Some(&ImportInfo {
                priority: 1,
                is_moniker: true
            })
        );
    }
}
