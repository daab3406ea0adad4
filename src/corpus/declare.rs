//! Declaration pass: registering every definable object of a document.

use smol_str::SmolStr;

use super::{COMPONENT, Corpus, ResolvedKind};
use crate::base::{DocId, LocalId, ObjectId};
use crate::error::ResolveError;
use crate::model::{Document, Visitor};

/// Collects `(path, object)` pairs of declarable objects in pre-order.
#[derive(Default)]
struct DeclarationCollector {
    found: Vec<(String, LocalId)>,
}

impl Visitor for DeclarationCollector {
    fn visit_pre(&mut self, doc: &Document, id: LocalId, path: &str) -> bool {
        // Objects without a name have no stable path to declare under.
        if path.contains("(unspecified)") {
            return false;
        }
        if doc.object(id).is_some_and(|o| o.kind.is_declarable()) {
            self.found.push((path.to_string(), id));
        }
        false
    }
}

/// Collects objects that fail their integrity rule.
#[derive(Default)]
struct IntegrityChecker {
    failures: Vec<String>,
}

impl Visitor for IntegrityChecker {
    fn visit_pre(&mut self, doc: &Document, id: LocalId, path: &str) -> bool {
        if doc.object(id).is_some_and(|o| !o.validate()) {
            self.failures.push(path.to_string());
        }
        false
    }
}

fn declarable_objects(doc: &Document) -> Vec<(String, LocalId)> {
    let mut collector = DeclarationCollector::default();
    doc.visit(&mut collector);
    collector.found
}

impl Corpus {
    /// Register every definable object of `doc` in the document's own
    /// declaration table and in the global symbol table.
    ///
    /// A path declared twice keeps its first object; the second is reported
    /// and skipped.
    pub(crate) fn declare_object_definitions(&mut self, doc_id: DocId) {
        let Some(doc) = self.documents.get(&doc_id) else {
            return;
        };
        let folder_path = doc.folder_path.clone();
        let found = declarable_objects(doc);

        let mut declared = Vec::with_capacity(found.len());
        for (path, id) in found {
            let Some(doc) = self.documents.get_mut(&doc_id) else {
                return;
            };
            if doc.internal_declarations.contains_key(path.as_str()) {
                let err = ResolveError::DuplicateDeclaration { path: path.as_str().into() };
                self.reporter.report_error(COMPONENT, &err, format!("{folder_path}{path}"));
                continue;
            }
            doc.internal_declarations.insert(SmolStr::from(path.as_str()), id);
            self.symbols.register(&path, doc_id);
            declared.push(path);
        }

        for path in declared {
            self.reporter
                .info(COMPONENT, format!("declared '{path}'"), format!("{folder_path}{path}"));
        }
    }

    /// Undo [`declare_object_definitions`](Self::declare_object_definitions)
    /// for `doc`, including every cached dependency set of its objects.
    pub(crate) fn remove_object_definitions(&mut self, doc_id: DocId) {
        let Some(doc) = self.documents.get(&doc_id) else {
            return;
        };
        let declared: Vec<(SmolStr, LocalId)> = doc
            .internal_declarations
            .iter()
            .map(|(path, id)| (path.clone(), *id))
            .collect();

        for (path, id) in declared {
            self.symbols.unregister(&path, doc_id);
            let object = ObjectId::new(doc_id, id);
            for kind in ResolvedKind::ALL {
                self.unregister_definition_reference_symbols(object, kind);
            }
        }
    }

    /// Run every object's integrity rule. Returns `false` if any failed.
    pub(crate) fn check_object_integrity(&self, doc_id: DocId) -> bool {
        let Some(doc) = self.documents.get(&doc_id) else {
            return false;
        };
        let mut checker = IntegrityChecker::default();
        doc.visit(&mut checker);

        for path in &checker.failures {
            let err = ResolveError::IntegrityCheckFailed { path: path.as_str().into() };
            self.reporter
                .report_error(COMPONENT, &err, format!("{}{}", doc.folder_path, path));
        }
        checker.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::codes;
    use crate::model::{ObjectKind, Slot};

    #[test]
    fn test_declares_nested_paths() {
        let mut corpus = Corpus::new();
        let mut doc = Document::new("Customer.cdm.json");
        let e = doc.add_definition(ObjectKind::EntityDef, "Customer");
        doc.add_child(e, Slot::HasAttributes, ObjectKind::TypeAttributeDef, Some("id"));
        doc.add_reference(e, Slot::ExhibitsTraits, ObjectKind::TraitRef, "is.identifiedBy");
        let id = corpus.add_document("local:/", doc);

        corpus.declare_object_definitions(id);

        let doc = corpus.document(id).unwrap();
        let names: Vec<&str> = doc.declarations().map(|(p, _)| p).collect();
        assert_eq!(names, vec!["Customer", "Customer/hasAttributes/id"]);
        assert!(corpus.symbols.contains("Customer/hasAttributes/id"));
        assert!(!corpus.symbols.contains("Customer/exhibitsTraits/is.identifiedBy"));
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let mut corpus = Corpus::new();
        let mut doc = Document::new("Dup.cdm.json");
        let first = doc.add_definition(ObjectKind::EntityDef, "Customer");
        doc.add_definition(ObjectKind::EntityDef, "Customer");
        let id = corpus.add_document("local:/", doc);

        corpus.reporter().enable_recording();
        corpus.declare_object_definitions(id);

        let errors: Vec<_> = corpus
            .reporter()
            .events()
            .into_iter()
            .filter(|e| e.code.as_deref() == Some(codes::DUPLICATE_DECLARATION))
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(corpus.document(id).unwrap().declaration("Customer"), Some(first));
        assert_eq!(corpus.symbols.docs("Customer"), Some(&[id][..]));
    }

    #[test]
    fn test_unnamed_objects_are_not_declared() {
        let mut corpus = Corpus::new();
        let mut doc = Document::new("Anon.cdm.json");
        let e = doc.add_unnamed_definition(ObjectKind::EntityDef);
        doc.add_child(e, Slot::HasAttributes, ObjectKind::TypeAttributeDef, Some("x"));
        doc.add_definition(ObjectKind::TraitDef, "t");
        let id = corpus.add_document("local:/", doc);

        corpus.declare_object_definitions(id);

        let names: Vec<&str> = corpus.document(id).unwrap().declarations().map(|(p, _)| p).collect();
        assert_eq!(names, vec!["t"]);
    }

    #[test]
    fn test_remove_unregisters_symbols() {
        let mut corpus = Corpus::new();
        let mut doc = Document::new("A.cdm.json");
        doc.add_definition(ObjectKind::EntityDef, "A");
        let id = corpus.add_document("local:/", doc);
        corpus.declare_object_definitions(id);
        assert!(corpus.symbols.contains("A"));

        corpus.remove_object_definitions(id);
        assert!(!corpus.symbols.contains("A"));
    }

    #[test]
    fn test_integrity_failure_reported() {
        let mut corpus = Corpus::new();
        let mut doc = Document::new("Bad.cdm.json");
        let t = doc.add_definition(ObjectKind::EntityDef, "E");
        doc.add_child(t, Slot::ExhibitsTraits, ObjectKind::TraitRef, Some(""));
        let id = corpus.add_document("local:/", doc);

        assert!(!corpus.check_object_integrity(id));
        assert_eq!(corpus.reporter().error_count(), 1);
    }
}
