//! Loading import closures through a storage adapter.

mod common;

use std::time::{Duration, SystemTime};

use common::{adapter_with, codes_of, corpus_with, customer_and_order, entity_doc};
use futures::executor::block_on;

use cdm::diagnostics::codes;
use cdm::model::Document;

#[test]
fn test_shared_import_is_loaded_once() {
    let (shared, _) = entity_doc("Shared", &["id"]);
    let left = Document::new("Left.cdm.json").with_import("Shared.cdm.json");
    let right = Document::new("Right.cdm.json").with_import("Shared.cdm.json");
    let root = Document::new("Root.cdm.json")
        .with_import("Left.cdm.json")
        .with_import("Right.cdm.json");
    let adapter = adapter_with([shared, left, right, root]);
    let mut corpus = corpus_with(&adapter);

    let root = block_on(corpus.fetch_document("local:/Root.cdm.json")).expect("root loads");

    assert_eq!(adapter.read_count("/Shared.cdm.json"), 1, "shared import must be read once");
    assert_eq!(adapter.read_count("/foundations.cdm.json"), 1);

    let left = corpus.document_by_path("local:/Left.cdm.json").unwrap();
    let right = corpus.document_by_path("local:/Right.cdm.json").unwrap();
    let shared = corpus.document_by_path("local:/Shared.cdm.json").unwrap();
    assert_eq!(corpus.document(left).unwrap().imports()[0].document(), Some(shared));
    assert_eq!(corpus.document(right).unwrap().imports()[0].document(), Some(shared));

    let doc = corpus.document(root).unwrap();
    assert!(!doc.needs_indexing());
    assert!(doc.imports_indexed());
    assert!(corpus.document(shared).unwrap().imports_indexed());
}

#[test]
fn test_missing_import_leaves_binding_unset() {
    let root = Document::new("Root.cdm.json")
        .with_import("Missing.cdm.json")
        .with_import(common::FOUNDATIONS);
    let adapter = adapter_with([root]);
    let mut corpus = corpus_with(&adapter);

    let root = block_on(corpus.fetch_document("local:/Root.cdm.json")).expect("indexing still succeeds");

    let doc = corpus.document(root).unwrap();
    assert_eq!(doc.imports()[0].document(), None);
    assert!(doc.imports()[1].document().is_some());
    assert!(codes_of(&corpus).contains(&codes::MISSING_IMPORT.to_string()));
    assert_eq!(corpus.reporter().error_count(), 0, "a missing import is only a warning");
}

#[test]
fn test_missing_import_is_not_retried() {
    let a = Document::new("A.cdm.json").with_import("Missing.cdm.json");
    let b = Document::new("B.cdm.json").with_import("Missing.cdm.json");
    let adapter = adapter_with([a, b]);
    let mut corpus = corpus_with(&adapter);

    block_on(corpus.fetch_document("local:/A.cdm.json")).unwrap();
    block_on(corpus.fetch_document("local:/B.cdm.json")).unwrap();

    assert_eq!(adapter.read_count("/Missing.cdm.json"), 1);
}

#[test]
fn test_circular_imports_terminate() {
    let a = Document::new("A.cdm.json").with_import("B.cdm.json");
    let b = Document::new("B.cdm.json").with_import("A.cdm.json");
    let adapter = adapter_with([a, b]);
    let mut corpus = corpus_with(&adapter);

    let a = block_on(corpus.fetch_document("local:/A.cdm.json")).unwrap();
    let b = corpus.document_by_path("local:/B.cdm.json").unwrap();

    assert_eq!(adapter.read_count("/A.cdm.json"), 1);
    assert_eq!(adapter.read_count("/B.cdm.json"), 1);
    let priorities = corpus.document(a).unwrap().import_priorities().unwrap();
    assert_eq!(priorities.priority_of(b), Some(1));
}

#[test]
fn test_unmounted_namespace_is_reported() {
    let adapter = adapter_with(Vec::<Document>::new());
    let mut corpus = corpus_with(&adapter);

    assert!(block_on(corpus.fetch_document("remote:/X.cdm.json")).is_none());
    assert!(codes_of(&corpus).contains(&codes::ADAPTER_NOT_FOUND.to_string()));
}

#[test]
fn test_fetch_object_reports_unknown_path() {
    let (customer, _) = entity_doc("Customer", &["customerId"]);
    let adapter = adapter_with([customer]);
    let mut corpus = corpus_with(&adapter);

    let found = block_on(corpus.fetch_object("local:/Customer.cdm.json/Customer"));
    let attribute = block_on(corpus.fetch_object("local:/Customer.cdm.json/Customer/hasAttributes/customerId"));
    let missing = block_on(corpus.fetch_object("local:/Customer.cdm.json/Nobody"));

    assert_eq!(corpus.object_name(found.unwrap()), Some("Customer"));
    assert_eq!(corpus.object_name(attribute.unwrap()), Some("customerId"));
    assert!(missing.is_none());
    assert!(codes_of(&corpus).contains(&codes::OBJECT_NOT_FOUND.to_string()));
    assert_eq!(adapter.read_count("/Customer.cdm.json"), 1);
}

#[test]
fn test_in_memory_document_is_indexed_on_fetch() {
    let adapter = adapter_with(Vec::<Document>::new());
    let mut corpus = corpus_with(&adapter);
    let (doc, _) = entity_doc("Local", &["id"]);
    let id = corpus.add_document("local:/", doc);
    assert!(corpus.document(id).unwrap().needs_indexing());

    let fetched = block_on(corpus.fetch_document("local:/Local.cdm.json"));

    assert_eq!(fetched, Some(id));
    assert!(!corpus.document(id).unwrap().needs_indexing());
    assert!(corpus.declared_object(id, "Local/hasAttributes/id").is_some());
}

#[test]
fn test_last_modified_time_comes_from_adapter() {
    let (customer, order) = customer_and_order();
    let adapter = adapter_with([customer, order]);
    let pinned = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    adapter.set_last_modified_time("/Customer.cdm.json", pinned);
    let mut corpus = corpus_with(&adapter);

    let modified = block_on(corpus.compute_last_modified_time("local:/Customer.cdm.json/Customer"));
    assert_eq!(modified, Some(pinned));
    let customer = block_on(corpus.fetch_object("local:/Customer.cdm.json/Customer")).unwrap();
    assert_eq!(block_on(corpus.last_modified_time_from_object(customer)), Some(pinned));
    assert!(block_on(corpus.compute_last_modified_time("local:/Order.cdm.json")).is_some());
}

#[test]
fn test_partition_modified_time_does_not_read_file() {
    let adapter = adapter_with(Vec::<Document>::new());
    let pinned = SystemTime::UNIX_EPOCH + Duration::from_secs(60);
    adapter.set_last_modified_time("/data/part-0.csv", pinned);
    let corpus = corpus_with(&adapter);

    let modified = block_on(corpus.last_modified_time_from_partition_path("local:/data/part-0.csv"));

    assert_eq!(modified, Some(pinned));
    assert_eq!(adapter.read_count("/data/part-0.csv"), 0);
    assert_eq!(block_on(corpus.last_modified_time_from_partition_path("nowhere:/x.csv")), None);
    assert!(codes_of(&corpus).contains(&codes::ADAPTER_NOT_FOUND.to_string()));
}
