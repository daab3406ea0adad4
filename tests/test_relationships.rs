//! Entity relationship graph built from manifests.

mod common;

use common::{adapter_with, corpus_with, customer_and_order, entity_doc};
use futures::executor::block_on;

use cdm::model::Document;
use cdm::{Corpus, E2ERelationship, ObjectKind, Slot, ValidationStep};

fn order_to_customer() -> E2ERelationship {
    E2ERelationship {
        from_entity: "local:/Order.cdm.json/Order".into(),
        from_entity_attribute: "customer".into(),
        to_entity: "local:/Customer.cdm.json/Customer".into(),
        to_entity_attribute: "customerId".into(),
    }
}

fn manifest() -> Document {
    let mut manifest = Document::new("default.manifest.cdm.json");
    manifest.add_entity_declaration("Customer", "Customer.cdm.json/Customer");
    manifest.add_entity_declaration("Order", "Order.cdm.json/Order");
    manifest
}

fn build_graph(docs: Vec<Document>, root: &str) -> Corpus {
    let adapter = adapter_with(docs);
    let mut corpus = corpus_with(&adapter);
    let root = block_on(corpus.fetch_document(root)).expect("manifest loads");
    block_on(corpus.resolve_through(ValidationStep::Finished, None)).unwrap();
    block_on(corpus.calculate_entity_graph(root));
    corpus
}

#[test]
fn test_foreign_key_becomes_relationship() {
    let (customer, order) = customer_and_order();
    let mut corpus = build_graph(vec![customer, order, manifest()], "local:/default.manifest.cdm.json");

    let order = block_on(corpus.fetch_object("local:/Order.cdm.json/Order")).unwrap();
    let customer = block_on(corpus.fetch_object("local:/Customer.cdm.json/Customer")).unwrap();

    assert_eq!(corpus.fetch_outgoing_relationships(order), &[order_to_customer()]);
    assert_eq!(corpus.fetch_incoming_relationships(customer), &[order_to_customer()]);
    assert!(corpus.fetch_outgoing_relationships(customer).is_empty());
    assert!(corpus.fetch_incoming_relationships(order).is_empty());
}

#[test]
fn test_transient_resolved_entities_are_removed() {
    let (customer, order) = customer_and_order();
    let corpus = build_graph(vec![customer, order, manifest()], "local:/default.manifest.cdm.json");

    assert!(corpus.document_by_path("local:/wrtSelf_Order.cdm.json").is_none());
    assert!(corpus.document_by_path("local:/wrtSelf_Customer.cdm.json").is_none());
    assert!(corpus.documents().all(|d| !d.name.starts_with("wrtSelf_")));
}

#[test]
fn test_sub_manifests_are_walked() {
    let (customer, order) = customer_and_order();
    let mut root = Document::new("root.manifest.cdm.json");
    root.add_sub_manifest("default", "default.manifest.cdm.json");
    let mut corpus = build_graph(
        vec![customer, order, manifest(), root],
        "local:/root.manifest.cdm.json",
    );

    let order = block_on(corpus.fetch_object("local:/Order.cdm.json/Order")).unwrap();
    assert_eq!(corpus.fetch_outgoing_relationships(order), &[order_to_customer()]);
}

#[test]
fn test_entity_without_key_has_no_relationship() {
    let (customer, _) = entity_doc("Customer", &["customerId"]);
    let (order, entity) = entity_doc("Order", &["orderId"]);
    let mut order = order.with_import("Customer.cdm.json");
    let fk = order.add_child(entity, Slot::HasAttributes, ObjectKind::EntityAttributeDef, Some("customer"));
    order.add_reference(fk, Slot::Entity, ObjectKind::EntityRef, "Customer");
    let mut corpus = build_graph(vec![customer, order, manifest()], "local:/default.manifest.cdm.json");

    let order = block_on(corpus.fetch_object("local:/Order.cdm.json/Order")).unwrap();
    assert!(corpus.fetch_outgoing_relationships(order).is_empty());
}

#[test]
fn test_resolved_entity_carries_attribute_context() {
    let (customer, order) = customer_and_order();
    let adapter = adapter_with([customer, order]);
    let mut corpus = corpus_with(&adapter);
    let order = block_on(corpus.fetch_object("local:/Order.cdm.json/Order")).unwrap();

    let resolved = block_on(corpus.create_resolved_entity(order, "OrderResolved")).unwrap();

    assert_eq!(
        corpus.object_corpus_path(resolved).as_deref(),
        Some("local:/OrderResolved.cdm.json/OrderResolved")
    );
    let resolved_obj = corpus.object(resolved).unwrap();
    let attributes: Vec<&str> = resolved_obj
        .children_in(Slot::HasAttributes)
        .filter_map(|a| corpus.object_name(cdm::ObjectId::new(resolved.doc, a)))
        .collect();
    assert_eq!(attributes, vec!["orderId", "customer"]);
    assert!(resolved_obj.child(Slot::AttributeContext).is_some());
    assert_eq!(
        corpus.res_ent_map.get("local:/Order.cdm.json/Order").map(String::as_str),
        Some("local:/OrderResolved.cdm.json/OrderResolved")
    );

    let relationships = corpus.find_outgoing_relationships(resolved);
    assert_eq!(relationships.len(), 1);
    assert_eq!(relationships[0].from_entity, "local:/OrderResolved.cdm.json/OrderResolved");
    assert_eq!(relationships[0].to_entity_attribute, "customerId");
}
