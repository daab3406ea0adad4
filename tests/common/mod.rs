//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use cdm::model::Document;
use cdm::{Corpus, MemoryAdapter, ObjectKind, Slot, StatusEvent, StatusLevel};

pub const FOUNDATIONS: &str = "foundations.cdm.json";

/// Object-valued data types and the identifying trait every test corpus
/// imports.
pub fn foundations() -> Document {
    let mut doc = Document::new(FOUNDATIONS);
    doc.add_definition(ObjectKind::DataTypeDef, "cdmObject");
    for name in ["entity", "attribute", "dataType", "purpose", "trait", "attributeGroup"] {
        let dt = doc.add_definition(ObjectKind::DataTypeDef, name);
        doc.add_reference(dt, Slot::ExtendsDataType, ObjectKind::DataTypeRef, "cdmObject");
    }
    doc.add_definition(ObjectKind::DataTypeDef, "string");

    let identified_by = doc.add_definition(ObjectKind::TraitDef, "is.identifiedBy");
    doc.add_parameter(identified_by, "attribute", Some("attribute"), true, None);
    doc
}

/// An entity document importing the foundations, with one string attribute
/// per name.
pub fn entity_doc(name: &str, attributes: &[&str]) -> (Document, cdm::LocalId) {
    let mut doc = Document::new(format!("{name}.cdm.json")).with_import(FOUNDATIONS);
    let entity = doc.add_definition(ObjectKind::EntityDef, name);
    for attribute in attributes {
        let att = doc.add_child(entity, Slot::HasAttributes, ObjectKind::TypeAttributeDef, Some(*attribute));
        doc.add_reference(att, Slot::DataType, ObjectKind::DataTypeRef, "string");
    }
    (doc, entity)
}

/// `Customer` with key `customerId` and `Order` holding a `customer`
/// attribute that refers to it.
pub fn customer_and_order() -> (Document, Document) {
    let (mut customer, entity) = entity_doc("Customer", &["customerId", "name"]);
    let identified_by = customer.add_reference(entity, Slot::ExhibitsTraits, ObjectKind::TraitRef, "is.identifiedBy");
    customer.add_argument(
        identified_by,
        None,
        cdm::ArgumentValue::symbol("Customer/hasAttributes/customerId"),
    );

    let (order, entity) = entity_doc("Order", &["orderId"]);
    let mut order = order.with_import("Customer.cdm.json");
    let fk = order.add_child(entity, Slot::HasAttributes, ObjectKind::EntityAttributeDef, Some("customer"));
    order.add_reference(fk, Slot::Entity, ObjectKind::EntityRef, "Customer");
    (customer, order)
}

/// A memory adapter preloaded with the foundations and `docs`, each stored
/// at `/{name}`.
pub fn adapter_with(docs: impl IntoIterator<Item = Document>) -> Arc<MemoryAdapter> {
    let adapter = MemoryAdapter::new().with_document(&format!("/{FOUNDATIONS}"), foundations());
    for doc in docs {
        let path = format!("/{}", doc.name);
        adapter.insert(&path, doc);
    }
    Arc::new(adapter)
}

pub fn corpus_with(adapter: &Arc<MemoryAdapter>) -> Corpus {
    let corpus = Corpus::new().with_adapter("local", Arc::clone(adapter));
    corpus.reporter().enable_recording();
    corpus
}

/// Collect every event at `level` or above through the event callback.
pub fn capture_events(corpus: &mut Corpus, level: StatusLevel) -> Rc<RefCell<Vec<StatusEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    corpus.set_event_callback(Box::new(move |event| sink.borrow_mut().push(event.clone())), level);
    events
}

pub fn codes_of(corpus: &Corpus) -> Vec<String> {
    corpus
        .reporter()
        .events()
        .iter()
        .filter_map(|e| e.code.as_deref().map(str::to_string))
        .collect()
}
