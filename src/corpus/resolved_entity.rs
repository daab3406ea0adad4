//! Materializing a resolved entity as a new document.

use super::Corpus;
use super::resolved::IDENTIFIED_BY;
use crate::base::path::ATTRIBUTE_PROMISE;
use crate::base::ObjectId;
use crate::model::{
    ArgumentValue, AttributeContextType, DirectiveSet, Document, ObjectKind, ResolveOptions, Slot,
};

impl Corpus {
    /// Build `"{new_name}.cdm.json"` next to `entity`'s document, holding an
    /// entity `new_name` with `entity`'s resolved attributes and an
    /// attribute context recording where each came from and which entity it
    /// refers to.
    ///
    /// Any document of that name in the folder is replaced. The new entity
    /// is indexed before it is returned.
    pub async fn create_resolved_entity(&mut self, entity: ObjectId, new_name: &str) -> Option<ObjectId> {
        let opt = ResolveOptions::new(Some(entity.doc)).with_directives(DirectiveSet::relational());
        let attributes = self.fetch_resolved_attributes(entity, &opt);
        let references = self.fetch_resolved_entity_references(entity, &opt);

        let source = self.documents.get(&entity.doc)?;
        let folder = format!("{}:{}", source.namespace, source.folder_path);
        let source_path = self.object_corpus_path(entity)?;

        let mut doc = Document::new(format!("{new_name}.cdm.json")).with_import(&source.at_corpus_path());
        let resolved = doc.add_definition(ObjectKind::EntityDef, new_name);
        let root = doc.add_attribute_context(resolved, new_name, AttributeContextType::Entity);
        doc.add_reference(root, Slot::Definition, ObjectKind::EntityRef, new_name);

        for attribute in attributes.iter() {
            let name = attribute.name.as_str();
            doc.add_child(resolved, Slot::HasAttributes, ObjectKind::TypeAttributeDef, Some(name));

            let att_ctx = doc.add_attribute_context(root, name, AttributeContextType::AttributeDefinition);
            if let Some(declared) = self
                .documents
                .get(&attribute.attribute.doc)
                .and_then(|d| d.path_of(attribute.attribute.local))
            {
                doc.add_reference(att_ctx, Slot::Definition, ObjectKind::AttributeRef, &declared);
            }

            let Some(reference) = references.for_attribute(name) else {
                continue;
            };
            let Some(key) = &reference.identifying_attribute else {
                continue;
            };
            let target = reference.target_reference.as_str();
            let target_name = self.object_name(reference.target).unwrap_or(target);

            let ent_ctx = doc.add_attribute_context(att_ctx, target_name, AttributeContextType::Entity);
            doc.add_reference(ent_ctx, Slot::Definition, ObjectKind::EntityRef, target);
            let identified_by = doc.add_reference(ent_ctx, Slot::ExhibitsTraits, ObjectKind::TraitRef, IDENTIFIED_BY);
            doc.add_argument(
                identified_by,
                None,
                ArgumentValue::AttributeReference(format!("{target_name}/{ATTRIBUTE_PROMISE}{key}").into()),
            );

            let set = doc.add_attribute_context(att_ctx, "_generatedAttributeSet", AttributeContextType::GeneratedSet);
            let round = doc.add_attribute_context(set, "_generatedAttributeRound0", AttributeContextType::GeneratedRound);
            let foreign_key =
                doc.add_attribute_context(round, "_foreignKey", AttributeContextType::AddedAttributeIdentity);
            doc.add_reference(
                foreign_key,
                Slot::Contents,
                ObjectKind::AttributeRef,
                &format!("{new_name}/hasAttributes/{name}"),
            );
        }

        let id = self.add_document(&folder, doc);
        let resolved = ObjectId::new(id, resolved);
        if let Some(resolved_path) = self.object_corpus_path(resolved) {
            self.res_ent_map.insert(source_path, resolved_path);
        }
        if !self.index_if_needed(id, &opt.with_wrt_doc(id)).await {
            return None;
        }
        Some(resolved)
    }
}
