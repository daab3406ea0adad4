//! Entity relationship graph.
//!
//! Relationships are read off a resolved entity's attribute-context tree:
//! a context whose definition is an entity reference carrying
//! `is.identifiedBy` marks a foreign key, and the nearest generated
//! attribute set names the local attribute that holds it.

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use smol_str::SmolStr;

use super::Corpus;
use super::resolved::IDENTIFIED_BY;
use crate::base::path::{WRT_SELF_PREFIX, last_segment};
use crate::base::{DocId, LocalId, ObjectId};
use crate::model::{AttributeContextType, ObjectKind, Payload, ResolveOptions, Slot};

/// Name of the attribute-context node grouping generated attributes.
const GENERATED_ATTRIBUTE_SET: &str = "_generatedAttributeSet";

/// A directed entity-to-entity relationship between two attributes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct E2ERelationship {
    /// Absolute corpus path of the entity holding the foreign key.
    pub from_entity: String,
    pub from_entity_attribute: String,
    /// Absolute corpus path of the referenced entity.
    pub to_entity: String,
    pub to_entity_attribute: String,
}

impl Corpus {
    pub fn fetch_outgoing_relationships(&self, entity: ObjectId) -> &[E2ERelationship] {
        self.outgoing_relationships
            .get(&entity)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn fetch_incoming_relationships(&self, entity: ObjectId) -> &[E2ERelationship] {
        self.incoming_relationships
            .get(&entity)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Collect the relationships of every entity declared in `manifest` and,
    /// recursively, in its sub-manifests.
    pub fn calculate_entity_graph(&mut self, manifest: DocId) -> LocalBoxFuture<'_, ()> {
        async move {
            let Some(doc) = self.documents.get(&manifest) else {
                return;
            };
            let relative_to = (doc.namespace.to_string(), doc.folder_path.to_string());
            let declared_paths = |ids: &[LocalId]| -> Vec<SmolStr> {
                ids.iter()
                    .filter_map(|id| match &doc.object(*id)?.payload {
                        Payload::EntityDeclaration { entity_path } => Some(entity_path.clone()),
                        Payload::ManifestDeclaration { definition } => Some(definition.clone()),
                        _ => None,
                    })
                    .collect()
            };
            let entity_paths = declared_paths(doc.entity_declarations());
            let sub_manifests = declared_paths(doc.sub_manifests());
            let relative_to = Some((relative_to.0.as_str(), relative_to.1.as_str()));

            for entity_path in entity_paths {
                let abs = self.storage.create_absolute_corpus_path(&entity_path, relative_to);
                self.calculate_entity_relationships(&abs).await;
            }

            for sub in sub_manifests {
                let abs = self.storage.create_absolute_corpus_path(&sub, relative_to);
                if let Some(sub_doc) = self.fetch_document(&abs).await {
                    self.calculate_entity_graph(sub_doc).await;
                }
            }
        }
        .boxed_local()
    }

    async fn calculate_entity_relationships(&mut self, entity_path: &str) {
        let Some(entity) = self.fetch_object(entity_path).await else {
            return;
        };
        let Some(obj) = self.object(entity) else {
            return;
        };
        if obj.kind != ObjectKind::EntityDef {
            return;
        }
        let is_resolved = obj.child(Slot::AttributeContext).is_some();
        let name = obj.name().unwrap_or_default().to_string();

        let resolved = if is_resolved {
            entity
        } else {
            match self
                .create_resolved_entity(entity, &format!("{WRT_SELF_PREFIX}{name}"))
                .await
            {
                Some(resolved) => resolved,
                None => return,
            }
        };

        let mut outgoing = self.find_outgoing_relationships(resolved);
        if is_resolved {
            for rel in &mut outgoing {
                if let Some(mapped) = self.res_ent_map.get(&rel.to_entity) {
                    rel.to_entity = mapped.clone();
                }
            }
        }
        self.outgoing_relationships.insert(entity, outgoing.clone());

        for rel in outgoing {
            if let Some(target) = self.fetch_object(&rel.to_entity).await {
                self.incoming_relationships.entry(target).or_default().push(rel);
            }
        }

        if !is_resolved {
            self.remove_document(resolved.doc);
        }
    }

    /// Relationships leaving a resolved entity.
    pub fn find_outgoing_relationships(&self, resolved_entity: ObjectId) -> Vec<E2ERelationship> {
        let mut out = Vec::new();
        let root = self
            .object(resolved_entity)
            .and_then(|o| o.child(Slot::AttributeContext));
        if let Some(root) = root {
            let mut opt = ResolveOptions::new(Some(resolved_entity.doc));
            self.find_outgoing_in_context(
                resolved_entity,
                ObjectId::new(resolved_entity.doc, root),
                None,
                &mut opt,
                &mut out,
            );
        }
        out
    }

    fn find_outgoing_in_context(
        &self,
        resolved_entity: ObjectId,
        context: ObjectId,
        generated_set: Option<ObjectId>,
        opt: &mut ResolveOptions,
        out: &mut Vec<E2ERelationship>,
    ) {
        let Some(ctx) = self.object(context) else {
            return;
        };
        let doc = context.doc;
        let generated_set = ctx
            .children_in(Slot::Contents)
            .find(|c| self.object_name(ObjectId::new(doc, *c)) == Some(GENERATED_ATTRIBUTE_SET))
            .map(|c| ObjectId::new(doc, c))
            .or(generated_set);

        for child in ctx.children_in(Slot::Contents) {
            let child = ObjectId::new(doc, child);
            let Some(child_obj) = self.object(child) else {
                continue;
            };
            if child_obj.kind != ObjectKind::AttributeContextDef {
                continue;
            }

            let definition = child_obj
                .child(Slot::Definition)
                .map(|d| ObjectId::new(doc, d))
                .filter(|d| self.object(*d).is_some_and(|o| o.kind == ObjectKind::EntityRef));
            if let Some(definition) = definition {
                let to_attributes: Vec<&str> = child_obj
                    .children_in(Slot::ExhibitsTraits)
                    .filter_map(|t| self.object(ObjectId::new(doc, t)))
                    .filter(|t| t.name() == Some(IDENTIFIED_BY))
                    .filter_map(|t| t.child(Slot::Arguments))
                    .filter_map(|arg| self.object(ObjectId::new(doc, arg))?.argument_value()?.as_text())
                    .map(last_segment)
                    .collect();
                let to_entity = self.fetch_object_definition(definition, opt);

                if let ([to_attribute], Some(to_entity)) = (to_attributes.as_slice(), to_entity) {
                    let foreign_key = generated_set.and_then(|set| self.find_added_attribute_identity(set));
                    if let Some(foreign_key) = foreign_key {
                        let from_attribute =
                            strip_context_prefix(&foreign_key, child_obj.name().unwrap_or_default());
                        out.push(E2ERelationship {
                            from_entity: self.entity_path_without_prefix(resolved_entity),
                            from_entity_attribute: from_attribute,
                            to_entity: self.entity_path_without_prefix(to_entity),
                            to_entity_attribute: to_attribute.to_string(),
                        });
                    }
                }
            }

            self.find_outgoing_in_context(resolved_entity, child, generated_set, opt, out);
        }
    }

    fn entity_path_without_prefix(&self, entity: ObjectId) -> String {
        self.object_corpus_path(entity)
            .unwrap_or_default()
            .replace(WRT_SELF_PREFIX, "")
    }

    /// The attribute named by the first added-attribute-identity node below
    /// `context`, skipping entity contexts.
    fn find_added_attribute_identity(&self, context: ObjectId) -> Option<String> {
        let ctx = self.object(context)?;
        for child in ctx.children_in(Slot::Contents) {
            let child = ObjectId::new(context.doc, child);
            let Some(child_obj) = self.object(child) else {
                continue;
            };
            let context_type = child_obj.context_type();
            if context_type == Some(AttributeContextType::Entity) {
                continue;
            }
            if let Some(found) = self.find_added_attribute_identity(child) {
                return Some(found);
            }
            if context_type == Some(AttributeContextType::AddedAttributeIdentity) {
                let first = child_obj.child(Slot::Contents)?;
                return self
                    .object_name(ObjectId::new(context.doc, first))
                    .map(str::to_string);
            }
        }
        None
    }
}

/// Last segment of `foreign_key` with the first `{context}_` removed.
fn strip_context_prefix(foreign_key: &str, context: &str) -> String {
    let prefix = format!("{context}_");
    last_segment(foreign_key).replacen(&prefix, "", 1)
}
