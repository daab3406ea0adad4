//! Resolved traits, attributes and entity references.
//!
//! Each result is computed once per cache key (see `cache_key.rs`) and
//! shared through `Rc`. While a result is computed, every symbol it looks up
//! is collected and registered as the definition's dependency set; the key
//! is then recomputed from that set before the result is stored.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::cache_key::empty_trait_set_key;
use super::{Corpus, ParameterCollection, ResolvedKind};
use crate::base::ObjectId;
use crate::base::path::last_segment;
use crate::model::{ArgumentValue, ObjectKind, ResolveOptions, Slot, SymbolSet};

/// Trait naming the attribute that identifies an entity.
pub(crate) const IDENTIFIED_BY: &str = "is.identifiedBy";

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Parameter values of one applied trait.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterValueSet {
    pub parameters: ParameterCollection,
    values: Vec<Option<ArgumentValue>>,
    was_set: Vec<bool>,
}

impl ParameterValueSet {
    /// Start every parameter at its default value.
    fn with_defaults(corpus: &Corpus, parameters: ParameterCollection) -> Self {
        let values: Vec<_> = parameters
            .iter()
            .map(|(_, p)| corpus.object(p).and_then(|o| o.default_value().cloned()))
            .collect();
        let was_set = vec![false; values.len()];
        Self {
            parameters,
            values,
            was_set,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_at(&self, ordinal: usize) -> Option<&ArgumentValue> {
        self.values.get(ordinal).and_then(Option::as_ref)
    }

    pub fn fetch_value(&self, name: &str) -> Option<&ArgumentValue> {
        self.value_at(self.parameters.index_of(name)?)
    }

    /// Whether an argument (rather than a default) supplied the value.
    pub fn was_set(&self, ordinal: usize) -> bool {
        self.was_set.get(ordinal).copied().unwrap_or(false)
    }

    fn set_value(&mut self, ordinal: usize, value: Option<ArgumentValue>) {
        if let Some(slot) = self.values.get_mut(ordinal) {
            *slot = value;
            self.was_set[ordinal] = true;
        }
    }

    /// Overwrite with every value `other` set explicitly.
    fn merge_set_values(&mut self, other: &ParameterValueSet) {
        for ordinal in 0..other.len() {
            if other.was_set(ordinal) {
                self.set_value(ordinal, other.values[ordinal].clone());
            }
        }
    }
}

/// One trait as it applies to an object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTrait {
    pub trait_def: ObjectId,
    pub trait_name: SmolStr,
    pub parameter_values: ParameterValueSet,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedTraitSet {
    pub set: Vec<ResolvedTrait>,
}

impl ResolvedTraitSet {
    pub fn find(&self, trait_name: &str) -> Option<&ResolvedTrait> {
        self.set.iter().find(|t| t.trait_name == trait_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedTrait> {
        self.set.iter()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Add a trait, or fold its explicitly set values into an earlier
    /// application of the same trait.
    fn merge(&mut self, incoming: ResolvedTrait) {
        match self.set.iter_mut().find(|t| t.trait_def == incoming.trait_def) {
            Some(existing) => existing.parameter_values.merge_set_values(&incoming.parameter_values),
            None => self.set.push(incoming),
        }
    }

    fn merge_set(&mut self, other: &ResolvedTraitSet) {
        for t in &other.set {
            self.merge(t.clone());
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAttribute {
    pub attribute: ObjectId,
    pub name: SmolStr,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedAttributeSet {
    pub set: Vec<ResolvedAttribute>,
}

impl ResolvedAttributeSet {
    pub fn get(&self, name: &str) -> Option<&ResolvedAttribute> {
        self.set.iter().find(|a| a.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedAttribute> {
        self.set.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.set.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// A later attribute with the same name replaces the earlier one in place.
    fn merge(&mut self, attribute: ResolvedAttribute) {
        match self.set.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => self.set.push(attribute),
        }
    }
}

/// An entity-typed attribute and the entity it points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedEntityReference {
    pub attribute: ObjectId,
    pub attribute_name: SmolStr,
    /// The reference as written, e.g. `Customer`.
    pub target_reference: SmolStr,
    pub target: ObjectId,
    /// Name of the target's identifying attribute, if it has one.
    pub identifying_attribute: Option<SmolStr>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedEntityReferenceSet {
    pub set: Vec<ResolvedEntityReference>,
}

impl ResolvedEntityReferenceSet {
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedEntityReference> {
        self.set.iter()
    }

    pub fn for_attribute(&self, attribute_name: &str) -> Option<&ResolvedEntityReference> {
        self.set.iter().find(|r| r.attribute_name == attribute_name)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

// ============================================================================
// CACHE
// ============================================================================

type ResultMap<T> = RefCell<FxHashMap<String, Rc<T>>>;

/// Resolved results keyed by cache tag.
#[derive(Debug, Default)]
pub(crate) struct ResolutionCache {
    traits: ResultMap<ResolvedTraitSet>,
    attributes: ResultMap<ResolvedAttributeSet>,
    entity_references: ResultMap<ResolvedEntityReferenceSet>,
    empty_traits: ResultMap<ResolvedTraitSet>,
    in_progress: RefCell<FxHashSet<(ObjectId, ResolvedKind)>>,
}

impl ResolutionCache {
    pub(crate) fn clear_results(&self) {
        self.traits.borrow_mut().clear();
        self.attributes.borrow_mut().clear();
        self.entity_references.borrow_mut().clear();
        self.empty_traits.borrow_mut().clear();
    }
}

// ============================================================================
// COMPUTATION
// ============================================================================

impl Corpus {
    pub fn fetch_resolved_traits(&self, object: ObjectId, res_opt: &ResolveOptions) -> Rc<ResolvedTraitSet> {
        let mut opt = res_opt.fork();
        self.resolved_traits_with(object, &mut opt)
    }

    pub fn fetch_resolved_attributes(&self, object: ObjectId, res_opt: &ResolveOptions) -> Rc<ResolvedAttributeSet> {
        let mut opt = res_opt.fork();
        self.resolved_attributes_with(object, &mut opt)
    }

    pub fn fetch_resolved_entity_references(
        &self,
        object: ObjectId,
        res_opt: &ResolveOptions,
    ) -> Rc<ResolvedEntityReferenceSet> {
        let mut opt = res_opt.fork();
        self.resolved_entity_references_with(object, &mut opt)
    }

    /// The shared empty trait set for a viewpoint and directive set.
    pub fn create_empty_resolved_trait_set(&self, res_opt: &ResolveOptions) -> Rc<ResolvedTraitSet> {
        let key = empty_trait_set_key(res_opt);
        Rc::clone(self.cache.empty_traits.borrow_mut().entry(key).or_default())
    }

    fn resolved_traits_with(&self, object: ObjectId, opt: &mut ResolveOptions) -> Rc<ResolvedTraitSet> {
        match self.definition_behind_reference(object, opt) {
            Redirect::To(def) => self.resolved_traits_with(def, opt),
            Redirect::Unresolved => self.create_empty_resolved_trait_set(opt),
            Redirect::Itself => self.fetch_cached(object, ResolvedKind::Traits, opt, &self.cache.traits, Self::compute_traits),
        }
    }

    fn resolved_attributes_with(&self, object: ObjectId, opt: &mut ResolveOptions) -> Rc<ResolvedAttributeSet> {
        match self.definition_behind_reference(object, opt) {
            Redirect::To(def) => self.resolved_attributes_with(def, opt),
            Redirect::Unresolved => Rc::default(),
            Redirect::Itself => self.fetch_cached(
                object,
                ResolvedKind::Attributes,
                opt,
                &self.cache.attributes,
                Self::compute_attributes,
            ),
        }
    }

    fn resolved_entity_references_with(
        &self,
        object: ObjectId,
        opt: &mut ResolveOptions,
    ) -> Rc<ResolvedEntityReferenceSet> {
        match self.definition_behind_reference(object, opt) {
            Redirect::To(def) => self.resolved_entity_references_with(def, opt),
            Redirect::Unresolved => Rc::default(),
            Redirect::Itself => self.fetch_cached(
                object,
                ResolvedKind::EntityReferences,
                opt,
                &self.cache.entity_references,
                Self::compute_entity_references,
            ),
        }
    }

    /// Entity and attribute-group references stand for their definitions.
    /// Trait references are resolved on their own since their arguments
    /// matter.
    fn definition_behind_reference(&self, object: ObjectId, opt: &mut ResolveOptions) -> Redirect {
        let Some(kind) = self.object(object).map(|o| o.kind) else {
            return Redirect::Unresolved;
        };
        if !kind.is_reference() || kind == ObjectKind::TraitRef {
            return Redirect::Itself;
        }
        match self.resolve_with_default_viewpoint(object, opt) {
            Some(def) => Redirect::To(def),
            None => Redirect::Unresolved,
        }
    }

    fn resolve_with_default_viewpoint(&self, object: ObjectId, opt: &mut ResolveOptions) -> Option<ObjectId> {
        let saved = opt.wrt_doc;
        opt.wrt_doc.get_or_insert(object.doc);
        let found = self.fetch_object_definition(object, opt);
        opt.wrt_doc = saved;
        found
    }

    fn fetch_cached<T: Default>(
        &self,
        object: ObjectId,
        kind: ResolvedKind,
        opt: &mut ResolveOptions,
        cache: &ResultMap<T>,
        compute: fn(&Self, ObjectId, &mut ResolveOptions) -> T,
    ) -> Rc<T> {
        let saved_wrt = opt.wrt_doc;
        opt.wrt_doc.get_or_insert(object.doc);
        let outer_symbols = opt.symbol_ref_set.take();

        let (value, dependencies) = self.lookup_or_compute(object, kind, opt, cache, compute);

        opt.wrt_doc = saved_wrt;
        opt.symbol_ref_set = outer_symbols;
        if let (Some(outer), Some(deps)) = (opt.symbol_ref_set.as_mut(), dependencies) {
            outer.extend(deps);
        }
        value
    }

    fn lookup_or_compute<T: Default>(
        &self,
        object: ObjectId,
        kind: ResolvedKind,
        opt: &mut ResolveOptions,
        cache: &ResultMap<T>,
        compute: fn(&Self, ObjectId, &mut ResolveOptions) -> T,
    ) -> (Rc<T>, Option<SymbolSet>) {
        if let Some(key) = self.create_definition_cache_tag(opt, object, kind, "", false) {
            if let Some(hit) = cache.borrow().get(&key) {
                return (Rc::clone(hit), self.fetch_definition_reference_symbols(object, kind));
            }
        }
        if !self.cache.in_progress.borrow_mut().insert((object, kind)) {
            // Cyclic definition; the outer computation supplies the result.
            return (Rc::default(), None);
        }

        opt.symbol_ref_set = Some(SymbolSet::default());
        if let Some(name) = self.object_name(object) {
            opt.note_symbol(name);
        }
        let value = Rc::new(compute(self, object, opt));
        self.cache.in_progress.borrow_mut().remove(&(object, kind));

        let dependencies = opt.symbol_ref_set.take().unwrap_or_default();
        self.register_definition_reference_symbols(object, kind, dependencies.clone());
        if let Some(key) = self.create_definition_cache_tag(opt, object, kind, "", false) {
            cache.borrow_mut().insert(key, Rc::clone(&value));
        }
        (value, Some(dependencies))
    }

    // ------------------------------------------------------------------
    // Traits
    // ------------------------------------------------------------------

    fn compute_traits(&self, object: ObjectId, opt: &mut ResolveOptions) -> ResolvedTraitSet {
        let mut set = ResolvedTraitSet::default();
        let Some(obj) = self.object(object) else {
            return set;
        };
        let child = |slot: Slot| obj.child(slot).map(|c| ObjectId::new(object.doc, c));
        let children = |slot: Slot| -> Vec<ObjectId> {
            obj.children_in(slot).map(|c| ObjectId::new(object.doc, c)).collect()
        };

        match obj.kind {
            ObjectKind::TraitRef => {
                if let Some(applied) = self.apply_trait_reference(object, opt) {
                    set.merge(applied);
                }
                return set;
            }
            ObjectKind::TraitDef => {
                let parameters = self.fetch_all_parameters(object, opt);
                set.merge(ResolvedTrait {
                    trait_def: object,
                    trait_name: obj.name().unwrap_or_default().into(),
                    parameter_values: ParameterValueSet::with_defaults(self, parameters),
                });
                return set;
            }
            ObjectKind::EntityDef | ObjectKind::ConstantEntityDef => {
                if let Some(base) = child(Slot::ExtendsEntity) {
                    set.merge_set(&self.resolved_traits_with(base, opt));
                }
            }
            ObjectKind::PurposeDef => {
                if let Some(base) = child(Slot::ExtendsPurpose) {
                    set.merge_set(&self.resolved_traits_with(base, opt));
                }
            }
            ObjectKind::DataTypeDef => {
                if let Some(base) = child(Slot::ExtendsDataType) {
                    set.merge_set(&self.resolved_traits_with(base, opt));
                }
            }
            ObjectKind::TypeAttributeDef => {
                for slot in [Slot::DataType, Slot::Purpose] {
                    if let Some(source) = child(slot) {
                        set.merge_set(&self.resolved_traits_with(source, opt));
                    }
                }
            }
            ObjectKind::EntityAttributeDef => {
                if let Some(purpose) = child(Slot::Purpose) {
                    set.merge_set(&self.resolved_traits_with(purpose, opt));
                }
            }
            _ => {}
        }

        for trait_ref in children(Slot::ExhibitsTraits).into_iter().chain(children(Slot::AppliedTraits)) {
            if let Some(applied) = self.apply_trait_reference(trait_ref, opt) {
                set.merge(applied);
            }
        }
        set
    }

    /// The trait a reference names, with its arguments over the defaults.
    fn apply_trait_reference(&self, trait_ref: ObjectId, opt: &mut ResolveOptions) -> Option<ResolvedTrait> {
        let reference = self.object(trait_ref)?;
        let trait_def = self.resolve_with_default_viewpoint(trait_ref, opt)?;
        let parameters = self.fetch_all_parameters(trait_def, opt);
        let mut values = ParameterValueSet::with_defaults(self, parameters);

        for (ordinal, argument) in reference.children_in(Slot::Arguments).enumerate() {
            let Some(argument) = self.object(ObjectId::new(trait_ref.doc, argument)) else {
                continue;
            };
            let index = match argument.resolved_parameter() {
                Some(param) => values.parameters.index_of_parameter(param),
                None => values
                    .parameters
                    .resolve_parameter(ordinal, argument.name())
                    .ok()
                    .and_then(|param| values.parameters.index_of_parameter(param)),
            };
            if let Some(index) = index {
                values.set_value(index, argument.argument_value().cloned());
            }
        }

        Some(ResolvedTrait {
            trait_def,
            trait_name: self.object_name(trait_def).unwrap_or_default().into(),
            parameter_values: values,
        })
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    fn compute_attributes(&self, object: ObjectId, opt: &mut ResolveOptions) -> ResolvedAttributeSet {
        let mut set = ResolvedAttributeSet::default();
        let Some(obj) = self.object(object) else {
            return set;
        };
        let members = match obj.kind {
            ObjectKind::EntityDef => {
                if let Some(base) = obj.child(Slot::ExtendsEntity) {
                    let base = self.resolved_attributes_with(ObjectId::new(object.doc, base), opt);
                    for attribute in base.iter() {
                        set.merge(attribute.clone());
                    }
                }
                Slot::HasAttributes
            }
            ObjectKind::AttributeGroupDef => Slot::Members,
            _ => return set,
        };

        for member in obj.children_in(members) {
            let member = ObjectId::new(object.doc, member);
            let Some(member_obj) = self.object(member) else {
                continue;
            };
            match member_obj.kind {
                kind if kind.is_attribute() => {
                    if let Some(name) = member_obj.name() {
                        set.merge(ResolvedAttribute {
                            attribute: member,
                            name: name.into(),
                        });
                    }
                }
                ObjectKind::AttributeGroupRef => {
                    let group = self.resolved_attributes_with(member, opt);
                    for attribute in group.iter() {
                        set.merge(attribute.clone());
                    }
                }
                _ => {}
            }
        }
        set
    }

    // ------------------------------------------------------------------
    // Entity references
    // ------------------------------------------------------------------

    fn compute_entity_references(&self, object: ObjectId, opt: &mut ResolveOptions) -> ResolvedEntityReferenceSet {
        let mut set = ResolvedEntityReferenceSet::default();
        if self.object(object).map(|o| o.kind) != Some(ObjectKind::EntityDef) {
            return set;
        }

        let attributes = self.resolved_attributes_with(object, opt);
        for attribute in attributes.iter() {
            let Some(att_obj) = self.object(attribute.attribute) else {
                continue;
            };
            if att_obj.kind != ObjectKind::EntityAttributeDef {
                continue;
            }
            let Some(entity_ref) = att_obj.child(Slot::Entity) else {
                continue;
            };
            let entity_ref = ObjectId::new(attribute.attribute.doc, entity_ref);
            let Some(target) = self.resolve_with_default_viewpoint(entity_ref, opt) else {
                continue;
            };
            let identifying_attribute = self.identifying_attribute(target, opt);
            set.set.push(ResolvedEntityReference {
                attribute: attribute.attribute,
                attribute_name: attribute.name.clone(),
                target_reference: self.object_name(entity_ref).unwrap_or_default().into(),
                target,
                identifying_attribute,
            });
        }
        set
    }

    /// Leaf name of the attribute named by the entity's `is.identifiedBy`.
    fn identifying_attribute(&self, entity: ObjectId, opt: &mut ResolveOptions) -> Option<SmolStr> {
        let traits = self.resolved_traits_with(entity, opt);
        let identified_by = traits.find(IDENTIFIED_BY)?;
        match identified_by.parameter_values.value_at(0)? {
            ArgumentValue::Object(attribute) => self.object_name(*attribute).map(SmolStr::from),
            other => other.as_text().map(|text| SmolStr::from(last_segment(text))),
        }
    }
}

enum Redirect {
    Itself,
    To(ObjectId),
    Unresolved,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{DocId, LocalId};

    fn oid(n: u32) -> ObjectId {
        ObjectId::new(DocId(1), LocalId(n))
    }

    fn resolved(def: u32, name: &str) -> ResolvedTrait {
        let mut parameters = ParameterCollection::new();
        parameters.add("p", oid(100));
        ResolvedTrait {
            trait_def: oid(def),
            trait_name: name.into(),
            parameter_values: ParameterValueSet {
                parameters,
                values: vec![None],
                was_set: vec![false],
            },
        }
    }

    #[test]
    fn test_trait_merge_overrides_set_values_only() {
        let mut set = ResolvedTraitSet::default();
        let mut base = resolved(1, "t");
        base.parameter_values.set_value(0, Some(ArgumentValue::symbol("base")));
        set.merge(base);

        set.merge(resolved(1, "t"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.find("t").unwrap().parameter_values.fetch_value("p"), Some(&ArgumentValue::symbol("base")));

        let mut derived = resolved(1, "t");
        derived.parameter_values.set_value(0, Some(ArgumentValue::symbol("derived")));
        set.merge(derived);
        assert_eq!(set.find("t").unwrap().parameter_values.fetch_value("p"), Some(&ArgumentValue::symbol("derived")));
    }

    #[test]
    fn test_attribute_merge_replaces_in_place() {
        let mut set = ResolvedAttributeSet::default();
        set.merge(ResolvedAttribute { attribute: oid(1), name: "id".into() });
        set.merge(ResolvedAttribute { attribute: oid(2), name: "name".into() });
        set.merge(ResolvedAttribute { attribute: oid(3), name: "id".into() });

        assert_eq!(set.names(), vec!["id", "name"]);
        assert_eq!(set.get("id").map(|a| a.attribute), Some(oid(3)));
    }

    #[test]
    fn test_empty_trait_set_is_shared() {
        let corpus = Corpus::new();
        let opt = ResolveOptions::new(Some(DocId(1)));
        let a = corpus.create_empty_resolved_trait_set(&opt);
        let b = corpus.create_empty_resolved_trait_set(&opt);
        assert!(Rc::ptr_eq(&a, &b));
        assert!(a.is_empty());
    }
}
