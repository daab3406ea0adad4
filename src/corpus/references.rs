//! Reference resolution pass and constant type-checking of argument values.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::{COMPONENT, Corpus};
use crate::base::path::{THIS_ATTRIBUTE, attribute_promise_offset};
use crate::base::{DocId, LocalId, ObjectId};
use crate::diagnostics::StatusLevel;
use crate::error::ResolveError;
use crate::model::{ArgumentValue, Document, ObjectKind, Payload, ResolveOptions, Slot, Visitor};

/// Data type every object-valued parameter type derives from.
const CDM_OBJECT: &str = "cdmObject";

/// Object-valued parameter data types and the kinds a value may have.
const EXPECTED_KINDS: &[(&str, &[ObjectKind])] = &[
    (
        "entity",
        &[ObjectKind::ConstantEntityDef, ObjectKind::EntityRef, ObjectKind::EntityDef],
    ),
    (
        "attribute",
        &[
            ObjectKind::AttributeRef,
            ObjectKind::TypeAttributeDef,
            ObjectKind::EntityAttributeDef,
        ],
    ),
    ("dataType", &[ObjectKind::DataTypeRef, ObjectKind::DataTypeDef]),
    ("purpose", &[ObjectKind::PurposeRef, ObjectKind::PurposeDef]),
    ("trait", &[ObjectKind::TraitRef, ObjectKind::TraitDef]),
    (
        "attributeGroup",
        &[ObjectKind::AttributeGroupRef, ObjectKind::AttributeGroupDef],
    ),
];

// ============================================================================
// REFERENCE PASS
// ============================================================================

struct ReferenceResolver<'a> {
    corpus: &'a Corpus,
    res_opt: ResolveOptions,
    parameters: Vec<LocalId>,
}

impl Visitor for ReferenceResolver<'_> {
    fn visit_pre(&mut self, doc: &Document, id: LocalId, path: &str) -> bool {
        let Some(object) = doc.object(id) else {
            return false;
        };
        if !object.kind.is_reference() {
            return false;
        }
        let Some(reference) = object.name() else {
            return false;
        };
        // Attribute promises are resolved with the attributes themselves.
        if attribute_promise_offset(reference).is_some() {
            return false;
        }

        let mut opt = self.res_opt.fork();
        opt.wrt_doc = Some(doc.id());
        if self.corpus.fetch_object_definition(doc.handle(id), &mut opt).is_none() {
            let err = ResolveError::UnresolvedReference {
                reference: reference.into(),
            };
            let level = if self.res_opt.shallow_validation {
                StatusLevel::Warning
            } else {
                StatusLevel::Error
            };
            self.corpus
                .reporter()
                .report_error_at(COMPONENT, &err, level, format!("{}{}", doc.folder_path(), path));
        }
        false
    }

    fn visit_post(&mut self, doc: &Document, id: LocalId, _path: &str) -> bool {
        if doc.object(id).is_some_and(|o| o.kind == ObjectKind::ParameterDef) {
            self.parameters.push(id);
        }
        false
    }
}

impl Corpus {
    /// Resolve every named reference in `doc` from the document's own
    /// viewpoint and type-check parameter defaults. Failures are reported
    /// and the pass moves on.
    pub(crate) fn resolve_object_definitions(&mut self, doc_id: DocId, res_opt: &ResolveOptions) {
        let Some(doc) = self.documents.get(&doc_id) else {
            return;
        };
        let mut pass = ReferenceResolver {
            corpus: self,
            res_opt: res_opt.fork(),
            parameters: Vec::new(),
        };
        doc.visit(&mut pass);

        let mut opt = res_opt.fork();
        opt.wrt_doc = Some(doc_id);
        let mut defaults = Vec::new();
        for param in pass.parameters {
            let handle = ObjectId::new(doc_id, param);
            let current = self.object(handle).and_then(|o| o.default_value().cloned());
            if current.is_none() {
                continue;
            }
            let checked = self.const_type_check(&mut opt, doc_id, handle, None);
            if checked != current {
                defaults.push((param, checked));
            }
        }

        let Some(doc) = self.documents.get_mut(&doc_id) else {
            return;
        };
        for (param, value) in defaults {
            if let Some(object) = doc.object_mut(param) {
                if let Payload::Parameter { default_value, .. } = &mut object.payload {
                    *default_value = value;
                }
            }
        }
    }

    // ========================================================================
    // CONSTANT TYPE-CHECK
    // ========================================================================

    /// Check that an argument value (or the parameter's default when `value`
    /// is `None`) fits the parameter's object-valued data type.
    ///
    /// Returns the value to store: a resolved object, a deferred attribute
    /// reference, or the input unchanged.
    pub fn const_type_check(
        &self,
        res_opt: &mut ResolveOptions,
        current_doc: DocId,
        parameter: ObjectId,
        value: Option<ArgumentValue>,
    ) -> Option<ArgumentValue> {
        let param = self.object(parameter)?;
        let param_name = SmolStr::from(param.name().unwrap_or_default());
        let mut replacement = value.clone();

        let Some(dt_ref) = param.child(Slot::DataType) else {
            return replacement;
        };
        let saved_wrt = res_opt.wrt_doc.replace(current_doc);
        let data_type = self.fetch_object_definition(ObjectId::new(parameter.doc, dt_ref), res_opt);
        res_opt.wrt_doc = saved_wrt;
        let Some(data_type) = data_type else {
            return replacement;
        };

        let value = match value {
            Some(v) => v,
            None => match param.default_value() {
                Some(default) => {
                    replacement = Some(default.clone());
                    default.clone()
                }
                None => return replacement,
            },
        };

        if !self.is_derived_from(data_type, CDM_OBJECT, res_opt) {
            return replacement;
        }

        let Some((expected, expected_kinds)) = EXPECTED_KINDS
            .iter()
            .find(|(base, _)| self.is_derived_from(data_type, base, res_opt))
            .copied()
        else {
            let err = ResolveError::UnexpectedDataType { parameter: param_name };
            self.reporter().report_error(COMPONENT, &err, self.object_corpus_path(parameter).unwrap_or_default());
            return replacement;
        };

        let found_kind = match &value {
            ArgumentValue::Object(object) => self.object(*object).map(|o| o.kind),
            ArgumentValue::AttributeReference(_) => Some(ObjectKind::AttributeRef),
            ArgumentValue::Symbol(text) if text == THIS_ATTRIBUTE && expected == "attribute" => {
                replacement = Some(ArgumentValue::AttributeReference(text.clone()));
                Some(ObjectKind::AttributeRef)
            }
            ArgumentValue::Symbol(text) if attribute_promise_offset(text).is_some() => {
                replacement = Some(ArgumentValue::AttributeReference(text.clone()));
                Some(ObjectKind::AttributeRef)
            }
            ArgumentValue::Symbol(text) => {
                let saved_wrt = res_opt.wrt_doc.replace(current_doc);
                let found = self.resolve_symbol_reference(res_opt, Some(current_doc), text, ObjectKind::Error, true);
                res_opt.wrt_doc = saved_wrt;
                match found {
                    Some(_) if expected == "attribute" => {
                        replacement = Some(ArgumentValue::AttributeReference(text.clone()));
                        Some(ObjectKind::AttributeRef)
                    }
                    Some(object) => {
                        replacement = Some(ArgumentValue::Object(object));
                        self.object(object).map(|o| o.kind)
                    }
                    None => None,
                }
            }
        };

        let text = match &value {
            ArgumentValue::Object(object) => SmolStr::from(self.object_name(*object).unwrap_or_default()),
            other => SmolStr::from(other.as_text().unwrap_or_default()),
        };
        match found_kind {
            Some(kind) if expected_kinds.contains(&kind) => {
                self.reporter()
                    .debug(COMPONENT, format!("resolved '{text}'"), self.object_corpus_path(parameter).unwrap_or_default());
            }
            _ => {
                let err = ResolveError::ParameterTypeMismatch {
                    parameter: param_name,
                    expected,
                    value: text,
                };
                self.reporter()
                    .report_error(COMPONENT, &err, self.object_corpus_path(parameter).unwrap_or_default());
            }
        }
        replacement
    }

    /// Whether a data type is `base` or extends it, directly or not.
    pub fn is_derived_from(&self, data_type: ObjectId, base: &str, res_opt: &mut ResolveOptions) -> bool {
        let mut seen = FxHashSet::default();
        let mut current = Some(data_type);
        while let Some(dt) = current {
            if !seen.insert(dt) {
                return false;
            }
            let Some(object) = self.object(dt) else {
                return false;
            };
            if object.name() == Some(base) {
                return true;
            }
            let Some(extends) = object.child(Slot::ExtendsDataType) else {
                return false;
            };
            let extends = ObjectId::new(dt.doc, extends);
            if self.object_name(extends) == Some(base) {
                return true;
            }
            current = self.fetch_object_definition(extends, res_opt);
        }
        false
    }
}
