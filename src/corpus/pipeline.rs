//! The validation pipeline.
//!
//! Resolution advances through fixed stages. Each stage runs one action over
//! every loaded document before the next stage starts; the transition table
//! in [`stage_plan`] says which actions a stage runs and where it goes next.

use std::fmt;

use super::resolved::IDENTIFIED_BY;
use super::{COMPONENT, Corpus};
use crate::base::{DocId, LocalId, ObjectId};
use crate::error::{ResolveError, Result};
use crate::model::{DirectiveSet, Document, ObjectKind, ResolveOptions, Slot, Visitor};

/// Stages of the validation pipeline, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum ValidationStep {
    Start,
    TraitAppliers,
    /// Only meaningful as a target: stop once traits can be applied.
    MinimumForResolving,
    Traits,
    Attributes,
    EntityReferences,
    Finished,
    Error,
}

impl ValidationStep {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationStep::Start => "start",
            ValidationStep::TraitAppliers => "traitAppliers",
            ValidationStep::MinimumForResolving => "minimumForResolving",
            ValidationStep::Traits => "traits",
            ValidationStep::Attributes => "attributes",
            ValidationStep::EntityReferences => "entityReferences",
            ValidationStep::Finished => "finished",
            ValidationStep::Error => "error",
        }
    }
}

impl fmt::Display for ValidationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TRANSITION TABLE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StageAction {
    Noop,
    ResolveTraits,
    CheckRequiredArguments,
    ResolveAttributes,
    ResolveForeignKeys,
    CheckPrimaryKeys,
}

/// One sweep over every document.
#[derive(Clone, Copy, Debug)]
struct StagePass {
    message: &'static str,
    action: StageAction,
    /// Whether this sweep completes the stage.
    stage_finished: bool,
    next: ValidationStep,
}

impl StagePass {
    /// A completed stage ends the run when the target lies before the next
    /// stage; the last stage always ends it.
    fn finishes(&self, through: ValidationStep) -> bool {
        self.stage_finished && (through < self.next || self.next == ValidationStep::Finished)
    }
}

fn stage_plan(stage: ValidationStep) -> Option<&'static [StagePass]> {
    const TRAIT_APPLIERS: &[StagePass] = &[StagePass {
        message: "defining traits...",
        action: StageAction::Noop,
        stage_finished: true,
        next: ValidationStep::Traits,
    }];
    const TRAITS: &[StagePass] = &[
        StagePass {
            message: "resolving traits...",
            action: StageAction::ResolveTraits,
            stage_finished: false,
            next: ValidationStep::Traits,
        },
        StagePass {
            message: "checking required arguments...",
            action: StageAction::CheckRequiredArguments,
            stage_finished: true,
            next: ValidationStep::Attributes,
        },
    ];
    const ATTRIBUTES: &[StagePass] = &[StagePass {
        message: "resolving attributes...",
        action: StageAction::ResolveAttributes,
        stage_finished: true,
        next: ValidationStep::EntityReferences,
    }];
    const ENTITY_REFERENCES: &[StagePass] = &[
        StagePass {
            message: "resolving foreign key references...",
            action: StageAction::ResolveForeignKeys,
            stage_finished: false,
            next: ValidationStep::EntityReferences,
        },
        StagePass {
            message: "checking primary keys...",
            action: StageAction::CheckPrimaryKeys,
            stage_finished: true,
            next: ValidationStep::Finished,
        },
    ];

    match stage {
        ValidationStep::Start | ValidationStep::TraitAppliers => Some(TRAIT_APPLIERS),
        ValidationStep::Traits => Some(TRAITS),
        ValidationStep::Attributes => Some(ATTRIBUTES),
        ValidationStep::EntityReferences => Some(ENTITY_REFERENCES),
        _ => None,
    }
}

// ============================================================================
// DRIVER
// ============================================================================

impl Corpus {
    /// Run every stage from the start up to and including `through`.
    ///
    /// Returns the step the run ended on: [`ValidationStep::Finished`] on
    /// success, [`ValidationStep::Error`] if a stage could not run.
    pub async fn resolve_through(
        &mut self,
        through: ValidationStep,
        res_opt: Option<&ResolveOptions>,
    ) -> Result<ValidationStep> {
        if self.is_currently_resolving {
            let err = ResolveError::ReentrantResolution;
            self.reporter.report_error(COMPONENT, &err, "");
            return Err(err);
        }
        self.is_currently_resolving = true;

        let mut step = ValidationStep::Start;
        while step != ValidationStep::Finished && step != ValidationStep::Error {
            step = self.resolve_references_and_validate(step, through, res_opt).await;
        }

        self.is_currently_resolving = false;
        Ok(step)
    }

    /// Run one stage across all documents and return the next step.
    pub async fn resolve_references_and_validate(
        &mut self,
        stage: ValidationStep,
        through: ValidationStep,
        res_opt: Option<&ResolveOptions>,
    ) -> ValidationStep {
        let directives = res_opt
            .map(|o| o.directives.clone())
            .unwrap_or_else(DirectiveSet::relational);
        let opt = ResolveOptions::default()
            .with_directives(directives)
            .with_relationship_depth(0);

        for doc in self.library.list_all_documents() {
            self.index_if_needed(doc, &opt).await;
        }

        let Some(plan) = stage_plan(stage) else {
            let err = ResolveError::InvalidStage { step: stage.as_str() };
            self.reporter.report_error(COMPONENT, &err, "");
            return ValidationStep::Error;
        };

        let mut next = ValidationStep::Error;
        for pass in plan {
            self.reporter.debug(COMPONENT, pass.message, "");
            for doc in self.library.list_all_documents() {
                let wrt = opt.fork().with_wrt_doc(doc);
                self.run_stage_action(pass.action, doc, &wrt);
            }
            next = pass.next;
            if pass.finishes(through) {
                self.finish_resolve();
                return ValidationStep::Finished;
            }
        }
        next
    }

    fn run_stage_action(&self, action: StageAction, doc: DocId, res_opt: &ResolveOptions) {
        if action == StageAction::Noop {
            return;
        }
        let Some(d) = self.documents.get(&doc) else {
            return;
        };
        let mut visitor = StageVisitor {
            corpus: self,
            action,
            res_opt,
            entity_nesting: 0,
        };
        d.visit(&mut visitor);
    }

    /// Report every required parameter of `object`'s resolved traits that
    /// ended up without a value.
    fn check_required_parameters(&self, object: ObjectId, res_opt: &ResolveOptions) {
        let traits = self.fetch_resolved_traits(object, res_opt);
        let object_name = self.object_name(object).unwrap_or_default();
        let path = self.object_corpus_path(object).unwrap_or_default();

        for resolved in traits.iter() {
            let values = &resolved.parameter_values;
            let mut found = 0;
            let mut resolved_count = 0;
            for (ordinal, (param_name, param)) in values.parameters.iter().enumerate() {
                if !self.object(param).is_some_and(|p| p.is_required_parameter()) {
                    continue;
                }
                found += 1;
                if values.value_at(ordinal).is_none() {
                    let err = ResolveError::MissingRequiredTraitArgument {
                        parameter: param_name.into(),
                        trait_name: resolved.trait_name.clone(),
                        object: object_name.into(),
                    };
                    self.reporter.report_error(COMPONENT, &err, path.as_str());
                } else {
                    resolved_count += 1;
                }
            }
            if found > 0 && found == resolved_count {
                self.reporter.info(
                    COMPONENT,
                    format!(
                        "found and resolved '{found}' required parameters of trait '{}' on '{object_name}'",
                        resolved.trait_name
                    ),
                    path.as_str(),
                );
            }
        }
    }

    /// Warn when an entity's resolved traits do not say which attribute
    /// identifies it.
    fn check_primary_key(&self, entity: ObjectId, res_opt: &ResolveOptions) {
        if self.fetch_resolved_traits(entity, res_opt).find(IDENTIFIED_BY).is_some() {
            return;
        }
        let err = ResolveError::MissingPrimaryKey {
            entity: self.object_name(entity).unwrap_or_default().into(),
        };
        let path = self.object_corpus_path(entity).unwrap_or_default();
        self.reporter.report_error(COMPONENT, &err, path);
    }
}

// ============================================================================
// STAGE VISITOR
// ============================================================================

/// Runs one stage action over a document, tracking how deeply entities and
/// attribute groups are nested.
struct StageVisitor<'a> {
    corpus: &'a Corpus,
    action: StageAction,
    res_opt: &'a ResolveOptions,
    entity_nesting: u32,
}

impl StageVisitor<'_> {
    fn check_with_attributes(&self, doc: &Document, id: LocalId, members: Slot) {
        let object = doc.handle(id);
        self.corpus.check_required_parameters(object, self.res_opt);
        let Some(obj) = doc.object(id) else {
            return;
        };
        for attribute in obj.children_in(members) {
            if doc.object(attribute).is_some_and(|a| a.kind.is_attribute()) {
                self.corpus.check_required_parameters(doc.handle(attribute), self.res_opt);
            }
        }
    }
}

impl Visitor for StageVisitor<'_> {
    fn visit_pre(&mut self, doc: &Document, id: LocalId, _path: &str) -> bool {
        let Some(kind) = doc.object(id).map(|o| o.kind) else {
            return false;
        };
        let object = doc.handle(id);
        let nests = matches!(kind, ObjectKind::EntityDef | ObjectKind::AttributeGroupDef);
        if nests {
            self.entity_nesting += 1;
        }
        let outermost = nests && self.entity_nesting == 1;

        match self.action {
            StageAction::Noop => {}
            StageAction::ResolveTraits => match kind {
                ObjectKind::EntityDef | ObjectKind::AttributeGroupDef if outermost => {
                    self.corpus.fetch_resolved_traits(object, self.res_opt);
                }
                ObjectKind::TraitDef
                | ObjectKind::PurposeDef
                | ObjectKind::DataTypeDef
                | ObjectKind::TypeAttributeDef
                | ObjectKind::EntityAttributeDef => {
                    self.corpus.fetch_resolved_traits(object, self.res_opt);
                }
                _ => {}
            },
            StageAction::CheckRequiredArguments => match kind {
                ObjectKind::EntityDef => self.check_with_attributes(doc, id, Slot::HasAttributes),
                ObjectKind::AttributeGroupDef => self.check_with_attributes(doc, id, Slot::Members),
                _ => {}
            },
            StageAction::ResolveAttributes => {
                if outermost {
                    self.corpus.fetch_resolved_attributes(object, self.res_opt);
                }
            }
            StageAction::ResolveForeignKeys => {
                if outermost && kind == ObjectKind::EntityDef {
                    self.corpus.fetch_resolved_entity_references(object, self.res_opt);
                }
            }
            StageAction::CheckPrimaryKeys => {
                if kind == ObjectKind::EntityDef && doc.definitions().contains(&id) {
                    self.corpus.check_primary_key(object, self.res_opt);
                }
            }
        }
        false
    }

    fn visit_post(&mut self, doc: &Document, id: LocalId, _path: &str) -> bool {
        if doc
            .object(id)
            .is_some_and(|o| matches!(o.kind, ObjectKind::EntityDef | ObjectKind::AttributeGroupDef))
        {
            self.entity_nesting = self.entity_nesting.saturating_sub(1);
        }
        false
    }
}
