//! Schema objects stored in a document's arena.

use smol_str::SmolStr;

use super::kind::{AttributeContextType, ObjectKind, Slot};
use crate::base::{LocalId, ObjectId};

/// The value carried by a trait argument or a parameter default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgumentValue {
    /// Text that is either a literal or a symbolic reference, depending on the
    /// data type of the parameter it binds to.
    Symbol(SmolStr),
    /// A value that has been resolved to a declared object.
    Object(ObjectId),
    /// A reference to an attribute that can only be looked up once
    /// attributes have been resolved.
    AttributeReference(SmolStr),
}

impl ArgumentValue {
    pub fn symbol(text: impl Into<SmolStr>) -> Self {
        ArgumentValue::Symbol(text.into())
    }

    /// The text form of the value, if it has one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArgumentValue::Symbol(s) | ArgumentValue::AttributeReference(s) => Some(s),
            ArgumentValue::Object(_) => None,
        }
    }
}

/// Kind-specific state of an object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Payload {
    #[default]
    None,
    TraitReference {
        arguments_resolved: bool,
    },
    Parameter {
        required: bool,
        default_value: Option<ArgumentValue>,
    },
    Argument {
        value: Option<ArgumentValue>,
        resolved_parameter: Option<ObjectId>,
    },
    AttributeContext {
        context_type: AttributeContextType,
    },
    EntityDeclaration {
        entity_path: SmolStr,
    },
    ManifestDeclaration {
        definition: SmolStr,
    },
}

/// A node of a document's definition tree.
#[derive(Clone, Debug)]
pub struct CdmObject {
    pub kind: ObjectKind,
    /// Declared name for definitions, named reference for references.
    pub name: Option<SmolStr>,
    pub parent: Option<LocalId>,
    pub children: Vec<(Slot, LocalId)>,
    pub payload: Payload,
}

impl CdmObject {
    pub fn new(kind: ObjectKind, name: Option<SmolStr>) -> Self {
        let payload = match kind {
            ObjectKind::TraitRef => Payload::TraitReference { arguments_resolved: false },
            ObjectKind::ParameterDef => Payload::Parameter { required: false, default_value: None },
            ObjectKind::ArgumentDef => Payload::Argument { value: None, resolved_parameter: None },
            ObjectKind::AttributeContextDef => Payload::AttributeContext {
                context_type: AttributeContextType::Unknown,
            },
            _ => Payload::None,
        };
        Self {
            kind,
            name,
            parent: None,
            children: Vec::new(),
            payload,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Children stored under a given slot, in insertion order.
    pub fn children_in(&self, slot: Slot) -> impl Iterator<Item = LocalId> + '_ {
        self.children
            .iter()
            .filter(move |(s, _)| *s == slot)
            .map(|(_, id)| *id)
    }

    /// The first child in a slot (e.g. `extendsEntity`, `dataType`).
    pub fn child(&self, slot: Slot) -> Option<LocalId> {
        self.children_in(slot).next()
    }

    /// The path segment this object contributes when visited.
    pub fn path_segment(&self) -> &str {
        match (&self.name, self.kind.is_reference()) {
            (Some(name), _) => name,
            (None, true) => "(ref)",
            (None, false) => "(unspecified)",
        }
    }

    pub fn context_type(&self) -> Option<AttributeContextType> {
        match self.payload {
            Payload::AttributeContext { context_type } => Some(context_type),
            _ => None,
        }
    }

    pub fn argument_value(&self) -> Option<&ArgumentValue> {
        match &self.payload {
            Payload::Argument { value, .. } => value.as_ref(),
            _ => None,
        }
    }

    pub fn resolved_parameter(&self) -> Option<ObjectId> {
        match self.payload {
            Payload::Argument { resolved_parameter, .. } => resolved_parameter,
            _ => None,
        }
    }

    pub fn arguments_resolved(&self) -> bool {
        matches!(self.payload, Payload::TraitReference { arguments_resolved: true })
    }

    pub fn is_required_parameter(&self) -> bool {
        matches!(self.payload, Payload::Parameter { required: true, .. })
    }

    pub fn default_value(&self) -> Option<&ArgumentValue> {
        match &self.payload {
            Payload::Parameter { default_value, .. } => default_value.as_ref(),
            _ => None,
        }
    }

    /// Basic integrity rule checked before a document is indexed.
    pub fn validate(&self) -> bool {
        let named = self.name.as_deref().is_some_and(|n| !n.is_empty());
        match (&self.kind, &self.payload) {
            (ObjectKind::ArgumentDef, Payload::Argument { value, .. }) => value.is_some(),
            (_, Payload::EntityDeclaration { entity_path }) => named && !entity_path.is_empty(),
            (_, Payload::ManifestDeclaration { definition }) => named && !definition.is_empty(),
            (kind, _) if kind.is_reference() => named,
            (
                ObjectKind::EntityDef
                | ObjectKind::TraitDef
                | ObjectKind::PurposeDef
                | ObjectKind::DataTypeDef
                | ObjectKind::ParameterDef
                | ObjectKind::TypeAttributeDef
                | ObjectKind::EntityAttributeDef
                | ObjectKind::AttributeGroupDef
                | ObjectKind::AttributeContextDef,
                _,
            ) => named,
            _ => true,
        }
    }
}
