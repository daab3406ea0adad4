//! Object kinds, child slots and attribute-context types.

use std::fmt;

// ============================================================================
// OBJECT KIND
// ============================================================================

/// The concrete kind of a schema object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectKind {
    /// Placeholder kind; as an expected kind it disables the kind check.
    Error,
    ArgumentDef,
    ParameterDef,
    TraitDef,
    TraitRef,
    PurposeDef,
    PurposeRef,
    DataTypeDef,
    DataTypeRef,
    TypeAttributeDef,
    EntityAttributeDef,
    AttributeRef,
    AttributeGroupDef,
    AttributeGroupRef,
    ConstantEntityDef,
    EntityDef,
    EntityRef,
    AttributeContextDef,
    AttributeContextRef,
    LocalEntityDeclarationDef,
    ReferencedEntityDeclarationDef,
    ManifestDeclarationDef,
}

impl ObjectKind {
    /// Kinds that get an entry in the symbol table when declared.
    pub fn is_declarable(self) -> bool {
        matches!(
            self,
            ObjectKind::EntityDef
                | ObjectKind::ParameterDef
                | ObjectKind::TraitDef
                | ObjectKind::PurposeDef
                | ObjectKind::DataTypeDef
                | ObjectKind::TypeAttributeDef
                | ObjectKind::EntityAttributeDef
                | ObjectKind::AttributeGroupDef
                | ObjectKind::ConstantEntityDef
                | ObjectKind::AttributeContextDef
                | ObjectKind::LocalEntityDeclarationDef
                | ObjectKind::ReferencedEntityDeclarationDef
        )
    }

    /// Kinds that name another object symbolically.
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            ObjectKind::AttributeRef
                | ObjectKind::AttributeGroupRef
                | ObjectKind::AttributeContextRef
                | ObjectKind::DataTypeRef
                | ObjectKind::EntityRef
                | ObjectKind::PurposeRef
                | ObjectKind::TraitRef
        )
    }

    pub fn is_attribute(self) -> bool {
        matches!(self, ObjectKind::TypeAttributeDef | ObjectKind::EntityAttributeDef)
    }

    /// The definition kind a resolved symbol must have when looked up with
    /// `self` as the expected kind. `None` means any kind is accepted.
    pub fn required_definition(self) -> Option<ObjectKind> {
        match self {
            ObjectKind::TraitRef => Some(ObjectKind::TraitDef),
            ObjectKind::DataTypeRef => Some(ObjectKind::DataTypeDef),
            ObjectKind::EntityRef => Some(ObjectKind::EntityDef),
            ObjectKind::ParameterDef => Some(ObjectKind::ParameterDef),
            ObjectKind::PurposeRef => Some(ObjectKind::PurposeDef),
            ObjectKind::AttributeGroupRef => Some(ObjectKind::AttributeGroupDef),
            _ => None,
        }
    }

    /// Short label used in kind-mismatch messages ("expected type trait").
    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::TraitDef | ObjectKind::TraitRef => "trait",
            ObjectKind::DataTypeDef | ObjectKind::DataTypeRef => "dataType",
            ObjectKind::EntityDef | ObjectKind::EntityRef | ObjectKind::ConstantEntityDef => "entity",
            ObjectKind::ParameterDef => "parameter",
            ObjectKind::PurposeDef | ObjectKind::PurposeRef => "purpose",
            ObjectKind::AttributeGroupDef | ObjectKind::AttributeGroupRef => "attributeGroup",
            ObjectKind::TypeAttributeDef | ObjectKind::EntityAttributeDef | ObjectKind::AttributeRef => {
                "attribute"
            }
            ObjectKind::AttributeContextDef | ObjectKind::AttributeContextRef => "attributeContext",
            ObjectKind::ArgumentDef => "argument",
            ObjectKind::LocalEntityDeclarationDef
            | ObjectKind::ReferencedEntityDeclarationDef => "entityDeclaration",
            ObjectKind::ManifestDeclarationDef => "manifestDeclaration",
            ObjectKind::Error => "error",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Error => "error",
            ObjectKind::ArgumentDef => "argumentDef",
            ObjectKind::ParameterDef => "parameterDef",
            ObjectKind::TraitDef => "traitDef",
            ObjectKind::TraitRef => "traitRef",
            ObjectKind::PurposeDef => "purposeDef",
            ObjectKind::PurposeRef => "purposeRef",
            ObjectKind::DataTypeDef => "dataTypeDef",
            ObjectKind::DataTypeRef => "dataTypeRef",
            ObjectKind::TypeAttributeDef => "typeAttributeDef",
            ObjectKind::EntityAttributeDef => "entityAttributeDef",
            ObjectKind::AttributeRef => "attributeRef",
            ObjectKind::AttributeGroupDef => "attributeGroupDef",
            ObjectKind::AttributeGroupRef => "attributeGroupRef",
            ObjectKind::ConstantEntityDef => "constantEntityDef",
            ObjectKind::EntityDef => "entityDef",
            ObjectKind::EntityRef => "entityRef",
            ObjectKind::AttributeContextDef => "attributeContextDef",
            ObjectKind::AttributeContextRef => "attributeContextRef",
            ObjectKind::LocalEntityDeclarationDef => "localEntityDeclarationDef",
            ObjectKind::ReferencedEntityDeclarationDef => "referencedEntityDeclarationDef",
            ObjectKind::ManifestDeclarationDef => "manifestDeclarationDef",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SLOTS
// ============================================================================

/// The property of a parent object a child hangs off.
///
/// The slot name becomes a path segment, so an attribute `id` of entity
/// `Customer` is declared as `Customer/hasAttributes/id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    ExhibitsTraits,
    AppliedTraits,
    HasAttributes,
    HasParameters,
    Arguments,
    ExtendsEntity,
    ExtendsTrait,
    ExtendsDataType,
    ExtendsPurpose,
    DataType,
    Purpose,
    Entity,
    Members,
    AttributeContext,
    Contents,
    Definition,
}

impl Slot {
    pub fn segment(self) -> &'static str {
        match self {
            Slot::ExhibitsTraits => "exhibitsTraits",
            Slot::AppliedTraits => "appliedTraits",
            Slot::HasAttributes => "hasAttributes",
            Slot::HasParameters => "hasParameters",
            Slot::Arguments => "arguments",
            Slot::ExtendsEntity => "extendsEntity",
            Slot::ExtendsTrait => "extendsTrait",
            Slot::ExtendsDataType => "extendsDataType",
            Slot::ExtendsPurpose => "extendsPurpose",
            Slot::DataType => "dataType",
            Slot::Purpose => "purpose",
            Slot::Entity => "entity",
            Slot::Members => "members",
            Slot::AttributeContext => "attributeContext",
            Slot::Contents => "contents",
            Slot::Definition => "definition",
        }
    }
}

// ============================================================================
// ATTRIBUTE CONTEXT TYPE
// ============================================================================

/// What step of attribute resolution an attribute-context node records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeContextType {
    Entity,
    EntityReferenceExtends,
    AttributeDefinition,
    AttributeGroup,
    GeneratedSet,
    GeneratedRound,
    AddedAttributeIdentity,
    AddedAttributeSupporting,
    PassThrough,
    Unknown,
}
