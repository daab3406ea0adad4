//! Resolution errors.

use smol_str::SmolStr;
use thiserror::Error;

use crate::diagnostics::{StatusLevel, codes};
use crate::model::ObjectKind;

/// Result type used across the corpus.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Everything that can go wrong while loading and resolving a corpus.
///
/// None of these abort a pass; the corpus reports them and carries on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unable to resolve import for '{path}'")]
    MissingImport { path: SmolStr },

    #[error("duplicate declaration for item '{path}'")]
    DuplicateDeclaration { path: SmolStr },

    #[error("Unable to resolve the reference '{reference}' to a known object")]
    UnresolvedReference { reference: SmolStr },

    #[error("expected type {}", expected.label())]
    KindMismatch { symbol: SmolStr, expected: ObjectKind, found: ObjectKind },

    #[error("no support for absolute references yet. fix '{symbol}'")]
    UnsupportedAbsoluteReference { symbol: SmolStr },

    #[error("no argument supplied for required parameter '{parameter}' of trait '{trait_name}' on '{object}'")]
    MissingRequiredTraitArgument {
        parameter: SmolStr,
        trait_name: SmolStr,
        object: SmolStr,
    },

    #[error("The namespace '{namespace}' has not been registered")]
    AdapterNotFound { namespace: SmolStr },

    #[error("there is no parameter named '{name}'")]
    UnknownParameter { name: SmolStr },

    #[error("too many arguments supplied")]
    TooManyArguments,

    #[error(
        "parameter '{parameter}' has the dataType of '{expected}' but the value '{value}' doesn't resolve to a known {expected} reference"
    )]
    ParameterTypeMismatch {
        parameter: SmolStr,
        expected: &'static str,
        value: SmolStr,
    },

    #[error("parameter '{parameter}' has an unexpected dataType.")]
    UnexpectedDataType { parameter: SmolStr },

    #[error("integrity check failed for : '{path}'")]
    IntegrityCheckFailed { path: SmolStr },

    #[error("There is a primary key missing for the entity {entity}.")]
    MissingPrimaryKey { entity: SmolStr },

    #[error("a resolution is already in progress")]
    ReentrantResolution,

    #[error("invalid validation step '{step}'")]
    InvalidStage { step: &'static str },
}

impl ResolveError {
    /// Diagnostic code reported alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::MissingImport { .. } => codes::MISSING_IMPORT,
            ResolveError::DuplicateDeclaration { .. } => codes::DUPLICATE_DECLARATION,
            ResolveError::UnresolvedReference { .. } => codes::UNRESOLVED_REFERENCE,
            ResolveError::KindMismatch { .. } => codes::KIND_MISMATCH,
            ResolveError::UnsupportedAbsoluteReference { .. } => codes::ABSOLUTE_REFERENCE,
            ResolveError::MissingRequiredTraitArgument { .. } => codes::MISSING_REQUIRED_ARGUMENT,
            ResolveError::AdapterNotFound { .. } => codes::ADAPTER_NOT_FOUND,
            ResolveError::UnknownParameter { .. } | ResolveError::TooManyArguments => codes::PARAMETER_RESOLUTION,
            ResolveError::ParameterTypeMismatch { .. } | ResolveError::UnexpectedDataType { .. } => {
                codes::PARAMETER_TYPE
            }
            ResolveError::IntegrityCheckFailed { .. } => codes::INTEGRITY_CHECK,
            ResolveError::MissingPrimaryKey { .. } => codes::MISSING_PRIMARY_KEY,
            ResolveError::ReentrantResolution => codes::REENTRANT_RESOLUTION,
            ResolveError::InvalidStage { .. } => codes::INVALID_STAGE,
        }
    }

    /// Level the error is reported at when nothing overrides it.
    pub fn level(&self) -> StatusLevel {
        match self {
            ResolveError::MissingImport { .. } | ResolveError::MissingPrimaryKey { .. } => StatusLevel::Warning,
            _ => StatusLevel::Error,
        }
    }
}
