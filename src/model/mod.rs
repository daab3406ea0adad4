//! Schema object model consumed by the resolution engine.
//!
//! Documents own an arena of [`CdmObject`]s; every cross-document link
//! (imports, priorities, resolved parameters) is held as an id, never as a
//! pointer into another document.

mod document;
mod kind;
mod object;
mod options;
mod visit;

pub use document::{Document, Folder, Import, ImportInfo, ImportPriorities};
pub use kind::{AttributeContextType, ObjectKind, Slot};
pub use object::{ArgumentValue, CdmObject, Payload};
pub use options::{DirectiveSet, ResolveOptions, SymbolSet};
pub use visit::Visitor;
