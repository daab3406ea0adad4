//! # cdm-corpus
//!
//! Resolution engine for a corpus of schema documents: loading import
//! closures, ranking imports, resolving symbols, staged validation, and
//! building the entity relationship graph.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! corpus      → Load registry, indexing passes, resolution, pipeline, relationships
//!   ↓
//! storage     → Namespace-mounted document adapters
//!   ↓
//! model       → Documents, objects, imports, options, visitor
//!   ↓
//! diagnostics → Status events, codes, reporter
//!   ↓
//! base        → Ids and corpus path helpers
//! ```

// ============================================================================
// MODULES
// ============================================================================

/// Foundation types: document and object ids, corpus paths
pub mod base;

/// Status events, diagnostic codes and the event reporter
pub mod diagnostics;

/// Resolution errors
pub mod error;

/// Schema object model
pub mod model;

/// Document storage adapters
pub mod storage;

/// The resolution session
pub mod corpus;

// Re-export commonly needed items
pub use base::{DocId, LocalId, ObjectId};
pub use corpus::{Corpus, E2ERelationship, ValidationStep};
pub use diagnostics::{StatusEvent, StatusLevel};
pub use error::{ResolveError, Result};
pub use model::{ArgumentValue, DirectiveSet, Document, ObjectKind, ResolveOptions, Slot};
pub use storage::{MemoryAdapter, StorageAdapter};
