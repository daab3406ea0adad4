//! Foundation types for the corpus.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`DocId`], [`LocalId`], [`ObjectId`] - Document and object handles
//! - [`path`] - Corpus path parsing helpers
//!
//! This module has NO dependencies on other cdm modules.

mod ids;
pub mod path;

pub use ids::{DocId, LocalId, ObjectId};
