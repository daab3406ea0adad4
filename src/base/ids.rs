//! Identifiers for documents and the objects they own.

use std::fmt;

/// An identifier for a document held by a corpus.
///
/// `DocId` is a lightweight handle (just a u32). Ids are handed out by the
/// corpus when a document is attached and are never reused within a
/// session, which is what makes them safe to embed in cache keys.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocId(pub u32);

impl DocId {
    /// Create a new DocId from a raw index.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocId({})", self.0)
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DocId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<DocId> for u32 {
    #[inline]
    fn from(id: DocId) -> Self {
        id.0
    }
}

/// Index of an object inside its document's arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalId(pub u32);

impl LocalId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalId({})", self.0)
    }
}

/// A globally unique object handle: document plus arena slot.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectId {
    pub doc: DocId,
    pub local: LocalId,
}

impl ObjectId {
    #[inline]
    pub const fn new(doc: DocId, local: LocalId) -> Self {
        Self { doc, local }
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}:{})", self.doc.0, self.local.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Unique per session, mirrors the numeric object ids used in cache keys.
        write!(f, "{}_{}", self.doc.0, self.local.0)
    }
}
