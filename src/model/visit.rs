//! Pre/post-order traversal of a document's object tree.
//!
//! Both callbacks receive the object's path (the same path it is declared
//! under) and return `true` to stop the whole traversal.

use super::document::Document;
use crate::base::LocalId;

/// Callbacks for [`Document::visit`].
pub trait Visitor {
    fn visit_pre(&mut self, _doc: &Document, _id: LocalId, _path: &str) -> bool {
        false
    }

    fn visit_post(&mut self, _doc: &Document, _id: LocalId, _path: &str) -> bool {
        false
    }
}

impl Document {
    /// Visit every definition, entity declaration and sub-manifest
    /// declaration in document order. Returns `true` if a callback stopped
    /// the traversal.
    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) -> bool {
        let roots = self
            .definitions()
            .iter()
            .chain(self.entity_declarations())
            .chain(self.sub_manifests());
        for &root in roots {
            if self.visit_object(root, "", visitor) {
                return true;
            }
        }
        false
    }

    /// Visit one object and its subtree. `path_from` is the prefix the
    /// object's own segment is appended to.
    pub fn visit_object<V: Visitor + ?Sized>(&self, id: LocalId, path_from: &str, visitor: &mut V) -> bool {
        let Some(object) = self.object(id) else {
            return false;
        };
        let path = format!("{}{}", path_from, object.path_segment());

        if visitor.visit_pre(self, id, &path) {
            return true;
        }
        for (slot, child) in &object.children {
            let prefix = format!("{}/{}/", path, slot.segment());
            if self.visit_object(*child, &prefix, visitor) {
                return true;
            }
        }
        visitor.visit_post(self, id, &path)
    }
}
