//! Corpus path helpers.
//!
//! Corpus paths look like `namespace:/folder/sub/doc.cdm.json/Object/path`.
//! The part up to and including the document extension addresses a document;
//! whatever follows addresses a declared object inside it.

/// Extension carried by every document path.
pub const DOCUMENT_EXTENSION: &str = ".cdm.json";

/// Extension carried by manifest documents.
pub const MANIFEST_EXTENSION: &str = ".manifest.cdm.json";

/// Marker for a reference into a resolved attribute list that cannot be
/// looked up until attributes have been resolved.
pub const ATTRIBUTE_PROMISE: &str = "(resolvedAttributes)/";

/// Literal argument value meaning "the attribute carrying this trait".
pub const THIS_ATTRIBUTE: &str = "this.attribute";

/// Prefix given to transient entities created for relationship extraction.
pub const WRT_SELF_PREFIX: &str = "wrtSelf_";

/// Split `ns:/path` into its namespace and the remaining path.
///
/// A colon only counts as a namespace separator when it comes before the
/// first `/`.
pub fn split_namespace_path(path: &str) -> (Option<&str>, &str) {
    match path.find(':') {
        Some(colon) if path[..colon].find('/').is_none() => {
            (Some(&path[..colon]), &path[colon + 1..])
        }
        _ => (None, path),
    }
}

/// Split an absolute object path into the document path and the object path
/// inside that document, if any.
pub fn split_document_path(path: &str) -> (&str, Option<&str>) {
    match path.rfind(DOCUMENT_EXTENSION) {
        Some(at) => {
            let end = at + DOCUMENT_EXTENSION.len();
            let rest = path[end..].trim_start_matches('/');
            if rest.is_empty() {
                (&path[..end], None)
            } else {
                (&path[..end], Some(rest))
            }
        }
        None => (path, None),
    }
}

/// Everything after the last `/`.
pub fn last_segment(path: &str) -> &str {
    match path.rfind('/') {
        Some(at) => &path[at + 1..],
        None => path,
    }
}

/// Offset of the resolved-attribute marker, if the reference is a promise.
pub fn attribute_promise_offset(reference: &str) -> Option<usize> {
    reference.find(ATTRIBUTE_PROMISE)
}

/// Whether a document name denotes a manifest.
pub fn is_manifest_name(name: &str) -> bool {
    name.ends_with(MANIFEST_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_namespace_path() {
        assert_eq!(split_namespace_path("local:/a/b.cdm.json"), (Some("local"), "/a/b.cdm.json"));
        assert_eq!(split_namespace_path("/a/b.cdm.json"), (None, "/a/b.cdm.json"));
        assert_eq!(split_namespace_path("a/b:c"), (None, "a/b:c"));
    }

    #[test]
    fn test_split_document_path() {
        assert_eq!(
            split_document_path("local:/a/Customer.cdm.json/Customer/hasAttributes/id"),
            ("local:/a/Customer.cdm.json", Some("Customer/hasAttributes/id"))
        );
        assert_eq!(split_document_path("local:/a/Customer.cdm.json"), ("local:/a/Customer.cdm.json", None));
        assert_eq!(split_document_path("local:/a/"), ("local:/a/", None));
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("Customer/hasAttributes/id"), "id");
        assert_eq!(last_segment("id"), "id");
    }

    #[test]
    fn test_attribute_promise_offset() {
        assert_eq!(attribute_promise_offset("Account/(resolvedAttributes)/accountId"), Some(8));
        assert_eq!(attribute_promise_offset("Account/hasAttributes/accountId"), None);
    }
}
