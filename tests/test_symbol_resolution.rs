//! Symbol resolution across ranked imports and monikers.

mod common;

use common::{adapter_with, codes_of, corpus_with};
use futures::executor::block_on;
use rstest::rstest;

use cdm::diagnostics::codes;
use cdm::model::Document;
use cdm::{Corpus, DocId, ObjectKind, ResolveOptions};

fn declaring(doc_name: &str, symbol: &str) -> Document {
    let mut doc = Document::new(doc_name);
    doc.add_definition(ObjectKind::EntityDef, symbol);
    doc
}

fn resolve(corpus: &Corpus, wrt: DocId, symbol: &str, expected: ObjectKind) -> Option<DocId> {
    let mut opt = ResolveOptions::new(Some(wrt));
    corpus
        .resolve_symbol_reference(&mut opt, Some(wrt), symbol, expected, true)
        .map(|found| found.doc)
}

fn load(docs: Vec<Document>, root: &str) -> (Corpus, DocId) {
    let adapter = adapter_with(docs);
    let mut corpus = corpus_with(&adapter);
    let root = block_on(corpus.fetch_document(root)).expect("root loads");
    (corpus, root)
}

#[rstest]
#[case::later_import_wins(false, "Second.cdm.json")]
#[case::own_declaration_wins(true, "Main.cdm.json")]
fn test_closest_declaration_wins(#[case] main_declares: bool, #[case] expected_doc: &str) {
    let mut main = Document::new("Main.cdm.json")
        .with_import("First.cdm.json")
        .with_import("Second.cdm.json");
    if main_declares {
        main.add_definition(ObjectKind::EntityDef, "Shared");
    }
    let docs = vec![
        declaring("First.cdm.json", "Shared"),
        declaring("Second.cdm.json", "Shared"),
        main,
    ];
    let (corpus, main) = load(docs, "local:/Main.cdm.json");

    let found = resolve(&corpus, main, "Shared", ObjectKind::EntityRef);

    let expected = corpus.document_by_path(&format!("local:/{expected_doc}"));
    assert!(expected.is_some());
    assert_eq!(found, expected);
}

#[test]
fn test_transitive_declaration_is_found() {
    let main = Document::new("Main.cdm.json").with_import("Middle.cdm.json");
    let middle = Document::new("Middle.cdm.json").with_import("Leaf.cdm.json");
    let (corpus, main) = load(
        vec![main, middle, declaring("Leaf.cdm.json", "Deep")],
        "local:/Main.cdm.json",
    );

    let leaf = corpus.document_by_path("local:/Leaf.cdm.json");
    assert_eq!(resolve(&corpus, main, "Deep", ObjectKind::EntityRef), leaf);
}

#[test]
fn test_kind_mismatch_is_reported() {
    let main = Document::new("Main.cdm.json").with_import("Other.cdm.json");
    let (corpus, main) = load(vec![main, declaring("Other.cdm.json", "Thing")], "local:/Main.cdm.json");

    assert_eq!(resolve(&corpus, main, "Thing", ObjectKind::TraitRef), None);
    assert!(codes_of(&corpus).contains(&codes::KIND_MISMATCH.to_string()));
    assert!(resolve(&corpus, main, "Thing", ObjectKind::Error).is_some());
}

#[test]
fn test_absolute_reference_is_rejected() {
    let main = Document::new("Main.cdm.json").with_import("Other.cdm.json");
    let (corpus, main) = load(vec![main, declaring("Other.cdm.json", "Thing")], "local:/Main.cdm.json");

    let mut opt = ResolveOptions::new(Some(main));
    assert!(corpus.docs_for_symbol(&mut opt, main, Some(main), "/Thing").is_none());
    assert_eq!(resolve(&corpus, main, "/Thing", ObjectKind::EntityRef), None);
    assert!(codes_of(&corpus).contains(&codes::ABSOLUTE_REFERENCE.to_string()));
}

#[test]
fn test_moniker_selects_aliased_document() {
    let main = Document::new("Main.cdm.json")
        .with_moniker_import("First.cdm.json", "first")
        .with_import("Second.cdm.json");
    let docs = vec![
        declaring("First.cdm.json", "Shared"),
        declaring("Second.cdm.json", "Shared"),
        main,
    ];
    let (corpus, main) = load(docs, "local:/Main.cdm.json");
    let first = corpus.document_by_path("local:/First.cdm.json");
    let second = corpus.document_by_path("local:/Second.cdm.json");

    assert_eq!(resolve(&corpus, main, "first/Shared", ObjectKind::EntityRef), first);
    assert_eq!(resolve(&corpus, main, "Shared", ObjectKind::EntityRef), second);

    let mut opt = ResolveOptions::new(Some(main));
    let docs = corpus.docs_for_symbol(&mut opt, main, Some(main), "first/Shared").unwrap();
    assert_eq!(docs.new_symbol.as_str(), "Shared");
    assert_eq!(docs.doc_best, first);
    assert_eq!(opt.from_moniker.as_deref(), Some("first"));
}

#[test]
fn test_monikered_import_is_not_searched_without_alias() {
    let main = Document::new("Main.cdm.json").with_moniker_import("Hidden.cdm.json", "hidden");
    let (corpus, main) = load(vec![main, declaring("Hidden.cdm.json", "Secret")], "local:/Main.cdm.json");

    let hidden = corpus.document_by_path("local:/Hidden.cdm.json").unwrap();
    let priorities = corpus.document(main).unwrap().import_priorities().unwrap();
    assert!(priorities.priority[&hidden].is_moniker);
    assert_eq!(priorities.moniker("hidden"), Some(hidden));
    assert_eq!(resolve(&corpus, main, "hidden/Secret", ObjectKind::EntityRef), Some(hidden));
}

#[test]
fn test_nested_monikers_are_followed() {
    let main = Document::new("Main.cdm.json").with_moniker_import("Outer.cdm.json", "outer");
    let outer = Document::new("Outer.cdm.json").with_moniker_import("Inner.cdm.json", "inner");
    let (corpus, main) = load(
        vec![main, outer, declaring("Inner.cdm.json", "Target")],
        "local:/Main.cdm.json",
    );

    let inner = corpus.document_by_path("local:/Inner.cdm.json");
    let mut opt = ResolveOptions::new(Some(main));
    let docs = corpus
        .docs_for_symbol(&mut opt, main, Some(main), "outer/inner/Target")
        .unwrap();
    assert_eq!(docs.new_symbol.as_str(), "Target");
    assert_eq!(docs.doc_best, inner);
}

#[rstest]
#[case::unknown_moniker("nope/Shared")]
#[case::unknown_nested_moniker("nope/deeper/Shared")]
#[case::undeclared("Nothing")]
fn test_unresolvable_symbol_is_none(#[case] symbol: &str) {
    let main = Document::new("Main.cdm.json").with_import("Other.cdm.json");
    let (corpus, main) = load(vec![main, declaring("Other.cdm.json", "Shared")], "local:/Main.cdm.json");
    let errors_before = corpus.reporter().error_count();

    assert_eq!(resolve(&corpus, main, symbol, ObjectKind::EntityRef), None);
    assert_eq!(corpus.reporter().error_count(), errors_before);
}

#[test]
fn test_path_to_symbol_uses_moniker_when_shadowed() {
    let main = Document::new("Main.cdm.json")
        .with_moniker_import("First.cdm.json", "first")
        .with_import("Second.cdm.json");
    let docs = vec![
        declaring("First.cdm.json", "Shared"),
        declaring("Second.cdm.json", "Shared"),
        main,
    ];
    let (corpus, main) = load(docs, "local:/Main.cdm.json");
    let first = corpus.document_by_path("local:/First.cdm.json");
    let second = corpus.document_by_path("local:/Second.cdm.json");

    let mut opt = ResolveOptions::new(Some(main));
    let to_first = corpus.docs_for_symbol(&mut opt, main, Some(main), "first/Shared").unwrap();
    assert_eq!(to_first.doc_best, first);
    assert_eq!(
        corpus.path_to_symbol("Shared", main, &to_first).as_deref(),
        Some("first/Shared")
    );
    assert_eq!(
        corpus.path_to_symbol("Shared", first.unwrap(), &to_first).as_deref(),
        Some("Shared")
    );

    let mut to_second = corpus.docs_for_symbol(&mut opt, main, Some(main), "Shared").unwrap();
    to_second.doc_best = second;
    assert_eq!(
        corpus.path_to_symbol("Shared", main, &to_second).as_deref(),
        Some("Shared")
    );
}

/// A moniker found through the origin document stops at a declared
/// remainder, while the same moniker found through the viewpoint keeps
/// chasing and loses the moniker's document choice.
#[test]
fn test_moniker_recursion_depends_on_where_moniker_was_found() {
    let mut aliased = Document::new("Aliased.cdm.json");
    let entity = aliased.add_definition(ObjectKind::EntityDef, "E");
    aliased.add_child(entity, cdm::Slot::HasAttributes, ObjectKind::TypeAttributeDef, Some("a"));
    let main = Document::new("Main.cdm.json").with_moniker_import("Aliased.cdm.json", "m");
    let (corpus, main) = load(vec![aliased, main], "local:/Main.cdm.json");
    let aliased = corpus.document_by_path("local:/Aliased.cdm.json");

    let mut opt = ResolveOptions::new(Some(main));
    let from_origin = corpus
        .docs_for_symbol(&mut opt, main, Some(main), "m/E/hasAttributes/a")
        .unwrap();
    assert_eq!(from_origin.new_symbol.as_str(), "E/hasAttributes/a");
    assert_eq!(from_origin.doc_best, aliased);

    let mut opt = ResolveOptions::new(Some(main));
    let from_viewpoint = corpus
        .docs_for_symbol(&mut opt, main, None, "m/E/hasAttributes/a")
        .unwrap();
    assert_eq!(from_viewpoint.new_symbol.as_str(), "E/hasAttributes/a");
    assert_eq!(from_viewpoint.doc_best, None);
    assert_eq!(from_viewpoint.doc_list, aliased.map(|d| vec![d]));
}
