//! End-to-end tests exercising the public API: parsing, navigation,
//! mutation, namespaces, DTDs, serialization, and XPath queries.

use domoxide::{
    DefaultEngine, Document, NodeId, NodeType, QueryItem, ReadOptions, Result, WriteOptions,
    XmlEngine, XmlError,
};

#[test]
fn parse_navigate_and_reserialize() {
    let input = concat!(
        "<?xml version=\"1.0\"?>\n",
        "<catalog><item id=\"1\">Widget</item><item id=\"2\">Gadget</item></catalog>\n"
    );
    let doc = Document::parse_str(input).unwrap();
    let catalog = doc.root_element().unwrap();
    assert_eq!(doc.name(catalog).as_deref(), Some("catalog"));
    assert_eq!(doc.child_count(catalog), 2);

    let items = doc.elements_for_name(catalog, "item");
    assert_eq!(items.len(), 2);
    assert_eq!(doc.attribute_value(items[1], "id"), Some("2"));
    assert_eq!(doc.string_value(items[1]), "Gadget");

    assert_eq!(doc.xml_string(), input);
}

#[test]
fn detach_and_reattach_subtree() {
    let doc_src = "<root><keep/><move><leaf>text</leaf></move></root>";
    let mut doc = Document::parse_str(doc_src).unwrap();
    let root = doc.root_element().unwrap();
    let moved = doc.elements_for_name(root, "move")[0];

    doc.detach(moved);
    assert_eq!(doc.parent(moved), None);
    assert_eq!(doc.child_count(root), 1);
    // The detached subtree keeps its descendants.
    assert_eq!(doc.string_value(moved), "text");
    assert_eq!(doc.level(moved), 0);

    let keep = doc.elements_for_name(root, "keep")[0];
    doc.add_child(keep, moved).unwrap();
    assert_eq!(doc.parent(moved), Some(keep));
    assert_eq!(doc.level(moved), 3);
    assert_eq!(
        doc.node_xml_string(root),
        "<root><keep><move><leaf>text</leaf></move></keep></root>"
    );
}

#[test]
fn attribute_overwrite_keeps_count() {
    let mut doc = Document::parse_str(r#"<e a="1" b="2"/>"#).unwrap();
    let e = doc.root_element().unwrap();
    assert_eq!(doc.attributes(e).len(), 2);

    let replacement = doc.new_attribute("a", "3").unwrap();
    doc.add_attribute(e, replacement).unwrap();
    assert_eq!(doc.attributes(e).len(), 2);
    assert_eq!(doc.attribute_value(e, "a"), Some("3"));
    assert_eq!(doc.node_xml_string(e), r#"<e a="3" b="2"/>"#);
}

#[test]
fn namespace_resolution_walks_ancestors() {
    let doc = Document::parse_str(
        r#"<root xmlns:p="urn:outer"><mid><leaf p:x="1"/></mid></root>"#,
    )
    .unwrap();
    let root = doc.root_element().unwrap();
    let mid = doc.first_child(root).unwrap();
    let leaf = doc.first_child(mid).unwrap();

    let ns = doc.namespace_for_prefix(leaf, "p").unwrap();
    assert_eq!(doc.string_value(ns), "urn:outer");
    assert_eq!(doc.namespace_for_prefix(leaf, "q"), None);
    assert_eq!(
        doc.resolve_prefix_for_uri(leaf, "urn:outer"),
        Some("p".to_string())
    );
}

#[test]
fn elements_for_name_empty_when_no_match() {
    let doc = Document::parse_str("<root><a/><b/></root>").unwrap();
    let root = doc.root_element().unwrap();
    assert!(doc.elements_for_name(root, "missing").is_empty());
}

#[test]
fn prefixed_and_unprefixed_siblings() {
    let doc = Document::parse_str(r#"<a xmlns:p="urn:x"><p:b/><c/></a>"#).unwrap();
    let a = doc.root_element().unwrap();

    let b = doc.elements_for_name(a, "p:b");
    assert_eq!(b.len(), 1);
    assert_eq!(doc.prefix(b[0]), Some("p"));
    assert_eq!(doc.local_name(b[0]), Some("b"));

    let c = doc.elements_for_name(a, "c");
    assert_eq!(c.len(), 1);
    assert_eq!(doc.prefix(c[0]), None);

    // The prefixed element resolves through the root's declaration.
    let ns = doc.namespace_for_prefix(b[0], "p").unwrap();
    assert_eq!(doc.string_value(ns), "urn:x");
}

#[test]
fn replace_root_element_preserves_position() {
    let mut doc =
        Document::parse_str("<?xml version=\"1.0\"?><!-- note --><old><child/></old>").unwrap();
    let old = doc.root_element().unwrap();
    let new_root = doc.new_element("new").unwrap();
    doc.set_root_element(new_root).unwrap();

    assert_eq!(doc.root_element(), Some(new_root));
    assert_eq!(doc.parent(old), None);
    assert_eq!(doc.child_count(old), 1);

    let xml = doc.xml_string();
    assert!(xml.contains("<!-- note -->"));
    assert!(xml.contains("<new/>"));
    assert!(!xml.contains("<old>"));
}

#[test]
fn xpath_descendant_search() {
    let doc = Document::parse_str("<a><b><c n=\"1\"/></b><c n=\"2\"/></a>").unwrap();
    let found = doc.nodes_for_xpath("//c").unwrap();
    assert_eq!(found.len(), 2);
    // Document order.
    assert_eq!(doc.attribute_value(found[0], "n"), Some("1"));
    assert_eq!(doc.attribute_value(found[1], "n"), Some("2"));

    let root = doc.root_element().unwrap();
    assert_eq!(
        doc.query_from(root, "count(//c)").unwrap(),
        QueryItem::Number(2.0)
    );
}

#[test]
fn xpath_with_namespace_bindings_from_scope() {
    let doc = Document::parse_str(r#"<a xmlns:p="urn:x"><p:b/><c/></a>"#).unwrap();
    let nodes = doc.nodes_for_xpath("//p:b").unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(doc.name(nodes[0]).as_deref(), Some("p:b"));
}

#[test]
fn remove_child_out_of_bounds_leaves_tree_intact() {
    let mut doc = Document::parse_str("<root><a/><b/></root>").unwrap();
    let root = doc.root_element().unwrap();

    let err = doc.remove_child(root, 99).unwrap_err();
    assert!(matches!(
        err,
        XmlError::IndexOutOfBounds { index: 99, len: 2 }
    ));
    assert_eq!(doc.child_count(root), 2);
}

#[test]
fn parse_error_carries_line_and_column() {
    let input = "<root>\n  <a>\n  <b></a>\n</root>";
    let err = Document::parse_str(input).unwrap_err();
    let XmlError::Parse(parse) = err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert!(parse.location.line >= 3);
    assert!(parse.location.column >= 1);
    assert!(parse.to_string().contains("parse error at"));
}

#[test]
fn parse_bytes_with_bom_and_encoding() {
    let doc = Document::parse_bytes(b"\xEF\xBB\xBF<r>ok</r>").unwrap();
    assert_eq!(doc.string_value(doc.root_element().unwrap()), "ok");

    let latin1: &[u8] = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><r>caf\xE9</r>";
    let doc = Document::parse_bytes(latin1).unwrap();
    assert_eq!(doc.string_value(doc.root_element().unwrap()), "café");
    // Re-encoding goes back out in the declared encoding.
    let bytes = doc.xml_data();
    assert!(bytes.windows(4).any(|w| w == b"caf\xE9"));
}

#[test]
fn dtd_round_trip_and_entity_expansion() {
    let input = concat!(
        "<?xml version=\"1.0\"?>\n",
        "<!DOCTYPE doc SYSTEM \"doc.dtd\" [\n",
        "<!ENTITY co \"&#169; 2026\">\n",
        "<!ELEMENT doc (#PCDATA)>\n",
        "]>\n",
        "<doc>&co;</doc>\n"
    );
    let doc = Document::parse_str(input).unwrap();

    let dtd = doc.dtd().unwrap();
    assert_eq!(doc.name(dtd).as_deref(), Some("doc"));
    assert_eq!(doc.dtd_system_id(dtd), Some("doc.dtd"));
    assert_eq!(doc.child_count(dtd), 2);
    assert!(doc.entity_decl_for_name(dtd, "co").is_some());

    let root = doc.root_element().unwrap();
    assert_eq!(doc.string_value(root), "\u{a9} 2026");
}

#[test]
fn whitespace_stripping_option() {
    let input = "<root>\n  <a/>\n  <b/>\n</root>";
    let doc =
        Document::parse_str_with_options(input, &ReadOptions::default().preserve_whitespace(false))
            .unwrap();
    let root = doc.root_element().unwrap();
    let kinds: Vec<NodeType> = doc.children(root).map(|n| doc.node_type(n)).collect();
    assert_eq!(kinds, vec![NodeType::Element, NodeType::Element]);
}

#[test]
fn pretty_print_skips_mixed_content() {
    let doc = Document::parse_str("<a><b><c/></b><m>text<i/>more</m></a>").unwrap();
    let xml = doc.xml_string_with_options(&WriteOptions::default().indent(true));
    // Element-only content is indented.
    assert!(xml.contains("  <b>\n    <c/>\n  </b>"));
    // Mixed content stays on one line.
    assert!(xml.contains("<m>text<i/>more</m>"));
}

#[test]
fn cross_document_import() {
    let src = Document::parse_str(r#"<lib><book id="b1">Title</book></lib>"#).unwrap();
    let book = src.nodes_for_xpath("//book").unwrap()[0];

    let mut dst = Document::parse_str("<shelf/>").unwrap();
    let shelf = dst.root_element().unwrap();
    let copy = dst.import_node(&src, book);
    dst.add_child(shelf, copy).unwrap();

    assert_eq!(
        dst.node_xml_string(shelf),
        r#"<shelf><book id="b1">Title</book></shelf>"#
    );
    // Source untouched.
    assert_eq!(src.nodes_for_xpath("//book").unwrap().len(), 1);
}

/// An engine stub that records being called and returns fixed values,
/// proving the document layer routes through the trait rather than any
/// built-in machinery.
struct CannedEngine;

impl XmlEngine for CannedEngine {
    fn parse_document(&self, _input: &str, _options: &ReadOptions) -> Result<Document> {
        let mut doc = Document::new();
        let root = doc.new_element("canned")?;
        doc.set_root_element(root)?;
        Ok(doc)
    }

    fn write_document(&self, _doc: &Document, _options: &WriteOptions) -> String {
        "<canned/>".to_string()
    }

    fn write_node(&self, _doc: &Document, _node: NodeId, _options: &WriteOptions) -> String {
        "<canned/>".to_string()
    }

    fn evaluate(
        &self,
        _doc: &Document,
        _context: NodeId,
        _expr: &str,
        _bindings: &[(String, String)],
    ) -> Result<QueryItem> {
        Ok(QueryItem::String("canned".to_string()))
    }
}

#[test]
fn engines_are_swappable_per_call() {
    let doc =
        Document::parse_str_with_engine("<ignored/>", &ReadOptions::default(), &CannedEngine)
            .unwrap();
    let root = doc.root_element().unwrap();
    assert_eq!(doc.name(root).as_deref(), Some("canned"));

    assert_eq!(
        doc.xml_string_with_engine(&WriteOptions::default(), &CannedEngine),
        "<canned/>"
    );
    assert_eq!(
        doc.query_from_with_engine(root, "//anything", &CannedEngine)
            .unwrap(),
        QueryItem::String("canned".to_string())
    );

    // The same document still works with the default engine.
    assert_eq!(
        doc.query_from_with_engine(root, "count(//canned)", &DefaultEngine)
            .unwrap(),
        QueryItem::Number(1.0)
    );
}

#[test]
fn set_string_value_replaces_element_content() {
    let mut doc = Document::parse_str("<p>old <b>rich</b> content</p>").unwrap();
    let p = doc.root_element().unwrap();
    assert_eq!(doc.child_count(p), 3);

    doc.set_string_value(p, "plain & simple");
    assert_eq!(doc.child_count(p), 1);
    assert_eq!(doc.node_xml_string(p), "<p>plain &amp; simple</p>");
}
