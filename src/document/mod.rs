//! Document-level operations: parsing, serialization, metadata, and queries.
//!
//! Parsing and XPath evaluation are delegated to an [`XmlEngine`]; every
//! operation has a `_with_engine` variant, and the plain forms use
//! [`DefaultEngine`]. The document keeps its XML declaration fields
//! (version, encoding, standalone) and its DTD separate from the node tree;
//! document-level comments and processing instructions live below the hidden
//! wrapper node alongside the root element.

use crate::engine::{writer, DefaultEngine, QueryItem, ReadOptions, WriteOptions, XmlEngine};
use crate::error::{Result, XmlError};
use crate::tree::{Children, Document, NodeId, NodeType};

impl Document {
    /// Parses an XML document from a string.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Parse`] if the input is not well-formed.
    ///
    /// # Examples
    ///
    /// ```
    /// use domoxide::Document;
    ///
    /// let doc = Document::parse_str("<root><child/></root>").unwrap();
    /// assert!(doc.root_element().is_some());
    /// ```
    pub fn parse_str(input: &str) -> Result<Self> {
        Self::parse_str_with_options(input, &ReadOptions::default())
    }

    /// Parses an XML document from a string with the given options.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Parse`] if the input is not well-formed.
    pub fn parse_str_with_options(input: &str, options: &ReadOptions) -> Result<Self> {
        Self::parse_str_with_engine(input, options, &DefaultEngine)
    }

    /// Parses an XML document from a string using a caller-supplied engine.
    ///
    /// # Errors
    ///
    /// Returns whatever error the engine reports for malformed input.
    pub fn parse_str_with_engine(
        input: &str,
        options: &ReadOptions,
        engine: &dyn XmlEngine,
    ) -> Result<Self> {
        engine.parse_document(input, options)
    }

    /// Parses an XML document from raw bytes.
    ///
    /// The byte encoding is taken from a BOM if present, else from the XML
    /// declaration, else assumed to be UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Parse`] if the bytes cannot be decoded or the
    /// decoded text is not well-formed.
    pub fn parse_bytes(input: &[u8]) -> Result<Self> {
        Self::parse_bytes_with_options(input, &ReadOptions::default())
    }

    /// Parses an XML document from raw bytes with the given options.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Parse`] on decode failure or malformed input.
    pub fn parse_bytes_with_options(input: &[u8], options: &ReadOptions) -> Result<Self> {
        let text = crate::engine::reader::decode_bytes(input)?;
        Self::parse_str_with_options(&text, options)
    }

    /// Creates a document whose root element is a deep copy of `elem` from
    /// `src`. The source document is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `elem` is not an element.
    pub fn from_root_element(src: &Document, elem: NodeId) -> Result<Self> {
        if src.node_type(elem) != NodeType::Element {
            return Err(XmlError::InvalidArgument(format!(
                "expected an element node, found {:?}",
                src.node_type(elem)
            )));
        }
        let mut doc = Self::new();
        let root = doc.import_node(src, elem);
        doc.set_root_element(root)?;
        Ok(doc)
    }

    // --- Root element and document-level children ---

    /// Returns the document's root element, if it has one.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.document_children()
            .find(|&n| self.node_type(n) == NodeType::Element)
    }

    /// Installs `elem` as the document's root element.
    ///
    /// A previous root element is detached first (it stays allocated and may
    /// be re-attached elsewhere); the new root takes its position among any
    /// document-level comments and processing instructions. A detached
    /// subtree containing `elem` is adopted whole; if `elem` is attached
    /// under another element it is detached first.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `elem` is not an element.
    pub fn set_root_element(&mut self, elem: NodeId) -> Result<()> {
        if self.node_type(elem) != NodeType::Element {
            return Err(XmlError::InvalidArgument(format!(
                "expected an element node, found {:?}",
                self.node_type(elem)
            )));
        }
        let old = self.root_element();
        if old == Some(elem) {
            return Ok(());
        }
        self.detach(elem);
        let wrapper = self.wrapper();
        match old {
            Some(old) => {
                self.link_insert_before(old, elem);
                self.detach_links(old);
            }
            None => self.link_append(wrapper, elem),
        }
        Ok(())
    }

    /// Returns an iterator over the document-level nodes: the root element
    /// plus any top-level comments and processing instructions, in document
    /// order.
    pub fn document_children(&self) -> Children<'_> {
        self.children(self.wrapper())
    }

    /// Appends a comment or processing instruction at document level. An
    /// element is accepted only while the document has no root element;
    /// use [`set_root_element`](Self::set_root_element) to replace one.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] for any other node kind, for a
    /// second root element, or for a node that is still attached.
    pub fn add_document_child(&mut self, node: NodeId) -> Result<()> {
        match self.node_type(node) {
            NodeType::Comment | NodeType::ProcessingInstruction => {}
            NodeType::Element if self.root_element().is_none() => {}
            NodeType::Element => {
                return Err(XmlError::InvalidArgument(
                    "document already has a root element".to_string(),
                ));
            }
            other => {
                return Err(XmlError::InvalidArgument(format!(
                    "a {other:?} node cannot be a document child"
                )));
            }
        }
        if self.node(node).parent.is_some() {
            return Err(XmlError::InvalidArgument(
                "node is already attached; detach it first".to_string(),
            ));
        }
        let wrapper = self.wrapper();
        self.link_append(wrapper, node);
        Ok(())
    }

    // --- XML declaration metadata ---

    /// The XML version from the declaration, e.g., `"1.0"`.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Sets or clears the XML version. Serialization defaults to `"1.0"`
    /// when unset.
    pub fn set_version(&mut self, version: Option<&str>) {
        self.version = version.map(str::to_string);
    }

    /// The character encoding named in the declaration, e.g., `"UTF-8"`.
    #[must_use]
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Sets or clears the declared character encoding. This controls both
    /// the emitted declaration and the byte encoding of
    /// [`xml_data`](Self::xml_data).
    pub fn set_encoding(&mut self, encoding: Option<&str>) {
        self.encoding = encoding.map(str::to_string);
    }

    /// The standalone flag from the declaration.
    #[must_use]
    pub fn standalone(&self) -> Option<bool> {
        self.standalone
    }

    /// Sets or clears the standalone flag.
    pub fn set_standalone(&mut self, standalone: Option<bool>) {
        self.standalone = standalone;
    }

    // --- DTD ---

    /// Returns the document's DTD node, if any.
    #[must_use]
    pub fn dtd(&self) -> Option<NodeId> {
        self.dtd
    }

    /// Installs or removes the document's DTD. A removed DTD node stays
    /// allocated and may be re-installed.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `dtd` is not a document type
    /// node.
    pub fn set_dtd(&mut self, dtd: Option<NodeId>) -> Result<()> {
        if let Some(dtd) = dtd {
            if self.node_type(dtd) != NodeType::DocumentType {
                return Err(XmlError::InvalidArgument(format!(
                    "expected a document type node, found {:?}",
                    self.node_type(dtd)
                )));
            }
        }
        self.dtd = dtd;
        Ok(())
    }

    // --- Serialization ---

    /// Serializes the document to an XML string, including the XML
    /// declaration and DTD.
    ///
    /// # Examples
    ///
    /// ```
    /// use domoxide::Document;
    ///
    /// let doc = Document::parse_str("<root><child/></root>").unwrap();
    /// assert!(doc.xml_string().contains("<root>"));
    /// ```
    #[must_use]
    pub fn xml_string(&self) -> String {
        self.xml_string_with_options(&WriteOptions::default())
    }

    /// Serializes the document to an XML string with the given options.
    #[must_use]
    pub fn xml_string_with_options(&self, options: &WriteOptions) -> String {
        DefaultEngine.write_document(self, options)
    }

    /// Serializes the document using a caller-supplied engine.
    #[must_use]
    pub fn xml_string_with_engine(&self, options: &WriteOptions, engine: &dyn XmlEngine) -> String {
        engine.write_document(self, options)
    }

    /// Serializes the document to bytes in its declared encoding (UTF-8 when
    /// none is declared or the declared label is unknown).
    #[must_use]
    pub fn xml_data(&self) -> Vec<u8> {
        self.xml_data_with_options(&WriteOptions::default())
    }

    /// Serializes the document to encoded bytes with the given options.
    #[must_use]
    pub fn xml_data_with_options(&self, options: &WriteOptions) -> Vec<u8> {
        writer::encode(self.encoding(), &self.xml_string_with_options(options))
    }

    /// Serializes a single node and its subtree, without an XML declaration.
    ///
    /// Attribute and namespace nodes serialize in their start-tag form,
    /// e.g., `id="1"` and `xmlns:p="urn:x"`.
    #[must_use]
    pub fn node_xml_string(&self, node: NodeId) -> String {
        self.node_xml_string_with_options(node, &WriteOptions::default())
    }

    /// Serializes a single node and its subtree with the given options.
    #[must_use]
    pub fn node_xml_string_with_options(&self, node: NodeId, options: &WriteOptions) -> String {
        DefaultEngine.write_node(self, node, options)
    }

    // --- Queries ---

    /// Evaluates an XPath 1.0 expression with the root element as the
    /// context node and returns the matching nodes in document order.
    ///
    /// Namespace prefixes used in the expression resolve against the
    /// declarations in scope at the context node.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Query`] for a malformed or non-node-set
    /// expression, or [`XmlError::InvalidArgument`] when the document has no
    /// root element.
    pub fn nodes_for_xpath(&self, expr: &str) -> Result<Vec<NodeId>> {
        let root = self.root_element().ok_or_else(|| {
            XmlError::InvalidArgument("document has no root element".to_string())
        })?;
        self.nodes_for_xpath_from(root, expr)
    }

    /// Evaluates an XPath 1.0 expression with `context` as the context node
    /// and returns the matching nodes in document order.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Query`] for a malformed or non-node-set
    /// expression.
    pub fn nodes_for_xpath_from(&self, context: NodeId, expr: &str) -> Result<Vec<NodeId>> {
        match self.query_from(context, expr)? {
            QueryItem::Nodes(nodes) => Ok(nodes),
            other => Err(crate::error::QueryError::new(format!(
                "expression evaluated to a {}, not a node-set",
                match other {
                    QueryItem::Boolean(_) => "boolean",
                    QueryItem::Number(_) => "number",
                    QueryItem::String(_) => "string",
                    QueryItem::Nodes(_) => "node-set",
                }
            ))
            .into()),
        }
    }

    /// Evaluates an XPath 1.0 expression with `context` as the context node,
    /// returning whichever of the four XPath value types it produces.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Query`] for a malformed expression.
    pub fn query_from(&self, context: NodeId, expr: &str) -> Result<QueryItem> {
        self.query_from_with_engine(context, expr, &DefaultEngine)
    }

    /// Evaluates an XPath expression using a caller-supplied engine.
    ///
    /// # Errors
    ///
    /// Returns whatever error the engine reports.
    pub fn query_from_with_engine(
        &self,
        context: NodeId,
        expr: &str,
        engine: &dyn XmlEngine,
    ) -> Result<QueryItem> {
        // Name tests in the expression resolve against the bindings in
        // scope at the context node.
        let scope = match self.node_type(context) {
            NodeType::Element => context,
            _ => self.parent(context).unwrap_or(context),
        };
        let bindings = self.in_scope_namespaces(scope);
        engine.evaluate(self, context, expr, &bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_reserialize_round_trip() {
        let input = "<?xml version=\"1.0\"?>\n<catalog><item id=\"1\">Widget</item></catalog>\n";
        let doc = Document::parse_str(input).unwrap();
        assert_eq!(doc.xml_string(), input);
    }

    #[test]
    fn test_escaped_content_round_trips() {
        let mut doc = Document::new();
        let root = doc.new_element("r").unwrap();
        doc.set_root_element(root).unwrap();
        doc.set_string_value(root, "a < b & c");
        let attr = doc.new_attribute("q", "say \"hi\"").unwrap();
        doc.add_attribute(root, attr).unwrap();

        let xml = doc.xml_string();
        let reparsed = Document::parse_str(&xml).unwrap();
        let r = reparsed.root_element().unwrap();
        assert_eq!(reparsed.string_value(r), "a < b & c");
        assert_eq!(reparsed.attribute_value(r, "q"), Some("say \"hi\""));
    }

    #[test]
    fn test_set_root_element_replaces_old() {
        let mut doc = Document::parse_str("<!-- lead --><old/>").unwrap();
        let old = doc.root_element().unwrap();
        let new = doc.new_element("new").unwrap();
        doc.set_root_element(new).unwrap();

        assert_eq!(doc.root_element(), Some(new));
        assert_eq!(doc.parent(old), None);
        // The old root survives as a detached subtree.
        assert_eq!(doc.name(old).as_deref(), Some("old"));
        // The new root keeps the old one's position after the comment.
        let kinds: Vec<NodeType> = doc
            .document_children()
            .map(|n| doc.node_type(n))
            .collect();
        assert_eq!(kinds, vec![NodeType::Comment, NodeType::Element]);
    }

    #[test]
    fn test_set_root_element_rejects_non_element() {
        let mut doc = Document::new();
        let text = doc.new_text("x");
        assert!(doc.set_root_element(text).is_err());
    }

    #[test]
    fn test_from_root_element_deep_copies() {
        let src = Document::parse_str(r#"<a id="1"><b/></a>"#).unwrap();
        let root = src.root_element().unwrap();
        let doc = Document::from_root_element(&src, root).unwrap();

        let copy = doc.root_element().unwrap();
        assert_eq!(doc.attribute_value(copy, "id"), Some("1"));
        assert_eq!(doc.child_count(copy), 1);
        // The source document still has its tree.
        assert_eq!(src.root_element(), Some(root));
    }

    #[test]
    fn test_add_document_child_rules() {
        let mut doc = Document::new();
        let comment = doc.new_comment(" generated ");
        doc.add_document_child(comment).unwrap();
        let root = doc.new_element("root").unwrap();
        doc.add_document_child(root).unwrap();

        let second = doc.new_element("second").unwrap();
        assert!(doc.add_document_child(second).is_err());
        let text = doc.new_text("x");
        assert!(doc.add_document_child(text).is_err());
    }

    #[test]
    fn test_declaration_metadata_round_trip() {
        let mut doc = Document::parse_str("<r/>").unwrap();
        doc.set_version(Some("1.0"));
        doc.set_encoding(Some("UTF-8"));
        doc.set_standalone(Some(false));
        let xml = doc.xml_string();
        assert!(xml.starts_with(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>"
        ));

        let reparsed = Document::parse_str(&xml).unwrap();
        assert_eq!(reparsed.encoding(), Some("UTF-8"));
        assert_eq!(reparsed.standalone(), Some(false));
    }

    #[test]
    fn test_xml_data_uses_declared_encoding() {
        let mut doc = Document::parse_str("<r>é</r>").unwrap();
        doc.set_encoding(Some("ISO-8859-1"));
        let bytes = doc.xml_data();
        assert!(bytes.contains(&0xE9));

        doc.set_encoding(None);
        // Without a declared encoding non-ASCII is emitted as a char ref.
        let text = String::from_utf8(doc.xml_data()).unwrap();
        assert!(text.contains("&#xE9;"));
    }

    #[test]
    fn test_dtd_survives_round_trip() {
        let input = concat!(
            "<?xml version=\"1.0\"?>\n",
            "<!DOCTYPE doc [\n",
            "<!ENTITY copy \"&#169;\">\n",
            "]>\n",
            "<doc/>\n"
        );
        let doc = Document::parse_str(input).unwrap();
        assert_eq!(doc.xml_string(), input);

        let mut doc = doc;
        doc.set_dtd(None).unwrap();
        assert!(!doc.xml_string().contains("DOCTYPE"));
    }

    #[test]
    fn test_set_dtd_kind_checked() {
        let mut doc = Document::parse_str("<r/>").unwrap();
        let elem = doc.new_element("e").unwrap();
        assert!(doc.set_dtd(Some(elem)).is_err());
        let dtd = doc.new_dtd("r", None, None).unwrap();
        doc.set_dtd(Some(dtd)).unwrap();
        assert_eq!(doc.dtd(), Some(dtd));
    }

    #[test]
    fn test_nodes_for_xpath_requires_node_set() {
        let doc = Document::parse_str("<a><b/></a>").unwrap();
        assert_eq!(doc.nodes_for_xpath("//b").unwrap().len(), 1);
        assert!(matches!(
            doc.nodes_for_xpath("count(//b)"),
            Err(XmlError::Query(_))
        ));
    }

    #[test]
    fn test_query_uses_in_scope_bindings() {
        let doc = Document::parse_str(r#"<a xmlns:p="urn:x"><p:b/><c/></a>"#).unwrap();
        let nodes = doc.nodes_for_xpath("//p:b").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(doc.prefix(nodes[0]), Some("p"));
    }

    #[test]
    fn test_node_xml_string_fragment() {
        let doc = Document::parse_str("<a><b c=\"1\">x</b></a>").unwrap();
        let a = doc.root_element().unwrap();
        let b = doc.first_child(a).unwrap();
        assert_eq!(doc.node_xml_string(b), "<b c=\"1\">x</b>");
    }

    #[test]
    fn test_pretty_printed_output() {
        let doc = Document::parse_str("<a><b>x</b><c/></a>").unwrap();
        let xml = doc.xml_string_with_options(&WriteOptions::default().indent(true));
        assert!(xml.contains("\n  <b>x</b>\n"));
        assert!(xml.contains("\n  <c/>\n"));
    }
}
