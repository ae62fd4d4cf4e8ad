//! Pluggable parse/serialize/query engines.
//!
//! The document layer does not tokenize markup or evaluate path expressions
//! itself; it delegates both to an [`XmlEngine`]. The crate ships a
//! [`DefaultEngine`] backed by `quick-xml` for parsing, an in-crate emitter
//! for serialization, and `sxd-xpath` for XPath 1.0 evaluation. Alternative
//! engines (or test doubles) plug in through the same trait.

pub(crate) mod query;
pub(crate) mod reader;
pub(crate) mod writer;

use crate::error::Result;
use crate::tree::{Document, NodeId};

/// Options controlling how input markup is read into a tree.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use domoxide::ReadOptions;
///
/// let opts = ReadOptions::default().preserve_whitespace(false);
/// ```
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// If true, whitespace-only text between elements is kept as text nodes.
    /// Defaults to `true`.
    pub preserve_whitespace: bool,
    /// If true, the engine is asked to validate the document against its
    /// DTD. The default engine performs no validation and ignores this flag.
    /// Defaults to `false`.
    pub validate_dtd: bool,
    /// If true, the engine is asked to fetch and expand external entities.
    /// The default engine never fetches external resources and ignores this
    /// flag. Defaults to `false`.
    pub resolve_external_entities: bool,
    /// If true, `xmlns` and `xmlns:prefix` declarations are stored as plain
    /// attribute nodes instead of namespace nodes. Prefix resolution then
    /// no longer sees them. Defaults to `false`.
    pub namespace_decls_as_attributes: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            preserve_whitespace: true,
            validate_dtd: false,
            resolve_external_entities: false,
            namespace_decls_as_attributes: false,
        }
    }
}

impl ReadOptions {
    /// Keeps or drops whitespace-only text nodes between elements.
    ///
    /// When disabled, text nodes consisting entirely of spaces, tabs, and
    /// newlines are not added to the tree. Text inside mixed content is
    /// always kept. Enabled by default.
    #[must_use]
    pub fn preserve_whitespace(mut self, preserve: bool) -> Self {
        self.preserve_whitespace = preserve;
        self
    }

    /// Requests DTD validation from engines that support it. The default
    /// engine builds the DTD tree but does not validate against it.
    /// Disabled by default.
    #[must_use]
    pub fn validate_dtd(mut self, validate: bool) -> Self {
        self.validate_dtd = validate;
        self
    }

    /// Requests expansion of external entities from engines that support
    /// it. The default engine expands internal general entities only and
    /// never fetches external resources. Disabled by default.
    #[must_use]
    pub fn resolve_external_entities(mut self, resolve: bool) -> Self {
        self.resolve_external_entities = resolve;
        self
    }

    /// Stores namespace declarations as ordinary attributes instead of
    /// namespace nodes. Disabled by default.
    #[must_use]
    pub fn namespace_decls_as_attributes(mut self, as_attributes: bool) -> Self {
        self.namespace_decls_as_attributes = as_attributes;
        self
    }
}

/// Options controlling serialization output.
///
/// ```
/// use domoxide::WriteOptions;
///
/// let opts = WriteOptions::default().indent(true).indent_str("\t");
/// ```
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Whether to produce indented (pretty-printed) output.
    /// Defaults to `false`.
    pub indent: bool,
    /// The indentation string used for each level when `indent` is `true`.
    /// Defaults to two spaces.
    pub indent_str: String,
    /// If true, the `<?xml ...?>` declaration line is not emitted.
    /// Defaults to `false`.
    pub omit_declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_str: "  ".to_string(),
            omit_declaration: false,
        }
    }
}

impl WriteOptions {
    /// Enables or disables indented (pretty-printed) output.
    ///
    /// When enabled, child elements are placed on their own lines with
    /// indentation. Mixed-content elements (those containing both text and
    /// element children) are not indented. Disabled by default.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the indentation string used for each nesting level.
    ///
    /// The default is two spaces (`"  "`). This only takes effect when
    /// [`indent`](Self::indent) is enabled.
    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_string();
        self
    }

    /// Suppresses the XML declaration line. Disabled by default.
    #[must_use]
    pub fn omit_declaration(mut self, omit: bool) -> Self {
        self.omit_declaration = omit;
        self
    }
}

/// The result of evaluating a path expression.
///
/// XPath 1.0 expressions produce one of four value types; node-set results
/// are reported as handles into the queried document, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryItem {
    /// A node-set, in document order.
    Nodes(Vec<NodeId>),
    /// A boolean result, e.g., from `count(//a) > 2`.
    Boolean(bool),
    /// A numeric result, e.g., from `count(//a)`.
    Number(f64),
    /// A string result, e.g., from `string(/a/@id)`.
    String(String),
}

/// The capability seam between the document layer and external machinery.
///
/// An engine knows how to turn markup into a [`Document`] tree, a tree back
/// into markup, and how to evaluate path expressions against a tree. The
/// document layer calls whichever engine it is handed and never inspects
/// markup itself, so engines are swappable per call.
pub trait XmlEngine {
    /// Parses a complete XML document from a string.
    ///
    /// # Errors
    ///
    /// Returns a parse error carrying the source position of the first
    /// fatal well-formedness violation.
    fn parse_document(&self, input: &str, options: &ReadOptions) -> Result<Document>;

    /// Serializes a whole document, including its XML declaration and DTD.
    fn write_document(&self, doc: &Document, options: &WriteOptions) -> String;

    /// Serializes a single node and its subtree, without any XML
    /// declaration.
    fn write_node(&self, doc: &Document, node: NodeId, options: &WriteOptions) -> String;

    /// Evaluates a path expression with `context` as the context node.
    ///
    /// `bindings` maps namespace prefixes to URIs for prefixed name tests in
    /// the expression.
    ///
    /// # Errors
    ///
    /// Returns a query error if the expression is malformed or cannot be
    /// evaluated.
    fn evaluate(
        &self,
        doc: &Document,
        context: NodeId,
        expr: &str,
        bindings: &[(String, String)],
    ) -> Result<QueryItem>;
}

/// The engine used when callers do not supply one: `quick-xml` tokenizing on
/// the way in, an in-crate emitter on the way out, and `sxd-xpath` for
/// queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEngine;

impl XmlEngine for DefaultEngine {
    fn parse_document(&self, input: &str, options: &ReadOptions) -> Result<Document> {
        reader::parse_document(input, options)
    }

    fn write_document(&self, doc: &Document, options: &WriteOptions) -> String {
        writer::write_document(doc, options)
    }

    fn write_node(&self, doc: &Document, node: NodeId, options: &WriteOptions) -> String {
        writer::write_node(doc, node, options)
    }

    fn evaluate(
        &self,
        doc: &Document,
        context: NodeId,
        expr: &str,
        bindings: &[(String, String)],
    ) -> Result<QueryItem> {
        query::evaluate(doc, context, expr, bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_options_builder() {
        let opts = ReadOptions::default();
        assert!(opts.preserve_whitespace);
        assert!(!opts.validate_dtd);
        assert!(!opts.resolve_external_entities);
        assert!(!opts.namespace_decls_as_attributes);

        let opts = opts
            .preserve_whitespace(false)
            .validate_dtd(true)
            .resolve_external_entities(true)
            .namespace_decls_as_attributes(true);
        assert!(!opts.preserve_whitespace);
        assert!(opts.validate_dtd);
        assert!(opts.resolve_external_entities);
        assert!(opts.namespace_decls_as_attributes);
    }

    #[test]
    fn test_write_options_builder() {
        let opts = WriteOptions::default().indent(true).indent_str("\t");
        assert!(opts.indent);
        assert_eq!(opts.indent_str, "\t");
        assert!(!opts.omit_declaration);
        let opts = opts.omit_declaration(true);
        assert!(opts.omit_declaration);
    }
}
