//! Node type definitions.
//!
//! The `NodeKind` enum represents all node kinds in the DOM tree. Each variant
//! carries the kind-specific payload (element name and attribute/namespace
//! collections, text content, DTD identifiers). Navigation links (parent,
//! children, siblings) are stored in `NodeData`, not here.

use super::NodeId;

/// The fixed kind of a node, without its payload.
///
/// Returned by [`Document::node_type`](crate::Document::node_type); useful for
/// dispatching on kind without borrowing the node's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// The hidden per-document wrapper node. Never surfaced by the public API.
    Document,
    /// An element node, e.g., `<item id="1">`.
    Element,
    /// An attribute node, a name/value pair owned by an element.
    Attribute,
    /// A namespace declaration node, a prefix/URI pair owned by an element.
    Namespace,
    /// A text node containing character data.
    Text,
    /// A comment node, e.g., `<!-- ... -->`.
    Comment,
    /// A processing instruction, e.g., `<?target data?>`.
    ProcessingInstruction,
    /// A document type declaration, e.g., `<!DOCTYPE catalog SYSTEM "...">`.
    DocumentType,
    /// A markup declaration inside a DTD (entity, notation, element, attlist).
    DtdDecl,
}

/// The kind of markup declaration a [`NodeKind::DtdDecl`] node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DtdDeclKind {
    /// `<!ENTITY ...>`
    Entity,
    /// `<!NOTATION ...>`
    Notation,
    /// `<!ELEMENT ...>` content model declaration.
    ElementDecl,
    /// `<!ATTLIST ...>`
    AttList,
}

impl DtdDeclKind {
    /// The declaration keyword as it appears in markup.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Entity => "ENTITY",
            Self::Notation => "NOTATION",
            Self::ElementDecl => "ELEMENT",
            Self::AttList => "ATTLIST",
        }
    }
}

/// The kind of a node and its associated data.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document wrapper node — there is exactly one per `Document`, it is
    /// the internal parent of the root element and is never exposed.
    Document,

    /// An element node.
    ///
    /// Attribute and namespace nodes are owned by the element through these
    /// ordered collections; they are not part of the child sibling chain.
    Element {
        /// The element's local name (without prefix).
        name: String,
        /// Namespace prefix (e.g., `"svg"` in `svg:rect`), if any.
        prefix: Option<String>,
        /// Attribute nodes, in document order, unique by name.
        attributes: Vec<NodeId>,
        /// Namespace declaration nodes, in declaration order, unique by prefix.
        namespaces: Vec<NodeId>,
    },

    /// An attribute node: a name/value pair.
    Attribute {
        /// The attribute's local name.
        name: String,
        /// Namespace prefix, if any.
        prefix: Option<String>,
        /// The attribute value (entity references resolved).
        value: String,
    },

    /// A namespace declaration: a prefix/URI pair. An empty prefix denotes
    /// the default namespace (`xmlns="..."`).
    Namespace {
        /// The declared prefix, or empty for the default namespace.
        prefix: String,
        /// The namespace URI.
        uri: String,
    },

    /// A text node containing character data. CDATA sections are represented
    /// as text.
    Text {
        /// The text content (character references resolved).
        content: String,
    },

    /// A comment node (without the `<!--` and `-->` delimiters).
    Comment {
        /// The comment text.
        content: String,
    },

    /// A processing instruction, e.g., `<?xml-stylesheet href="a.css"?>`.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI data, if any.
        data: Option<String>,
    },

    /// A document type declaration. Its markup declarations are ordinary
    /// child nodes of [`NodeKind::DtdDecl`] kind.
    DocumentType {
        /// The root element name declared in the DOCTYPE.
        name: String,
        /// The PUBLIC identifier, if any.
        public_id: Option<String>,
        /// The SYSTEM identifier (URI), if any.
        system_id: Option<String>,
    },

    /// A markup declaration inside a DTD.
    DtdDecl {
        /// Which declaration keyword this node represents.
        decl: DtdDeclKind,
        /// The declared name (entity name, element name, ...).
        name: String,
        /// The raw remainder of the declaration after the name, e.g.,
        /// `"value"` for an entity or `(#PCDATA)` for an element declaration.
        text: String,
    },
}

impl NodeKind {
    /// Returns the payload-free kind tag for this node kind.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Document => NodeType::Document,
            Self::Element { .. } => NodeType::Element,
            Self::Attribute { .. } => NodeType::Attribute,
            Self::Namespace { .. } => NodeType::Namespace,
            Self::Text { .. } => NodeType::Text,
            Self::Comment { .. } => NodeType::Comment,
            Self::ProcessingInstruction { .. } => NodeType::ProcessingInstruction,
            Self::DocumentType { .. } => NodeType::DocumentType,
            Self::DtdDecl { .. } => NodeType::DtdDecl,
        }
    }
}
