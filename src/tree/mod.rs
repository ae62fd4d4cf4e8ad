//! Arena-based DOM tree.
//!
//! This module implements the core tree representation using arena allocation
//! with typed indices. All nodes live in a contiguous `Vec<NodeData>` owned by
//! the [`Document`], and are referenced by [`NodeId`] — a newtype over
//! `NonZeroU32`.
//!
//! This design provides O(1) node access, cache-friendly layout, no reference
//! counting overhead, and safe bulk deallocation (drop the `Document` and
//! everything is freed). Parent pointers are navigational, not owning, so the
//! parent/child back-references never form an ownership cycle.
//!
//! # Architecture
//!
//! Arena indices are used for all navigation links (parent, first\_child,
//! last\_child, next\_sibling, prev\_sibling). A node detached from its parent
//! stays allocated in the arena and becomes the root of an independent,
//! re-attachable subtree. Handle liveness follows from the borrow checker:
//! a `NodeId` is only usable through a live `&Document`.
//!
//! Each `Document` owns a hidden wrapper node that is the internal parent of
//! the root element. The wrapper is never returned by any public method, and
//! [`Document::parent`] reports `None` for nodes directly below it.

mod dtd;
mod element;
mod node;

pub use node::{DtdDeclKind, NodeKind, NodeType};

use std::num::NonZeroU32;

use crate::error::{Result, XmlError};
use crate::util::qname::{is_valid_ncname, is_valid_qname, split_qname};

/// A typed index into the document's node arena.
///
/// `NodeId` is a newtype over `NonZeroU32`, meaning it can never be zero
/// and `Option<NodeId>` has the same size as `NodeId` (niche optimization).
///
/// Two `NodeId`s compare equal iff they reference the same underlying
/// storage — identity, not structural equality. A `NodeId` is only
/// meaningful together with the `Document` that allocated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    /// Returns the raw index as a `usize` for indexing into the arena.
    fn as_index(self) -> usize {
        self.0.get() as usize
    }
}

/// Storage for a single node in the document arena.
///
/// Each node stores its kind (element, text, comment, etc.) and links to
/// parent, children, and siblings for tree navigation.
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    /// What kind of node this is and its payload.
    pub(crate) kind: NodeKind,
    /// Parent node, if any. The wrapper node and detached roots have none.
    /// Attribute and namespace nodes point at their owning element.
    pub(crate) parent: Option<NodeId>,
    /// First child node.
    pub(crate) first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub(crate) last_child: Option<NodeId>,
    /// Next sibling.
    pub(crate) next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub(crate) prev_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }
}

/// An XML document: the root container of the DOM tree.
///
/// The `Document` owns all nodes in an arena and provides the node-level,
/// element-level, and document-level operations of the DOM contract. All
/// tree operations go through `&Document` (navigation) or `&mut Document`
/// (mutation).
///
/// # Examples
///
/// ```no_run
/// use domoxide::Document;
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.name(root).as_deref(), Some("root"));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
    /// The hidden document wrapper node.
    wrapper: NodeId,
    /// XML version from the XML declaration (e.g., "1.0").
    pub(crate) version: Option<String>,
    /// Encoding from the XML declaration (e.g., "UTF-8").
    pub(crate) encoding: Option<String>,
    /// Standalone flag from the XML declaration.
    pub(crate) standalone: Option<bool>,
    /// The document type declaration node, if any.
    pub(crate) dtd: Option<NodeId>,
}

impl Document {
    /// Creates a new empty document.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        // Index 0: placeholder (NodeId uses NonZeroU32)
        nodes.push(NodeData::new(NodeKind::Document));
        // Index 1: the hidden document wrapper node
        nodes.push(NodeData::new(NodeKind::Document));
        let wrapper = NodeId::from_index(1);
        Self {
            nodes,
            wrapper,
            version: None,
            encoding: None,
            standalone: None,
            dtd: None,
        }
    }

    /// The hidden wrapper node id. Internal: the public API never returns it.
    pub(crate) fn wrapper(&self) -> NodeId {
        self.wrapper
    }

    /// Returns a reference to the `NodeData` for the given node.
    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    /// Returns a mutable reference to the `NodeData` for the given node.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Allocates a new node in the arena and returns its `NodeId`.
    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    // --- Detached-node constructors ---

    /// Creates a detached element node with the given qualified name.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `name` is not a well-formed
    /// XML qualified name.
    pub fn new_element(&mut self, name: &str) -> Result<NodeId> {
        if !is_valid_qname(name) {
            return Err(XmlError::InvalidArgument(format!(
                "'{name}' is not a valid element name"
            )));
        }
        let (prefix, local) = split_qname(name);
        Ok(self.alloc(NodeKind::Element {
            name: local.to_string(),
            prefix: prefix.map(str::to_string),
            attributes: Vec::new(),
            namespaces: Vec::new(),
        }))
    }

    /// Creates a detached text node.
    pub fn new_text(&mut self, content: &str) -> NodeId {
        self.alloc(NodeKind::Text {
            content: content.to_string(),
        })
    }

    /// Creates a detached comment node.
    pub fn new_comment(&mut self, content: &str) -> NodeId {
        self.alloc(NodeKind::Comment {
            content: content.to_string(),
        })
    }

    /// Creates a detached processing-instruction node.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `target` is not a well-formed
    /// XML name.
    pub fn new_processing_instruction(
        &mut self,
        target: &str,
        data: Option<&str>,
    ) -> Result<NodeId> {
        if !is_valid_ncname(target) {
            return Err(XmlError::InvalidArgument(format!(
                "'{target}' is not a valid processing instruction target"
            )));
        }
        Ok(self.alloc(NodeKind::ProcessingInstruction {
            target: target.to_string(),
            data: data.map(str::to_string),
        }))
    }

    /// Creates a detached attribute node with the given qualified name and
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `name` is not a well-formed
    /// XML qualified name.
    pub fn new_attribute(&mut self, name: &str, value: &str) -> Result<NodeId> {
        if !is_valid_qname(name) {
            return Err(XmlError::InvalidArgument(format!(
                "'{name}' is not a valid attribute name"
            )));
        }
        let (prefix, local) = split_qname(name);
        Ok(self.alloc(NodeKind::Attribute {
            name: local.to_string(),
            prefix: prefix.map(str::to_string),
            value: value.to_string(),
        }))
    }

    /// Creates a detached namespace declaration node. An empty `prefix`
    /// declares the default namespace.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `prefix` is neither empty nor
    /// a well-formed name.
    pub fn new_namespace(&mut self, prefix: &str, uri: &str) -> Result<NodeId> {
        if !prefix.is_empty() && !is_valid_ncname(prefix) {
            return Err(XmlError::InvalidArgument(format!(
                "'{prefix}' is not a valid namespace prefix"
            )));
        }
        Ok(self.alloc(NodeKind::Namespace {
            prefix: prefix.to_string(),
            uri: uri.to_string(),
        }))
    }

    // --- Node contract ---

    /// Returns the kind of a node, fixed at construction.
    #[must_use]
    pub fn node_type(&self, id: NodeId) -> NodeType {
        self.node(id).kind.node_type()
    }

    /// Returns the qualified name of a node, if its kind carries one.
    ///
    /// Elements and attributes report `prefix:local` when prefixed; namespace
    /// nodes report their prefix (empty for the default namespace); PIs their
    /// target; DTD and declaration nodes their declared name. Text and
    /// comment nodes have no name.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<String> {
        match &self.node(id).kind {
            NodeKind::Element { name, prefix, .. } | NodeKind::Attribute { name, prefix, .. } => {
                Some(match prefix {
                    Some(p) => format!("{p}:{name}"),
                    None => name.clone(),
                })
            }
            NodeKind::Namespace { prefix, .. } => Some(prefix.clone()),
            NodeKind::ProcessingInstruction { target, .. } => Some(target.clone()),
            NodeKind::DocumentType { name, .. } | NodeKind::DtdDecl { name, .. } => {
                Some(name.clone())
            }
            NodeKind::Text { .. } | NodeKind::Comment { .. } | NodeKind::Document => None,
        }
    }

    /// Returns the local name of a node (the name without its prefix).
    #[must_use]
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. }
            | NodeKind::Attribute { name, .. }
            | NodeKind::DocumentType { name, .. }
            | NodeKind::DtdDecl { name, .. } => Some(name),
            NodeKind::Namespace { prefix, .. } => Some(prefix),
            NodeKind::ProcessingInstruction { target, .. } => Some(target),
            NodeKind::Text { .. } | NodeKind::Comment { .. } | NodeKind::Document => None,
        }
    }

    /// Returns the namespace prefix of an element or attribute node, if any.
    #[must_use]
    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { prefix, .. } | NodeKind::Attribute { prefix, .. } => {
                prefix.as_deref()
            }
            _ => None,
        }
    }

    /// Renames a node.
    ///
    /// Elements and attributes accept qualified names (`prefix:local`);
    /// processing instructions, DTDs, and declarations accept plain names.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if the new name is not
    /// well-formed for the node's kind, or if the kind carries no name.
    pub fn set_name(&mut self, id: NodeId, new_name: &str) -> Result<()> {
        match &self.node(id).kind {
            NodeKind::Element { .. } | NodeKind::Attribute { .. } => {
                if !is_valid_qname(new_name) {
                    return Err(XmlError::InvalidArgument(format!(
                        "'{new_name}' is not a valid XML name"
                    )));
                }
                let (new_prefix, new_local) = split_qname(new_name);
                let (new_prefix, new_local) =
                    (new_prefix.map(str::to_string), new_local.to_string());
                match &mut self.node_mut(id).kind {
                    NodeKind::Element { name, prefix, .. }
                    | NodeKind::Attribute { name, prefix, .. } => {
                        *name = new_local;
                        *prefix = new_prefix;
                    }
                    _ => {}
                }
                Ok(())
            }
            NodeKind::ProcessingInstruction { .. } => {
                if !is_valid_ncname(new_name) {
                    return Err(XmlError::InvalidArgument(format!(
                        "'{new_name}' is not a valid processing instruction target"
                    )));
                }
                if let NodeKind::ProcessingInstruction { target, .. } =
                    &mut self.node_mut(id).kind
                {
                    *target = new_name.to_string();
                }
                Ok(())
            }
            NodeKind::Namespace { .. } => {
                if !new_name.is_empty() && !is_valid_ncname(new_name) {
                    return Err(XmlError::InvalidArgument(format!(
                        "'{new_name}' is not a valid namespace prefix"
                    )));
                }
                if let NodeKind::Namespace { prefix, .. } = &mut self.node_mut(id).kind {
                    *prefix = new_name.to_string();
                }
                Ok(())
            }
            NodeKind::DocumentType { .. } | NodeKind::DtdDecl { .. } => {
                if !is_valid_qname(new_name) {
                    return Err(XmlError::InvalidArgument(format!(
                        "'{new_name}' is not a valid XML name"
                    )));
                }
                match &mut self.node_mut(id).kind {
                    NodeKind::DocumentType { name, .. } | NodeKind::DtdDecl { name, .. } => {
                        *name = new_name.to_string();
                    }
                    _ => {}
                }
                Ok(())
            }
            NodeKind::Text { .. } | NodeKind::Comment { .. } | NodeKind::Document => Err(
                XmlError::InvalidArgument("node kind carries no name".to_string()),
            ),
        }
    }

    /// Returns the textual content of a node.
    ///
    /// For elements this is the concatenated text of all descendant text
    /// nodes; for attributes the value; for namespace nodes the URI; for
    /// text, comment, and PI nodes their own content.
    #[must_use]
    pub fn string_value(&self, id: NodeId) -> String {
        match &self.node(id).kind {
            NodeKind::Element { .. } | NodeKind::Document => {
                let mut buf = String::new();
                self.collect_text(id, &mut buf);
                buf
            }
            NodeKind::Attribute { value, .. } => value.clone(),
            NodeKind::Namespace { uri, .. } => uri.clone(),
            NodeKind::Text { content } | NodeKind::Comment { content } => content.clone(),
            NodeKind::ProcessingInstruction { data, .. } => {
                data.clone().unwrap_or_default()
            }
            NodeKind::DocumentType { .. } => String::new(),
            NodeKind::DtdDecl { decl, text, .. } => {
                // An entity declaration's value is its quoted literal.
                if *decl == DtdDeclKind::Entity {
                    let trimmed = text.trim();
                    trimmed
                        .strip_prefix('"')
                        .and_then(|t| t.strip_suffix('"'))
                        .or_else(|| {
                            trimmed.strip_prefix('\'').and_then(|t| t.strip_suffix('\''))
                        })
                        .unwrap_or(text)
                        .to_string()
                } else {
                    text.clone()
                }
            }
        }
    }

    /// Replaces the textual content of a node.
    ///
    /// For element nodes this removes *all* existing children and installs a
    /// single text child with the given content.
    pub fn set_string_value(&mut self, id: NodeId, value: &str) {
        match &self.node(id).kind {
            NodeKind::Element { .. } => {
                while let Some(child) = self.node(id).first_child {
                    self.detach_links(child);
                }
                let text = self.new_text(value);
                self.link_append(id, text);
            }
            NodeKind::Attribute { .. } => {
                if let NodeKind::Attribute { value: v, .. } = &mut self.node_mut(id).kind {
                    *v = value.to_string();
                }
            }
            NodeKind::Namespace { .. } => {
                if let NodeKind::Namespace { uri, .. } = &mut self.node_mut(id).kind {
                    *uri = value.to_string();
                }
            }
            NodeKind::Text { .. } | NodeKind::Comment { .. } => {
                match &mut self.node_mut(id).kind {
                    NodeKind::Text { content } | NodeKind::Comment { content } => {
                        *content = value.to_string();
                    }
                    _ => {}
                }
            }
            NodeKind::ProcessingInstruction { .. } => {
                if let NodeKind::ProcessingInstruction { data, .. } = &mut self.node_mut(id).kind
                {
                    *data = Some(value.to_string());
                }
            }
            NodeKind::DtdDecl { .. } => {
                if let NodeKind::DtdDecl { text, .. } = &mut self.node_mut(id).kind {
                    *text = value.to_string();
                }
            }
            NodeKind::DocumentType { .. } | NodeKind::Document => {}
        }
    }

    fn collect_text(&self, id: NodeId, buf: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text { content } => buf.push_str(content),
            _ => {
                for child in self.children(id) {
                    self.collect_text(child, buf);
                }
            }
        }
    }

    // --- Navigation ---

    /// Returns the structural parent of a node, or `None` if the node is
    /// detached or sits at the top of its tree.
    ///
    /// The hidden document wrapper is never reported: the root element's
    /// parent is `None`. Attribute and namespace nodes report their owning
    /// element.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        match self.node(id).parent {
            Some(p) if p == self.wrapper => None,
            other => other,
        }
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Returns the number of children of a node.
    ///
    /// Attribute and namespace nodes are not children and are not counted.
    #[must_use]
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Returns the child at `index`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::IndexOutOfBounds`] if `index` is not below the
    /// child count.
    pub fn child_at(&self, id: NodeId, index: usize) -> Result<NodeId> {
        self.children(id)
            .nth(index)
            .ok_or_else(|| XmlError::IndexOutOfBounds {
                index,
                len: self.child_count(id),
            })
    }

    /// Returns the nesting level of a node: the number of ancestor hops to
    /// the top of its tree.
    ///
    /// The root element of a document is at level 1 (the document itself is
    /// level 0); the root of a detached subtree is at level 0.
    #[must_use]
    pub fn level(&self, id: NodeId) -> usize {
        let mut level = 0;
        let mut current = self.node(id).parent;
        while let Some(p) = current {
            level += 1;
            current = self.node(p).parent;
        }
        level
    }

    /// Removes a node from its parent without destroying it.
    ///
    /// The node becomes the root of its own independent subtree, still
    /// carrying its descendants (and, for elements, attributes and namespace
    /// declarations), and may be re-attached elsewhere. Detaching an already
    /// detached node is a no-op.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        // Attribute and namespace nodes live in their owner's slot vectors,
        // not in the sibling chain.
        match self.node(id).kind.node_type() {
            NodeType::Attribute => {
                if let NodeKind::Element { attributes, .. } = &mut self.node_mut(parent).kind {
                    attributes.retain(|&a| a != id);
                }
                self.node_mut(id).parent = None;
            }
            NodeType::Namespace => {
                if let NodeKind::Element { namespaces, .. } = &mut self.node_mut(parent).kind {
                    namespaces.retain(|&n| n != id);
                }
                self.node_mut(id).parent = None;
            }
            _ => self.detach_links(id),
        }
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over a node and its ancestors, stopping below the
    /// hidden document wrapper.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: Some(id),
        }
    }

    /// Returns an iterator over all descendants of a node (depth-first,
    /// document order).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// Returns the total number of nodes allocated in the arena.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1 // subtract placeholder at index 0
    }

    // --- Low-level link surgery (internal) ---

    /// Appends `child` to the end of `parent`'s child list.
    ///
    /// `child` must be detached.
    pub(crate) fn link_append(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.node(child).parent.is_none(),
            "child already has a parent; detach it first"
        );

        self.node_mut(child).parent = Some(parent);

        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(parent).last_child = Some(child);
        } else {
            self.node_mut(parent).first_child = Some(child);
            self.node_mut(parent).last_child = Some(child);
        }
    }

    /// Inserts `new_child` before `reference` in the sibling chain.
    ///
    /// `reference` must be attached and `new_child` detached.
    pub(crate) fn link_insert_before(&mut self, reference: NodeId, new_child: NodeId) {
        debug_assert!(
            self.node(new_child).parent.is_none(),
            "new_child already has a parent; detach it first"
        );

        let Some(parent) = self.node(reference).parent else {
            return;
        };
        self.node_mut(new_child).parent = Some(parent);

        if let Some(prev) = self.node(reference).prev_sibling {
            self.node_mut(prev).next_sibling = Some(new_child);
            self.node_mut(new_child).prev_sibling = Some(prev);
        } else {
            self.node_mut(parent).first_child = Some(new_child);
        }

        self.node_mut(new_child).next_sibling = Some(reference);
        self.node_mut(reference).prev_sibling = Some(new_child);
    }

    /// Unlinks a node from the sibling chain of its parent.
    pub(crate) fn detach_links(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };

        let prev = self.node(id).prev_sibling;
        let next = self.node(id).next_sibling;

        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }

        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }

        self.node_mut(id).parent = None;
        self.node_mut(id).prev_sibling = None;
        self.node_mut(id).next_sibling = None;
    }

    /// Installs an attribute node into an element's slot vector.
    pub(crate) fn push_attribute_slot(&mut self, elem: NodeId, attr: NodeId) {
        self.node_mut(attr).parent = Some(elem);
        if let NodeKind::Element { attributes, .. } = &mut self.node_mut(elem).kind {
            attributes.push(attr);
        }
    }

    /// Installs a namespace node into an element's slot vector.
    pub(crate) fn push_namespace_slot(&mut self, elem: NodeId, ns: NodeId) {
        self.node_mut(ns).parent = Some(elem);
        if let NodeKind::Element { namespaces, .. } = &mut self.node_mut(elem).kind {
            namespaces.push(ns);
        }
    }

    /// Returns `true` if `candidate` is `id` itself or one of its ancestors.
    pub(crate) fn is_self_or_ancestor(&self, id: NodeId, candidate: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(n) = current {
            if n == candidate {
                return true;
            }
            current = self.node(n).parent;
        }
        false
    }

    /// Deep-clones the subtree rooted at `id` within this arena, returning
    /// the detached clone's root.
    pub(crate) fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let new_id = match self.node(id).kind.clone() {
            NodeKind::Element {
                name,
                prefix,
                attributes,
                namespaces,
            } => {
                let clone = self.alloc(NodeKind::Element {
                    name,
                    prefix,
                    attributes: Vec::new(),
                    namespaces: Vec::new(),
                });
                for ns in namespaces {
                    let ns_clone = self.clone_subtree(ns);
                    self.push_namespace_slot(clone, ns_clone);
                }
                for attr in attributes {
                    let attr_clone = self.clone_subtree(attr);
                    self.push_attribute_slot(clone, attr_clone);
                }
                clone
            }
            other => self.alloc(other),
        };
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            let child_clone = self.clone_subtree(child);
            self.link_append(new_id, child_clone);
        }
        new_id
    }

    /// Deep-copies the subtree rooted at `id` in `src` into this arena,
    /// returning the detached copy's root. This is the only way a node
    /// crosses between documents: storage is never shared between two trees.
    pub fn import_node(&mut self, src: &Document, id: NodeId) -> NodeId {
        let new_id = match src.node(id).kind.clone() {
            NodeKind::Element {
                name,
                prefix,
                attributes,
                namespaces,
            } => {
                let copy = self.alloc(NodeKind::Element {
                    name,
                    prefix,
                    attributes: Vec::new(),
                    namespaces: Vec::new(),
                });
                for ns in namespaces {
                    let ns_copy = self.import_node(src, ns);
                    self.push_namespace_slot(copy, ns_copy);
                }
                for attr in attributes {
                    let attr_copy = self.import_node(src, attr);
                    self.push_attribute_slot(copy, attr_copy);
                }
                copy
            }
            other => self.alloc(other),
        };
        for child in src.children(id) {
            let child_copy = self.import_node(src, child);
            self.link_append(new_id, child_copy);
        }
        new_id
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors, excluding the hidden wrapper.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = match self.doc.node(current).parent {
            Some(p) if p == self.doc.wrapper => None,
            other => other,
        };
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        // Try to go deeper first
        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        // Try next sibling
        if let Some(sibling) = self.doc.next_sibling(current) {
            self.next = Some(sibling);
            return Some(current);
        }

        // Walk up to find an ancestor with a next sibling
        let mut ancestor = self.doc.node(current).parent;
        while let Some(anc) = ancestor {
            if anc == self.root {
                self.next = None;
                return Some(current);
            }
            if let Some(sibling) = self.doc.next_sibling(anc) {
                self.next = Some(sibling);
                return Some(current);
            }
            ancestor = self.doc.node(anc).parent;
        }

        self.next = None;
        Some(current)
    }
}
