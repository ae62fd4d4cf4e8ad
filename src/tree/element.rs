//! Element-level operations: child mutation, attributes, and namespaces.
//!
//! Child lists are mutated through index-checked, all-or-nothing operations.
//! A child that is already attached somewhere is never shared between two
//! positions: inserting it elsewhere installs a deep clone instead, so no
//! node ever has two parents.
//!
//! Attributes and namespace declarations are ordered collections owned by
//! the element, unique by qualified name and by prefix respectively. Adding
//! a duplicate replaces the existing entry in place, preserving its position.

use super::{Document, NodeId, NodeKind, NodeType};
use crate::error::{Result, XmlError};

impl Document {
    fn expect_element(&self, id: NodeId) -> Result<()> {
        if self.node_type(id) == NodeType::Element {
            Ok(())
        } else {
            Err(XmlError::InvalidArgument(format!(
                "expected an element node, found {:?}",
                self.node_type(id)
            )))
        }
    }

    fn expect_child_kind(&self, id: NodeId) -> Result<()> {
        match self.node_type(id) {
            NodeType::Element
            | NodeType::Text
            | NodeType::Comment
            | NodeType::ProcessingInstruction => Ok(()),
            other => Err(XmlError::InvalidArgument(format!(
                "a {other:?} node cannot be an element child"
            ))),
        }
    }

    /// Resolves `child` to a node safe to attach under `parent`: the node
    /// itself if detached, otherwise a deep clone.
    fn adoptable(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId> {
        if self.is_self_or_ancestor(parent, child) {
            return Err(XmlError::InvalidArgument(
                "cannot attach a node below itself".to_string(),
            ));
        }
        if self.node(child).parent.is_some() {
            Ok(self.clone_subtree(child))
        } else {
            Ok(child)
        }
    }

    /// Appends `child` to the end of `parent`'s child list.
    ///
    /// If `child` is already attached elsewhere, a deep clone is appended
    /// instead and the original stays in place. Returns the node actually
    /// installed.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `parent` is not an element,
    /// if `child`'s kind cannot be an element child, or if attaching would
    /// create a cycle.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId> {
        self.expect_element(parent)?;
        self.expect_child_kind(child)?;
        let child = self.adoptable(parent, child)?;
        self.link_append(parent, child);
        Ok(child)
    }

    /// Inserts `child` at `index` in `parent`'s child list. `index` equal to
    /// the child count appends. Returns the node actually installed (a deep
    /// clone if `child` was attached elsewhere).
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::IndexOutOfBounds`] if `index` exceeds the child
    /// count, or [`XmlError::InvalidArgument`] for a bad parent or child
    /// kind. On error the tree is left unchanged.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<NodeId> {
        self.expect_element(parent)?;
        self.expect_child_kind(child)?;
        let len = self.child_count(parent);
        if index > len {
            return Err(XmlError::IndexOutOfBounds { index, len });
        }
        let reference = self.children(parent).nth(index);
        let child = self.adoptable(parent, child)?;
        match reference {
            Some(r) => self.link_insert_before(r, child),
            None => self.link_append(parent, child),
        }
        Ok(child)
    }

    /// Removes and returns the child at `index`. The removed node keeps its
    /// subtree and may be re-attached.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::IndexOutOfBounds`] if `index` is not below the
    /// child count. On error the tree is left unchanged.
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> Result<NodeId> {
        self.expect_element(parent)?;
        let old = self.child_at(parent, index)?;
        self.detach_links(old);
        Ok(old)
    }

    /// Replaces the child at `index` with `new_child`, returning the
    /// displaced node. `new_child` is cloned first if attached elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::IndexOutOfBounds`] for a bad index or
    /// [`XmlError::InvalidArgument`] for a bad kind or cycle. On error the
    /// tree is left unchanged.
    pub fn replace_child(&mut self, parent: NodeId, index: usize, new_child: NodeId) -> Result<NodeId> {
        self.expect_element(parent)?;
        self.expect_child_kind(new_child)?;
        let old = self.child_at(parent, index)?;
        let new_child = self.adoptable(parent, new_child)?;
        self.link_insert_before(old, new_child);
        self.detach_links(old);
        Ok(old)
    }

    /// Returns the direct child elements of `parent` whose qualified name is
    /// `name`, in document order. Returns an empty vector when nothing
    /// matches or `parent` is not an element.
    #[must_use]
    pub fn elements_for_name(&self, parent: NodeId, name: &str) -> Vec<NodeId> {
        self.children(parent)
            .filter(|&c| {
                self.node_type(c) == NodeType::Element
                    && self.name(c).as_deref() == Some(name)
            })
            .collect()
    }

    // --- Attributes ---

    /// Returns the attribute nodes of an element, in document order.
    #[must_use]
    pub fn attributes(&self, elem: NodeId) -> &[NodeId] {
        match &self.node(elem).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns the attribute of `elem` with the given qualified name.
    #[must_use]
    pub fn attribute_for_name(&self, elem: NodeId, name: &str) -> Option<NodeId> {
        self.attributes(elem)
            .iter()
            .copied()
            .find(|&a| self.name(a).as_deref() == Some(name))
    }

    /// Returns the value of the attribute with the given qualified name.
    #[must_use]
    pub fn attribute_value(&self, elem: NodeId, name: &str) -> Option<&str> {
        let attr = self.attribute_for_name(elem, name)?;
        match &self.node(attr).kind {
            NodeKind::Attribute { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Attaches an attribute node to an element.
    ///
    /// If the element already has an attribute with the same qualified name,
    /// the new one takes its slot (position preserved) and the old node is
    /// detached. An `attr` attached to another element is cloned first.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `elem` is not an element or
    /// `attr` is not an attribute node.
    pub fn add_attribute(&mut self, elem: NodeId, attr: NodeId) -> Result<()> {
        self.expect_element(elem)?;
        if self.node_type(attr) != NodeType::Attribute {
            return Err(XmlError::InvalidArgument(format!(
                "expected an attribute node, found {:?}",
                self.node_type(attr)
            )));
        }
        let attr = if self.node(attr).parent.is_some() {
            self.clone_subtree(attr)
        } else {
            attr
        };
        let name = self.name(attr);
        let existing = self
            .attributes(elem)
            .iter()
            .position(|&a| self.name(a) == name);
        match existing {
            Some(slot) => {
                let old = self.attributes(elem)[slot];
                self.node_mut(old).parent = None;
                self.node_mut(attr).parent = Some(elem);
                if let NodeKind::Element { attributes, .. } = &mut self.node_mut(elem).kind {
                    attributes[slot] = attr;
                }
            }
            None => self.push_attribute_slot(elem, attr),
        }
        Ok(())
    }

    /// Removes and returns the attribute with the given qualified name, or
    /// `None` if the element has no such attribute.
    pub fn remove_attribute(&mut self, elem: NodeId, name: &str) -> Option<NodeId> {
        let attr = self.attribute_for_name(elem, name)?;
        self.detach(attr);
        Some(attr)
    }

    // --- Namespaces ---

    /// Returns the namespace declaration nodes of an element, in declaration
    /// order.
    #[must_use]
    pub fn namespaces(&self, elem: NodeId) -> &[NodeId] {
        match &self.node(elem).kind {
            NodeKind::Element { namespaces, .. } => namespaces,
            _ => &[],
        }
    }

    /// Attaches a namespace declaration node to an element.
    ///
    /// If the element already declares the same prefix, the new declaration
    /// takes its slot and the old node is detached. A declaration attached
    /// to another element is cloned first.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `elem` is not an element or
    /// `ns` is not a namespace node.
    pub fn add_namespace(&mut self, elem: NodeId, ns: NodeId) -> Result<()> {
        self.expect_element(elem)?;
        if self.node_type(ns) != NodeType::Namespace {
            return Err(XmlError::InvalidArgument(format!(
                "expected a namespace node, found {:?}",
                self.node_type(ns)
            )));
        }
        let ns = if self.node(ns).parent.is_some() {
            self.clone_subtree(ns)
        } else {
            ns
        };
        let prefix = self.name(ns);
        let existing = self
            .namespaces(elem)
            .iter()
            .position(|&n| self.name(n) == prefix);
        match existing {
            Some(slot) => {
                let old = self.namespaces(elem)[slot];
                self.node_mut(old).parent = None;
                self.node_mut(ns).parent = Some(elem);
                if let NodeKind::Element { namespaces, .. } = &mut self.node_mut(elem).kind {
                    namespaces[slot] = ns;
                }
            }
            None => self.push_namespace_slot(elem, ns),
        }
        Ok(())
    }

    /// Removes and returns the namespace declaration for `prefix` (empty for
    /// the default namespace), or `None` if this element declares no such
    /// prefix. Only the element's own declarations are considered.
    pub fn remove_namespace(&mut self, elem: NodeId, prefix: &str) -> Option<NodeId> {
        let ns = self
            .namespaces(elem)
            .iter()
            .copied()
            .find(|&n| self.name(n).as_deref() == Some(prefix))?;
        self.detach(ns);
        Some(ns)
    }

    /// Resolves `prefix` (empty for the default namespace) to its in-scope
    /// declaration, checking this element's own declarations first and then
    /// walking up through ancestor elements.
    #[must_use]
    pub fn namespace_for_prefix(&self, elem: NodeId, prefix: &str) -> Option<NodeId> {
        for anc in self.ancestors(elem) {
            if let Some(ns) = self
                .namespaces(anc)
                .iter()
                .copied()
                .find(|&n| self.name(n).as_deref() == Some(prefix))
            {
                return Some(ns);
            }
        }
        None
    }

    /// Returns the in-scope prefix bound to `uri` at `elem`, searching this
    /// element's declarations and then its ancestors'. An empty string means
    /// the default namespace.
    #[must_use]
    pub fn resolve_prefix_for_uri(&self, elem: NodeId, uri: &str) -> Option<String> {
        for anc in self.ancestors(elem) {
            for &ns in self.namespaces(anc) {
                if let NodeKind::Namespace { prefix, uri: u } = &self.node(ns).kind {
                    if u == uri {
                        return Some(prefix.clone());
                    }
                }
            }
        }
        None
    }

    /// All namespace bindings in scope at `elem`, innermost declaration
    /// winning for a repeated prefix. Used to seed query evaluation contexts.
    pub(crate) fn in_scope_namespaces(&self, elem: NodeId) -> Vec<(String, String)> {
        let mut bindings: Vec<(String, String)> = Vec::new();
        for anc in self.ancestors(elem) {
            for &ns in self.namespaces(anc) {
                if let NodeKind::Namespace { prefix, uri } = &self.node(ns).kind {
                    if !bindings.iter().any(|(p, _)| p == prefix) {
                        bindings.push((prefix.clone(), uri.clone()));
                    }
                }
            }
        }
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_root(name: &str) -> (Document, NodeId) {
        let mut doc = Document::new();
        let root = doc.new_element(name).unwrap();
        doc.set_root_element(root).unwrap();
        (doc, root)
    }

    #[test]
    fn test_add_child_rejects_attribute_kind() {
        let (mut doc, root) = doc_with_root("root");
        let attr = doc.new_attribute("id", "1").unwrap();
        assert!(matches!(
            doc.add_child(root, attr),
            Err(XmlError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_add_attached_child_installs_clone() {
        let (mut doc, root) = doc_with_root("root");
        let a = doc.new_element("a").unwrap();
        let b = doc.new_element("b").unwrap();
        doc.add_child(root, a).unwrap();
        doc.add_child(root, b).unwrap();
        let leaf = doc.new_text("x");
        doc.add_child(a, leaf).unwrap();

        // leaf is attached under a; adding it under b must clone, not move.
        let installed = doc.add_child(b, leaf).unwrap();
        assert_ne!(installed, leaf);
        assert_eq!(doc.parent(leaf), Some(a));
        assert_eq!(doc.parent(installed), Some(b));
        assert_eq!(doc.string_value(b), "x");
    }

    #[test]
    fn test_add_child_refuses_cycle() {
        let (mut doc, root) = doc_with_root("root");
        let a = doc.new_element("a").unwrap();
        doc.add_child(root, a).unwrap();
        assert!(doc.add_child(a, a).is_err());
        assert!(doc.add_child(a, root).is_err());
    }

    #[test]
    fn test_insert_child_at_index() {
        let (mut doc, root) = doc_with_root("root");
        let a = doc.new_element("a").unwrap();
        let c = doc.new_element("c").unwrap();
        doc.add_child(root, a).unwrap();
        doc.add_child(root, c).unwrap();

        let b = doc.new_element("b").unwrap();
        doc.insert_child(root, 1, b).unwrap();

        let names: Vec<String> = doc
            .children(root)
            .filter_map(|n| doc.name(n))
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_insert_child_at_end_appends() {
        let (mut doc, root) = doc_with_root("root");
        let a = doc.new_element("a").unwrap();
        doc.add_child(root, a).unwrap();
        let b = doc.new_element("b").unwrap();
        doc.insert_child(root, 1, b).unwrap();
        assert_eq!(doc.last_child(root), Some(b));
    }

    #[test]
    fn test_insert_child_bad_index_leaves_tree_unchanged() {
        let (mut doc, root) = doc_with_root("root");
        let a = doc.new_element("a").unwrap();
        doc.add_child(root, a).unwrap();
        let b = doc.new_element("b").unwrap();
        assert!(matches!(
            doc.insert_child(root, 5, b),
            Err(XmlError::IndexOutOfBounds { index: 5, len: 1 })
        ));
        assert_eq!(doc.child_count(root), 1);
        assert_eq!(doc.parent(b), None);
    }

    #[test]
    fn test_remove_child_out_of_bounds() {
        let (mut doc, root) = doc_with_root("root");
        let a = doc.new_element("a").unwrap();
        let b = doc.new_element("b").unwrap();
        doc.add_child(root, a).unwrap();
        doc.add_child(root, b).unwrap();

        assert!(matches!(
            doc.remove_child(root, 99),
            Err(XmlError::IndexOutOfBounds { index: 99, len: 2 })
        ));
        assert_eq!(doc.child_count(root), 2);
    }

    #[test]
    fn test_remove_child_returns_detached_subtree() {
        let (mut doc, root) = doc_with_root("root");
        let a = doc.new_element("a").unwrap();
        doc.add_child(root, a).unwrap();
        let t = doc.new_text("body");
        doc.add_child(a, t).unwrap();

        let removed = doc.remove_child(root, 0).unwrap();
        assert_eq!(removed, a);
        assert_eq!(doc.parent(a), None);
        assert_eq!(doc.string_value(a), "body");
        assert_eq!(doc.child_count(root), 0);
    }

    #[test]
    fn test_replace_child_returns_old() {
        let (mut doc, root) = doc_with_root("root");
        let a = doc.new_element("a").unwrap();
        let c = doc.new_element("c").unwrap();
        doc.add_child(root, a).unwrap();
        doc.add_child(root, c).unwrap();

        let b = doc.new_element("b").unwrap();
        let old = doc.replace_child(root, 0, b).unwrap();
        assert_eq!(old, a);
        assert_eq!(doc.parent(a), None);

        let names: Vec<String> = doc
            .children(root)
            .filter_map(|n| doc.name(n))
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_elements_for_name_filters_kind_and_name() {
        let (mut doc, root) = doc_with_root("root");
        let i1 = doc.new_element("item").unwrap();
        let other = doc.new_element("other").unwrap();
        let i2 = doc.new_element("item").unwrap();
        let text = doc.new_text("item");
        doc.add_child(root, i1).unwrap();
        doc.add_child(root, other).unwrap();
        doc.add_child(root, i2).unwrap();
        doc.add_child(root, text).unwrap();

        assert_eq!(doc.elements_for_name(root, "item"), vec![i1, i2]);
        assert!(doc.elements_for_name(root, "missing").is_empty());
    }

    #[test]
    fn test_add_attribute_replaces_by_name_in_place() {
        let (mut doc, root) = doc_with_root("root");
        let a1 = doc.new_attribute("id", "1").unwrap();
        let color = doc.new_attribute("color", "red").unwrap();
        doc.add_attribute(root, a1).unwrap();
        doc.add_attribute(root, color).unwrap();

        let a2 = doc.new_attribute("id", "2").unwrap();
        doc.add_attribute(root, a2).unwrap();

        assert_eq!(doc.attributes(root).len(), 2);
        assert_eq!(doc.attribute_value(root, "id"), Some("2"));
        // Replacement keeps the original slot order.
        assert_eq!(doc.attributes(root)[0], a2);
        assert_eq!(doc.parent(a1), None);
    }

    #[test]
    fn test_remove_attribute() {
        let (mut doc, root) = doc_with_root("root");
        let attr = doc.new_attribute("id", "1").unwrap();
        doc.add_attribute(root, attr).unwrap();

        assert_eq!(doc.remove_attribute(root, "id"), Some(attr));
        assert_eq!(doc.attribute_for_name(root, "id"), None);
        assert_eq!(doc.remove_attribute(root, "id"), None);
    }

    #[test]
    fn test_attribute_detach_via_node_api() {
        let (mut doc, root) = doc_with_root("root");
        let attr = doc.new_attribute("id", "1").unwrap();
        doc.add_attribute(root, attr).unwrap();
        assert_eq!(doc.parent(attr), Some(root));

        doc.detach(attr);
        assert_eq!(doc.parent(attr), None);
        assert!(doc.attributes(root).is_empty());
    }

    #[test]
    fn test_add_namespace_replaces_by_prefix() {
        let (mut doc, root) = doc_with_root("root");
        let ns1 = doc.new_namespace("p", "urn:one").unwrap();
        doc.add_namespace(root, ns1).unwrap();
        let ns2 = doc.new_namespace("p", "urn:two").unwrap();
        doc.add_namespace(root, ns2).unwrap();

        assert_eq!(doc.namespaces(root).len(), 1);
        let found = doc.namespace_for_prefix(root, "p").unwrap();
        assert_eq!(doc.string_value(found), "urn:two");
    }

    #[test]
    fn test_namespace_ancestor_fallback() {
        let (mut doc, root) = doc_with_root("root");
        let ns = doc.new_namespace("p", "urn:x").unwrap();
        doc.add_namespace(root, ns).unwrap();
        let child = doc.new_element("child").unwrap();
        doc.add_child(root, child).unwrap();
        let grandchild = doc.new_element("grandchild").unwrap();
        doc.add_child(child, grandchild).unwrap();

        let found = doc.namespace_for_prefix(grandchild, "p").unwrap();
        assert_eq!(found, ns);
        assert_eq!(doc.namespace_for_prefix(grandchild, "q"), None);
    }

    #[test]
    fn test_inner_declaration_shadows_outer() {
        let (mut doc, root) = doc_with_root("root");
        let outer = doc.new_namespace("p", "urn:outer").unwrap();
        doc.add_namespace(root, outer).unwrap();
        let child = doc.new_element("child").unwrap();
        doc.add_child(root, child).unwrap();
        let inner = doc.new_namespace("p", "urn:inner").unwrap();
        doc.add_namespace(child, inner).unwrap();

        let found = doc.namespace_for_prefix(child, "p").unwrap();
        assert_eq!(doc.string_value(found), "urn:inner");

        let bindings = doc.in_scope_namespaces(child);
        assert_eq!(bindings, vec![("p".to_string(), "urn:inner".to_string())]);
    }

    #[test]
    fn test_resolve_prefix_for_uri() {
        let (mut doc, root) = doc_with_root("root");
        let ns = doc.new_namespace("svg", "http://www.w3.org/2000/svg").unwrap();
        doc.add_namespace(root, ns).unwrap();
        let child = doc.new_element("child").unwrap();
        doc.add_child(root, child).unwrap();

        assert_eq!(
            doc.resolve_prefix_for_uri(child, "http://www.w3.org/2000/svg"),
            Some("svg".to_string())
        );
        assert_eq!(doc.resolve_prefix_for_uri(child, "urn:none"), None);
    }

    #[test]
    fn test_default_namespace_uses_empty_prefix() {
        let (mut doc, root) = doc_with_root("root");
        let ns = doc.new_namespace("", "urn:default").unwrap();
        doc.add_namespace(root, ns).unwrap();

        let found = doc.namespace_for_prefix(root, "").unwrap();
        assert_eq!(doc.string_value(found), "urn:default");
    }
}
