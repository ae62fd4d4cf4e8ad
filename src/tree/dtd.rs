//! Document type declaration nodes.
//!
//! A DTD node carries the declared root element name plus optional PUBLIC
//! and SYSTEM identifiers. The markup declarations of its internal subset
//! (`<!ENTITY ...>`, `<!NOTATION ...>`, `<!ELEMENT ...>`, `<!ATTLIST ...>`)
//! are ordinary child nodes of [`DtdDeclKind`](super::DtdDeclKind) kind, so
//! the usual child navigation applies.

use super::{Document, DtdDeclKind, NodeId, NodeKind, NodeType};
use crate::error::{Result, XmlError};
use crate::util::qname::is_valid_qname;

impl Document {
    /// Creates a detached document type declaration node.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `name` is not a well-formed
    /// XML name.
    pub fn new_dtd(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<NodeId> {
        if !is_valid_qname(name) {
            return Err(XmlError::InvalidArgument(format!(
                "'{name}' is not a valid document type name"
            )));
        }
        Ok(self.alloc(NodeKind::DocumentType {
            name: name.to_string(),
            public_id: public_id.map(str::to_string),
            system_id: system_id.map(str::to_string),
        }))
    }

    /// Creates a detached DTD markup declaration node.
    ///
    /// `text` is the declaration body following the name, e.g., `"&#169;"`
    /// (quoted) for an entity or `(#PCDATA)` for an element declaration.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `name` is not a well-formed
    /// XML name.
    pub fn new_dtd_decl(&mut self, decl: DtdDeclKind, name: &str, text: &str) -> Result<NodeId> {
        if !is_valid_qname(name) {
            return Err(XmlError::InvalidArgument(format!(
                "'{name}' is not a valid declaration name"
            )));
        }
        Ok(self.alloc(NodeKind::DtdDecl {
            decl,
            name: name.to_string(),
            text: text.to_string(),
        }))
    }

    fn expect_dtd(&self, id: NodeId) -> Result<()> {
        if self.node_type(id) == NodeType::DocumentType {
            Ok(())
        } else {
            Err(XmlError::InvalidArgument(format!(
                "expected a document type node, found {:?}",
                self.node_type(id)
            )))
        }
    }

    /// Returns the PUBLIC identifier of a DTD node, if any.
    #[must_use]
    pub fn dtd_public_id(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::DocumentType { public_id, .. } => public_id.as_deref(),
            _ => None,
        }
    }

    /// Sets or clears the PUBLIC identifier of a DTD node.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `id` is not a document type
    /// node.
    pub fn set_dtd_public_id(&mut self, id: NodeId, public_id: Option<&str>) -> Result<()> {
        self.expect_dtd(id)?;
        if let NodeKind::DocumentType { public_id: p, .. } = &mut self.node_mut(id).kind {
            *p = public_id.map(str::to_string);
        }
        Ok(())
    }

    /// Returns the SYSTEM identifier of a DTD node, if any.
    #[must_use]
    pub fn dtd_system_id(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::DocumentType { system_id, .. } => system_id.as_deref(),
            _ => None,
        }
    }

    /// Sets or clears the SYSTEM identifier of a DTD node.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `id` is not a document type
    /// node.
    pub fn set_dtd_system_id(&mut self, id: NodeId, system_id: Option<&str>) -> Result<()> {
        self.expect_dtd(id)?;
        if let NodeKind::DocumentType { system_id: s, .. } = &mut self.node_mut(id).kind {
            *s = system_id.map(str::to_string);
        }
        Ok(())
    }

    /// Returns which markup declaration keyword a DTD declaration node
    /// represents.
    #[must_use]
    pub fn dtd_decl_kind(&self, id: NodeId) -> Option<DtdDeclKind> {
        match &self.node(id).kind {
            NodeKind::DtdDecl { decl, .. } => Some(*decl),
            _ => None,
        }
    }

    /// Appends a markup declaration to a DTD node's internal subset.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::InvalidArgument`] if `dtd` is not a document type
    /// node or `decl` is not a declaration node.
    pub fn add_dtd_decl(&mut self, dtd: NodeId, decl: NodeId) -> Result<()> {
        self.expect_dtd(dtd)?;
        if self.node_type(decl) != NodeType::DtdDecl {
            return Err(XmlError::InvalidArgument(format!(
                "expected a DTD declaration node, found {:?}",
                self.node_type(decl)
            )));
        }
        if self.node(decl).parent.is_some() {
            return Err(XmlError::InvalidArgument(
                "declaration is already attached; detach it first".to_string(),
            ));
        }
        self.link_append(dtd, decl);
        Ok(())
    }

    /// Returns the first entity declaration with the given name inside a DTD
    /// node's internal subset.
    #[must_use]
    pub fn entity_decl_for_name(&self, dtd: NodeId, name: &str) -> Option<NodeId> {
        self.children(dtd).find(|&c| {
            self.dtd_decl_kind(c) == Some(DtdDeclKind::Entity)
                && self.name(c).as_deref() == Some(name)
        })
    }
}
