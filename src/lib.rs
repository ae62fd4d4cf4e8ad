//! # domoxide
//!
//! A DOM-style XML object model: a mutable document tree with full node,
//! element, and document-level editing, namespace resolution, DTD access,
//! and XPath 1.0 queries.
//!
//! Parsing, serialization, and query evaluation plug in through the
//! [`XmlEngine`] trait; the bundled [`DefaultEngine`] is backed by
//! `quick-xml` and `sxd-xpath`.
//!
//! ## Quick Start
//!
//! ```
//! use domoxide::Document;
//!
//! let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
//! let root = doc.root_element().unwrap();
//! let child = doc.first_child(root).unwrap();
//! assert_eq!(doc.string_value(child), "Hello");
//! ```

pub mod document;
pub mod engine;
pub mod error;
pub mod tree;
pub mod util;

// Re-export primary types at the crate root for convenience.
pub use engine::{DefaultEngine, QueryItem, ReadOptions, WriteOptions, XmlEngine};
pub use error::{ParseError, QueryError, Result, SourceLocation, XmlError};
pub use tree::{Document, DtdDeclKind, NodeId, NodeKind, NodeType};
