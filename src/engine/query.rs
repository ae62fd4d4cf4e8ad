//! XPath 1.0 evaluation via `sxd-xpath`.
//!
//! The query engine works on `sxd-document` trees, so evaluation builds a
//! shadow copy of the queried document and records, per node kind, which
//! shadow handle corresponds to which arena node. Node-set results are then
//! translated back into `NodeId`s through that correspondence, preserving
//! document order.
//!
//! Namespace-aware name tests work through URIs: element and attribute names
//! are installed into the shadow tree as `{uri}local` qualified names, with
//! URIs resolved from the in-scope declarations of the source tree. The
//! caller supplies prefix bindings for the expression itself.

use sxd_document::dom as shadow;
use sxd_document::{Package, QName};
use sxd_xpath::nodeset::Node as ShadowNode;
use sxd_xpath::{Context, Factory, Value};

use crate::error::{QueryError, Result};
use crate::tree::{Document, NodeId, NodeKind};

use super::QueryItem;

#[derive(Default)]
struct Correspondence<'d> {
    elements: Vec<(shadow::Element<'d>, NodeId)>,
    attributes: Vec<(shadow::Attribute<'d>, NodeId)>,
    texts: Vec<(shadow::Text<'d>, NodeId)>,
    comments: Vec<(shadow::Comment<'d>, NodeId)>,
    pis: Vec<(shadow::ProcessingInstruction<'d>, NodeId)>,
}

impl<'d> Correspondence<'d> {
    fn resolve(&self, node: ShadowNode<'d>, doc: &Document) -> Option<NodeId> {
        match node {
            // The shadow root stands in for the hidden wrapper; report the
            // root element instead.
            ShadowNode::Root(_) => doc.root_element(),
            ShadowNode::Element(e) => lookup(&self.elements, e),
            ShadowNode::Attribute(a) => lookup(&self.attributes, a),
            ShadowNode::Text(t) => lookup(&self.texts, t),
            ShadowNode::Comment(c) => lookup(&self.comments, c),
            ShadowNode::ProcessingInstruction(pi) => lookup(&self.pis, pi),
            ShadowNode::Namespace(_) => None,
        }
    }

    fn shadow_of(&self, id: NodeId) -> Option<ShadowNode<'d>> {
        self.elements
            .iter()
            .find(|&&(_, n)| n == id)
            .map(|&(e, _)| ShadowNode::Element(e))
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|&&(_, n)| n == id)
                    .map(|&(a, _)| ShadowNode::Attribute(a))
            })
            .or_else(|| {
                self.texts
                    .iter()
                    .find(|&&(_, n)| n == id)
                    .map(|&(t, _)| ShadowNode::Text(t))
            })
            .or_else(|| {
                self.comments
                    .iter()
                    .find(|&&(_, n)| n == id)
                    .map(|&(c, _)| ShadowNode::Comment(c))
            })
            .or_else(|| {
                self.pis
                    .iter()
                    .find(|&&(_, n)| n == id)
                    .map(|&(p, _)| ShadowNode::ProcessingInstruction(p))
            })
    }
}

fn lookup<H: PartialEq + Copy>(pairs: &[(H, NodeId)], handle: H) -> Option<NodeId> {
    pairs.iter().find(|&&(h, _)| h == handle).map(|&(_, n)| n)
}

/// Evaluates `expr` against `doc` with `context` as the context node.
pub(crate) fn evaluate(
    doc: &Document,
    context: NodeId,
    expr: &str,
    bindings: &[(String, String)],
) -> Result<QueryItem> {
    let factory = Factory::new();
    let xpath = factory
        .build(expr)
        .map_err(|e| QueryError::new(e.to_string()))?
        .ok_or_else(|| QueryError::new("empty XPath expression"))?;

    let package = Package::new();
    let shadow_doc = package.as_document();
    let mut map = Correspondence::default();
    for child in doc.document_children() {
        match build_shadow(doc, child, &shadow_doc, &mut map) {
            Some(shadow::ChildOfElement::Element(e)) => shadow_doc.root().append_child(e),
            Some(shadow::ChildOfElement::Comment(c)) => shadow_doc.root().append_child(c),
            Some(shadow::ChildOfElement::ProcessingInstruction(pi)) => {
                shadow_doc.root().append_child(pi);
            }
            _ => {}
        }
    }

    let context_node = map
        .shadow_of(context)
        .ok_or_else(|| QueryError::new("context node cannot be queried"))?;

    let mut eval_context = Context::new();
    for (prefix, uri) in bindings {
        // XPath 1.0 has no default-namespace axis for name tests; an empty
        // prefix binding would be unreachable from the expression.
        if !prefix.is_empty() {
            eval_context.set_namespace(prefix, uri);
        }
    }

    let value = xpath
        .evaluate(&eval_context, context_node)
        .map_err(|e| QueryError::new(e.to_string()))?;

    Ok(match value {
        Value::Boolean(b) => QueryItem::Boolean(b),
        Value::Number(n) => QueryItem::Number(n),
        Value::String(s) => QueryItem::String(s),
        Value::Nodeset(set) => QueryItem::Nodes(
            set.document_order()
                .into_iter()
                .filter_map(|n| map.resolve(n, doc))
                .collect(),
        ),
    })
}

fn element_qname<'a>(doc: &'a Document, elem: NodeId, local: &'a str) -> QName<'a> {
    let prefix = doc.prefix(elem).unwrap_or("");
    match doc.namespace_for_prefix(elem, prefix) {
        Some(ns) => match &doc.node(ns).kind {
            NodeKind::Namespace { uri, .. } if !uri.is_empty() => {
                QName::with_namespace_uri(Some(uri.as_str()), local)
            }
            _ => QName::new(local),
        },
        None => QName::new(local),
    }
}

fn build_shadow<'d>(
    doc: &Document,
    id: NodeId,
    shadow_doc: &shadow::Document<'d>,
    map: &mut Correspondence<'d>,
) -> Option<shadow::ChildOfElement<'d>> {
    match &doc.node(id).kind {
        NodeKind::Element { name, prefix, attributes, .. } => {
            let elem = shadow_doc.create_element(element_qname(doc, id, name));
            if prefix.is_some() {
                elem.set_preferred_prefix(prefix.as_deref());
            }
            map.elements.push((elem, id));

            for &attr in attributes {
                if let NodeKind::Attribute {
                    name,
                    prefix,
                    value,
                } = &doc.node(attr).kind
                {
                    // Unprefixed attributes are in no namespace.
                    let qname = match prefix {
                        Some(pfx) => match doc.namespace_for_prefix(id, pfx) {
                            Some(ns) => match &doc.node(ns).kind {
                                NodeKind::Namespace { uri, .. } if !uri.is_empty() => {
                                    QName::with_namespace_uri(Some(uri.as_str()), name.as_str())
                                }
                                _ => QName::new(name.as_str()),
                            },
                            None => QName::new(name.as_str()),
                        },
                        None => QName::new(name.as_str()),
                    };
                    let shadow_attr = elem.set_attribute_value(qname, value);
                    if let Some(pfx) = prefix {
                        shadow_attr.set_preferred_prefix(Some(pfx));
                    }
                    map.attributes.push((shadow_attr, attr));
                }
            }

            for child in doc.children(id) {
                if let Some(node) = build_shadow(doc, child, shadow_doc, map) {
                    elem.append_child(node);
                }
            }
            Some(elem.into())
        }
        NodeKind::Text { content } => {
            let text = shadow_doc.create_text(content);
            map.texts.push((text, id));
            Some(text.into())
        }
        NodeKind::Comment { content } => {
            let comment = shadow_doc.create_comment(content);
            map.comments.push((comment, id));
            Some(comment.into())
        }
        NodeKind::ProcessingInstruction { target, data } => {
            let pi = shadow_doc.create_processing_instruction(target, data.as_deref());
            map.pis.push((pi, id));
            Some(pi.into())
        }
        // Attribute, namespace, DTD, and wrapper nodes have no standalone
        // place in the shadow tree.
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ReadOptions;
    use crate::error::XmlError;

    fn parse(input: &str) -> Document {
        crate::engine::reader::parse_document(input, &ReadOptions::default()).unwrap()
    }

    #[test]
    fn test_descendant_query() {
        let doc = parse("<a><b><c/></b><c/></a>");
        let root = doc.root_element().unwrap();
        let result = evaluate(&doc, root, "//c", &[]).unwrap();
        let QueryItem::Nodes(nodes) = result else {
            panic!("expected a node-set");
        };
        assert_eq!(nodes.len(), 2);
        for n in nodes {
            assert_eq!(doc.name(n).as_deref(), Some("c"));
        }
    }

    #[test]
    fn test_attribute_query() {
        let doc = parse(r#"<a id="7"><b id="8"/></a>"#);
        let root = doc.root_element().unwrap();
        let result = evaluate(&doc, root, "string(/a/@id)", &[]).unwrap();
        assert_eq!(result, QueryItem::String("7".to_string()));

        let result = evaluate(&doc, root, "//@id", &[]).unwrap();
        let QueryItem::Nodes(nodes) = result else {
            panic!("expected a node-set");
        };
        assert_eq!(nodes.len(), 2);
        assert_eq!(doc.string_value(nodes[0]), "7");
    }

    #[test]
    fn test_count_and_boolean_results() {
        let doc = parse("<a><b/><b/><b/></a>");
        let root = doc.root_element().unwrap();
        assert_eq!(
            evaluate(&doc, root, "count(//b)", &[]).unwrap(),
            QueryItem::Number(3.0)
        );
        assert_eq!(
            evaluate(&doc, root, "count(//b) > 2", &[]).unwrap(),
            QueryItem::Boolean(true)
        );
    }

    #[test]
    fn test_relative_query_uses_context_node() {
        let doc = parse("<a><b><c/></b><b/></a>");
        let root = doc.root_element().unwrap();
        let first_b = doc.first_child(root).unwrap();
        let result = evaluate(&doc, first_b, "c", &[]).unwrap();
        let QueryItem::Nodes(nodes) = result else {
            panic!("expected a node-set");
        };
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_namespaced_query_with_bindings() {
        let doc = parse(r#"<a xmlns:p="urn:x"><p:b/><c/></a>"#);
        let root = doc.root_element().unwrap();
        let bindings = vec![("p".to_string(), "urn:x".to_string())];
        let result = evaluate(&doc, root, "//p:b", &bindings).unwrap();
        let QueryItem::Nodes(nodes) = result else {
            panic!("expected a node-set");
        };
        assert_eq!(nodes.len(), 1);
        assert_eq!(doc.name(nodes[0]).as_deref(), Some("p:b"));
    }

    #[test]
    fn test_malformed_expression_is_query_error() {
        let doc = parse("<a/>");
        let root = doc.root_element().unwrap();
        let err = evaluate(&doc, root, "///", &[]).unwrap_err();
        assert!(matches!(err, XmlError::Query(_)));
    }

    #[test]
    fn test_root_maps_to_root_element() {
        let doc = parse("<a><b/></a>");
        let root = doc.root_element().unwrap();
        let result = evaluate(&doc, root, "/", &[]).unwrap();
        let QueryItem::Nodes(nodes) = result else {
            panic!("expected a node-set");
        };
        assert_eq!(nodes, vec![root]);
    }
}
