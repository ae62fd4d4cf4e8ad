//! XML serializer.
//!
//! Emits a `Document` tree as well-formed XML. Escaping follows the
//! conventions of the common C serializers: `<`, `>`, `&` become named
//! entity references, carriage returns and control characters become hex or
//! decimal character references, and when the document declares no encoding,
//! non-ASCII characters are re-encoded as hex character references so the
//! output stays pure ASCII.

use crate::tree::{Document, NodeId, NodeKind};

use super::WriteOptions;

/// Serializes a whole document: XML declaration, DTD (if any), then the
/// document-level nodes.
#[must_use]
pub(crate) fn write_document(doc: &Document, options: &WriteOptions) -> String {
    let mut output = String::new();

    // XML declaration — emitted unless suppressed, defaulting to version 1.0
    if !options.omit_declaration {
        let version = doc.version().unwrap_or("1.0");
        output.push_str("<?xml version=\"");
        output.push_str(version);
        output.push('"');
        if let Some(encoding) = doc.encoding() {
            output.push_str(" encoding=\"");
            output.push_str(encoding);
            output.push('"');
        }
        if let Some(standalone) = doc.standalone() {
            output.push_str(" standalone=\"");
            output.push_str(if standalone { "yes" } else { "no" });
            output.push('"');
        }
        output.push_str("?>\n");
    }

    // When no encoding is declared, non-ASCII chars are re-encoded as hex
    // character references so the output is valid in any encoding.
    let reencode_non_ascii = doc.encoding().is_none();

    if let Some(dtd) = doc.dtd() {
        write_doctype(doc, dtd, &mut output);
        output.push('\n');
    }

    let mut first = true;
    for child in doc.document_children() {
        if options.indent && !first {
            output.push('\n');
        }
        serialize_node(
            doc,
            child,
            &mut output,
            reencode_non_ascii,
            options,
            0,
            false,
        );
        first = false;
    }

    output.push('\n');
    output
}

/// Serializes a single node and its subtree, without an XML declaration.
#[must_use]
pub(crate) fn write_node(doc: &Document, id: NodeId, options: &WriteOptions) -> String {
    let mut output = String::new();
    let reencode_non_ascii = doc.encoding().is_none();
    match &doc.node(id).kind {
        // Attribute and namespace nodes are not part of the sibling chain;
        // emit them as they would appear inside a start tag.
        NodeKind::Attribute {
            name,
            prefix,
            value,
        } => {
            if let Some(pfx) = prefix {
                output.push_str(pfx);
                output.push(':');
            }
            output.push_str(name);
            output.push_str("=\"");
            write_escaped_attr(&mut output, value, reencode_non_ascii);
            output.push('"');
        }
        NodeKind::Namespace { prefix, uri } => {
            output.push_str("xmlns");
            if !prefix.is_empty() {
                output.push(':');
                output.push_str(prefix);
            }
            output.push_str("=\"");
            write_escaped_attr(&mut output, uri, reencode_non_ascii);
            output.push('"');
        }
        NodeKind::DocumentType { .. } => write_doctype(doc, id, &mut output),
        NodeKind::DtdDecl { .. } => write_dtd_decl(doc, id, &mut output),
        _ => serialize_node(doc, id, &mut output, reencode_non_ascii, options, 0, false),
    }
    output
}

/// Encodes serialized markup into the byte encoding `label` names, falling
/// back to UTF-8 when the label is absent or unknown.
#[must_use]
pub(crate) fn encode(label: Option<&str>, xml: &str) -> Vec<u8> {
    let encoding = label
        .and_then(|l| encoding_rs::Encoding::for_label(l.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);
    let (bytes, _, _) = encoding.encode(xml);
    bytes.into_owned()
}

fn write_doctype(doc: &Document, dtd: NodeId, out: &mut String) {
    out.push_str("<!DOCTYPE ");
    if let Some(name) = doc.name(dtd) {
        out.push_str(&name);
    }
    match (doc.dtd_public_id(dtd), doc.dtd_system_id(dtd)) {
        (Some(pub_id), Some(sys_id)) => {
            out.push_str(" PUBLIC \"");
            out.push_str(pub_id);
            out.push_str("\" \"");
            out.push_str(sys_id);
            out.push('"');
        }
        (Some(pub_id), None) => {
            out.push_str(" PUBLIC \"");
            out.push_str(pub_id);
            out.push('"');
        }
        (None, Some(sys_id)) => {
            out.push_str(" SYSTEM \"");
            out.push_str(sys_id);
            out.push('"');
        }
        (None, None) => {}
    }
    if doc.first_child(dtd).is_some() {
        out.push_str(" [\n");
        for decl in doc.children(dtd) {
            write_dtd_decl(doc, decl, out);
            out.push('\n');
        }
        out.push_str("]>");
    } else {
        out.push('>');
    }
}

fn write_dtd_decl(doc: &Document, id: NodeId, out: &mut String) {
    if let NodeKind::DtdDecl { decl, name, text } = &doc.node(id).kind {
        out.push_str("<!");
        out.push_str(decl.keyword());
        out.push(' ');
        out.push_str(name);
        if !text.is_empty() {
            out.push(' ');
            out.push_str(text);
        }
        out.push('>');
    }
}

/// Returns `true` if the element contains only other elements (and optional
/// whitespace text), meaning it's safe to add indentation.
fn is_element_only(doc: &Document, id: NodeId) -> bool {
    let mut has_element_child = false;
    for child in doc.children(id) {
        match &doc.node(child).kind {
            NodeKind::Element { .. } => has_element_child = true,
            NodeKind::Text { content } => {
                if !content.trim().is_empty() {
                    return false;
                }
            }
            _ => {}
        }
    }
    has_element_child
}

fn serialize_node(
    doc: &Document,
    id: NodeId,
    out: &mut String,
    reencode_non_ascii: bool,
    options: &WriteOptions,
    depth: usize,
    parent_is_element_only: bool,
) {
    let indent = options.indent;
    match &doc.node(id).kind {
        NodeKind::Element {
            name,
            prefix,
            attributes,
            namespaces,
        } => {
            if indent && parent_is_element_only {
                for _ in 0..depth {
                    out.push_str(&options.indent_str);
                }
            }
            out.push('<');
            if let Some(pfx) = prefix {
                out.push_str(pfx);
                out.push(':');
            }
            out.push_str(name);

            for &ns in namespaces {
                if let NodeKind::Namespace { prefix, uri } = &doc.node(ns).kind {
                    out.push_str(" xmlns");
                    if !prefix.is_empty() {
                        out.push(':');
                        out.push_str(prefix);
                    }
                    out.push_str("=\"");
                    write_escaped_attr(out, uri, reencode_non_ascii);
                    out.push('"');
                }
            }

            for &attr in attributes {
                if let NodeKind::Attribute {
                    name,
                    prefix,
                    value,
                } = &doc.node(attr).kind
                {
                    out.push(' ');
                    if let Some(pfx) = prefix {
                        out.push_str(pfx);
                        out.push(':');
                    }
                    out.push_str(name);
                    out.push_str("=\"");
                    write_escaped_attr(out, value, reencode_non_ascii);
                    out.push('"');
                }
            }

            if doc.first_child(id).is_none() {
                out.push_str("/>");
                if indent && parent_is_element_only {
                    out.push('\n');
                }
            } else {
                out.push('>');
                let element_only = indent && is_element_only(doc, id);
                if element_only {
                    out.push('\n');
                }
                for child in doc.children(id) {
                    if element_only {
                        if let NodeKind::Text { content } = &doc.node(child).kind {
                            if content.trim().is_empty() {
                                continue;
                            }
                        }
                    }
                    serialize_node(
                        doc,
                        child,
                        out,
                        reencode_non_ascii,
                        options,
                        depth + 1,
                        element_only,
                    );
                }
                if element_only {
                    for _ in 0..depth {
                        out.push_str(&options.indent_str);
                    }
                }
                out.push_str("</");
                if let Some(pfx) = prefix {
                    out.push_str(pfx);
                    out.push(':');
                }
                out.push_str(name);
                out.push('>');
                if indent && parent_is_element_only {
                    out.push('\n');
                }
            }
        }
        NodeKind::Text { content } => {
            write_escaped_text(out, content, reencode_non_ascii);
        }
        NodeKind::Comment { content } => {
            if indent && parent_is_element_only {
                for _ in 0..depth {
                    out.push_str(&options.indent_str);
                }
            }
            out.push_str("<!--");
            out.push_str(content);
            out.push_str("-->");
            if indent && parent_is_element_only {
                out.push('\n');
            }
        }
        NodeKind::ProcessingInstruction { target, data } => {
            if indent && parent_is_element_only {
                for _ in 0..depth {
                    out.push_str(&options.indent_str);
                }
            }
            out.push_str("<?");
            out.push_str(target);
            if let Some(d) = data {
                out.push(' ');
                out.push_str(d);
            }
            out.push_str("?>");
            if indent && parent_is_element_only {
                out.push('\n');
            }
        }
        // Attribute, namespace, DTD, and wrapper nodes never appear in a
        // sibling chain below an element.
        _ => {}
    }
}

/// Writes a hexadecimal character reference (`&#xHH;`) for a Unicode code point.
fn write_hex_char_ref(out: &mut String, ch: char) {
    use std::fmt::Write;
    let _ = write!(out, "&#x{:X};", ch as u32);
}

/// Escapes text content for XML output.
///
/// - `<`, `>`, `&` are escaped with named entity references
/// - `\r` is encoded as `&#13;`
/// - `\t` and `\n` are passed through
/// - Other control characters below 0x20 are hex-encoded
/// - Non-ASCII characters are hex-encoded only when `reencode_non_ascii`
fn write_escaped_text(out: &mut String, text: &str, reencode_non_ascii: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            '\t' | '\n' => out.push(ch),
            c if (c as u32) < 0x20 => write_hex_char_ref(out, c),
            c if reencode_non_ascii && (c as u32) >= 0x80 => write_hex_char_ref(out, c),
            _ => out.push(ch),
        }
    }
}

/// Escapes an attribute value for XML output. In addition to the text
/// escapes, quotes, tabs, and newlines become character references so the
/// value survives attribute-value normalization on re-parse.
fn write_escaped_attr(out: &mut String, text: &str, reencode_non_ascii: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            c if (c as u32) < 0x20 => write_hex_char_ref(out, c),
            c if reencode_non_ascii && (c as u32) >= 0x80 => write_hex_char_ref(out, c),
            _ => out.push(ch),
        }
    }
}
