//! XML parser built on `quick-xml`.
//!
//! The event stream from `quick_xml::Reader` is folded into a [`Document`]
//! arena. The reader itself only tokenizes; well-formedness constraints the
//! tokenizer does not enforce (a single root element, no stray text at
//! document level, balanced tags at end of input) are checked here, and all
//! failures are reported as [`ParseError`]s carrying the source position.
//!
//! The DOCTYPE internal subset is scanned by a small dedicated scanner:
//! markup declarations become DTD declaration nodes, and general entity
//! declarations additionally feed the entity map used to resolve references
//! in text and attribute values.

use std::collections::HashMap;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{ParseError, Result, SourceLocation, XmlError};
use crate::tree::{Document, DtdDeclKind, NodeId, NodeKind};
use crate::util::qname::split_qname;

use super::ReadOptions;

/// Decodes raw bytes into a string, honoring a BOM first and an encoding
/// declaration second. Input without either is treated as UTF-8.
pub(crate) fn decode_bytes(bytes: &[u8]) -> Result<String> {
    let (encoding, bom_len) = match encoding_rs::Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, bom_len),
        None => {
            let encoding = sniff_declared_encoding(bytes)
                .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
                .unwrap_or(encoding_rs::UTF_8);
            (encoding, 0)
        }
    };
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    if had_errors {
        return Err(ParseError::new(
            format!("input is not valid {}", encoding.name()),
            SourceLocation::default(),
        )
        .into());
    }
    Ok(text.into_owned())
}

/// Extracts the `encoding` pseudo-attribute from an XML declaration, if the
/// input starts with one. Only the ASCII-compatible prefix is inspected.
fn sniff_declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(256)];
    let head = std::str::from_utf8(head).unwrap_or_else(|e| {
        // Partial trailing multibyte sequences are fine for sniffing.
        std::str::from_utf8(&head[..e.valid_up_to()]).unwrap_or("")
    });
    if !head.starts_with("<?xml") {
        return None;
    }
    let decl = &head[..head.find("?>").unwrap_or(head.len())];
    let idx = decl.find("encoding")?;
    let rest = decl[idx + "encoding".len()..].trim_start().strip_prefix('=')?;
    let rest = rest.trim_start();
    let quote = rest.chars().next().filter(|&q| q == '"' || q == '\'')?;
    let rest = &rest[1..];
    let end = rest.find(quote)?;
    Some(rest[..end].to_string())
}

fn location_at(input: &str, byte_offset: usize) -> SourceLocation {
    let byte_offset = byte_offset.min(input.len());
    let before = &input[..byte_offset];
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    SourceLocation {
        line: u32::try_from(before.matches('\n').count() + 1).unwrap_or(u32::MAX),
        column: u32::try_from(before[line_start..].chars().count() + 1).unwrap_or(u32::MAX),
        byte_offset,
    }
}

fn err_at(input: &str, byte_offset: usize, message: impl Into<String>) -> XmlError {
    ParseError::new(message, location_at(input, byte_offset)).into()
}

/// Resolves an entity reference: DTD-declared general entities first, then
/// the five predefined XML entities.
fn resolve_entity<'m>(entities: &'m HashMap<String, String>, name: &str) -> Option<&'m str> {
    entities
        .get(name)
        .map(String::as_str)
        .or_else(|| resolve_predefined_entity(name))
}

/// Parses a complete document from a string.
pub(crate) fn parse_document(input: &str, options: &ReadOptions) -> Result<Document> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().expand_empty_elements = true;

    let mut doc = Document::new();
    let wrapper = doc.wrapper();
    let mut stack: Vec<NodeId> = vec![wrapper];
    let mut entities: HashMap<String, String> = HashMap::new();
    let mut seen_root = false;

    loop {
        let offset = usize::try_from(reader.buffer_position()).unwrap_or(input.len());
        let event = reader
            .read_event()
            .map_err(|e| err_at(input, offset, e.to_string()))?;
        // `stack` always holds at least the wrapper; anything above it is an
        // open element.
        let parent = *stack.last().unwrap_or(&wrapper);
        let at_top = stack.len() == 1;

        match event {
            Event::Eof => break,
            Event::Decl(decl) => {
                let version = decl
                    .version()
                    .map_err(|e| err_at(input, offset, e.to_string()))?;
                doc.version = Some(String::from_utf8_lossy(&version).into_owned());
                if let Some(encoding) = decl.encoding() {
                    let encoding = encoding.map_err(|e| err_at(input, offset, e.to_string()))?;
                    doc.encoding = Some(String::from_utf8_lossy(&encoding).into_owned());
                }
                if let Some(standalone) = decl.standalone() {
                    let standalone =
                        standalone.map_err(|e| err_at(input, offset, e.to_string()))?;
                    doc.standalone = Some(&*standalone == b"yes");
                }
            }
            Event::DocType(text) => {
                if seen_root {
                    return Err(err_at(
                        input,
                        offset,
                        "document type declaration after the root element",
                    ));
                }
                let text = String::from_utf8_lossy(&text).into_owned();
                let dtd = parse_doctype(&mut doc, input, offset, &text, &mut entities)?;
                doc.dtd = Some(dtd);
            }
            Event::Start(start) => {
                if at_top && seen_root {
                    return Err(err_at(
                        input,
                        offset,
                        "extra content after the document element",
                    ));
                }
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let elem = doc
                    .new_element(&name)
                    .map_err(|_| err_at(input, offset, format!("invalid element name '{name}'")))?;
                for attr in start.attributes() {
                    let attr = attr.map_err(|e| err_at(input, offset, e.to_string()))?;
                    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                    let value = attr
                        .unescape_value_with(|ent| resolve_entity(&entities, ent))
                        .map_err(|e| err_at(input, offset, e.to_string()))?
                        .into_owned();
                    let (prefix, local) = split_qname(&key);
                    let is_ns_decl = !options.namespace_decls_as_attributes
                        && (key == "xmlns" || prefix == Some("xmlns"));
                    if is_ns_decl && key == "xmlns" {
                        let ns = doc.alloc(NodeKind::Namespace {
                            prefix: String::new(),
                            uri: value,
                        });
                        doc.push_namespace_slot(elem, ns);
                    } else if is_ns_decl {
                        let ns = doc.alloc(NodeKind::Namespace {
                            prefix: local.to_string(),
                            uri: value,
                        });
                        doc.push_namespace_slot(elem, ns);
                    } else {
                        // Unique names are a well-formedness constraint.
                        if doc.attribute_for_name(elem, &key).is_some() {
                            return Err(err_at(
                                input,
                                offset,
                                format!("duplicate attribute '{key}'"),
                            ));
                        }
                        let node = doc.new_attribute(&key, &value).map_err(|_| {
                            err_at(input, offset, format!("invalid attribute name '{key}'"))
                        })?;
                        doc.push_attribute_slot(elem, node);
                    }
                }
                doc.link_append(parent, elem);
                if at_top {
                    seen_root = true;
                }
                stack.push(elem);
            }
            Event::End(_) => {
                // Tag-name mismatches are rejected by the tokenizer.
                stack.pop();
            }
            Event::Text(text) => {
                let content = text
                    .unescape_with(|ent| resolve_entity(&entities, ent))
                    .map_err(|e| err_at(input, offset, e.to_string()))?
                    .into_owned();
                let is_blank = content.chars().all(char::is_whitespace);
                if at_top {
                    if !is_blank {
                        return Err(err_at(
                            input,
                            offset,
                            "character data outside the document element",
                        ));
                    }
                    continue;
                }
                if is_blank && !options.preserve_whitespace {
                    continue;
                }
                let node = doc.new_text(&content);
                doc.link_append(parent, node);
            }
            Event::CData(cdata) => {
                if at_top {
                    return Err(err_at(
                        input,
                        offset,
                        "character data outside the document element",
                    ));
                }
                let content = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                let node = doc.new_text(&content);
                doc.link_append(parent, node);
            }
            Event::Comment(text) => {
                let content = String::from_utf8_lossy(&text).into_owned();
                let node = doc.new_comment(&content);
                doc.link_append(parent, node);
            }
            Event::PI(pi) => {
                let target = String::from_utf8_lossy(pi.target()).into_owned();
                let content = String::from_utf8_lossy(pi.content()).into_owned();
                let data = if content.is_empty() {
                    None
                } else {
                    Some(content)
                };
                let node = doc
                    .new_processing_instruction(&target, data.as_deref())
                    .map_err(|_| {
                        err_at(input, offset, format!("invalid PI target '{target}'"))
                    })?;
                doc.link_append(parent, node);
            }
            Event::Empty(_) => {
                // Unreachable with expand_empty_elements enabled.
            }
        }
    }

    let end = usize::try_from(reader.buffer_position()).unwrap_or(input.len());
    if stack.len() > 1 {
        return Err(err_at(input, end, "unexpected end of input: unclosed element"));
    }
    if !seen_root {
        return Err(err_at(input, end, "document has no root element"));
    }
    Ok(doc)
}

/// Scans the content of a `<!DOCTYPE ...>` declaration: root name, external
/// identifiers, and the markup declarations of the internal subset.
fn parse_doctype(
    doc: &mut Document,
    input: &str,
    offset: usize,
    text: &str,
    entities: &mut HashMap<String, String>,
) -> Result<NodeId> {
    let text = text.trim();
    let name_end = text
        .find(|c: char| c.is_whitespace() || c == '[')
        .unwrap_or(text.len());
    let name = &text[..name_end];
    if name.is_empty() {
        return Err(err_at(input, offset, "document type declaration has no name"));
    }
    let mut rest = text[name_end..].trim_start();

    let mut public_id = None;
    let mut system_id = None;
    if let Some(after) = rest.strip_prefix("PUBLIC") {
        let (value, after) = take_quoted(after.trim_start())
            .ok_or_else(|| err_at(input, offset, "malformed PUBLIC identifier"))?;
        public_id = Some(value);
        if let Some((value, after)) = take_quoted(after.trim_start()) {
            system_id = Some(value);
            rest = after.trim_start();
        } else {
            rest = after.trim_start();
        }
    } else if let Some(after) = rest.strip_prefix("SYSTEM") {
        let (value, after) = take_quoted(after.trim_start())
            .ok_or_else(|| err_at(input, offset, "malformed SYSTEM identifier"))?;
        system_id = Some(value);
        rest = after.trim_start();
    }

    let dtd = doc
        .new_dtd(name, public_id.as_deref(), system_id.as_deref())
        .map_err(|_| err_at(input, offset, format!("invalid document type name '{name}'")))?;

    if let Some(subset) = rest.trim_end().strip_prefix('[') {
        let subset = subset.strip_suffix(']').unwrap_or(subset);
        scan_internal_subset(doc, dtd, input, offset, subset, entities)?;
    }
    Ok(dtd)
}

/// Finds the `>` terminating a markup declaration, skipping any `>` inside
/// quoted literals (entity values and attribute defaults may contain one).
fn find_decl_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '>' => return Some(i),
                _ => {}
            },
        }
    }
    None
}

/// Reads a quoted literal, returning it together with the remaining input.
fn take_quoted(s: &str) -> Option<(String, &str)> {
    let quote = s.chars().next().filter(|&q| q == '"' || q == '\'')?;
    let body = &s[1..];
    let end = body.find(quote)?;
    Some((body[..end].to_string(), &body[end + 1..]))
}

fn scan_internal_subset(
    doc: &mut Document,
    dtd: NodeId,
    input: &str,
    offset: usize,
    subset: &str,
    entities: &mut HashMap<String, String>,
) -> Result<()> {
    let mut rest = subset.trim_start();
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("<!--") {
            let end = after
                .find("-->")
                .ok_or_else(|| err_at(input, offset, "unterminated comment in internal subset"))?;
            rest = after[end + 3..].trim_start();
        } else if let Some(after) = rest.strip_prefix("<?") {
            let end = after.find("?>").ok_or_else(|| {
                err_at(input, offset, "unterminated processing instruction in internal subset")
            })?;
            rest = after[end + 2..].trim_start();
        } else if let Some(after) = rest.strip_prefix("<!") {
            let end = find_decl_end(after)
                .ok_or_else(|| err_at(input, offset, "unterminated markup declaration"))?;
            scan_markup_decl(doc, dtd, input, offset, &after[..end], entities)?;
            rest = after[end + 1..].trim_start();
        } else {
            return Err(err_at(
                input,
                offset,
                "unexpected content in internal subset",
            ));
        }
    }
    Ok(())
}

fn scan_markup_decl(
    doc: &mut Document,
    dtd: NodeId,
    input: &str,
    offset: usize,
    decl: &str,
    entities: &mut HashMap<String, String>,
) -> Result<()> {
    let mut words = decl.splitn(2, char::is_whitespace);
    let keyword = words.next().unwrap_or("");
    let rest = words.next().unwrap_or("").trim_start();
    let kind = match keyword {
        "ENTITY" => DtdDeclKind::Entity,
        "NOTATION" => DtdDeclKind::Notation,
        "ELEMENT" => DtdDeclKind::ElementDecl,
        "ATTLIST" => DtdDeclKind::AttList,
        other => {
            return Err(err_at(
                input,
                offset,
                format!("unsupported markup declaration '<!{other}'"),
            ));
        }
    };

    // Parameter entities are recorded as declarations but never expanded.
    let (parameter, rest) = match rest.strip_prefix('%') {
        Some(after) => (true, after.trim_start()),
        None => (false, rest),
    };
    let name_end = rest
        .find(char::is_whitespace)
        .unwrap_or(rest.len());
    let name = &rest[..name_end];
    let body = rest[name_end..].trim();

    let node = doc.new_dtd_decl(kind, name, body).map_err(|_| {
        err_at(input, offset, format!("invalid declaration name '{name}'"))
    })?;
    doc.add_dtd_decl(dtd, node)?;

    if kind == DtdDeclKind::Entity && !parameter {
        if let Some((literal, _)) = take_quoted(body) {
            entities.insert(name.to_string(), resolve_char_refs(&literal));
        }
    }
    Ok(())
}

/// Resolves numeric character references in an entity replacement value so
/// that `&copy;` style entities expand to their final characters.
fn resolve_char_refs(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("&#") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find(';') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let body = &after[..end];
        let code = match body.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => body.parse::<u32>().ok(),
        };
        match code.and_then(char::from_u32) {
            Some(c) => out.push(c),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
