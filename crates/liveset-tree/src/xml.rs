//! XML reading and writing for [`Document`].
//!
//! Parsing keeps elements, attributes (in source order), non-whitespace text,
//! CDATA, and comments. Whitespace-only text between elements is dropped;
//! the writer regenerates tab indentation, which is how Live itself lays
//! out a set.

use std::fmt::Display;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::trace;

use crate::document::{Attribute, Document, Element, NodeId, NodeKind};
use crate::error::{TreeError, TreeResult};

fn serialize_error(e: impl Display) -> TreeError {
    TreeError::Serialize(e.to_string())
}

impl Document {
    /// Parse an XML string into a new document.
    pub fn parse(xml: &str) -> TreeResult<Self> {
        let mut reader = Reader::from_str(xml);
        let mut doc = Document::new();
        let mut open = vec![doc.root()];

        loop {
            let position = reader.buffer_position() as u64;
            let parse_error = |message: String| TreeError::Parse { position, message };
            let event = reader.read_event().map_err(|e| parse_error(e.to_string()))?;
            let parent = *open.last().ok_or(TreeError::NoDocumentElement)?;

            match event {
                Event::Start(start) => {
                    let element = element_from_start(&start).map_err(parse_error)?;
                    let id = doc.create_node(NodeKind::Element(element));
                    doc.append_child(parent, id)?;
                    open.push(id);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start).map_err(parse_error)?;
                    let id = doc.create_node(NodeKind::Element(element));
                    doc.append_child(parent, id)?;
                }
                Event::End(_) => {
                    if open.len() <= 1 {
                        return Err(parse_error("unexpected closing tag".into()));
                    }
                    open.pop();
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| parse_error(e.to_string()))?;
                    if !text.trim().is_empty() {
                        let id = doc.create_node(NodeKind::Text(text.into_owned()));
                        doc.append_child(parent, id)?;
                    }
                }
                Event::CData(data) => {
                    let text = std::str::from_utf8(&data)?.to_string();
                    let id = doc.create_node(NodeKind::CData(text));
                    doc.append_child(parent, id)?;
                }
                Event::Comment(comment) => {
                    let text = std::str::from_utf8(&comment)?.to_string();
                    let id = doc.create_node(NodeKind::Comment(text));
                    doc.append_child(parent, id)?;
                }
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {
                    trace!(position, "skipping prolog event");
                }
                Event::Eof => break,
            }
        }

        if open.len() > 1 {
            return Err(TreeError::Parse {
                position: reader.buffer_position() as u64,
                message: format!("{} unclosed element(s) at end of input", open.len() - 1),
            });
        }
        if doc.document_element().is_none() {
            return Err(TreeError::NoDocumentElement);
        }
        Ok(doc)
    }

    /// Serialize the whole document with an XML declaration.
    pub fn to_xml_string(&self) -> TreeResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(serialize_error)?;
        for child in self.children(self.root()) {
            self.write_node(&mut writer, *child)?;
        }
        let mut out = String::from_utf8(writer.into_inner()).map_err(serialize_error)?;
        out.push('\n');
        Ok(out)
    }

    /// Serialize a single subtree (for example one extracted track).
    pub fn subtree_to_xml(&self, node: NodeId) -> TreeResult<String> {
        if !self.contains(node) {
            return Err(TreeError::UnknownNode(node));
        }
        let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(serialize_error)?;
        self.write_node(&mut writer, node)?;
        let mut out = String::from_utf8(writer.into_inner()).map_err(serialize_error)?;
        out.push('\n');
        Ok(out)
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, node: NodeId) -> TreeResult<()> {
        let kind = self.kind(node).ok_or(TreeError::UnknownNode(node))?;
        match kind {
            NodeKind::Document => {
                for child in self.children(node) {
                    self.write_node(writer, *child)?;
                }
            }
            NodeKind::Element(element) => {
                let mut start = BytesStart::new(element.name.as_str());
                for attr in &element.attributes {
                    start.push_attribute((attr.name.as_str(), attr.value.as_str()));
                }
                let children = self.children(node);
                if children.is_empty() {
                    writer.write_event(Event::Empty(start)).map_err(serialize_error)?;
                } else {
                    writer.write_event(Event::Start(start)).map_err(serialize_error)?;
                    for child in children {
                        self.write_node(writer, *child)?;
                    }
                    writer
                        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
                        .map_err(serialize_error)?;
                }
            }
            NodeKind::Text(text) => {
                writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(serialize_error)?;
            }
            NodeKind::CData(text) => {
                writer
                    .write_event(Event::CData(BytesCData::new(text.as_str())))
                    .map_err(serialize_error)?;
            }
            NodeKind::Comment(text) => {
                writer
                    .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
                    .map_err(serialize_error)?;
            }
        }
        Ok(())
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, String> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| e.to_string())?
        .to_string();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|e| e.to_string())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        element
            .attributes
            .push(Attribute::new(key, value.into_owned()));
    }
    Ok(element)
}
