use super::element::Element;
use super::error::{self, DocumentError};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A parsed metadata document: an optional doctype and the root element.
pub struct Document {
    /// contents of the `<!DOCTYPE ...>` declaration, without the keyword
    pub doctype: Option<String>,
    pub root: Element,
}

impl Document {
    pub fn new(doctype: Option<String>, root: Element) -> Self {
        Self { doctype, root }
    }

    /// read in and parse an entire document for a given path
    pub fn from_path(path: &Path) -> Result<Self, crate::Error> {
        let file = File::open(path)?;
        Ok(Self::parse(BufReader::new(file))?)
    }

    pub fn parse<R: BufRead>(reader: R) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_reader(reader);
        reader.trim_text(false);

        let mut buffer = Vec::new();
        let mut doctype = None;
        let mut root = None;
        // elements that have been opened but not yet closed
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buffer)
                .map_err(error::MalformedXml::from)?;

            match event {
                Event::Start(start) => {
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    // quick-xml has already checked that the end tag matches
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element);
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(error::MalformedXml::from)?;
                    append_text(&mut stack, &text);
                }
                Event::CData(data) => {
                    let text = String::from_utf8(data.into_inner().into_owned())?;
                    append_text(&mut stack, &text);
                }
                Event::DocType(text) => {
                    let text = String::from_utf8(text.into_inner().into_owned())?;
                    doctype = Some(text.trim().to_string());
                }
                Event::Eof => break,
                // declarations, comments and processing instructions are not kept
                _ => (),
            }

            buffer.clear();
        }

        if let Some(open) = stack.pop() {
            return Err(error::Unclosed::new(open.name).into());
        }

        let root = root
            .ok_or_else(|| error::MissingElement::new("document".into(), "root element".into()))?;

        Ok(Self { doctype, root })
    }

    /// Serialize the document: the xml declaration, the doctype (if any), then the root element.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), quick_xml::Error> {
        let mut writer = Writer::new(writer);
        let newline = || Event::Text(BytesText::from_escaped("\n"));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer.write_event(newline())?;

        if let Some(doctype) = &self.doctype {
            writer.write_event(Event::DocType(BytesText::from_escaped(doctype.as_str())))?;
            writer.write_event(newline())?;
        }

        write_element(&mut writer, &self.root)?;
        writer.write_event(newline())?;

        Ok(())
    }

    pub fn to_xml_string(&self) -> Result<String, crate::Error> {
        let mut bytes = Vec::new();
        self.write(&mut bytes)?;
        Ok(String::from_utf8(bytes)?)
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, DocumentError> {
    let name = String::from_utf8(start.name().as_ref().to_vec())?;
    let mut element = Element::new(name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(error::MalformedAttribute::from)?;
        let key = String::from_utf8(attribute.key.as_ref().to_vec())?;
        let value = attribute
            .unescape_value()
            .map_err(error::MalformedXml::from)?;
        element.set_attribute(key, value.into_owned());
    }

    Ok(element)
}

/// hand a finished element to its parent, or make it the root
fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

/// character data belongs to the tail of the previous sibling if there is one, otherwise to the
/// text of the enclosing element. anything outside the root is dropped.
fn append_text(stack: &mut [Element], text: &str) {
    let parent = match stack.last_mut() {
        Some(parent) => parent,
        None => return,
    };

    let slot = match parent.children.last_mut() {
        Some(sibling) => &mut sibling.tail,
        None => &mut parent.text,
    };

    slot.get_or_insert_with(String::new).push_str(text);
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<(), quick_xml::Error> {
    let start = BytesStart::new(element.name.as_str()).with_attributes(element.attributes());

    let text = element.text.as_deref().filter(|text| !text.is_empty());

    if element.children.is_empty() && text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;

    if let Some(text) = text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }

    for child in &element.children {
        write_element(writer, child)?;
        if let Some(tail) = child.tail.as_deref().filter(|tail| !tail.is_empty()) {
            writer.write_event(Event::Text(BytesText::new(tail)))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;

    Ok(())
}

/// Normalize the whitespace of `element` and everything below it.
///
/// Blank `text` and `tail` are replaced so that every nesting level is indented by two
/// spaces. Non-blank character data, element order and attributes are left alone. A childless
/// element at level 0 keeps its tail.
pub fn indent(element: &mut Element, level: usize) {
    let newline = format!("\n{}", "  ".repeat(level));

    if !element.children.is_empty() {
        if is_blank(&element.text) {
            element.text = Some(format!("{newline}  "));
        }
        if is_blank(&element.tail) {
            element.tail = Some(newline.clone());
        }

        for child in element.children.iter_mut() {
            indent(child, level + 1);
        }

        if let Some(last) = element.children.last_mut() {
            if is_blank(&last.tail) {
                last.tail = Some(newline);
            }
        }
    } else if level > 0 && is_blank(&element.tail) {
        element.tail = Some(newline);
    }
}

fn is_blank(text: &Option<String>) -> bool {
    text.as_deref().map_or(true, |text| text.trim().is_empty())
}
