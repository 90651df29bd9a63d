use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

use super::error::ParseError;
use super::parser::{Diagnostic, TeiParser};
use super::segment::Segmenter;
use crate::model::{AttributeMap, Document};

#[derive(Debug)]
pub struct ParsedDocument {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
    pub unrecognized_tags: BTreeSet<String>,
}

pub fn parse_file(path: &Path, segmenter: &dyn Segmenter) -> Result<ParsedDocument, ParseError> {
    let xml = fs::read_to_string(path)?;
    parse_str(&xml, &path.display().to_string(), segmenter)
}

pub fn parse_str(
    xml: &str,
    source_file: &str,
    segmenter: &dyn Segmenter,
) -> Result<ParsedDocument, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut parser = TeiParser::new(segmenter);
    let mut header = HeaderCollector::default();

    // Adjacent text and entity references arrive as separate events; they are
    // joined so the segmenter sees the whole run at once.
    let mut pending = String::new();
    let mut depth = 0_usize;
    let mut body_depth: Option<usize> = None;

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|source| ParseError::Xml {
            position: reader.buffer_position() as u64,
            source,
        })?;

        match event {
            Event::Start(e) => {
                flush_characters(&mut pending, &mut parser)?;
                let name = local_name_of(&e);
                header.start(&name, depth, before);

                if body_depth.is_none() && name == "body" {
                    body_depth = Some(depth);
                }
                if body_depth.is_some() {
                    parser.open(&name, attributes_of(&e));
                }
                depth += 1;
            }
            Event::Empty(e) => {
                flush_characters(&mut pending, &mut parser)?;
                let name = local_name_of(&e);
                header.empty(&name, &xml[before..reader.buffer_position() as usize]);

                if body_depth.is_some() {
                    parser.open(&name, attributes_of(&e));
                    parser.close(&name);
                }
            }
            Event::End(e) => {
                flush_characters(&mut pending, &mut parser)?;
                depth = depth.saturating_sub(1);
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                header.end(depth, xml, reader.buffer_position() as usize);

                if body_depth.is_some() {
                    parser.close(&name);
                }
                if body_depth == Some(depth) {
                    body_depth = None;
                }
            }
            Event::Text(e) => {
                let text = String::from_utf8_lossy(&e);
                header.text(&text);
                if body_depth.is_some() {
                    pending.push_str(&text);
                }
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e);
                header.text(&text);
                if body_depth.is_some() {
                    pending.push_str(&text);
                }
            }
            Event::GeneralRef(e) => {
                let name = String::from_utf8_lossy(&e);
                let Some(resolved) = resolve_reference(&name) else {
                    warn!(source_file, entity = %name, "dropping undefined entity reference");
                    continue;
                };
                header.text(resolved.encode_utf8(&mut [0; 4]));
                if body_depth.is_some() {
                    pending.push(resolved);
                }
            }
            Event::Comment(_) | Event::PI(_) => {
                flush_characters(&mut pending, &mut parser)?;
            }
            Event::Eof => {
                flush_characters(&mut pending, &mut parser)?;
                break;
            }
            _ => {}
        }
    }

    let header = header.header;
    let edition_stmt = header
        .edition_stmt
        .ok_or(ParseError::MissingSection("editionStmt"))?;
    let source_desc = header
        .source_desc
        .ok_or(ParseError::MissingSection("sourceDesc"))?;

    let parsed = parser.finish()?;

    Ok(ParsedDocument {
        document: Document {
            source_file: source_file.to_string(),
            author: header.author,
            edition_stmt,
            language: parsed.language,
            publication_stmt: header.publication_stmt,
            resp_stmt: header.resp_stmt,
            source_desc,
            title: header.title,
            urn: parsed.urn,
            textpart_labels: parsed.textpart_labels,
            textparts: parsed.textparts,
            elements: parsed.elements,
        },
        diagnostics: parsed.diagnostics,
        unrecognized_tags: parsed.unrecognized_tags,
    })
}

fn flush_characters(pending: &mut String, parser: &mut TeiParser<'_>) -> Result<(), ParseError> {
    if pending.is_empty() {
        return Ok(());
    }

    let text = std::mem::take(pending);
    parser.characters(&text)
}

fn local_name_of(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

// `xml:lang` becomes `lang`; namespace declarations are skipped.
fn attributes_of(start: &BytesStart<'_>) -> AttributeMap {
    let mut attributes = AttributeMap::new();

    for attr in start.attributes().flatten() {
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }

        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw)
            .map(|value| value.into_owned())
            .unwrap_or_else(|_| raw.to_string());

        attributes.insert(key, value);
    }

    attributes
}

fn resolve_reference(name: &str) -> Option<char> {
    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(decimal) = name.strip_prefix('#') {
        decimal.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderField {
    Author,
    Title,
    EditionStmt,
    PublicationStmt,
    RespStmt,
    SourceDesc,
}

impl HeaderField {
    fn from_local_name(name: &str) -> Option<Self> {
        let field = match name {
            "author" => Self::Author,
            "title" => Self::Title,
            "editionStmt" => Self::EditionStmt,
            "publicationStmt" => Self::PublicationStmt,
            "respStmt" => Self::RespStmt,
            "sourceDesc" => Self::SourceDesc,
            _ => return None,
        };
        Some(field)
    }

    fn keeps_markup(self) -> bool {
        !matches!(self, Self::Author | Self::Title)
    }
}

#[derive(Debug, Default)]
struct Header {
    author: Option<String>,
    title: Option<String>,
    edition_stmt: Option<String>,
    publication_stmt: Option<String>,
    resp_stmt: Option<String>,
    source_desc: Option<String>,
}

impl Header {
    fn slot(&mut self, field: HeaderField) -> &mut Option<String> {
        match field {
            HeaderField::Author => &mut self.author,
            HeaderField::Title => &mut self.title,
            HeaderField::EditionStmt => &mut self.edition_stmt,
            HeaderField::PublicationStmt => &mut self.publication_stmt,
            HeaderField::RespStmt => &mut self.resp_stmt,
            HeaderField::SourceDesc => &mut self.source_desc,
        }
    }
}

#[derive(Debug)]
struct OpenCapture {
    field: HeaderField,
    depth: usize,
    start: usize,
    text: String,
}

// First occurrence of each field wins.
#[derive(Debug, Default)]
struct HeaderCollector {
    header: Header,
    open: Vec<OpenCapture>,
}

impl HeaderCollector {
    fn start(&mut self, name: &str, depth: usize, start: usize) {
        let Some(field) = HeaderField::from_local_name(name) else {
            return;
        };

        if self.header.slot(field).is_some() || self.open.iter().any(|c| c.field == field) {
            return;
        }

        self.open.push(OpenCapture {
            field,
            depth,
            start,
            text: String::new(),
        });
    }

    fn empty(&mut self, name: &str, markup: &str) {
        let Some(field) = HeaderField::from_local_name(name) else {
            return;
        };
        if self.open.iter().any(|c| c.field == field) {
            return;
        }

        let slot = self.header.slot(field);
        if slot.is_none() {
            *slot = Some(if field.keeps_markup() {
                markup.to_string()
            } else {
                String::new()
            });
        }
    }

    fn text(&mut self, text: &str) {
        for capture in &mut self.open {
            if !capture.field.keeps_markup() {
                capture.text.push_str(text);
            }
        }
    }

    fn end(&mut self, depth: usize, xml: &str, end: usize) {
        let Some(position) = self.open.iter().rposition(|c| c.depth == depth) else {
            return;
        };

        let capture = self.open.remove(position);
        let value = if capture.field.keeps_markup() {
            xml[capture.start..end].to_string()
        } else {
            capture.text.trim().to_string()
        };

        let slot = self.header.slot(capture.field);
        if slot.is_none() {
            *slot = Some(value);
        }
    }
}
