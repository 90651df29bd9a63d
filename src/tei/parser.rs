use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::error::ParseError;
use super::segment::Segmenter;
use super::urn::{self, OccurrenceCounter};
use crate::model::{AttributeMap, Element, ElementChild, TextRun, Textpart, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Choice,
    Corr,
    Del,
    Foreign,
    Gap,
    Head,
    Hi,
    L,
    Label,
    Lb,
    Lg,
    Milestone,
    Note,
    Num,
    P,
    Pb,
    Quote,
    Sic,
}

impl ElementKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "choice" => Self::Choice,
            "corr" => Self::Corr,
            "del" => Self::Del,
            "foreign" => Self::Foreign,
            "gap" => Self::Gap,
            "head" => Self::Head,
            "hi" => Self::Hi,
            "l" => Self::L,
            "label" => Self::Label,
            "lb" => Self::Lb,
            "lg" => Self::Lg,
            "milestone" => Self::Milestone,
            "note" => Self::Note,
            "num" => Self::Num,
            "p" => Self::P,
            "pb" => Self::Pb,
            "quote" => Self::Quote,
            "sic" => Self::Sic,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Choice => "choice",
            Self::Corr => "corr",
            Self::Del => "del",
            Self::Foreign => "foreign",
            Self::Gap => "gap",
            Self::Head => "head",
            Self::Hi => "hi",
            Self::L => "l",
            Self::Label => "label",
            Self::Lb => "lb",
            Self::Lg => "lg",
            Self::Milestone => "milestone",
            Self::Note => "note",
            Self::Num => "num",
            Self::P => "p",
            Self::Pb => "pb",
            Self::Quote => "quote",
            Self::Sic => "sic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind<'a> {
    Body,
    Division,
    Known(ElementKind),
    Unknown(&'a str),
}

impl<'a> TagKind<'a> {
    fn resolve(tag: &'a str) -> Self {
        match tag {
            "body" => Self::Body,
            "div" => Self::Division,
            other => ElementKind::from_tag(other)
                .map(Self::Known)
                .unwrap_or(Self::Unknown(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    UnnumberedTextpart { urn: String },
    ElementOutsideTextpart { tagname: String },
    OrphanedElement { tagname: String },
    TextpartMismatch { element_urn: String, textpart_urn: String },
    StrayCharacters { text: String },
    UnrecognizedTag { tagname: String },
    UnbalancedClose { tagname: String },
    UnclosedAtEnd { elements: usize, textparts: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DivisionKind {
    Root,
    Textpart,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenElement {
    Tracked(usize),
    // No textpart to belong to; kept so its close still pairs up.
    Dropped,
}

#[derive(Debug)]
enum NodeChild {
    Element(usize),
    TextRun(TextRun),
}

#[derive(Debug)]
struct ElementNode {
    tagname: String,
    attributes: AttributeMap,
    urn: String,
    textpart_urn: String,
    textpart_index: usize,
    children: Vec<NodeChild>,
}

struct Owner {
    index: usize,
    urn: String,
}

impl Owner {
    fn of(textpart: &Textpart) -> Self {
        Self {
            index: textpart.index,
            urn: textpart.urn.clone(),
        }
    }
}

#[derive(Debug)]
pub struct ParsedText {
    pub urn: String,
    pub language: Option<String>,
    pub textpart_labels: Vec<String>,
    pub textparts: Vec<Textpart>,
    pub elements: Vec<Element>,
    pub unrecognized_tags: BTreeSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct TeiParser<'s> {
    segmenter: &'s dyn Segmenter,
    urn: Option<String>,
    language: Option<String>,
    divisions: Vec<DivisionKind>,
    open_textparts: Vec<Textpart>,
    closed_textparts: Vec<Textpart>,
    textparts_created: usize,
    textpart_labels: Vec<String>,
    arena: Vec<ElementNode>,
    open_elements: Vec<OpenElement>,
    roots: Vec<usize>,
    element_occurrences: OccurrenceCounter,
    token_occurrences: OccurrenceCounter,
    unrecognized_tags: BTreeSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'s> TeiParser<'s> {
    pub fn new(segmenter: &'s dyn Segmenter) -> Self {
        Self {
            segmenter,
            urn: None,
            language: None,
            divisions: Vec::new(),
            open_textparts: Vec::new(),
            closed_textparts: Vec::new(),
            textparts_created: 0,
            textpart_labels: Vec::new(),
            arena: Vec::new(),
            open_elements: Vec::new(),
            roots: Vec::new(),
            element_occurrences: OccurrenceCounter::default(),
            token_occurrences: OccurrenceCounter::default(),
            unrecognized_tags: BTreeSet::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn open(&mut self, tag: &str, attributes: AttributeMap) {
        match TagKind::resolve(tag) {
            TagKind::Body => {}
            TagKind::Division => self.open_division(attributes),
            TagKind::Known(kind) => self.open_element(kind.as_str(), attributes),
            TagKind::Unknown(tagname) => {
                if self.unrecognized_tags.insert(tagname.to_string()) {
                    debug!(document = %self.document_label(), tagname, "unknown element");
                    self.diagnostics.push(Diagnostic::UnrecognizedTag {
                        tagname: tagname.to_string(),
                    });
                }
                self.open_element(tagname, attributes);
            }
        }
    }

    pub fn close(&mut self, tag: &str) {
        match TagKind::resolve(tag) {
            TagKind::Body => {}
            TagKind::Division => self.close_division(),
            TagKind::Known(_) | TagKind::Unknown(_) => self.close_element(tag),
        }
    }

    pub fn characters(&mut self, text: &str) -> Result<(), ParseError> {
        let blank = text.trim().is_empty();

        let index = match self.open_elements.last() {
            Some(OpenElement::Tracked(index)) => *index,
            Some(OpenElement::Dropped) | None => {
                if !blank {
                    warn!(
                        document = %self.document_label(),
                        text = text.trim(),
                        "characters must belong to an element; discarding"
                    );
                    self.diagnostics.push(Diagnostic::StrayCharacters {
                        text: text.trim().to_string(),
                    });
                }
                return Ok(());
            }
        };

        if blank {
            return Ok(());
        }

        let Some(language) = self.language.as_deref() else {
            debug!("no document language; characters are not segmented");
            return Ok(());
        };
        let segments = self.segmenter.segment(language, text)?;

        let scope = match self.open_textparts.last() {
            Some(textpart) => textpart.urn.clone(),
            None => self.arena[index].textpart_urn.clone(),
        };

        let mut tokens = Vec::new();
        for segment in segments {
            if segment.text.trim().is_empty() {
                continue;
            }

            let prior = self.token_occurrences.next(&scope, &segment.text);
            let token = Token {
                urn: urn::token_urn(&scope, &segment.text, prior),
                text: segment.text,
                whitespace: segment.whitespace_after,
                position: tokens.len(),
            };

            if let Some(textpart) = self.open_textparts.last_mut() {
                textpart.tokens.push(token.clone());
            }
            tokens.push(token);
        }

        if !tokens.is_empty() {
            self.arena[index]
                .children
                .push(NodeChild::TextRun(TextRun::new(tokens)));
        }

        Ok(())
    }

    pub fn finish(mut self) -> Result<ParsedText, ParseError> {
        let open_elements = self.open_elements.len();
        let open_textparts = self.open_textparts.len();
        if open_elements > 0 || open_textparts > 0 {
            warn!(
                document = %self.document_label(),
                elements = open_elements,
                textparts = open_textparts,
                "document ended with unclosed elements or textparts"
            );
            self.diagnostics.push(Diagnostic::UnclosedAtEnd {
                elements: open_elements,
                textparts: open_textparts,
            });
        }

        while let Some(open) = self.open_elements.pop() {
            if let OpenElement::Tracked(index) = open {
                self.settle_closed_element(index);
            }
        }
        while let Some(textpart) = self.open_textparts.pop() {
            self.closed_textparts.push(textpart);
        }

        let urn = self.urn.take().ok_or(ParseError::MissingUrn)?;

        let mut slots: Vec<Option<ElementNode>> = self.arena.into_iter().map(Some).collect();
        let elements = self
            .roots
            .iter()
            .filter_map(|&index| materialize(&mut slots, index))
            .collect();

        Ok(ParsedText {
            urn,
            language: self.language,
            textpart_labels: self.textpart_labels,
            textparts: self.closed_textparts,
            elements,
            unrecognized_tags: self.unrecognized_tags,
            diagnostics: self.diagnostics,
        })
    }

    fn document_label(&self) -> &str {
        self.urn.as_deref().unwrap_or("<no urn>")
    }

    fn open_division(&mut self, mut attributes: AttributeMap) {
        let division_type = attributes.get("type").cloned();

        let kind = match division_type.as_deref() {
            Some("edition") | Some("translation") => {
                self.language = attributes.remove("lang");
                self.urn = attributes.remove("n");
                if self.urn.is_none() {
                    warn!("edition division has no `n` attribute");
                }
                DivisionKind::Root
            }
            Some("textpart") => {
                self.open_textpart(attributes);
                DivisionKind::Textpart
            }
            other => {
                debug!(
                    document = %self.document_label(),
                    division_type = other.unwrap_or(""),
                    "ignoring division"
                );
                DivisionKind::Other
            }
        };

        self.divisions.push(kind);
    }

    fn open_textpart(&mut self, mut attributes: AttributeMap) {
        let n = attributes.remove("n");
        let subtype = attributes.remove("subtype");
        let kind = attributes.remove("type");

        if let Some(subtype) = &subtype {
            if !self.textpart_labels.contains(subtype) {
                self.textpart_labels.push(subtype.clone());
            }
        }

        let location = urn::location_of(
            self.open_textparts.iter().map(|textpart| textpart.n.as_deref()),
            n.as_deref(),
        );
        let textpart_urn = urn::textpart_urn(self.urn.as_deref().unwrap_or_default(), &location);

        if n.is_none() {
            debug!(urn = %textpart_urn, "unnumbered textpart");
            self.diagnostics.push(Diagnostic::UnnumberedTextpart {
                urn: textpart_urn.clone(),
            });
        }

        self.open_textparts.push(Textpart {
            index: self.textparts_created,
            location,
            n,
            subtype,
            kind,
            urn: textpart_urn,
            attributes,
            tokens: Vec::new(),
        });
        self.textparts_created += 1;
    }

    fn close_division(&mut self) {
        match self.divisions.pop() {
            Some(DivisionKind::Textpart) => {
                if let Some(textpart) = self.open_textparts.pop() {
                    self.closed_textparts.push(textpart);
                }
            }
            Some(DivisionKind::Root | DivisionKind::Other) => {}
            None => {
                warn!(document = %self.document_label(), "div closed without a matching open");
                self.diagnostics.push(Diagnostic::UnbalancedClose {
                    tagname: "div".to_string(),
                });
            }
        }
    }

    fn open_element(&mut self, tagname: &str, attributes: AttributeMap) {
        let owner = match self.open_textparts.last() {
            Some(textpart) => Some(Owner::of(textpart)),
            None => {
                warn!(
                    document = %self.document_label(),
                    tagname,
                    "elements should not appear outside of textparts"
                );
                self.diagnostics.push(Diagnostic::ElementOutsideTextpart {
                    tagname: tagname.to_string(),
                });
                self.closed_textparts.last().map(Owner::of)
            }
        };

        let Some(owner) = owner else {
            warn!(
                document = %self.document_label(),
                tagname,
                "orphaned element; no textpart available"
            );
            self.diagnostics.push(Diagnostic::OrphanedElement {
                tagname: tagname.to_string(),
            });
            self.open_elements.push(OpenElement::Dropped);
            return;
        };

        let index = self.arena.len();
        let prior = self.element_occurrences.next(&owner.urn, tagname);
        let element_urn = urn::element_urn(&owner.urn, tagname, prior);

        if let Some(OpenElement::Tracked(parent)) = self.open_elements.last().copied() {
            let parent_node = &mut self.arena[parent];
            if parent_node.textpart_index != owner.index {
                warn!(
                    parent = %parent_node.urn,
                    element = %element_urn,
                    "open element belongs to a different textpart than the current element"
                );
                self.diagnostics.push(Diagnostic::TextpartMismatch {
                    element_urn: element_urn.clone(),
                    textpart_urn: parent_node.textpart_urn.clone(),
                });
            }
            parent_node.children.push(NodeChild::Element(index));
        }

        self.arena.push(ElementNode {
            tagname: tagname.to_string(),
            attributes,
            urn: element_urn,
            textpart_urn: owner.urn,
            textpart_index: owner.index,
            children: Vec::new(),
        });
        self.open_elements.push(OpenElement::Tracked(index));
    }

    fn close_element(&mut self, tagname: &str) {
        let Some(open) = self.open_elements.pop() else {
            warn!(document = %self.document_label(), tagname, "close without a matching open element");
            self.diagnostics.push(Diagnostic::UnbalancedClose {
                tagname: tagname.to_string(),
            });
            return;
        };

        let OpenElement::Tracked(index) = open else {
            return;
        };

        if self.arena[index].tagname != tagname {
            debug!(
                expected = %self.arena[index].tagname,
                found = tagname,
                "close tag does not match the innermost open element"
            );
        }

        self.settle_closed_element(index);

        if let Some(textpart) = self.open_textparts.last() {
            let node = &self.arena[index];
            if textpart.index != node.textpart_index {
                warn!(
                    element = %node.urn,
                    textpart = %textpart.urn,
                    "element closed inside a different textpart than it was opened in"
                );
                self.diagnostics.push(Diagnostic::TextpartMismatch {
                    element_urn: node.urn.clone(),
                    textpart_urn: textpart.urn.clone(),
                });
            }
        }
    }

    // Elements already listed by their parent are reachable through it.
    fn settle_closed_element(&mut self, index: usize) {
        let attached = match self.open_elements.last() {
            Some(OpenElement::Tracked(parent)) => self.arena[*parent]
                .children
                .iter()
                .any(|child| matches!(child, NodeChild::Element(child) if *child == index)),
            _ => false,
        };

        if !attached {
            self.roots.push(index);
        }
    }
}

fn materialize(slots: &mut [Option<ElementNode>], index: usize) -> Option<Element> {
    let node = slots.get_mut(index)?.take()?;

    let children = node
        .children
        .into_iter()
        .filter_map(|child| match child {
            NodeChild::TextRun(run) => Some(ElementChild::TextRun(run)),
            NodeChild::Element(child) => materialize(slots, child).map(ElementChild::Element),
        })
        .collect();

    Some(Element {
        index,
        tagname: node.tagname,
        attributes: node.attributes,
        urn: node.urn,
        textpart_urn: node.textpart_urn,
        textpart_index: node.textpart_index,
        children,
    })
}
