use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type AttributeMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source_file: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(rename = "editionStmt")]
    pub edition_stmt: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(rename = "publicationStmt", default)]
    pub publication_stmt: Option<String>,
    #[serde(rename = "respStmt", default)]
    pub resp_stmt: Option<String>,
    #[serde(rename = "sourceDesc")]
    pub source_desc: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub urn: String,
    #[serde(default)]
    pub textpart_labels: Vec<String>,
    #[serde(default)]
    pub textparts: Vec<Textpart>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Document {
    pub fn counts(&self) -> DocumentCounts {
        let mut counts = DocumentCounts {
            textparts: self.textparts.len(),
            ..DocumentCounts::default()
        };

        for element in &self.elements {
            element.accumulate_counts(&mut counts);
        }

        counts
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Textpart {
    pub index: usize,
    pub location: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub urn: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: AttributeMap,
    // Not serialized; the element tree owns tokens in the artifact.
    #[serde(skip)]
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub index: usize,
    pub tagname: String,
    #[serde(default)]
    pub attributes: AttributeMap,
    pub urn: String,
    pub textpart_urn: String,
    pub textpart_index: usize,
    #[serde(default)]
    pub children: Vec<ElementChild>,
}

impl Element {
    fn accumulate_counts(&self, counts: &mut DocumentCounts) {
        counts.elements += 1;

        for child in &self.children {
            match child {
                ElementChild::TextRun(run) => counts.tokens += run.tokens.len(),
                ElementChild::Element(element) => element.accumulate_counts(counts),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementChild {
    TextRun(TextRun),
    Element(Element),
}

pub const TEXT_RUN_TAGNAME: &str = "text_run";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub tagname: String,
    pub tokens: Vec<Token>,
}

impl TextRun {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tagname: TEXT_RUN_TAGNAME.to_string(),
            tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub urn: String,
    pub whitespace: bool,
    #[serde(default)]
    pub position: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DocumentCounts {
    pub textparts: usize,
    pub elements: usize,
    pub tokens: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactHeader {
    #[serde(default)]
    pub urn: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchCounts {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunFileEntry {
    pub path: String,
    pub outcome: String,
    pub urn: Option<String>,
    pub sha256: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub phase: String,
    pub db_schema_version: String,
    pub started_at: String,
    pub updated_at: String,
    pub source_root: Option<String>,
    pub output_root: String,
    pub db_path: Option<String>,
    pub counts: BatchCounts,
    pub files: Vec<RunFileEntry>,
}
