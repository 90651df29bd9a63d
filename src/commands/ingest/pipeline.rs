use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::error::LoadError;
use crate::model::{ArtifactHeader, Document, DocumentCounts, Element, ElementChild};
use crate::store::{DocumentStore, DocumentWriter, StoreError};
use crate::tei::{self, Segmenter};
use crate::util::write_json_pretty;

pub fn discover_sources(root: &Path, exclude: Option<&Regex>) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), "xml") {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if exclude.is_some_and(|pattern| pattern.is_match(&file_name)) {
            debug!(path = %entry.path().display(), "excluded from discovery");
            continue;
        }

        sources.push(entry.into_path());
    }

    sources.sort();
    Ok(sources)
}

// A missing output directory has no artifacts.
pub fn discover_artifacts(output_root: &Path, skip_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    if !output_root.exists() {
        return Ok(Vec::new());
    }

    let walker = WalkDir::new(output_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| skip_dir.is_none_or(|skip| entry.path() != skip));

    let mut artifacts = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", output_root.display()))?;
        if entry.file_type().is_file() && has_extension(entry.path(), "json") {
            artifacts.push(entry.into_path());
        }
    }

    artifacts.sort();
    Ok(artifacts)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

pub fn artifact_path(source: &Path, source_root: &Path, output_root: &Path) -> Result<PathBuf> {
    let relative = source.strip_prefix(source_root).with_context(|| {
        format!(
            "{} is not inside {}",
            source.display(),
            source_root.display()
        )
    })?;

    Ok(output_root.join(relative).with_extension("json"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed {
        artifact: PathBuf,
        urn: String,
        counts: DocumentCounts,
        diagnostics: usize,
    },
    Skipped {
        artifact: PathBuf,
    },
}

pub fn parse_one(
    source: &Path,
    source_root: &Path,
    output_root: &Path,
    segmenter: &dyn Segmenter,
) -> Result<ParseOutcome> {
    let artifact = artifact_path(source, source_root, output_root)?;
    if artifact.exists() {
        debug!(path = %artifact.display(), "artifact exists; skipping parse");
        return Ok(ParseOutcome::Skipped { artifact });
    }

    info!(path = %source.display(), "parsing");

    let parsed = tei::parse_file(source, segmenter)
        .with_context(|| format!("failed to parse {}", source.display()))?;

    if !parsed.unrecognized_tags.is_empty() {
        debug!(
            urn = %parsed.document.urn,
            tags = ?parsed.unrecognized_tags,
            "document used unrecognized tags"
        );
    }

    write_json_pretty(&artifact, &parsed.document)?;

    let counts = parsed.document.counts();
    info!(
        path = %artifact.display(),
        urn = %parsed.document.urn,
        textparts = counts.textparts,
        elements = counts.elements,
        tokens = counts.tokens,
        "wrote artifact"
    );

    Ok(ParseOutcome::Parsed {
        artifact,
        urn: parsed.document.urn,
        counts,
        diagnostics: parsed.diagnostics.len(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { urn: String, counts: DocumentCounts },
    Skipped { urn: String },
}

pub fn load_one<S: DocumentStore>(artifact: &Path, store: &mut S) -> Result<LoadOutcome, LoadError> {
    let raw = read_artifact(artifact)?;
    let urn = artifact_urn(artifact, &raw)?.ok_or_else(|| LoadError::MissingUrn {
        path: artifact.to_path_buf(),
    })?;

    if store.document_exists(&urn)? {
        info!(urn = %urn, "skipping existing document");
        return Ok(LoadOutcome::Skipped { urn });
    }

    let document: Document = serde_json::from_slice(&raw).map_err(|source| LoadError::Artifact {
        path: artifact.to_path_buf(),
        source,
    })?;

    match persist_document(store, &document) {
        Ok(counts) => {
            info!(
                urn = %urn,
                textparts = counts.textparts,
                elements = counts.elements,
                tokens = counts.tokens,
                "loaded document"
            );
            Ok(LoadOutcome::Loaded { urn, counts })
        }
        Err(LoadError::Store(StoreError::Duplicate(_))) => {
            info!(urn = %urn, "document was stored by another loader; skipping");
            Ok(LoadOutcome::Skipped { urn })
        }
        Err(err) => Err(err),
    }
}

pub fn persist_document<S: DocumentStore>(
    store: &mut S,
    document: &Document,
) -> Result<DocumentCounts, LoadError> {
    let mut writer = store.begin()?;
    writer.insert_document(document)?;

    let mut textpart_ids = HashMap::with_capacity(document.textparts.len());
    for textpart in &document.textparts {
        let id = writer.append_textpart(&document.urn, textpart)?;
        textpart_ids.insert(textpart.index, id);
    }

    let mut counts = DocumentCounts {
        textparts: document.textparts.len(),
        ..DocumentCounts::default()
    };
    for element in &document.elements {
        persist_element(&mut writer, &textpart_ids, None, element, &mut counts)?;
    }

    writer.commit()?;
    Ok(counts)
}

fn persist_element<W: DocumentWriter>(
    writer: &mut W,
    textpart_ids: &HashMap<usize, i64>,
    parent_id: Option<i64>,
    element: &Element,
    counts: &mut DocumentCounts,
) -> Result<(), LoadError> {
    let textpart_id = *textpart_ids
        .get(&element.textpart_index)
        .ok_or_else(|| LoadError::UnknownTextpart {
            element_urn: element.urn.clone(),
            textpart_index: element.textpart_index,
        })?;

    let element_id = writer.append_element(textpart_id, parent_id, element)?;
    counts.elements += 1;

    for child in &element.children {
        match child {
            ElementChild::TextRun(run) => {
                for (position, token) in run.tokens.iter().enumerate() {
                    writer.append_token(textpart_id, element_id, position, token)?;
                    counts.tokens += 1;
                }
            }
            ElementChild::Element(child) => {
                persist_element(writer, textpart_ids, Some(element_id), child, counts)?;
            }
        }
    }

    Ok(())
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|err| LoadError::Artifact {
        path: path.to_path_buf(),
        source: serde_json::Error::io(err),
    })
}

fn artifact_urn(path: &Path, raw: &[u8]) -> Result<Option<String>, LoadError> {
    let header: ArtifactHeader = serde_json::from_slice(raw).map_err(|source| LoadError::Artifact {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(header.urn.filter(|urn| !urn.is_empty()))
}

pub fn read_document(path: &Path) -> Result<Document, LoadError> {
    let raw = read_artifact(path)?;
    serde_json::from_slice(&raw).map_err(|source| LoadError::Artifact {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct FileStatus {
    pub source: PathBuf,
    pub artifact: PathBuf,
    pub parsed: bool,
    pub loaded: bool,
    pub urn: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionStatus {
    pub files: Vec<FileStatus>,
}

impl IngestionStatus {
    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn parsed(&self) -> usize {
        self.files.iter().filter(|file| file.parsed).count()
    }

    pub fn loaded(&self) -> usize {
        self.files.iter().filter(|file| file.loaded).count()
    }

    pub fn pending_parse(&self) -> usize {
        self.total() - self.parsed()
    }

    pub fn pending_load(&self) -> usize {
        self.files
            .iter()
            .filter(|file| file.parsed && !file.loaded)
            .count()
    }
}

pub fn compute_status(
    source_root: &Path,
    output_root: &Path,
    exclude: Option<&Regex>,
    loaded_urns: &HashSet<String>,
) -> Result<IngestionStatus> {
    let mut files = Vec::new();

    for source in discover_sources(source_root, exclude)? {
        let artifact = artifact_path(&source, source_root, output_root)?;
        let parsed = artifact.exists();

        let urn = if parsed {
            match read_artifact(&artifact).and_then(|raw| artifact_urn(&artifact, &raw)) {
                Ok(urn) => urn,
                Err(err) => {
                    warn!(path = %artifact.display(), error = %err, "unreadable artifact");
                    None
                }
            }
        } else {
            None
        };

        let loaded = urn.as_ref().is_some_and(|urn| loaded_urns.contains(urn));

        files.push(FileStatus {
            source,
            artifact,
            parsed,
            loaded,
            urn,
        });
    }

    Ok(IngestionStatus { files })
}
