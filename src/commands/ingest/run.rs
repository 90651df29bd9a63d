use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rayon::prelude::*;
use tracing::{error, info, warn};

use super::pipeline::{
    LoadOutcome, ParseOutcome, discover_artifacts, discover_sources, load_one, parse_one,
};
use crate::cli::{AllArgs, LoadArgs, ParseArgs};
use crate::config::PipelineConfig;
use crate::model::{BatchCounts, IngestRunManifest, RunFileEntry};
use crate::store::{DB_SCHEMA_VERSION, DocumentStore, SqliteStore};
use crate::tei::Segmenter;
use crate::util::{ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

const MANIFEST_VERSION: u32 = 1;

pub fn parse(args: ParseArgs) -> Result<()> {
    let config = PipelineConfig::from_args(&args.pipeline)?;
    run_parse(&config, &args.source_dir)?;
    Ok(())
}

pub fn load(args: LoadArgs) -> Result<()> {
    let config = PipelineConfig::from_args(&args.pipeline)?;
    run_load(&config)?;
    Ok(())
}

pub fn all(args: AllArgs) -> Result<()> {
    let config = PipelineConfig::from_args(&args.pipeline)?;

    println!("Phase 1: parsing TEI XML to JSON");
    run_parse(&config, &args.source_dir)?;

    println!("\nPhase 2: loading JSON into the database");
    run_load(&config)?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub counts: BatchCounts,
    pub files: Vec<RunFileEntry>,
    pub manifest_path: PathBuf,
}

pub fn run_parse(config: &PipelineConfig, source_dir: &Path) -> Result<BatchReport> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("parse-{}", utc_compact_string(started_ts));

    let sources = discover_sources(source_dir, config.exclude.as_ref())?;
    info!(source_dir = %source_dir.display(), run_id = %run_id, files = sources.len(), "starting parse");

    if sources.is_empty() {
        println!("No TEI XML files found.");
    } else {
        println!("Found {} TEI XML files in {}", sources.len(), source_dir.display());
    }

    let segmenter = config.segmenter();
    let pool = build_pool(config.jobs)?;
    let files: Vec<RunFileEntry> = pool.install(|| {
        sources
            .par_iter()
            .map(|source| parse_entry(source, source_dir, &config.output_dir, &segmenter))
            .collect()
    });

    let counts = tally(&files);
    println!(
        "Parsed: {}, Skipped: {}, Errors: {}",
        counts.processed, counts.skipped, counts.errors
    );
    if config.verbose {
        print_entries(&files);
    }

    let manifest = IngestRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id,
        phase: "parse".to_string(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        started_at,
        updated_at: now_utc_string(),
        source_root: Some(source_dir.display().to_string()),
        output_root: config.output_dir.display().to_string(),
        db_path: None,
        counts,
        files,
    };
    let manifest_path = write_manifest(config, started_ts, &manifest)?;

    Ok(BatchReport {
        counts: manifest.counts,
        files: manifest.files,
        manifest_path,
    })
}

fn parse_entry(
    source: &Path,
    source_root: &Path,
    output_root: &Path,
    segmenter: &dyn Segmenter,
) -> RunFileEntry {
    let path = source.display().to_string();

    match parse_one(source, source_root, output_root, segmenter) {
        Ok(ParseOutcome::Parsed {
            urn, diagnostics, ..
        }) => {
            if diagnostics > 0 {
                warn!(path = %path, urn = %urn, diagnostics, "parsed with recoverable anomalies");
            }
            RunFileEntry {
                sha256: hash_source(source),
                path,
                outcome: "parsed".to_string(),
                urn: Some(urn),
                error: None,
            }
        }
        Ok(ParseOutcome::Skipped { .. }) => RunFileEntry {
            path,
            outcome: "skipped".to_string(),
            urn: None,
            sha256: None,
            error: None,
        },
        Err(err) => {
            let message = format!("{err:#}");
            error!(path = %path, error = %message, "failed to parse");
            RunFileEntry {
                path,
                outcome: "error".to_string(),
                urn: None,
                sha256: None,
                error: Some(message),
            }
        }
    }
}

fn hash_source(source: &Path) -> Option<String> {
    match sha256_file(source) {
        Ok(digest) => Some(digest),
        Err(err) => {
            let message = format!("{err:#}");
            warn!(path = %source.display(), error = %message, "failed to hash source");
            None
        }
    }
}

pub fn run_load(config: &PipelineConfig) -> Result<BatchReport> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("load-{}", utc_compact_string(started_ts));

    let artifacts = discover_artifacts(&config.output_dir, Some(&config.manifest_dir))?;
    info!(output_dir = %config.output_dir.display(), run_id = %run_id, files = artifacts.len(), "starting load");

    if artifacts.is_empty() {
        println!("No JSON files found. Run `tei-ingest parse` first.");
    } else {
        println!(
            "Found {} JSON files in {}",
            artifacts.len(),
            config.output_dir.display()
        );
    }

    if let Some(parent) = config.db_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }
    let mut store = SqliteStore::open(&config.db_path)?;

    let files = load_artifacts(&artifacts, &mut store);
    let counts = tally(&files);
    println!(
        "Loaded: {}, Skipped: {}, Errors: {}",
        counts.processed, counts.skipped, counts.errors
    );
    if config.verbose {
        print_entries(&files);
    }

    let manifest = IngestRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id,
        phase: "load".to_string(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        started_at,
        updated_at: now_utc_string(),
        source_root: None,
        output_root: config.output_dir.display().to_string(),
        db_path: Some(config.db_path.display().to_string()),
        counts,
        files,
    };
    let manifest_path = write_manifest(config, started_ts, &manifest)?;

    Ok(BatchReport {
        counts: manifest.counts,
        files: manifest.files,
        manifest_path,
    })
}

pub fn load_artifacts<S: DocumentStore>(artifacts: &[PathBuf], store: &mut S) -> Vec<RunFileEntry> {
    artifacts
        .iter()
        .map(|artifact| {
            let path = artifact.display().to_string();
            match load_one(artifact, store) {
                Ok(LoadOutcome::Loaded { urn, .. }) => RunFileEntry {
                    path,
                    outcome: "loaded".to_string(),
                    urn: Some(urn),
                    sha256: None,
                    error: None,
                },
                Ok(LoadOutcome::Skipped { urn }) => RunFileEntry {
                    path,
                    outcome: "skipped".to_string(),
                    urn: Some(urn),
                    sha256: None,
                    error: None,
                },
                Err(err) => {
                    let message = error_chain(&err);
                    error!(path = %path, error = %message, "failed to load");
                    RunFileEntry {
                        path,
                        outcome: "error".to_string(),
                        urn: None,
                        sha256: None,
                        error: Some(message),
                    }
                }
            }
        })
        .collect()
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn build_pool(jobs: Option<usize>) -> Result<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = jobs {
        builder = builder.num_threads(jobs);
    }
    builder.build().context("failed to build parser thread pool")
}

fn tally(files: &[RunFileEntry]) -> BatchCounts {
    let mut counts = BatchCounts::default();
    for file in files {
        match file.outcome.as_str() {
            "skipped" => counts.skipped += 1,
            "error" => counts.errors += 1,
            _ => counts.processed += 1,
        }
    }
    counts
}

fn print_entries(files: &[RunFileEntry]) {
    for file in files {
        match (&file.urn, &file.error) {
            (_, Some(error)) => println!("  {:<8} {}: {}", file.outcome, file.path, error),
            (Some(urn), None) => println!("  {:<8} {} ({})", file.outcome, file.path, urn),
            (None, None) => println!("  {:<8} {}", file.outcome, file.path),
        }
    }
}

fn write_manifest(
    config: &PipelineConfig,
    started_ts: chrono::DateTime<Utc>,
    manifest: &IngestRunManifest,
) -> Result<PathBuf> {
    ensure_directory(&config.manifest_dir)?;
    let path = config.manifest_dir.join(format!(
        "{}_run_{}.json",
        manifest.phase,
        utc_compact_string(started_ts)
    ));
    write_json_pretty(&path, manifest)?;
    info!(path = %path.display(), "wrote run manifest");
    Ok(path)
}
