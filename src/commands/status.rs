use std::collections::HashSet;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::ingest::{IngestionStatus, compute_status};
use crate::config::PipelineConfig;
use crate::store::{DocumentStore, SqliteStore};

pub fn run(args: StatusArgs) -> Result<()> {
    let config = PipelineConfig::from_args(&args.pipeline)?;

    info!(source_dir = %args.source_dir.display(), "status requested");

    let store = if config.db_path.exists() {
        Some(SqliteStore::open_read_only(&config.db_path)?)
    } else {
        warn!(path = %config.db_path.display(), "database file missing");
        None
    };

    let loaded_urns = match &store {
        Some(store) => store
            .document_urns()
            .with_context(|| format!("failed to list documents in {}", config.db_path.display()))?,
        None => HashSet::new(),
    };

    let status = compute_status(
        &args.source_dir,
        &config.output_dir,
        config.exclude.as_ref(),
        &loaded_urns,
    )?;

    print_summary(&status);
    if config.verbose {
        print_details(&status, store.as_ref())?;
    }

    Ok(())
}

fn print_summary(status: &IngestionStatus) {
    println!("Total TEI files:    {}", status.total());
    println!("Parsed to JSON:     {}", status.parsed());
    println!("Loaded to database: {}", status.loaded());

    let pending_parse = status.pending_parse();
    let pending_load = status.pending_load();
    if pending_parse > 0 || pending_load > 0 {
        println!();
    }
    if pending_parse > 0 {
        println!("Pending parse: {pending_parse} files");
    }
    if pending_load > 0 {
        println!("Pending load:  {pending_load} files");
    }
}

fn print_details(status: &IngestionStatus, store: Option<&SqliteStore>) -> Result<()> {
    println!("\nFile details:");

    for file in &status.files {
        let parsed = if file.parsed { '+' } else { '-' };
        let loaded = if file.loaded { '+' } else { '-' };
        println!("  [{parsed}P {loaded}L] {}", file.source.display());

        let Some(urn) = &file.urn else {
            continue;
        };
        println!("           URN: {urn}");

        if let (true, Some(store)) = (file.loaded, store) {
            if let Some(check) = store.check_counts(urn)? {
                let stored = check.stored;
                let recorded = check.recorded;
                println!(
                    "           Rows: {} textparts, {} elements, {} tokens",
                    stored.textparts, stored.elements, stored.tokens
                );
                println!(
                    "           Recorded: {} textparts, {} elements, {} tokens",
                    recorded.textparts, recorded.elements, recorded.tokens
                );
                if !check.matches() {
                    warn!(urn = %urn, "stored rows do not match the recorded counts");
                    println!("           MISMATCH: stored rows differ from recorded counts");
                }
            }
        }
    }

    Ok(())
}
