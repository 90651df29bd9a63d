use anyhow::{Context, Result};
use tracing::info;

use crate::cli::TocArgs;
use crate::commands::ingest::read_document;
use crate::tei::table_of_contents;

pub fn run(args: TocArgs) -> Result<()> {
    let document = read_document(&args.artifact)?;
    let toc = table_of_contents(&document.textparts, &document.textpart_labels);

    info!(
        urn = %document.urn,
        labels = ?document.textpart_labels,
        entries = toc.len(),
        "built table of contents"
    );

    let rendered = serde_json::to_string_pretty(&toc)
        .with_context(|| format!("failed to render table of contents for {}", document.urn))?;
    println!("{rendered}");

    Ok(())
}
