use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "tei-ingest",
    version,
    about = "Parse TEI editions to JSON and load them into SQLite"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Parse(ParseArgs),
    Load(LoadArgs),
    All(AllArgs),
    Status(StatusArgs),
    Toc(TocArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    #[arg(long, short = 'o', env = "TEI_INGEST_OUTPUT_DIR", default_value = "tei_json")]
    pub output_dir: PathBuf,

    #[arg(long, short = 'd', env = "TEI_INGEST_DB_PATH", default_value = "tei-ingest.sqlite")]
    pub db_path: PathBuf,

    #[arg(long, env = "TEI_INGEST_MANIFEST_DIR", default_value = "tei_manifests")]
    pub manifest_dir: PathBuf,

    #[arg(long, default_value = "__cts__")]
    pub exclude: String,

    #[arg(long, value_delimiter = ',', default_values = ["grc", "la"])]
    pub languages: Vec<String>,

    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,

    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    pub source_dir: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AllArgs {
    pub source_dir: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    pub source_dir: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug, Clone)]
pub struct TocArgs {
    pub artifact: PathBuf,
}
