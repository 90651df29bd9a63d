use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::cli::PipelineArgs;
use crate::tei::UnicodeWordSegmenter;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub db_path: PathBuf,
    pub manifest_dir: PathBuf,
    pub exclude: Option<Regex>,
    pub languages: Vec<String>,
    pub jobs: Option<usize>,
    pub verbose: bool,
}

impl PipelineConfig {
    pub fn from_args(args: &PipelineArgs) -> Result<Self> {
        let exclude = if args.exclude.is_empty() {
            None
        } else {
            Some(
                Regex::new(&args.exclude)
                    .with_context(|| format!("invalid exclude pattern: {}", args.exclude))?,
            )
        };

        if args.jobs == Some(0) {
            bail!("--jobs must be at least 1");
        }

        Ok(Self {
            output_dir: args.output_dir.clone(),
            db_path: args.db_path.clone(),
            manifest_dir: args.manifest_dir.clone(),
            exclude,
            languages: args.languages.clone(),
            jobs: args.jobs,
            verbose: args.verbose,
        })
    }

    pub fn segmenter(&self) -> UnicodeWordSegmenter {
        UnicodeWordSegmenter::new(self.languages.iter().cloned())
    }
}
