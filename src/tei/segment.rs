use std::collections::BTreeSet;

use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub whitespace_after: bool,
}

#[derive(Error, Debug)]
#[error("{language}: {message}")]
pub struct SegmentError {
    pub language: String,
    pub message: String,
}

// Must be deterministic: token URNs are numbered by occurrence.
pub trait Segmenter: Send + Sync {
    fn segment(&self, language: &str, text: &str) -> Result<Vec<Segment>, SegmentError>;
}

pub const DEFAULT_LANGUAGES: [&str; 2] = ["grc", "la"];

#[derive(Debug, Clone)]
pub struct UnicodeWordSegmenter {
    languages: BTreeSet<String>,
}

impl UnicodeWordSegmenter {
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
        }
    }

    pub fn supports(&self, language: &str) -> bool {
        self.languages.contains(language)
    }
}

impl Default for UnicodeWordSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGES)
    }
}

impl Segmenter for UnicodeWordSegmenter {
    fn segment(&self, language: &str, text: &str) -> Result<Vec<Segment>, SegmentError> {
        if !self.supports(language) {
            return Ok(Vec::new());
        }

        let mut segments: Vec<Segment> = Vec::new();
        for piece in text.split_word_bounds() {
            if piece.chars().all(char::is_whitespace) {
                if let Some(last) = segments.last_mut() {
                    last.whitespace_after = true;
                }
                continue;
            }

            segments.push(Segment {
                text: piece.to_string(),
                whitespace_after: false,
            });
        }

        Ok(segments)
    }
}
