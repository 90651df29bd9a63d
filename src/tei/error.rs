use thiserror::Error;

use super::segment::SegmentError;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("{0} is required but missing from the header")]
    MissingSection(&'static str),

    #[error("no edition division with an `n` attribute; the document has no URN")]
    MissingUrn,

    #[error("segmentation failed: {0}")]
    Segmentation(#[from] SegmentError),
}
