mod error;
mod pipeline;
mod run;

pub use error::LoadError;
pub use pipeline::{IngestionStatus, compute_status, read_document};
pub use run::{all, load, parse};
