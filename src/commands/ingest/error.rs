use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("no document URN in {}", path.display())]
    MissingUrn { path: PathBuf },
    #[error("element {element_urn} refers to textpart {textpart_index}, which the document does not contain")]
    UnknownTextpart {
        element_urn: String,
        textpart_index: usize,
    },
    #[error("failed to read artifact {}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
