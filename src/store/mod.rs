use std::collections::HashSet;

use thiserror::Error;

use crate::model::{Document, Element, Textpart, Token};

mod sqlite;

pub use sqlite::{DB_SCHEMA_VERSION, SqliteStore};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document {0} is already stored")]
    Duplicate(String),
    #[error("sqlite operation failed")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to encode column value")]
    Encode(#[from] serde_json::Error),
}

pub trait DocumentStore {
    type Writer<'a>: DocumentWriter
    where
        Self: 'a;

    fn document_exists(&self, urn: &str) -> Result<bool, StoreError>;

    fn document_urns(&self) -> Result<HashSet<String>, StoreError>;

    fn begin(&mut self) -> Result<Self::Writer<'_>, StoreError>;
}

pub trait DocumentWriter {
    fn insert_document(&mut self, document: &Document) -> Result<(), StoreError>;

    fn append_textpart(&mut self, document_urn: &str, textpart: &Textpart)
    -> Result<i64, StoreError>;

    fn append_element(
        &mut self,
        textpart_id: i64,
        parent_id: Option<i64>,
        element: &Element,
    ) -> Result<i64, StoreError>;

    fn append_token(
        &mut self,
        textpart_id: i64,
        element_id: i64,
        position: usize,
        token: &Token,
    ) -> Result<i64, StoreError>;

    fn commit(self) -> Result<(), StoreError>
    where
        Self: Sized;
}
