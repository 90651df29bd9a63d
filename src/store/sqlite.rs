use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Transaction, ffi, params};

use super::{DocumentStore, DocumentWriter, StoreError};
use crate::model::{Document, DocumentCounts, Element, Textpart, Token};
use crate::util::now_utc_string;

pub const DB_SCHEMA_VERSION: &str = "0.2.0";

#[derive(Debug)]
pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let connection =
            Connection::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        configure_connection(&connection)?;
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    pub fn open_read_only(path: &Path) -> Result<Self> {
        let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("failed to open {} read-only", path.display()))?;
        Ok(Self { connection })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory database")?;
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    pub fn row_counts(&self, urn: &str) -> Result<Option<DocumentCounts>, StoreError> {
        if !self.document_exists(urn)? {
            return Ok(None);
        }

        let (textparts, elements, tokens): (i64, i64, i64) = self.connection.query_row(
            "
            SELECT
              (SELECT COUNT(*) FROM textparts WHERE document_urn = ?1),
              (SELECT COUNT(*) FROM elements e
                 JOIN textparts t ON e.textpart_id = t.id
                WHERE t.document_urn = ?1),
              (SELECT COUNT(*) FROM tokens k
                 JOIN textparts t ON k.textpart_id = t.id
                WHERE t.document_urn = ?1)
            ",
            [urn],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(Some(DocumentCounts {
            textparts: to_count(textparts),
            elements: to_count(elements),
            tokens: to_count(tokens),
        }))
    }

    // Counts taken from the artifact at insert time.
    pub fn recorded_counts(&self, urn: &str) -> Result<Option<DocumentCounts>, StoreError> {
        let counts = self
            .connection
            .query_row(
                "SELECT textpart_count, element_count, token_count FROM documents WHERE urn = ?1",
                [urn],
                |row| {
                    Ok(DocumentCounts {
                        textparts: to_count(row.get::<_, Option<i64>>(0)?.unwrap_or(0)),
                        elements: to_count(row.get::<_, Option<i64>>(1)?.unwrap_or(0)),
                        tokens: to_count(row.get::<_, Option<i64>>(2)?.unwrap_or(0)),
                    })
                },
            )
            .optional()?;

        Ok(counts)
    }

    pub fn check_counts(&self, urn: &str) -> Result<Option<CountCheck>, StoreError> {
        let Some(recorded) = self.recorded_counts(urn)? else {
            return Ok(None);
        };
        let stored = self.row_counts(urn)?.unwrap_or_default();
        Ok(Some(CountCheck { recorded, stored }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountCheck {
    pub recorded: DocumentCounts,
    pub stored: DocumentCounts,
}

impl CountCheck {
    pub fn matches(&self) -> bool {
        self.recorded == self.stored
    }
}

impl DocumentStore for SqliteStore {
    type Writer<'a> = SqliteWriter<'a>;

    fn document_exists(&self, urn: &str) -> Result<bool, StoreError> {
        let found = self
            .connection
            .query_row("SELECT 1 FROM documents WHERE urn = ?1", [urn], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn document_urns(&self) -> Result<HashSet<String>, StoreError> {
        let mut statement = self.connection.prepare("SELECT urn FROM documents")?;
        let urns = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(urns)
    }

    fn begin(&mut self) -> Result<SqliteWriter<'_>, StoreError> {
        Ok(SqliteWriter {
            tx: self.connection.transaction()?,
        })
    }
}

// Rolls back on drop unless committed.
pub struct SqliteWriter<'a> {
    tx: Transaction<'a>,
}

impl DocumentWriter for SqliteWriter<'_> {
    fn insert_document(&mut self, document: &Document) -> Result<(), StoreError> {
        let labels = serde_json::to_string(&document.textpart_labels)?;
        let counts = document.counts();

        let inserted = self.tx.execute(
            "
            INSERT INTO documents(
              urn, source_file, author, title, language, edition_stmt,
              publication_stmt, resp_stmt, source_desc, textpart_labels,
              textpart_count, element_count, token_count, loaded_at
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ",
            params![
                &document.urn,
                &document.source_file,
                &document.author,
                &document.title,
                &document.language,
                &document.edition_stmt,
                &document.publication_stmt,
                &document.resp_stmt,
                &document.source_desc,
                labels,
                counts.textparts as i64,
                counts.elements as i64,
                counts.tokens as i64,
                now_utc_string(),
            ],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Duplicate(document.urn.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn append_textpart(
        &mut self,
        document_urn: &str,
        textpart: &Textpart,
    ) -> Result<i64, StoreError> {
        let location = serde_json::to_string(&textpart.location)?;
        let attributes = if textpart.attributes.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&textpart.attributes)?)
        };

        self.tx.execute(
            "
            INSERT INTO textparts(document_urn, idx, location, n, subtype, type, urn, attributes)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                document_urn,
                textpart.index as i64,
                location,
                &textpart.n,
                &textpart.subtype,
                &textpart.kind,
                &textpart.urn,
                attributes,
            ],
        )?;

        Ok(self.tx.last_insert_rowid())
    }

    fn append_element(
        &mut self,
        textpart_id: i64,
        parent_id: Option<i64>,
        element: &Element,
    ) -> Result<i64, StoreError> {
        let attributes = serde_json::to_string(&element.attributes)?;

        self.tx.execute(
            "
            INSERT INTO elements(textpart_id, parent_id, idx, tagname, urn, attributes)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                textpart_id,
                parent_id,
                element.index as i64,
                &element.tagname,
                &element.urn,
                attributes,
            ],
        )?;

        Ok(self.tx.last_insert_rowid())
    }

    fn append_token(
        &mut self,
        textpart_id: i64,
        element_id: i64,
        position: usize,
        token: &Token,
    ) -> Result<i64, StoreError> {
        self.tx.execute(
            "
            INSERT INTO tokens(textpart_id, element_id, position, text, urn, whitespace)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                textpart_id,
                element_id,
                position as i64,
                &token.text,
                &token.urn,
                token.whitespace,
            ],
        )?;

        Ok(self.tx.last_insert_rowid())
    }

    fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }
}

pub(super) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn to_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS documents (
              id INTEGER PRIMARY KEY,
              urn TEXT NOT NULL UNIQUE,
              source_file TEXT NOT NULL,
              author TEXT,
              title TEXT,
              language TEXT,
              edition_stmt TEXT NOT NULL,
              publication_stmt TEXT,
              resp_stmt TEXT,
              source_desc TEXT NOT NULL,
              textpart_labels TEXT NOT NULL,
              loaded_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS textparts (
              id INTEGER PRIMARY KEY,
              document_urn TEXT NOT NULL,
              idx INTEGER NOT NULL,
              location TEXT NOT NULL,
              n TEXT,
              subtype TEXT,
              type TEXT,
              urn TEXT NOT NULL,
              attributes TEXT,
              FOREIGN KEY(document_urn) REFERENCES documents(urn)
            );

            CREATE TABLE IF NOT EXISTS elements (
              id INTEGER PRIMARY KEY,
              textpart_id INTEGER NOT NULL,
              parent_id INTEGER,
              idx INTEGER NOT NULL,
              tagname TEXT NOT NULL,
              urn TEXT NOT NULL,
              attributes TEXT NOT NULL,
              FOREIGN KEY(textpart_id) REFERENCES textparts(id),
              FOREIGN KEY(parent_id) REFERENCES elements(id)
            );

            CREATE TABLE IF NOT EXISTS tokens (
              id INTEGER PRIMARY KEY,
              textpart_id INTEGER NOT NULL,
              element_id INTEGER NOT NULL,
              position INTEGER NOT NULL,
              text TEXT NOT NULL,
              urn TEXT NOT NULL,
              whitespace INTEGER NOT NULL,
              FOREIGN KEY(textpart_id) REFERENCES textparts(id),
              FOREIGN KEY(element_id) REFERENCES elements(id)
            );
            ",
        )
        .context("failed to create tables")?;

    ensure_column_exists(connection, "documents", "textpart_count INTEGER")?;
    ensure_column_exists(connection, "documents", "element_count INTEGER")?;
    ensure_column_exists(connection, "documents", "token_count INTEGER")?;

    connection
        .execute_batch(
            "
            CREATE INDEX IF NOT EXISTS idx_textparts_document ON textparts(document_urn);
            CREATE INDEX IF NOT EXISTS idx_elements_textpart ON elements(textpart_id);
            CREATE INDEX IF NOT EXISTS idx_elements_parent ON elements(parent_id);
            CREATE INDEX IF NOT EXISTS idx_tokens_element ON tokens(element_id);
            CREATE INDEX IF NOT EXISTS idx_tokens_textpart_urn ON tokens(textpart_id, urn);
            ",
        )
        .context("failed to create indexes")?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

fn ensure_column_exists(
    connection: &Connection,
    table_name: &str,
    column_definition: &str,
) -> Result<()> {
    let Some(column_name) = column_definition.split_whitespace().next() else {
        bail!("invalid column definition: {column_definition}");
    };

    let pragma_sql = format!("PRAGMA table_info({table_name})");
    let mut statement = connection
        .prepare(&pragma_sql)
        .with_context(|| format!("failed to inspect schema for table {table_name}"))?;

    let mut rows = statement.query([])?;
    while let Some(row) = rows.next()? {
        let existing_name: String = row.get(1)?;
        if existing_name == column_name {
            return Ok(());
        }
    }

    let alter_sql = format!("ALTER TABLE {table_name} ADD COLUMN {column_definition}");
    connection
        .execute(&alter_sql, [])
        .with_context(|| format!("failed to add column {column_name} on {table_name}"))?;

    Ok(())
}

#[cfg(test)]
pub(super) fn schema_version(store: &SqliteStore) -> Result<String> {
    let version = store.connection.query_row(
        "SELECT value FROM metadata WHERE key = 'db_schema_version'",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

#[cfg(test)]
pub(super) fn execute_raw(store: &SqliteStore, sql: &str) -> rusqlite::Result<usize> {
    store.connection.execute(sql, [])
}
