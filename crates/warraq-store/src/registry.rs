//! Document registry over an embedded SQLite database.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;
use warraq_core::types::{Document, EmbeddingStatus};
use warraq_core::{Error, Result};

use crate::TRACING_TARGET;
use crate::schema::SCHEMA_SQL;

/// Registry of uploaded documents and their embedding lifecycle.
///
/// Cheap to clone; the connection is shared. Operations are short local
/// statements, guarded by a mutex rather than a pool.
#[derive(Clone)]
pub struct DocumentRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl DocumentRegistry {
    /// Opens (and migrates) a registry at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| Error::registry(format!("failed to open registry: {e}")))?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory registry, for tests and ephemeral use.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::registry(format!("failed to open registry: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::registry(format!("failed to apply schema: {e}")))?;

        tracing::debug!(target: TRACING_TARGET, "registry opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Registers a new pending document and returns it.
    pub fn register(&self, display_name: impl Into<String>) -> Result<Document> {
        let document = Document::new(display_name);

        self.conn
            .lock()
            .execute(
                "INSERT INTO documents
                    (id, display_name, total_pages, embedding_status,
                     chunks_count, is_selected, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    document.id.to_string(),
                    document.display_name,
                    document.total_pages,
                    document.embedding_status.as_ref(),
                    document.chunks_count,
                    document.is_selected,
                    document.created_at.to_string(),
                ],
            )
            .map_err(|e| Error::registry(format!("failed to register document: {e}")))?;

        tracing::info!(
            target: TRACING_TARGET,
            document_id = %document.id,
            name = %document.display_name,
            "document registered"
        );

        Ok(document)
    }

    /// Fetches a document by id.
    pub fn get(&self, id: Uuid) -> Result<Option<Document>> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, display_name, total_pages, embedding_status,
                        chunks_count, is_selected, created_at
                 FROM documents WHERE id = ?1",
                params![id.to_string()],
                row_to_document,
            )
            .optional()
            .map_err(|e| Error::registry(format!("failed to fetch document: {e}")))
    }

    /// Lists all documents, newest first.
    pub fn list(&self) -> Result<Vec<Document>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, display_name, total_pages, embedding_status,
                        chunks_count, is_selected, created_at
                 FROM documents ORDER BY created_at DESC",
            )
            .map_err(|e| Error::registry(format!("failed to prepare listing: {e}")))?;

        let rows = stmt
            .query_map([], row_to_document)
            .map_err(|e| Error::registry(format!("failed to list documents: {e}")))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::registry(format!("failed to read document row: {e}")))
    }

    /// Ids of all selected documents: the query corpus.
    pub fn selected_ids(&self) -> Result<Vec<Uuid>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id FROM documents WHERE is_selected = 1")
            .map_err(|e| Error::registry(format!("failed to prepare corpus query: {e}")))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| Error::registry(format!("failed to query corpus: {e}")))?;

        let mut ids = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| Error::registry(format!("failed to read corpus row: {e}")))?;
            ids.push(parse_uuid(&raw)?);
        }
        Ok(ids)
    }

    /// Sets the page count, once, from the parsed PDF.
    pub fn set_total_pages(&self, id: Uuid, total_pages: u32) -> Result<()> {
        let changed = self
            .conn
            .lock()
            .execute(
                "UPDATE documents SET total_pages = ?2 WHERE id = ?1",
                params![id.to_string(), total_pages],
            )
            .map_err(|e| Error::registry(format!("failed to set page count: {e}")))?;

        if changed == 0 {
            return Err(Error::registry(format!("unknown document {id}")));
        }
        Ok(())
    }

    /// Transitions the embedding status, enforcing forward monotonicity.
    ///
    /// `chunks_count` is written together with `Completed` so the count and
    /// the terminal status land in one statement.
    pub fn set_status(
        &self,
        id: Uuid,
        status: EmbeddingStatus,
        chunks_count: Option<u32>,
    ) -> Result<()> {
        let current = self
            .get(id)?
            .ok_or_else(|| Error::registry(format!("unknown document {id}")))?
            .embedding_status;

        if !current.can_transition_to(status) {
            return Err(Error::registry(format!(
                "illegal status transition {current} -> {status} for document {id}"
            )));
        }

        match chunks_count {
            Some(count) => self
                .conn
                .lock()
                .execute(
                    "UPDATE documents SET embedding_status = ?2, chunks_count = ?3 WHERE id = ?1",
                    params![id.to_string(), status.as_ref(), count],
                )
                .map_err(|e| Error::registry(format!("failed to update status: {e}")))?,
            None => self
                .conn
                .lock()
                .execute(
                    "UPDATE documents SET embedding_status = ?2 WHERE id = ?1",
                    params![id.to_string(), status.as_ref()],
                )
                .map_err(|e| Error::registry(format!("failed to update status: {e}")))?,
        };

        tracing::debug!(
            target: TRACING_TARGET,
            document_id = %id,
            status = %status,
            "status transition"
        );

        Ok(())
    }

    /// Toggles corpus membership.
    pub fn set_selected(&self, id: Uuid, selected: bool) -> Result<()> {
        let changed = self
            .conn
            .lock()
            .execute(
                "UPDATE documents SET is_selected = ?2 WHERE id = ?1",
                params![id.to_string(), selected],
            )
            .map_err(|e| Error::registry(format!("failed to update selection: {e}")))?;

        if changed == 0 {
            return Err(Error::registry(format!("unknown document {id}")));
        }
        Ok(())
    }

    /// Deletes a document row. The caller is responsible for also deleting
    /// the document's vectors (whole-document deletion is the only path
    /// that removes chunks).
    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let changed = self
            .conn
            .lock()
            .execute(
                "DELETE FROM documents WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(|e| Error::registry(format!("failed to delete document: {e}")))?;

        Ok(changed > 0)
    }
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let id: String = row.get(0)?;
    let status: String = row.get(3)?;
    let created_at: String = row.get(6)?;

    Ok(Document {
        id: Uuid::from_str(&id).unwrap_or_default(),
        display_name: row.get(1)?,
        total_pages: row.get(2)?,
        embedding_status: EmbeddingStatus::from_str(&status)
            .unwrap_or(EmbeddingStatus::Failed),
        chunks_count: row.get(4)?,
        is_selected: row.get(5)?,
        created_at: created_at
            .parse()
            .unwrap_or_else(|_| jiff::Timestamp::UNIX_EPOCH),
    })
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::from_str(raw).map_err(|e| Error::registry(format!("corrupt document id {raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DocumentRegistry {
        DocumentRegistry::open_in_memory().unwrap()
    }

    #[test]
    fn register_and_fetch_round_trip() {
        let registry = registry();
        let doc = registry.register("صحيح البخاري").unwrap();

        let fetched = registry.get(doc.id).unwrap().unwrap();
        assert_eq!(fetched.display_name, "صحيح البخاري");
        assert_eq!(fetched.embedding_status, EmbeddingStatus::Pending);
        assert_eq!(fetched.chunks_count, 0);
        assert!(fetched.is_selected);
    }

    #[test]
    fn status_walks_forward_only() {
        let registry = registry();
        let doc = registry.register("book").unwrap();

        registry
            .set_status(doc.id, EmbeddingStatus::Processing, None)
            .unwrap();
        registry
            .set_status(doc.id, EmbeddingStatus::Completed, Some(42))
            .unwrap();

        let fetched = registry.get(doc.id).unwrap().unwrap();
        assert_eq!(fetched.embedding_status, EmbeddingStatus::Completed);
        assert_eq!(fetched.chunks_count, 42);

        // Terminal states never move again.
        assert!(
            registry
                .set_status(doc.id, EmbeddingStatus::Processing, None)
                .is_err()
        );
    }

    #[test]
    fn pending_cannot_fail_directly() {
        let registry = registry();
        let doc = registry.register("book").unwrap();

        assert!(
            registry
                .set_status(doc.id, EmbeddingStatus::Failed, None)
                .is_err()
        );
    }

    #[test]
    fn failure_is_reachable_from_processing() {
        let registry = registry();
        let doc = registry.register("book").unwrap();

        registry
            .set_status(doc.id, EmbeddingStatus::Processing, None)
            .unwrap();
        registry
            .set_status(doc.id, EmbeddingStatus::Failed, None)
            .unwrap();

        let fetched = registry.get(doc.id).unwrap().unwrap();
        assert_eq!(fetched.embedding_status, EmbeddingStatus::Failed);
    }

    #[test]
    fn corpus_reflects_selection() {
        let registry = registry();
        let a = registry.register("a").unwrap();
        let b = registry.register("b").unwrap();

        registry.set_selected(b.id, false).unwrap();

        let corpus = registry.selected_ids().unwrap();
        assert_eq!(corpus, vec![a.id]);
    }

    #[test]
    fn delete_removes_the_row() {
        let registry = registry();
        let doc = registry.register("book").unwrap();

        assert!(registry.delete(doc.id).unwrap());
        assert!(registry.get(doc.id).unwrap().is_none());
        assert!(!registry.delete(doc.id).unwrap());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.db");

        let doc_id = {
            let registry = DocumentRegistry::open(&path).unwrap();
            registry.register("persistent").unwrap().id
        };

        let registry = DocumentRegistry::open(&path).unwrap();
        let fetched = registry.get(doc_id).unwrap().unwrap();
        assert_eq!(fetched.display_name, "persistent");
    }
}
