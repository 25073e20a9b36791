//! SQLite schema for the document registry.

/// Registry schema, applied idempotently on open.
pub(crate) const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id               TEXT PRIMARY KEY,
    display_name     TEXT NOT NULL,
    total_pages      INTEGER NOT NULL DEFAULT 0,
    embedding_status TEXT NOT NULL DEFAULT 'pending',
    chunks_count     INTEGER NOT NULL DEFAULT 0,
    is_selected      INTEGER NOT NULL DEFAULT 1,
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_selected
    ON documents (is_selected);
";
