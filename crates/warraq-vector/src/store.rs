//! Chunk store trait and query types.

use async_trait::async_trait;
use uuid::Uuid;
use warraq_core::Result;
use warraq_core::types::Chunk;

/// A similarity query restricted to a document corpus.
///
/// The restriction is part of the query itself — it is applied inside the
/// backend's search, never as a post-hoc filter, so results can never leak
/// chunks from documents outside the corpus.
#[derive(Debug, Clone)]
pub struct VectorQuery {
    /// Query embedding.
    pub embedding: Vec<f32>,

    /// Documents the search is restricted to. Empty means no results.
    pub document_ids: Vec<Uuid>,

    /// Maximum number of chunks to return.
    pub limit: usize,

    /// Similarity floor applied inside the backend, when supported.
    pub min_similarity: Option<f32>,
}

impl VectorQuery {
    /// Creates a query over the given corpus.
    pub fn new(embedding: Vec<f32>, document_ids: Vec<Uuid>, limit: usize) -> Self {
        Self {
            embedding,
            document_ids,
            limit,
            min_similarity: None,
        }
    }

    /// Sets the similarity floor.
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = Some(min_similarity);
        self
    }
}

/// Vector datastore boundary for chunks.
///
/// A chunk's text and embedding travel together through `upsert` — one call
/// is the atomic unit, so the two never drift apart. Concurrent upserts of
/// the same chunk id converge on the later write; no locking is provided.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Inserts or overwrites chunks by id.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Searches for the most similar chunks within the query's corpus.
    ///
    /// Returned chunks carry their similarity score and are ordered best
    /// first. Embeddings are not loaded on the way back.
    async fn search(&self, query: &VectorQuery) -> Result<Vec<Chunk>>;

    /// Lists up to `limit` chunks of one document, for maintenance sweeps.
    async fn list_document(&self, document_id: Uuid, limit: usize) -> Result<Vec<Chunk>>;

    /// Deletes every chunk of a document.
    async fn delete_document(&self, document_id: Uuid) -> Result<()>;
}
