//! In-memory chunk store for tests and offline use.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;
use warraq_core::Result;
use warraq_core::types::Chunk;

use crate::store::{ChunkStore, VectorQuery};

/// Chunk store backed by a process-local map with cosine scoring.
///
/// Mirrors the backend contract closely enough to drive the retrieval and
/// correction paths in tests without a running Qdrant.
#[derive(Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<HashMap<Uuid, Chunk>>,
}

impl MemoryChunkStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    /// Returns true when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }

    /// Fetches one chunk by id.
    pub fn get(&self, id: Uuid) -> Option<Chunk> {
        self.chunks.read().get(&id).cloned()
    }
}

/// Cosine similarity between two vectors of equal length.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        let mut map = self.chunks.write();
        for chunk in chunks {
            map.insert(chunk.id, chunk.clone());
        }
        Ok(())
    }

    async fn search(&self, query: &VectorQuery) -> Result<Vec<Chunk>> {
        let map = self.chunks.read();

        let mut scored: Vec<Chunk> = map
            .values()
            .filter(|c| query.document_ids.contains(&c.document_id))
            .map(|c| {
                let similarity = cosine_similarity(&query.embedding, &c.embedding);
                c.clone().with_similarity(similarity)
            })
            .filter(|c| {
                query
                    .min_similarity
                    .is_none_or(|floor| c.similarity_or_zero() >= floor)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity_or_zero()
                .partial_cmp(&a.similarity_or_zero())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(query.limit);
        Ok(scored)
    }

    async fn list_document(&self, document_id: Uuid, limit: usize) -> Result<Vec<Chunk>> {
        let map = self.chunks.read();
        let mut chunks: Vec<Chunk> = map
            .values()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| (c.page_number, c.metadata.chunk_index));
        chunks.truncate(limit);
        Ok(chunks)
    }

    async fn delete_document(&self, document_id: Uuid) -> Result<()> {
        self.chunks
            .write()
            .retain(|_, c| c.document_id != document_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(document_id: Uuid, page: u32, index: u32, embedding: Vec<f32>) -> Chunk {
        Chunk::new(
            document_id,
            page,
            index,
            format!("text of chunk {index} on page {page}"),
            embedding,
        )
    }

    #[tokio::test]
    async fn search_is_scoped_to_requested_documents() {
        let store = MemoryChunkStore::new();
        let in_corpus = Uuid::new_v4();
        let out_of_corpus = Uuid::new_v4();

        store
            .upsert(&[
                chunk(in_corpus, 1, 0, vec![1.0, 0.0]),
                chunk(out_of_corpus, 1, 0, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store
            .search(&VectorQuery::new(vec![1.0, 0.0], vec![in_corpus], 10))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, in_corpus);
    }

    #[tokio::test]
    async fn results_are_ranked_by_similarity() {
        let store = MemoryChunkStore::new();
        let doc = Uuid::new_v4();

        store
            .upsert(&[
                chunk(doc, 1, 0, vec![0.0, 1.0]),
                chunk(doc, 2, 0, vec![1.0, 0.0]),
                chunk(doc, 3, 0, vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let results = store
            .search(&VectorQuery::new(vec![1.0, 0.0], vec![doc], 10))
            .await
            .unwrap();

        let pages: Vec<u32> = results.iter().map(|c| c.page_number).collect();
        assert_eq!(pages, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn similarity_floor_drops_weak_matches() {
        let store = MemoryChunkStore::new();
        let doc = Uuid::new_v4();

        store
            .upsert(&[
                chunk(doc, 1, 0, vec![1.0, 0.0]),
                chunk(doc, 2, 0, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let query =
            VectorQuery::new(vec![1.0, 0.0], vec![doc], 10).with_min_similarity(0.5);
        let results = store.search(&query).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].page_number, 1);
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let store = MemoryChunkStore::new();
        let doc = Uuid::new_v4();

        let mut c = chunk(doc, 1, 0, vec![1.0, 0.0]);
        store.upsert(std::slice::from_ref(&c)).await.unwrap();

        c.apply_correction("the corrected chunk text".into(), vec![0.0, 1.0]);
        store.upsert(std::slice::from_ref(&c)).await.unwrap();

        assert_eq!(store.len(), 1);
        let stored = store.get(c.id).unwrap();
        assert!(stored.corrected);
        assert_eq!(stored.embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn delete_document_removes_all_its_chunks() {
        let store = MemoryChunkStore::new();
        let keep = Uuid::new_v4();
        let drop = Uuid::new_v4();

        store
            .upsert(&[
                chunk(keep, 1, 0, vec![1.0, 0.0]),
                chunk(drop, 1, 0, vec![1.0, 0.0]),
                chunk(drop, 2, 0, vec![0.5, 0.5]),
            ])
            .await
            .unwrap();

        store.delete_document(drop).await.unwrap();

        assert_eq!(store.len(), 1);
        let remaining = store.list_document(keep, 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
