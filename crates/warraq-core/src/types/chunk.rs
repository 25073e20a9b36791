//! Chunk types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MIN_CHUNK_CHARACTERS;

/// The atomic retrievable unit: a bounded slice of one page's text together
/// with its embedding.
///
/// Text and embedding are always written together; an embedding must always
/// reflect its co-located text. Chunks are only ever deleted through
/// whole-document deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk identifier.
    pub id: Uuid,

    /// Parent document identifier.
    pub document_id: Uuid,

    /// 1-based page number within the source PDF.
    pub page_number: u32,

    /// The chunk text.
    pub text: String,

    /// Embedding vector of the model's fixed dimensionality.
    pub embedding: Vec<f32>,

    /// Query-time similarity score. Transient, never persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,

    /// Set when the correction loop has rewritten this chunk.
    #[serde(default)]
    pub corrected: bool,

    /// Provenance metadata.
    pub metadata: ChunkMetadata,
}

/// Provenance metadata stored alongside each chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Monotonically increasing chunk index within the page.
    pub chunk_index: u32,

    /// Text length in characters at index time.
    pub length: u32,

    /// When the chunk was embedded and stored.
    pub indexed_at: jiff::Timestamp,
}

impl Chunk {
    /// Creates a new chunk for a document page.
    pub fn new(
        document_id: Uuid,
        page_number: u32,
        chunk_index: u32,
        text: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        let text = text.into();
        let length = text.chars().count() as u32;

        Self {
            id: Uuid::new_v4(),
            document_id,
            page_number,
            text,
            embedding,
            similarity: None,
            corrected: false,
            metadata: ChunkMetadata {
                chunk_index,
                length,
                indexed_at: jiff::Timestamp::now(),
            },
        }
    }

    /// Returns the similarity score, or 0.0 when unscored.
    pub fn similarity_or_zero(&self) -> f32 {
        self.similarity.unwrap_or(0.0)
    }

    /// Sets the transient similarity score.
    pub fn with_similarity(mut self, similarity: f32) -> Self {
        self.similarity = Some(similarity);
        self
    }

    /// Returns true if this chunk satisfies the persistence invariant:
    /// non-empty text of at least the minimum length and a non-empty
    /// embedding.
    pub fn is_persistable(&self) -> bool {
        self.text.chars().count() >= MIN_CHUNK_CHARACTERS && !self.embedding.is_empty()
    }

    /// Replaces text and embedding together after an accepted correction.
    ///
    /// The two never move independently; this is the only mutation path.
    pub fn apply_correction(&mut self, text: String, embedding: Vec<f32>) {
        self.metadata.length = text.chars().count() as u32;
        self.text = text;
        self.embedding = embedding;
        self.corrected = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_chunks_are_not_persistable() {
        let chunk = Chunk::new(Uuid::new_v4(), 1, 0, "too short", vec![0.1; 8]);
        assert!(!chunk.is_persistable());

        let chunk = Chunk::new(Uuid::new_v4(), 1, 0, "long enough text here", vec![0.1; 8]);
        assert!(chunk.is_persistable());
    }

    #[test]
    fn empty_embedding_is_not_persistable() {
        let chunk = Chunk::new(Uuid::new_v4(), 1, 0, "long enough text here", vec![]);
        assert!(!chunk.is_persistable());
    }

    #[test]
    fn correction_rewrites_text_and_embedding_together() {
        let mut chunk = Chunk::new(Uuid::new_v4(), 3, 1, "some original text", vec![0.0; 4]);
        chunk.apply_correction("some corrected text".into(), vec![1.0; 4]);

        assert!(chunk.corrected);
        assert_eq!(chunk.text, "some corrected text");
        assert_eq!(chunk.embedding, vec![1.0; 4]);
        assert_eq!(chunk.metadata.length, 19);
    }
}
