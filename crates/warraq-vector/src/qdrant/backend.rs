//! Qdrant chunk store implementation.

use async_trait::async_trait;
use qdrant_client::Payload;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfig;
use qdrant_client::qdrant::with_payload_selector::SelectorOptions;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointId,
    PointStruct, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use uuid::Uuid;
use warraq_core::types::{Chunk, ChunkMetadata};
use warraq_core::{Error, Result};

use super::QdrantConfig;
use crate::TRACING_TARGET;
use crate::store::{ChunkStore, VectorQuery};

/// Chunk store backed by a Qdrant collection.
///
/// One point per chunk, keyed by chunk id; text and provenance live in the
/// payload so an upsert rewrites text and embedding in a single call.
pub struct QdrantChunkStore {
    client: Qdrant,
    config: QdrantConfig,
}

impl QdrantChunkStore {
    /// Connects to Qdrant.
    pub fn connect(config: QdrantConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.clone())
            .build()
            .map_err(|e| Error::vector_store(format!("failed to connect to qdrant: {e}")))?;

        tracing::debug!(
            target: TRACING_TARGET,
            url = %config.url,
            collection = %config.collection,
            "connected to qdrant"
        );

        Ok(Self { client, config })
    }

    /// Ensures the collection exists, creating it with cosine distance.
    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.config.collection)
            .await
            .map_err(|e| Error::vector_store(e.to_string()))?;

        if !exists {
            let vectors_config = VectorsConfig::Params(
                VectorParamsBuilder::new(dimensions as u64, Distance::Cosine).build(),
            );

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.config.collection)
                        .vectors_config(vectors_config),
                )
                .await
                .map_err(|e| Error::vector_store(e.to_string()))?;

            tracing::info!(
                target: TRACING_TARGET,
                collection = %self.config.collection,
                dimensions,
                "created qdrant collection"
            );
        }

        Ok(())
    }

    /// OR-filter matching any of the given document ids.
    fn corpus_filter(document_ids: &[Uuid]) -> Filter {
        Filter::should(
            document_ids
                .iter()
                .map(|id| Condition::matches("document_id", id.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    /// Extracts a point id as a chunk uuid.
    fn point_uuid(id: Option<PointId>) -> Option<Uuid> {
        use qdrant_client::qdrant::point_id::PointIdOptions;

        match id?.point_id_options? {
            PointIdOptions::Uuid(s) => Uuid::parse_str(&s).ok(),
            PointIdOptions::Num(_) => None,
        }
    }
}

/// Builds the payload stored alongside a chunk's vector.
fn chunk_payload(chunk: &Chunk) -> Result<Payload> {
    let value = serde_json::json!({
        "document_id": chunk.document_id.to_string(),
        "page_number": chunk.page_number,
        "text": chunk.text,
        "corrected": chunk.corrected,
        "chunk_index": chunk.metadata.chunk_index,
        "length": chunk.metadata.length,
        "indexed_at": chunk.metadata.indexed_at.to_string(),
    });

    Payload::try_from(value).map_err(|e| Error::vector_store(format!("invalid payload: {e}")))
}

/// Rebuilds a chunk from a point's payload.
///
/// The embedding is not loaded on the way back; retrieval consumers only
/// need text, provenance, and the similarity score.
fn payload_chunk(
    id: Uuid,
    payload: &std::collections::HashMap<String, qdrant_client::qdrant::Value>,
    similarity: Option<f32>,
) -> Option<Chunk> {
    let document_id = Uuid::parse_str(payload.get("document_id")?.as_str()?).ok()?;
    let page_number = payload.get("page_number")?.as_integer()? as u32;
    let text = payload.get("text")?.as_str()?.to_string();
    let corrected = payload
        .get("corrected")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let chunk_index = payload
        .get("chunk_index")
        .and_then(|v| v.as_integer())
        .unwrap_or(0) as u32;
    let length = payload
        .get("length")
        .and_then(|v| v.as_integer())
        .unwrap_or(text.chars().count() as i64) as u32;
    let indexed_at = payload
        .get("indexed_at")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(jiff::Timestamp::UNIX_EPOCH);

    Some(Chunk {
        id,
        document_id,
        page_number,
        text,
        embedding: Vec::new(),
        similarity,
        corrected,
        metadata: ChunkMetadata {
            chunk_index,
            length,
            indexed_at,
        },
    })
}

#[async_trait]
impl ChunkStore for QdrantChunkStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        let Some(first) = chunks.first() else {
            return Ok(());
        };

        self.ensure_collection(first.embedding.len()).await?;

        let points = chunks
            .iter()
            .map(|chunk| {
                let payload = chunk_payload(chunk)?;
                Ok(PointStruct::new(
                    chunk.id.to_string(),
                    chunk.embedding.clone(),
                    payload,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.config.collection, points))
            .await
            .map_err(|e| Error::vector_store(e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET,
            collection = %self.config.collection,
            count = chunks.len(),
            "upserted chunks"
        );

        Ok(())
    }

    async fn search(&self, query: &VectorQuery) -> Result<Vec<Chunk>> {
        if query.document_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut search = SearchPointsBuilder::new(
            &self.config.collection,
            query.embedding.clone(),
            query.limit as u64,
        )
        .filter(Self::corpus_filter(&query.document_ids))
        .with_payload(SelectorOptions::Enable(true));

        if let Some(floor) = query.min_similarity {
            search = search.score_threshold(floor);
        }

        let response = self
            .client
            .search_points(search)
            .await
            .map_err(|e| Error::vector_store(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = Self::point_uuid(point.id)?;
                payload_chunk(id, &point.payload, Some(point.score))
            })
            .collect())
    }

    async fn list_document(&self, document_id: Uuid, limit: usize) -> Result<Vec<Chunk>> {
        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.config.collection)
                    .filter(Self::corpus_filter(std::slice::from_ref(&document_id)))
                    .limit(limit as u32)
                    .with_payload(SelectorOptions::Enable(true)),
            )
            .await
            .map_err(|e| Error::vector_store(e.to_string()))?;

        let mut chunks: Vec<Chunk> = response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = Self::point_uuid(point.id)?;
                payload_chunk(id, &point.payload, None)
            })
            .collect();

        chunks.sort_by_key(|c| (c.page_number, c.metadata.chunk_index));
        Ok(chunks)
    }

    async fn delete_document(&self, document_id: Uuid) -> Result<()> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.config.collection)
                    .points(Self::corpus_filter(std::slice::from_ref(&document_id))),
            )
            .await
            .map_err(|e| Error::vector_store(e.to_string()))?;

        tracing::info!(
            target: TRACING_TARGET,
            collection = %self.config.collection,
            document_id = %document_id,
            "deleted document chunks"
        );

        Ok(())
    }
}

impl std::fmt::Debug for QdrantChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantChunkStore")
            .field("url", &self.config.url)
            .field("collection", &self.config.collection)
            .finish()
    }
}
