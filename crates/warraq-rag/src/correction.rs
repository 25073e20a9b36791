//! The correction and validation loop.
//!
//! Repairs OCR corruption in stored chunks under strict acceptance bounds.
//! The regex battery is a cheap pre-filter: a chunk that raises no signal
//! costs zero model calls. An accepted correction rewrites text and
//! embedding together in a single upsert; a rejected or failed correction
//! leaves the original untouched — data is never degraded here.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;
use warraq_core::text::{Language, corruption::is_corruption_suspect, detect_language};
use warraq_core::Result;
use warraq_core::types::Chunk;
use warraq_model::{EmbeddingCascade, Invocation, ModelCascade, Task};
use warraq_vector::ChunkStore;

use crate::TRACING_TARGET;

/// Correction loop tuning knobs.
#[derive(Debug, Clone)]
pub struct CorrectionConfig {
    /// Chunks per maintenance batch.
    pub batch_size: usize,

    /// Delay between maintenance batches.
    pub inter_batch_delay: Duration,

    /// Upper bound on chunks examined per document sweep.
    pub sweep_limit: usize,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            inter_batch_delay: Duration::from_secs(3),
            sweep_limit: 1000,
        }
    }
}

/// Outcome summary of a maintenance sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SweepReport {
    /// Chunks examined.
    pub scanned: u32,
    /// Chunks the pattern battery flagged as candidates.
    pub candidates: u32,
    /// Corrections accepted and persisted.
    pub corrected: u32,
    /// Per-chunk failures (counted, never aborting the sweep).
    pub failed: u32,
}

/// The correction and validation loop.
#[derive(Clone)]
pub struct CorrectionLoop {
    cascade: ModelCascade,
    embedder: EmbeddingCascade,
    store: Arc<dyn ChunkStore>,
    config: CorrectionConfig,
}

impl CorrectionLoop {
    /// Creates a correction loop over the given services.
    pub fn new(
        cascade: ModelCascade,
        embedder: EmbeddingCascade,
        store: Arc<dyn ChunkStore>,
    ) -> Self {
        Self::with_config(cascade, embedder, store, CorrectionConfig::default())
    }

    /// Creates a correction loop with custom configuration.
    pub fn with_config(
        cascade: ModelCascade,
        embedder: EmbeddingCascade,
        store: Arc<dyn ChunkStore>,
        config: CorrectionConfig,
    ) -> Self {
        Self {
            cascade,
            embedder,
            store,
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    /// Corrects one chunk if it is a candidate.
    ///
    /// Returns the corrected chunk when a correction was accepted and
    /// persisted, `None` when the chunk was left untouched (not a
    /// candidate, or every model's output failed validation). `aggressive`
    /// bypasses the pattern pre-filter.
    pub async fn correct_chunk(
        &self,
        chunk: &Chunk,
        language: Option<Language>,
        aggressive: bool,
    ) -> Result<Option<Chunk>> {
        if !aggressive && !is_corruption_suspect(&chunk.text) {
            // Round-trip guarantee: clean chunks cost zero model calls.
            return Ok(None);
        }

        let language = language.unwrap_or_else(|| detect_language(&chunk.text));

        let corrected_text = match self
            .cascade
            .invoke(&Task::correct_text(&chunk.text, language))
            .await?
        {
            Invocation::Model { text, model } => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    chunk_id = %chunk.id,
                    model = %model,
                    "correction accepted"
                );
                text
            }
            // Exhaustion fallback is the original text: keep the chunk.
            Invocation::Fallback { .. } => return Ok(None),
        };

        if corrected_text == chunk.text {
            return Ok(None);
        }

        // Re-embed and rewrite text + embedding in one upsert so the two
        // never drift apart. Concurrent sweeps racing on the same chunk id
        // converge on the later write.
        let embedding = self.embedder.embed(&corrected_text).await?;

        let mut corrected = chunk.clone();
        corrected.apply_correction(corrected_text, embedding);
        self.store.upsert(std::slice::from_ref(&corrected)).await?;

        Ok(Some(corrected))
    }

    /// Corrects a batch of chunks, returning the updated set.
    ///
    /// Chunks that were not corrected come back unchanged. Per-chunk
    /// failures are logged and counted; the batch never aborts.
    pub async fn correct_chunks_batch(
        &self,
        chunks: Vec<Chunk>,
        language: Option<Language>,
        aggressive: bool,
    ) -> (Vec<Chunk>, SweepReport) {
        let mut report = SweepReport::default();
        let mut output = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            report.scanned += 1;
            if aggressive || is_corruption_suspect(&chunk.text) {
                report.candidates += 1;
            }

            match self.correct_chunk(&chunk, language, aggressive).await {
                Ok(Some(corrected)) => {
                    report.corrected += 1;
                    output.push(corrected);
                }
                Ok(None) => output.push(chunk),
                Err(error) => {
                    report.failed += 1;
                    tracing::warn!(
                        target: TRACING_TARGET,
                        chunk_id = %chunk.id,
                        error = %error,
                        "chunk correction failed, original retained"
                    );
                    output.push(chunk);
                }
            }
        }

        (output, report)
    }

    /// Maintenance sweep over one document's stored chunks.
    ///
    /// Processes small batches with an inter-batch delay to respect
    /// external rate limits.
    pub async fn sweep_document(
        &self,
        document_id: Uuid,
        aggressive: bool,
    ) -> Result<SweepReport> {
        let chunks = self
            .store
            .list_document(document_id, self.config.sweep_limit)
            .await?;

        if chunks.is_empty() {
            return Ok(SweepReport::default());
        }

        tracing::info!(
            target: TRACING_TARGET,
            document_id = %document_id,
            chunks = chunks.len(),
            "correction sweep started"
        );

        let mut report = SweepReport::default();
        let batch_size = self.config.batch_size.max(1);
        let batches = chunks.chunks(batch_size).map(<[Chunk]>::to_vec);
        let total_batches = chunks.len().div_ceil(batch_size);

        for (batch_index, batch) in batches.enumerate() {
            let (_, batch_report) = self.correct_chunks_batch(batch, None, aggressive).await;

            report.scanned += batch_report.scanned;
            report.candidates += batch_report.candidates;
            report.corrected += batch_report.corrected;
            report.failed += batch_report.failed;

            if batch_index + 1 < total_batches && !self.config.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.config.inter_batch_delay).await;
            }
        }

        tracing::info!(
            target: TRACING_TARGET,
            document_id = %document_id,
            corrected = report.corrected,
            failed = report.failed,
            "correction sweep finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use warraq_model::mock::{MockEmbedder, MockModel};
    use warraq_vector::MemoryChunkStore;

    use super::*;

    const DIMS: usize = 8;

    /// Arabic text the battery flags (doubled alef) with a clean twin.
    const CORRUPT: &str = "ذكر المؤرخ أن االكتاب المذكور وصل من بغداد في موسم الحج";
    const CLEAN: &str = "ذكر المؤرخ أن الكتاب المذكور وصل من بغداد في موسم الحج";

    fn corrupt_chunk(document_id: Uuid) -> Chunk {
        Chunk::new(
            document_id,
            1,
            0,
            CORRUPT,
            MockEmbedder::vector_for(CORRUPT, DIMS),
        )
    }

    fn loop_with(model: MockModel, store: Arc<MemoryChunkStore>) -> CorrectionLoop {
        let cascade = ModelCascade::new(vec![Arc::new(model)]).unwrap();
        let embedder =
            EmbeddingCascade::new(vec![Arc::new(MockEmbedder::new("embed", DIMS))]).unwrap();
        CorrectionLoop::with_config(
            cascade,
            embedder,
            store,
            CorrectionConfig {
                batch_size: 5,
                inter_batch_delay: Duration::ZERO,
                sweep_limit: 1000,
            },
        )
    }

    #[tokio::test]
    async fn clean_chunk_costs_zero_model_calls() {
        let store = Arc::new(MemoryChunkStore::new());
        let model = MockModel::succeeding("fixer", CLEAN);
        let calls = model.call_count();
        let correction = loop_with(model, store.clone());

        let doc = Uuid::new_v4();
        let chunk = Chunk::new(doc, 1, 0, CLEAN, MockEmbedder::vector_for(CLEAN, DIMS));
        store.upsert(std::slice::from_ref(&chunk)).await.unwrap();

        let result = correction.correct_chunk(&chunk, None, false).await.unwrap();

        assert!(result.is_none());
        assert_eq!(calls.get(), 0);
        // Text and embedding untouched.
        let stored = store.get(chunk.id).unwrap();
        assert_eq!(stored.text, CLEAN);
        assert!(!stored.corrected);
    }

    #[tokio::test]
    async fn accepted_correction_rewrites_text_and_embedding_together() {
        let store = Arc::new(MemoryChunkStore::new());
        let correction = loop_with(MockModel::succeeding("fixer", CLEAN), store.clone());

        let chunk = corrupt_chunk(Uuid::new_v4());
        store.upsert(std::slice::from_ref(&chunk)).await.unwrap();
        let original_embedding = chunk.embedding.clone();

        let corrected = correction
            .correct_chunk(&chunk, None, false)
            .await
            .unwrap()
            .expect("correction should be accepted");

        assert_eq!(corrected.text, CLEAN);
        assert!(corrected.corrected);
        assert_ne!(corrected.embedding, original_embedding);

        let stored = store.get(chunk.id).unwrap();
        assert_eq!(stored.text, CLEAN);
        assert!(stored.corrected);
        assert_eq!(stored.embedding, corrected.embedding);
    }

    #[tokio::test]
    async fn out_of_bounds_correction_is_never_persisted() {
        let store = Arc::new(MemoryChunkStore::new());
        // The model's output doubles the length: validation rejects it and
        // the cascade falls back to the original.
        let oversized = format!("{CORRUPT} {CORRUPT}");
        let correction = loop_with(MockModel::succeeding("fixer", oversized), store.clone());

        let chunk = corrupt_chunk(Uuid::new_v4());
        store.upsert(std::slice::from_ref(&chunk)).await.unwrap();

        let result = correction.correct_chunk(&chunk, None, false).await.unwrap();

        assert!(result.is_none());
        let stored = store.get(chunk.id).unwrap();
        assert_eq!(stored.text, CORRUPT);
        assert!(!stored.corrected);
    }

    #[tokio::test]
    async fn model_failure_keeps_the_original() {
        let store = Arc::new(MemoryChunkStore::new());
        let correction = loop_with(MockModel::failing("dead"), store.clone());

        let chunk = corrupt_chunk(Uuid::new_v4());
        store.upsert(std::slice::from_ref(&chunk)).await.unwrap();

        let result = correction.correct_chunk(&chunk, None, false).await.unwrap();

        assert!(result.is_none());
        assert_eq!(store.get(chunk.id).unwrap().text, CORRUPT);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_processes_batches_and_reports() {
        let store = Arc::new(MemoryChunkStore::new());
        let correction = loop_with(MockModel::succeeding("fixer", CLEAN), store.clone());

        let doc = Uuid::new_v4();
        // Seven chunks: two batches of five and two. One is corrupt.
        for i in 0..7 {
            let text = if i == 3 {
                CORRUPT.to_string()
            } else {
                format!("{CLEAN} رقم {i}")
            };
            let chunk = Chunk::new(doc, 1, i, &text, MockEmbedder::vector_for(&text, DIMS));
            store.upsert(std::slice::from_ref(&chunk)).await.unwrap();
        }

        let report = correction.sweep_document(doc, false).await.unwrap();

        assert_eq!(report.scanned, 7);
        assert_eq!(report.candidates, 1);
        assert_eq!(report.corrected, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn batch_failures_are_counted_not_fatal() {
        let store = Arc::new(MemoryChunkStore::new());
        // The model accepts, but embedding the corrected text fails, so
        // persisting the correction errors per-chunk.
        let cascade =
            ModelCascade::new(vec![Arc::new(MockModel::succeeding("fixer", CLEAN))]).unwrap();
        let embedder =
            EmbeddingCascade::new(vec![Arc::new(MockEmbedder::failing("embed", DIMS))]).unwrap();
        let correction = CorrectionLoop::with_config(
            cascade,
            embedder,
            store.clone(),
            CorrectionConfig {
                batch_size: 5,
                inter_batch_delay: Duration::ZERO,
                sweep_limit: 1000,
            },
        );

        let chunk = corrupt_chunk(Uuid::new_v4());
        let (output, report) = correction
            .correct_chunks_batch(vec![chunk.clone()], None, false)
            .await;

        assert_eq!(report.failed, 1);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].text, CORRUPT);
    }
}
