//! The document ingestion pipeline.
//!
//! Per page: native extraction, OCR fallback for scanned or Arabic pages,
//! optional inline correction, overlap chunking, per-chunk embedding with a
//! single backed-off retry on rate limits, and a vector-store upsert. Pages
//! run strictly in sequence so one raster is alive at a time and the fixed
//! inter-page delay can smooth rate-limit pressure.

use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use uuid::Uuid;
use warraq_core::text::{arabic_ratio, corruption::is_corruption_suspect};
use warraq_core::types::{Chunk, EmbeddingStatus};
use warraq_core::{Error, Result};
use warraq_model::{EmbeddingCascade, ModelCascade, Task};
use warraq_store::DocumentRegistry;
use warraq_vector::ChunkStore;

use crate::TRACING_TARGET;
use crate::config::IngestConfig;
use crate::parser::DocumentParser;
use crate::render::PageRenderer;
use crate::splitter::Splitter;

/// Progress event reported after each processed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct IngestProgress {
    /// 1-based page just finished.
    pub page: u32,
    /// Total pages in the document.
    pub total_pages: u32,
    /// Chunks stored so far.
    pub chunks_stored: u32,
}

/// Summary of one document ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct IngestReport {
    /// Pages that yielded at least one chunk.
    pub pages_processed: u32,
    /// Pages skipped because neither extraction path found text.
    pub pages_skipped: u32,
    /// Chunks embedded and stored.
    pub chunks_stored: u32,
    /// Chunks dropped after embedding failed past the retry.
    pub chunks_failed: u32,
}

/// The ingestion pipeline.
pub struct IngestPipeline {
    cascade: ModelCascade,
    embedder: EmbeddingCascade,
    registry: DocumentRegistry,
    store: Arc<dyn ChunkStore>,
    parser: Arc<dyn DocumentParser>,
    renderer: Arc<dyn PageRenderer>,
    splitter: Splitter,
    config: IngestConfig,
}

impl IngestPipeline {
    /// Creates a pipeline over the given services.
    pub fn new(
        cascade: ModelCascade,
        embedder: EmbeddingCascade,
        registry: DocumentRegistry,
        store: Arc<dyn ChunkStore>,
        parser: Arc<dyn DocumentParser>,
        renderer: Arc<dyn PageRenderer>,
        config: IngestConfig,
    ) -> Self {
        let splitter = Splitter::new(
            config.max_chunk_characters,
            config.chunk_overlap_characters,
        );
        Self {
            cascade,
            embedder,
            registry,
            store,
            parser,
            renderer,
            splitter,
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingests a registered document from a PDF on disk.
    ///
    /// `on_progress` fires after each page. A page failing both extraction
    /// paths is skipped; the document fails only when no page yields any
    /// chunk.
    pub async fn embed_document<F>(
        &self,
        document_id: Uuid,
        path: &Path,
        mut on_progress: F,
    ) -> Result<IngestReport>
    where
        F: FnMut(IngestProgress) + Send,
    {
        let bytes = tokio::fs::read(path).await?;

        let pages = match self.parser.page_texts(&bytes) {
            Ok(pages) if !pages.is_empty() => pages,
            Ok(_) => {
                self.registry
                    .set_status(document_id, EmbeddingStatus::Processing, None)?;
                self.registry
                    .set_status(document_id, EmbeddingStatus::Failed, None)?;
                return Err(Error::extraction("document has no pages"));
            }
            Err(error) => {
                // Total extraction failure: we cannot even count pages.
                self.registry
                    .set_status(document_id, EmbeddingStatus::Processing, None)?;
                self.registry
                    .set_status(document_id, EmbeddingStatus::Failed, None)?;
                return Err(error);
            }
        };

        let total_pages = pages.len() as u32;
        self.registry.set_total_pages(document_id, total_pages)?;
        self.registry
            .set_status(document_id, EmbeddingStatus::Processing, None)?;

        tracing::info!(
            target: TRACING_TARGET,
            document_id = %document_id,
            total_pages,
            "ingestion started"
        );

        let mut report = IngestReport::default();

        for (page_index, native_text) in pages.iter().enumerate() {
            let page_number = page_index as u32 + 1;

            match self
                .process_page(document_id, path, page_number, native_text)
                .await
            {
                Ok((stored, failed)) if stored > 0 => {
                    report.pages_processed += 1;
                    report.chunks_stored += stored;
                    report.chunks_failed += failed;
                }
                Ok((_, failed)) => {
                    report.pages_skipped += 1;
                    report.chunks_failed += failed;
                    tracing::debug!(
                        target: TRACING_TARGET,
                        document_id = %document_id,
                        page = page_number,
                        "page skipped, no indexable text"
                    );
                }
                Err(error) => {
                    // Extraction errors are page-local.
                    report.pages_skipped += 1;
                    tracing::warn!(
                        target: TRACING_TARGET,
                        document_id = %document_id,
                        page = page_number,
                        error = %error,
                        "page skipped after extraction failure"
                    );
                }
            }

            on_progress(IngestProgress {
                page: page_number,
                total_pages,
                chunks_stored: report.chunks_stored,
            });

            if page_number < total_pages && !self.config.inter_page_delay.is_zero() {
                tokio::time::sleep(self.config.inter_page_delay).await;
            }
        }

        if report.chunks_stored > 0 {
            self.registry.set_status(
                document_id,
                EmbeddingStatus::Completed,
                Some(report.chunks_stored),
            )?;
            tracing::info!(
                target: TRACING_TARGET,
                document_id = %document_id,
                chunks = report.chunks_stored,
                skipped = report.pages_skipped,
                "ingestion completed"
            );
            Ok(report)
        } else {
            self.registry
                .set_status(document_id, EmbeddingStatus::Failed, None)?;
            Err(Error::extraction(format!(
                "no page of {document_id} yielded indexable text"
            )))
        }
    }

    /// Deletes a document everywhere: registry row and vector rows.
    pub async fn delete_document(&self, document_id: Uuid) -> Result<bool> {
        self.store.delete_document(document_id).await?;
        self.registry.delete(document_id)
    }

    /// Processes one page; returns (stored, failed) chunk counts.
    async fn process_page(
        &self,
        document_id: Uuid,
        path: &Path,
        page_number: u32,
        native_text: &str,
    ) -> Result<(u32, u32)> {
        let text = self.page_text(path, page_number, native_text).await?;

        let text = if self.config.correct_inline
            && arabic_ratio(&text) > self.config.arabic_suspect_ratio
            && is_corruption_suspect(&text)
        {
            self.correct_page(&text).await
        } else {
            text
        };

        let pieces = self.splitter.split(&text);
        if pieces.is_empty() {
            return Ok((0, 0));
        }

        let mut chunks: Vec<Chunk> = Vec::with_capacity(pieces.len());
        let mut failed = 0_u32;

        for piece in pieces {
            match self.embed_with_backoff(&piece.text).await {
                Ok(embedding) => {
                    chunks.push(Chunk::new(
                        document_id,
                        page_number,
                        piece.index,
                        piece.text,
                        embedding,
                    ));
                }
                Err(error) => {
                    failed += 1;
                    tracing::warn!(
                        target: TRACING_TARGET,
                        document_id = %document_id,
                        page = page_number,
                        chunk_index = piece.index,
                        error = %error,
                        "chunk dropped after embedding failure"
                    );
                }
            }
        }

        if chunks.is_empty() {
            return Ok((0, failed));
        }

        let stored = chunks.len() as u32;
        self.store.upsert(&chunks).await?;
        Ok((stored, failed))
    }

    /// Chooses the authoritative text for a page.
    ///
    /// OCR runs when native extraction came up short or the page is
    /// suspected Arabic; its output is authoritative when it succeeds. An
    /// OCR failure falls back to whatever native text exists rather than
    /// failing the page outright.
    async fn page_text(
        &self,
        path: &Path,
        page_number: u32,
        native_text: &str,
    ) -> Result<String> {
        let native = native_text.trim();
        let needs_ocr = native.chars().count() < self.config.min_native_characters
            || arabic_ratio(native) > self.config.arabic_suspect_ratio;

        if !needs_ocr {
            return Ok(native.to_string());
        }

        match self.ocr_page(path, page_number).await {
            Ok(ocr_text) => Ok(ocr_text),
            Err(error) if !native.is_empty() => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    page = page_number,
                    error = %error,
                    "ocr failed, keeping native extraction"
                );
                Ok(native.to_string())
            }
            Err(error) => Err(error),
        }
    }

    /// Renders the page and extracts its text through the vision cascade.
    async fn ocr_page(&self, path: &Path, page_number: u32) -> Result<String> {
        let png = self
            .renderer
            .render_page(path, page_number, self.config.render_scale)
            .await?;

        let encoded = BASE64.encode(&png);
        let invocation = self.cascade.invoke(&Task::ocr_page(&encoded)).await?;
        Ok(invocation.into_text())
    }

    /// Inline correction of a suspect Arabic page before chunking.
    ///
    /// Correction exhaustion falls back to the unmodified page text inside
    /// the cascade; this can only improve or preserve the page.
    async fn correct_page(&self, text: &str) -> String {
        let language = warraq_core::text::detect_language(text);
        match self.cascade.invoke(&Task::correct_text(text, language)).await {
            Ok(invocation) => invocation.into_text(),
            Err(_) => text.to_string(),
        }
    }

    /// Embeds one chunk, backing off and retrying once on a rate limit.
    async fn embed_with_backoff(&self, text: &str) -> Result<Vec<f32>> {
        match self.embedder.embed(text).await {
            Err(error) if error.is_rate_limited() => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    backoff_ms = self.config.rate_limit_backoff.as_millis() as u64,
                    "rate limited, backing off before retry"
                );
                tokio::time::sleep(self.config.rate_limit_backoff).await;
                self.embedder.embed(text).await
            }
            result => result,
        }
    }
}
