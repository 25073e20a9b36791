//! High-level RAG service facade.

use std::sync::Arc;

use uuid::Uuid;
use warraq_core::Result;
use warraq_core::text::Language;
use warraq_core::types::{DocumentGroup, QueryAnalysis, RetrievalResult, group_chunks};
use warraq_model::{EmbeddingCascade, ModelCascade};
use warraq_vector::ChunkStore;

use crate::analyzer::QueryAnalyzer;
use crate::correction::{CorrectionLoop, SweepReport};
use crate::engine::{RetrievalConfig, RetrievalEngine};
use crate::followup::FollowUpDetector;
use crate::multihop::{CompositeResult, MultiHopOptions, MultiHopReasoner, is_complex_query};

/// The question-answering core, assembled.
///
/// Owns the analyzer, retrieval engine, correction loop, follow-up
/// detector, and multi-hop reasoner over shared cascades and one chunk
/// store. Cheap to clone.
#[derive(Clone)]
pub struct RagService {
    analyzer: QueryAnalyzer,
    engine: RetrievalEngine,
    correction: CorrectionLoop,
    reasoner: MultiHopReasoner,
    followup: FollowUpDetector,
}

impl RagService {
    /// Assembles the service over the given cascades and store.
    pub fn new(
        cascade: ModelCascade,
        embedder: EmbeddingCascade,
        store: Arc<dyn ChunkStore>,
    ) -> Self {
        Self::with_retrieval_config(cascade, embedder, store, RetrievalConfig::default())
    }

    /// Assembles the service with custom retrieval configuration.
    pub fn with_retrieval_config(
        cascade: ModelCascade,
        embedder: EmbeddingCascade,
        store: Arc<dyn ChunkStore>,
        config: RetrievalConfig,
    ) -> Self {
        let analyzer = QueryAnalyzer::new(cascade.clone());
        let engine = RetrievalEngine::with_config(embedder.clone(), store.clone(), config);
        let correction = CorrectionLoop::new(cascade.clone(), embedder, store);
        let reasoner =
            MultiHopReasoner::new(cascade, engine.clone()).with_correction(correction.clone());

        Self {
            analyzer,
            engine,
            correction,
            reasoner,
            followup: FollowUpDetector::new(),
        }
    }

    /// Analyzes a query against the target document language.
    pub async fn analyze_query(
        &self,
        query: &str,
        document_language: Language,
    ) -> Result<QueryAnalysis> {
        self.analyzer.analyze(query, document_language).await
    }

    /// Retrieves ranked, attributed context for an analyzed query.
    pub async fn retrieve_smart_context(
        &self,
        analysis: &QueryAnalysis,
        document_ids: &[Uuid],
        use_reranking: bool,
        use_keyword_search: bool,
    ) -> Result<RetrievalResult> {
        self.engine
            .retrieve(analysis, document_ids, use_reranking, use_keyword_search)
            .await
    }

    /// Multi-hop reasoning with graceful degradation to single-hop.
    ///
    /// Runs multi-hop only for complex queries; simple ones, and any
    /// multi-hop failure, go through the single-hop engine instead.
    pub async fn perform_multi_hop_reasoning(
        &self,
        analysis: &QueryAnalysis,
        document_ids: &[Uuid],
        options: &MultiHopOptions,
    ) -> Result<CompositeResult> {
        if is_complex_query(analysis) {
            match self.reasoner.reason(analysis, document_ids, options).await {
                Ok(result) if !result.chunks.is_empty() => return Ok(result),
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(
                        target: crate::TRACING_TARGET,
                        error = %error,
                        "multi-hop failed, falling back to single-hop"
                    );
                }
            }
        }

        let single = self
            .engine
            .retrieve(analysis, document_ids, false, true)
            .await?;

        Ok(CompositeResult {
            context: crate::multihop::compose_context(&single.chunks, options.response_language),
            chunks: single.chunks,
            hops_executed: 1,
            confidence: single.confidence,
        })
    }

    /// Correction maintenance over a batch of chunks.
    pub async fn correct_chunks_batch(
        &self,
        chunks: Vec<warraq_core::types::Chunk>,
        language: Option<Language>,
        aggressive: bool,
    ) -> (Vec<warraq_core::types::Chunk>, SweepReport) {
        self.correction
            .correct_chunks_batch(chunks, language, aggressive)
            .await
    }

    /// Correction maintenance sweep over one document.
    pub async fn sweep_document(&self, document_id: Uuid, aggressive: bool) -> Result<SweepReport> {
        self.correction.sweep_document(document_id, aggressive).await
    }

    /// Returns true when `query` continues the previous turn and the last
    /// context can be reused without touching the engine.
    pub fn is_follow_up(&self, query: &str, previous_query: Option<&str>) -> bool {
        self.followup.is_follow_up(query, previous_query)
    }

    /// Groups a result's chunks by document and page for presentation.
    pub fn group_results(&self, result: &RetrievalResult) -> Vec<DocumentGroup> {
        group_chunks(&result.chunks)
    }
}
