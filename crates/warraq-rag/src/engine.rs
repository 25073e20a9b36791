//! Confidence-scored multi-strategy retrieval.

use std::sync::Arc;

use uuid::Uuid;
use warraq_core::types::{Chunk, QueryAnalysis, RetrievalResult, RetrievalStrategy};
use warraq_core::{MIN_CHUNK_CHARACTERS, Result};
use warraq_model::EmbeddingCascade;
use warraq_vector::{ChunkStore, VectorQuery};

use crate::TRACING_TARGET;

/// Weight of vector similarity in the rerank blend.
const RERANK_SIMILARITY_WEIGHT: f32 = 0.7;

/// Weight of keyword overlap in the rerank blend.
const RERANK_KEYWORD_WEIGHT: f32 = 0.3;

/// Retrieval tuning knobs.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Maximum chunks returned to the caller.
    pub max_results: usize,

    /// Candidate pool multiplier when the keyword pass widens the search.
    pub keyword_widening_factor: usize,

    /// Similarity floor; weaker candidates never occupy a result slot.
    pub min_similarity: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: 8,
            keyword_widening_factor: 3,
            min_similarity: 0.25,
        }
    }
}

/// The smart retrieval engine.
///
/// Stateless between calls: a skipped retrieval (follow-up reuse at the
/// caller) leaves no residue here.
#[derive(Clone)]
pub struct RetrievalEngine {
    embedder: EmbeddingCascade,
    store: Arc<dyn ChunkStore>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    /// Creates an engine over the given embedder and chunk store.
    pub fn new(embedder: EmbeddingCascade, store: Arc<dyn ChunkStore>) -> Self {
        Self::with_config(embedder, store, RetrievalConfig::default())
    }

    /// Creates an engine with custom configuration.
    pub fn with_config(
        embedder: EmbeddingCascade,
        store: Arc<dyn ChunkStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieves ranked context for an analyzed query.
    ///
    /// Zero results is a valid outcome, not an error. Chunks only ever come
    /// from the requested `document_ids`.
    pub async fn retrieve(
        &self,
        analysis: &QueryAnalysis,
        document_ids: &[Uuid],
        use_reranking: bool,
        use_keyword_search: bool,
    ) -> Result<RetrievalResult> {
        let strategy = strategy_label(use_keyword_search, use_reranking);

        if document_ids.is_empty() {
            return Ok(RetrievalResult::empty(strategy));
        }

        let embedding = self.embedder.embed(&analysis.expanded_query).await?;

        let limit = if use_keyword_search {
            self.config.max_results * self.config.keyword_widening_factor
        } else {
            self.config.max_results
        };

        let query = VectorQuery::new(embedding, document_ids.to_vec(), limit)
            .with_min_similarity(self.config.min_similarity);

        let candidates = self.store.search(&query).await?;

        // Quality filter before ranking: short or weak chunks never occupy
        // a result slot.
        let mut candidates: Vec<Chunk> = candidates
            .into_iter()
            .filter(|c| {
                c.text.chars().count() >= MIN_CHUNK_CHARACTERS
                    && c.similarity_or_zero() >= self.config.min_similarity
            })
            .collect();

        if use_reranking || use_keyword_search {
            let keywords = &analysis.keywords;
            candidates.sort_by(|a, b| {
                let score_a = self.blended_score(a, keywords, use_keyword_search, use_reranking);
                let score_b = self.blended_score(b, keywords, use_keyword_search, use_reranking);
                score_b
                    .partial_cmp(&score_a)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        } else {
            candidates.sort_by(|a, b| {
                b.similarity_or_zero()
                    .partial_cmp(&a.similarity_or_zero())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        candidates.truncate(self.config.max_results);

        let confidence = confidence_score(&candidates);

        tracing::debug!(
            target: TRACING_TARGET,
            strategy = %strategy,
            results = candidates.len(),
            confidence,
            "retrieval finished"
        );

        Ok(RetrievalResult {
            chunks: candidates,
            strategy,
            confidence,
        })
    }

    /// Blend of similarity and keyword overlap used by the rerank pass.
    fn blended_score(
        &self,
        chunk: &Chunk,
        keywords: &[String],
        use_keyword_search: bool,
        use_reranking: bool,
    ) -> f32 {
        let similarity = chunk.similarity_or_zero();
        if !use_keyword_search && !use_reranking {
            return similarity;
        }

        let keyword = keyword_overlap(&chunk.text, keywords);
        if use_reranking {
            RERANK_SIMILARITY_WEIGHT * similarity + RERANK_KEYWORD_WEIGHT * keyword
        } else {
            // Keyword widening without rerank: similarity leads, keyword
            // overlap only breaks ties among the widened pool.
            similarity + 0.05 * keyword
        }
    }
}

/// Strategy label for the chosen retrieval paths.
fn strategy_label(use_keyword_search: bool, use_reranking: bool) -> RetrievalStrategy {
    match (use_keyword_search, use_reranking) {
        (false, false) => RetrievalStrategy::Vector,
        (true, false) => RetrievalStrategy::VectorKeyword,
        (false, true) => RetrievalStrategy::VectorReranked,
        (true, true) => RetrievalStrategy::VectorKeywordReranked,
    }
}

/// Fraction of keywords that appear in the chunk text, case-insensitive.
fn keyword_overlap(text: &str, keywords: &[String]) -> f32 {
    if keywords.is_empty() {
        return 0.0;
    }
    let lowered = text.to_lowercase();
    let hits = keywords
        .iter()
        .filter(|k| lowered.contains(&k.to_lowercase()))
        .count();
    hits as f32 / keywords.len() as f32
}

/// Advisory confidence from the top similarity scores.
///
/// Monotonic and bounded in [0, 1]: the level of the top three scores
/// carries most of the weight, and a tight cluster among them adds the
/// rest. Never gates results.
pub(crate) fn confidence_score(chunks: &[Chunk]) -> f32 {
    let top: Vec<f32> = chunks
        .iter()
        .take(3)
        .map(Chunk::similarity_or_zero)
        .collect();

    if top.is_empty() {
        return 0.0;
    }

    let mean = top.iter().sum::<f32>() / top.len() as f32;
    let spread = top
        .iter()
        .fold(0.0_f32, |acc, &s| acc.max((s - mean).abs()));

    (0.6 * mean + 0.4 * (1.0 - spread) * mean).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use warraq_core::text::Language;
    use warraq_core::types::QueryType;
    use warraq_model::mock::MockEmbedder;
    use warraq_vector::MemoryChunkStore;

    use super::*;

    const DIMS: usize = 8;

    fn analysis(expanded: &str, keywords: &[&str]) -> QueryAnalysis {
        QueryAnalysis {
            original_query: expanded.to_string(),
            translated_query: None,
            detected_language: Language::En,
            expanded_query: expanded.to_string(),
            query_type: QueryType::Factual,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            is_multi_document_query: false,
        }
    }

    fn engine_with(store: Arc<MemoryChunkStore>) -> RetrievalEngine {
        let embedder =
            EmbeddingCascade::new(vec![Arc::new(MockEmbedder::new("embed", DIMS))]).unwrap();
        RetrievalEngine::with_config(
            embedder,
            store,
            RetrievalConfig {
                max_results: 5,
                keyword_widening_factor: 3,
                min_similarity: 0.0,
            },
        )
    }

    async fn seed(store: &MemoryChunkStore, document_id: Uuid, page: u32, text: &str) -> Chunk {
        let chunk = Chunk::new(
            document_id,
            page,
            0,
            text,
            MockEmbedder::vector_for(text, DIMS),
        );
        store.upsert(std::slice::from_ref(&chunk)).await.unwrap();
        chunk
    }

    #[tokio::test]
    async fn retrieval_never_leaves_the_corpus() {
        let store = Arc::new(MemoryChunkStore::new());
        let inside = Uuid::new_v4();
        let outside = Uuid::new_v4();

        seed(&store, inside, 1, "caravans crossed the desert at dawn").await;
        seed(&store, outside, 1, "caravans crossed the desert at dawn").await;

        let engine = engine_with(store);
        let result = engine
            .retrieve(&analysis("caravans desert", &[]), &[inside], false, false)
            .await
            .unwrap();

        assert!(!result.is_empty());
        assert!(result.chunks.iter().all(|c| c.document_id == inside));
    }

    #[tokio::test]
    async fn empty_corpus_is_a_valid_empty_result() {
        let store = Arc::new(MemoryChunkStore::new());
        let engine = engine_with(store);

        let result = engine
            .retrieve(&analysis("anything", &[]), &[], false, false)
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.strategy, RetrievalStrategy::Vector);
    }

    #[tokio::test]
    async fn zero_matches_is_not_an_error() {
        let store = Arc::new(MemoryChunkStore::new());
        let doc = Uuid::new_v4();
        let engine = engine_with(store);

        let result = engine
            .retrieve(&analysis("anything at all", &[]), &[doc], false, false)
            .await
            .unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn strategy_labels_reflect_contributing_paths() {
        let store = Arc::new(MemoryChunkStore::new());
        let doc = Uuid::new_v4();
        seed(&store, doc, 1, "a page about the history of trade routes").await;
        let engine = engine_with(store);
        let a = analysis("trade routes", &["trade"]);

        for (kw, rerank, expected) in [
            (false, false, RetrievalStrategy::Vector),
            (true, false, RetrievalStrategy::VectorKeyword),
            (false, true, RetrievalStrategy::VectorReranked),
            (true, true, RetrievalStrategy::VectorKeywordReranked),
        ] {
            let result = engine.retrieve(&a, &[doc], rerank, kw).await.unwrap();
            assert_eq!(result.strategy, expected);
        }
    }

    #[tokio::test]
    async fn reranking_promotes_keyword_rich_chunks() {
        let store = Arc::new(MemoryChunkStore::new());
        let doc = Uuid::new_v4();

        // Two chunks; the query text matches the first more closely in
        // vector space, but the second carries every keyword.
        let query = "zakat obligations on merchants";
        seed(&store, doc, 1, "zakat obligations on merchants and nothing").await;
        seed(
            &store,
            doc,
            2,
            "zakat obligations on merchants: gold, silver, and trade goods",
        )
        .await;

        let engine = engine_with(store);
        let with_keywords = analysis(query, &["gold", "silver", "trade"]);

        let reranked = engine
            .retrieve(&with_keywords, &[doc], true, true)
            .await
            .unwrap();

        assert_eq!(reranked.chunks[0].page_number, 2);
    }

    #[tokio::test]
    async fn short_chunks_are_filtered_before_ranking() {
        let store = Arc::new(MemoryChunkStore::new());
        let doc = Uuid::new_v4();

        // Below the persistence minimum; a store may still contain strays.
        let stray = Chunk::new(doc, 1, 0, "tiny", MockEmbedder::vector_for("tiny", DIMS));
        store.upsert(&[stray]).await.unwrap();
        seed(&store, doc, 2, "a chunk of perfectly reasonable length").await;

        let engine = engine_with(store);
        let result = engine
            .retrieve(&analysis("reasonable length", &[]), &[doc], false, false)
            .await
            .unwrap();

        assert_eq!(result.chunks.len(), 1);
        assert_eq!(result.chunks[0].page_number, 2);
    }

    #[test]
    fn confidence_is_bounded_and_monotonic() {
        let doc = Uuid::new_v4();
        let chunk = |s: f32| {
            Chunk::new(doc, 1, 0, "some chunk text here", vec![0.0; DIMS]).with_similarity(s)
        };

        assert_eq!(confidence_score(&[]), 0.0);

        let weak = confidence_score(&[chunk(0.3), chunk(0.25), chunk(0.2)]);
        let strong = confidence_score(&[chunk(0.9), chunk(0.88), chunk(0.85)]);
        assert!(strong > weak);
        assert!((0.0..=1.0).contains(&weak));
        assert!((0.0..=1.0).contains(&strong));

        // A tight cluster beats a scattered one at the same mean.
        let tight = confidence_score(&[chunk(0.7), chunk(0.7), chunk(0.7)]);
        let scattered = confidence_score(&[chunk(0.95), chunk(0.7), chunk(0.45)]);
        assert!(tight > scattered);
    }
}
