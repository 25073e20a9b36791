//! Multi-hop reasoning for comparative and complex questions.
//!
//! Runs up to `max_hops` retrieve-then-refine rounds, folding new chunks
//! into an accumulating context. Comparative questions seed per-subject
//! sub-queries from their "between A and B" phrasing; later hops derive a
//! sub-query from the running context through the model cascade. A failed
//! later hop degrades to whatever has been accumulated — the caller falls
//! back to single-hop retrieval only when nothing was retrieved at all.

use std::collections::HashSet;

use uuid::Uuid;
use warraq_core::Result;
use warraq_core::text::Language;
use warraq_core::types::{
    Chunk, QueryAnalysis, RetrievalResult, RetrievalStrategy, group_chunks,
};
use warraq_model::{ModelCascade, Task};

use crate::TRACING_TARGET;
use crate::correction::CorrectionLoop;
use crate::engine::{RetrievalEngine, confidence_score};
use crate::patterns::between_subjects;

/// Word count at which a question starts counting as complex.
const COMPLEX_QUERY_WORDS: usize = 12;

/// Multi-part cues: several question marks or an enumerating conjunction.
fn has_multi_part_cue(query: &str) -> bool {
    let question_marks = query.matches(['?', '؟']).count();
    question_marks > 1
        || query.contains(" and also ")
        || query.contains(" as well as ")
        || query.contains("وكذلك")
        || query.contains("وأيضا")
}

/// Heuristic complexity trigger for multi-hop reasoning.
///
/// Comparative questions always qualify; otherwise length plus a
/// multi-part cue is required. Explicit opt-in still gates execution.
pub fn is_complex_query(analysis: &QueryAnalysis) -> bool {
    if analysis.is_multi_document_query {
        return true;
    }
    let words = analysis.original_query.split_whitespace().count();
    words >= COMPLEX_QUERY_WORDS && has_multi_part_cue(&analysis.original_query)
}

/// Options for one multi-hop run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MultiHopOptions {
    /// Maximum retrieve-then-refine rounds.
    pub max_hops: u32,

    /// Languages of the target documents, used as the correction-language
    /// hint when every document agrees.
    pub document_languages: Vec<Language>,

    /// Language the composite context is formatted in.
    pub response_language: Language,

    /// Run the correction loop over the accumulated chunks.
    pub correct_spelling: bool,

    /// With `correct_spelling`, bypass the corruption pre-filter.
    pub aggressive: bool,
}

impl Default for MultiHopOptions {
    fn default() -> Self {
        Self {
            max_hops: 3,
            document_languages: Vec::new(),
            response_language: Language::Ar,
            correct_spelling: false,
            aggressive: false,
        }
    }
}

impl MultiHopOptions {
    /// One shared document language, when all target documents agree.
    fn shared_document_language(&self) -> Option<Language> {
        match self.document_languages.as_slice() {
            [] => None,
            [first, rest @ ..] => rest.iter().all(|l| l == first).then_some(*first),
        }
    }
}

/// Composite output of a multi-hop run.
#[derive(Debug, Clone)]
pub struct CompositeResult {
    /// Formatted context scaffold in the requested response language.
    pub context: String,

    /// Every distinct chunk the hops accumulated, ranked.
    pub chunks: Vec<Chunk>,

    /// Hops actually executed.
    pub hops_executed: u32,

    /// Advisory confidence over the accumulated chunks.
    pub confidence: f32,
}

impl CompositeResult {
    /// Converts into a plain retrieval result for callers that do not care
    /// about the composite scaffold.
    pub fn into_retrieval_result(self) -> RetrievalResult {
        RetrievalResult {
            chunks: self.chunks,
            strategy: RetrievalStrategy::MultiHop,
            confidence: self.confidence,
        }
    }
}

/// The multi-hop reasoner.
#[derive(Clone)]
pub struct MultiHopReasoner {
    cascade: ModelCascade,
    engine: RetrievalEngine,
    correction: Option<CorrectionLoop>,
}

impl MultiHopReasoner {
    /// Creates a reasoner over the given cascade and retrieval engine.
    pub fn new(cascade: ModelCascade, engine: RetrievalEngine) -> Self {
        Self {
            cascade,
            engine,
            correction: None,
        }
    }

    /// Attaches a correction loop for `correct_spelling` runs.
    pub fn with_correction(mut self, correction: CorrectionLoop) -> Self {
        self.correction = Some(correction);
        self
    }

    /// Executes up to `max_hops` rounds and assembles a composite context.
    ///
    /// Errors only when the very first hop fails; later failures stop the
    /// loop early and return what was accumulated.
    pub async fn reason(
        &self,
        analysis: &QueryAnalysis,
        document_ids: &[Uuid],
        options: &MultiHopOptions,
    ) -> Result<CompositeResult> {
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut accumulated: Vec<Chunk> = Vec::new();
        let mut hops_executed = 0_u32;

        let mut pending: Vec<String> = vec![analysis.expanded_query.clone()];

        // Comparative questions retrieve each compared subject on its own:
        // the blended query often favors whichever book dominates the index.
        if analysis.is_multi_document_query
            && let Some((a, b)) = between_subjects(&analysis.original_query)
        {
            pending.push(a);
            pending.push(b);
        }

        while hops_executed < options.max_hops {
            let sub_query = match pending.pop() {
                Some(query) => query,
                None => match self.derive_sub_query(analysis, &accumulated).await {
                    Some(query) => query,
                    None => break,
                },
            };

            hops_executed += 1;

            let result = match self
                .engine
                .retrieve(&hop_analysis(analysis, &sub_query), document_ids, false, false)
                .await
            {
                Ok(result) => result,
                Err(error) if hops_executed == 1 => return Err(error),
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        hop = hops_executed,
                        error = %error,
                        "hop failed, degrading to accumulated context"
                    );
                    break;
                }
            };

            let fresh: Vec<Chunk> = result
                .chunks
                .into_iter()
                .filter(|c| seen.insert(c.id))
                .collect();

            tracing::debug!(
                target: TRACING_TARGET,
                hop = hops_executed,
                fresh = fresh.len(),
                total = accumulated.len() + fresh.len(),
                "hop finished"
            );

            // A round that adds nothing new ends the loop, unless seeded
            // sub-queries are still waiting their turn.
            if fresh.is_empty() && pending.is_empty() {
                break;
            }

            accumulated.extend(fresh);
        }

        accumulated.sort_by(|a, b| {
            b.similarity_or_zero()
                .partial_cmp(&a.similarity_or_zero())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        if options.correct_spelling
            && let Some(correction) = &self.correction
        {
            let (corrected, report) = correction
                .correct_chunks_batch(
                    accumulated,
                    options.shared_document_language(),
                    options.aggressive,
                )
                .await;
            accumulated = corrected;
            if report.corrected > 0 {
                tracing::info!(
                    target: TRACING_TARGET,
                    corrected = report.corrected,
                    "composite context corrected"
                );
            }
        }

        let confidence = confidence_score(&accumulated);
        let context = compose_context(&accumulated, options.response_language);

        Ok(CompositeResult {
            context,
            chunks: accumulated,
            hops_executed,
            confidence,
        })
    }

    /// Derives the next sub-query from the running context.
    ///
    /// Answer generation has no fallback; a cascade failure here returns
    /// `None` and ends the loop gracefully.
    async fn derive_sub_query(
        &self,
        analysis: &QueryAnalysis,
        accumulated: &[Chunk],
    ) -> Option<String> {
        if accumulated.is_empty() {
            return None;
        }

        let summary: String = accumulated
            .iter()
            .take(3)
            .map(|c| c.text.chars().take(200).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Original question: {}\n\nContext found so far:\n{}\n\n\
             Write one short follow-up search query, in the question's \
             language, that would fill the biggest gap in this context. \
             Return only the query.",
            analysis.original_query, summary
        );

        match self.cascade.invoke(&Task::generate_answer(prompt)).await {
            Ok(invocation) => {
                let query = invocation.into_text();
                // A derived query identical to the original would loop.
                (query != analysis.original_query && !query.is_empty()).then_some(query)
            }
            Err(_) => None,
        }
    }
}

/// Analysis for one hop: the sub-query rides on the original's metadata.
fn hop_analysis(analysis: &QueryAnalysis, sub_query: &str) -> QueryAnalysis {
    QueryAnalysis {
        original_query: analysis.original_query.clone(),
        translated_query: None,
        detected_language: analysis.detected_language,
        expanded_query: sub_query.to_string(),
        query_type: analysis.query_type,
        keywords: analysis.keywords.clone(),
        is_multi_document_query: analysis.is_multi_document_query,
    }
}

/// Formats the accumulated chunks as an attributed context scaffold.
pub(crate) fn compose_context(chunks: &[Chunk], response_language: Language) -> String {
    if chunks.is_empty() {
        return String::new();
    }

    let (source_label, page_label) = match response_language {
        Language::Ar => ("المصدر", "صفحة"),
        Language::En | Language::Mixed => ("Source", "page"),
    };

    let mut sections = Vec::new();
    for group in group_chunks(chunks) {
        for page in &group.pages {
            let heading = format!(
                "[{} {} — {} {}]",
                source_label, group.document_id, page_label, page.page_number
            );
            let body: Vec<&str> = page.chunks.iter().map(|c| c.text.as_str()).collect();
            sections.push(format!("{}\n{}", heading, body.join("\n")));
        }
    }
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use warraq_core::types::QueryType;
    use warraq_model::mock::{MockEmbedder, MockModel};
    use warraq_model::{EmbeddingCascade, TextModel};
    use warraq_vector::{ChunkStore, MemoryChunkStore};

    use super::*;

    const DIMS: usize = 8;

    fn analysis(query: &str, comparative: bool) -> QueryAnalysis {
        QueryAnalysis {
            original_query: query.to_string(),
            translated_query: None,
            detected_language: Language::En,
            expanded_query: query.to_string(),
            query_type: if comparative {
                QueryType::Comparative
            } else {
                QueryType::Factual
            },
            keywords: Vec::new(),
            is_multi_document_query: comparative,
        }
    }

    async fn seed(store: &MemoryChunkStore, doc: Uuid, page: u32, text: &str) {
        let chunk = Chunk::new(doc, page, 0, text, MockEmbedder::vector_for(text, DIMS));
        store.upsert(std::slice::from_ref(&chunk)).await.unwrap();
    }

    fn reasoner_with(
        store: Arc<MemoryChunkStore>,
        models: Vec<Arc<dyn TextModel>>,
    ) -> MultiHopReasoner {
        let cascade = ModelCascade::new(models).unwrap();
        let embedder =
            EmbeddingCascade::new(vec![Arc::new(MockEmbedder::new("embed", DIMS))]).unwrap();
        let engine = RetrievalEngine::with_config(
            embedder,
            store,
            crate::engine::RetrievalConfig {
                max_results: 5,
                keyword_widening_factor: 3,
                min_similarity: 0.0,
            },
        );
        MultiHopReasoner::new(cascade, engine)
    }

    #[test]
    fn comparative_queries_are_complex() {
        assert!(is_complex_query(&analysis("compare A and B", true)));
        assert!(!is_complex_query(&analysis("when was it written?", false)));
    }

    #[test]
    fn long_multi_part_queries_are_complex() {
        let q = "What does the first book say about trade? \
                 and what does it say about travel?";
        assert!(is_complex_query(&analysis(q, false)));
    }

    #[tokio::test]
    async fn comparative_question_retrieves_each_subject() {
        let store = Arc::new(MemoryChunkStore::new());
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();

        seed(&store, doc_a, 1, "Sahih Bukhari collects rigorously verified reports").await;
        seed(&store, doc_b, 1, "Sahih Muslim arranges reports by subject matter").await;

        let reasoner = reasoner_with(store, vec![Arc::new(MockModel::failing("dead"))]);

        let result = reasoner
            .reason(
                &analysis(
                    "What is common between Sahih Bukhari and Sahih Muslim?",
                    true,
                ),
                &[doc_a, doc_b],
                &MultiHopOptions {
                    max_hops: 3,
                    response_language: Language::En,
                    ..MultiHopOptions::default()
                },
            )
            .await
            .unwrap();

        // Both documents contribute to the composite.
        let docs: HashSet<Uuid> = result.chunks.iter().map(|c| c.document_id).collect();
        assert!(docs.contains(&doc_a) && docs.contains(&doc_b));
        assert_eq!(result.hops_executed, 3);
        assert!(result.context.contains("Source"));
    }

    #[tokio::test]
    async fn derived_sub_queries_extend_the_context() {
        let store = Arc::new(MemoryChunkStore::new());
        let doc = Uuid::new_v4();

        seed(&store, doc, 1, "the first chapter discusses the etiquette of travel").await;
        seed(&store, doc, 9, "the final chapter lists the provisions for a caravan").await;

        // The deriving model asks for the missing half.
        let reasoner = reasoner_with(
            store,
            vec![Arc::new(MockModel::succeeding(
                "deriver",
                "provisions for a caravan",
            ))],
        );

        let result = reasoner
            .reason(
                &analysis("what is the etiquette of travel?", false),
                &[doc],
                &MultiHopOptions {
                    max_hops: 2,
                    response_language: Language::En,
                    ..MultiHopOptions::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result.hops_executed, 2);
        let pages: HashSet<u32> = result.chunks.iter().map(|c| c.page_number).collect();
        assert!(pages.contains(&1) && pages.contains(&9));
    }

    #[tokio::test]
    async fn sub_query_derivation_failure_degrades_gracefully() {
        let store = Arc::new(MemoryChunkStore::new());
        let doc = Uuid::new_v4();
        seed(&store, doc, 1, "a lone page about the etiquette of travel").await;

        // Derivation model is dead: the run stops after the first hop with
        // the first hop's chunks intact.
        let reasoner = reasoner_with(store, vec![Arc::new(MockModel::failing("dead"))]);

        let result = reasoner
            .reason(
                &analysis("what is the etiquette of travel?", false),
                &[doc],
                &MultiHopOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.hops_executed, 1);
        assert!(!result.chunks.is_empty());
    }

    #[tokio::test]
    async fn empty_corpus_yields_empty_composite() {
        let store = Arc::new(MemoryChunkStore::new());
        let reasoner = reasoner_with(store, vec![Arc::new(MockModel::failing("dead"))]);

        let result = reasoner
            .reason(
                &analysis("anything", false),
                &[Uuid::new_v4()],
                &MultiHopOptions::default(),
            )
            .await
            .unwrap();

        assert!(result.chunks.is_empty());
        assert!(result.context.is_empty());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn context_headers_follow_the_response_language() {
        let doc = Uuid::new_v4();
        let chunk = Chunk::new(doc, 4, 0, "نص عربي للتجربة والاختبار", vec![0.0; DIMS])
            .with_similarity(0.9);

        let arabic = compose_context(std::slice::from_ref(&chunk), Language::Ar);
        assert!(arabic.contains("المصدر"));
        assert!(arabic.contains("صفحة"));

        let english = compose_context(std::slice::from_ref(&chunk), Language::En);
        assert!(english.contains("Source"));
        assert!(english.contains("page 4"));
    }
}
