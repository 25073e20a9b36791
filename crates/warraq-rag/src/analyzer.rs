//! Cross-lingual query analysis.

use warraq_core::Result;
use warraq_core::text::{Language, detect_language};
use warraq_core::types::{QueryAnalysis, QueryType};
use warraq_model::{Invocation, ModelCascade, Task, parse_keywords, parse_query_type};

use crate::TRACING_TARGET;
use crate::patterns::is_comparative_query;

/// Analyzes user questions before retrieval: language routing, intent
/// classification, comparative detection, and keyword expansion.
#[derive(Clone)]
pub struct QueryAnalyzer {
    cascade: ModelCascade,
}

impl QueryAnalyzer {
    /// Creates an analyzer over the given cascade.
    pub fn new(cascade: ModelCascade) -> Self {
        Self { cascade }
    }

    /// Analyzes a query against the target document language.
    ///
    /// Translation runs only when the query language differs from the
    /// document language and is not mixed. The comparative pattern matcher
    /// runs unconditionally and force-overrides the model classification:
    /// it is cheap, reliable signal the model sometimes misses.
    pub async fn analyze(
        &self,
        query: &str,
        document_language: Language,
    ) -> Result<QueryAnalysis> {
        let detected_language = detect_language(query);

        let translated_query = if detected_language != Language::Mixed
            && detected_language != document_language
        {
            match self
                .cascade
                .invoke(&Task::translate(query, document_language))
                .await?
            {
                Invocation::Model { text, model } => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        model = %model,
                        from = %detected_language,
                        to = %document_language,
                        "query translated"
                    );
                    Some(text)
                }
                // Fallback is the original text: no usable translation.
                Invocation::Fallback { .. } => None,
            }
        } else {
            None
        };

        let search_query = translated_query.as_deref().unwrap_or(query);

        // Pattern match runs on the original and the translation, so
        // comparative phrasing survives the language switch.
        let is_multi_document_query =
            is_comparative_query(query) || is_comparative_query(search_query);

        let classified = self.cascade.invoke(&Task::classify(search_query)).await?;
        let model_type =
            parse_query_type(classified.text()).unwrap_or(QueryType::FALLBACK);

        let query_type = if is_multi_document_query {
            QueryType::Comparative
        } else {
            model_type
        };

        let expansion = self
            .cascade
            .invoke(&Task::expand_keywords(search_query))
            .await?;
        let keywords = parse_keywords(expansion.text());

        let expanded_query = if keywords.is_empty() {
            search_query.to_string()
        } else {
            format!("{} {}", search_query, keywords.join(" "))
        };

        tracing::debug!(
            target: TRACING_TARGET,
            language = %detected_language,
            query_type = %query_type,
            multi_document = is_multi_document_query,
            keywords = keywords.len(),
            "query analyzed"
        );

        Ok(QueryAnalysis {
            original_query: query.to_string(),
            translated_query,
            detected_language,
            expanded_query,
            query_type,
            keywords,
            is_multi_document_query,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use warraq_model::mock::MockModel;

    use super::*;

    fn analyzer_with(models: Vec<Arc<dyn warraq_model::TextModel>>) -> QueryAnalyzer {
        QueryAnalyzer::new(ModelCascade::new(models).unwrap())
    }

    /// A model whose answer depends on the task embedded in the prompt.
    fn task_aware_model(translation: &str, classification: &str, keywords: &str) -> MockModel {
        // The cascade sends every task to the same models; the mock keys on
        // prompt markers the task builders always include.
        MockModel::with_responder("model-a", {
            let translation = translation.to_string();
            let classification = classification.to_string();
            let keywords = keywords.to_string();
            move |prompt: &str| {
                if prompt.starts_with("Translate") {
                    Ok(translation.clone())
                } else if prompt.starts_with("Classify") {
                    Ok(classification.clone())
                } else if prompt.starts_with("Suggest") {
                    Ok(keywords.clone())
                } else {
                    Ok(String::new())
                }
            }
        })
    }

    #[tokio::test]
    async fn arabic_query_against_english_corpus_is_translated_once() {
        let model = task_aware_model(
            "What is the ruling on travel prayer?",
            "factual",
            "ruling, travel, prayer",
        );
        let calls = model.call_count();
        let analyzer = analyzer_with(vec![Arc::new(model)]);

        let analysis = analyzer
            .analyze("ما حكم صلاة المسافر؟", Language::En)
            .await
            .unwrap();

        assert_eq!(analysis.detected_language, Language::Ar);
        assert_eq!(
            analysis.translated_query.as_deref(),
            Some("What is the ruling on travel prayer?")
        );
        // Retrieval searches the translation, not the original.
        assert!(analysis.expanded_query.starts_with("What is the ruling"));
        // Exactly three calls: translate, classify, expand. One translation.
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn same_language_query_is_not_translated() {
        let model = task_aware_model("unused", "narrative", "kings, battles");
        let calls = model.call_count();
        let analyzer = analyzer_with(vec![Arc::new(model)]);

        let analysis = analyzer
            .analyze("Tell me the story of the two kings", Language::En)
            .await
            .unwrap();

        assert!(analysis.translated_query.is_none());
        assert_eq!(analysis.query_type, QueryType::Narrative);
        // Classify and expand only.
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn comparative_pattern_overrides_model_classification() {
        // The model misclassifies as thematic; the pattern wins.
        let model = task_aware_model("unused", "thematic", "books");
        let analyzer = analyzer_with(vec![Arc::new(model)]);

        let analysis = analyzer
            .analyze("What is common between book A and book B?", Language::En)
            .await
            .unwrap();

        assert!(analysis.is_multi_document_query);
        assert_eq!(analysis.query_type, QueryType::Comparative);
    }

    #[tokio::test]
    async fn mixed_language_queries_skip_translation() {
        let model = task_aware_model("unused", "factual", "tafsir");
        let calls = model.call_count();
        let analyzer = analyzer_with(vec![Arc::new(model)]);

        let analysis = analyzer
            .analyze("ما معنى surah explanation تفسير", Language::En)
            .await
            .unwrap();

        assert_eq!(analysis.detected_language, Language::Mixed);
        assert!(analysis.translated_query.is_none());
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn total_model_failure_still_yields_an_analysis() {
        let analyzer = analyzer_with(vec![Arc::new(MockModel::failing("dead"))]);

        let analysis = analyzer
            .analyze("ما حكم صلاة المسافر في السفر الطويل؟", Language::En)
            .await
            .unwrap();

        // Translation fell back to the original, classification to
        // thematic, keywords to the naive token list.
        assert!(analysis.translated_query.is_none());
        assert_eq!(analysis.query_type, QueryType::Thematic);
        assert!(!analysis.keywords.is_empty());
        assert!(analysis.expanded_query.starts_with("ما حكم"));
    }

    #[tokio::test]
    async fn keywords_land_in_the_expanded_query() {
        let model = task_aware_model("unused", "thematic", "trade, caravans, ledgers");
        let analyzer = analyzer_with(vec![Arc::new(model)]);

        let analysis = analyzer
            .analyze("How did merchants organize trade?", Language::En)
            .await
            .unwrap();

        assert_eq!(analysis.keywords, vec!["trade", "caravans", "ledgers"]);
        assert_eq!(
            analysis.expanded_query,
            "How did merchants organize trade? trade caravans ledgers"
        );
    }
}
