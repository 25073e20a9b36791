//! Ordered model cascades.
//!
//! A cascade tries each model variant strictly in sequence (later variants
//! are more expensive, so they are only paid for on demonstrated failure)
//! and returns a tagged result: which model produced the value, or that the
//! deterministic fallback was used. "All models failed" is a first-class
//! return value, not exception flow.

use std::sync::Arc;

use warraq_core::{Error, Result};

use crate::TRACING_TARGET;
use crate::provider::{TextEmbedder, TextModel};
use crate::task::Task;

/// Outcome of a cascade invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// A model produced an accepted response.
    Model {
        /// The accepted response text.
        text: String,
        /// Identifier of the model that produced it.
        model: String,
    },
    /// Every model failed; the task's deterministic fallback was used.
    Fallback {
        /// The fallback text derived from the input.
        text: String,
    },
}

impl Invocation {
    /// The result text, however it was produced.
    pub fn text(&self) -> &str {
        match self {
            Self::Model { text, .. } | Self::Fallback { text } => text,
        }
    }

    /// Consumes the invocation, returning the result text.
    pub fn into_text(self) -> String {
        match self {
            Self::Model { text, .. } | Self::Fallback { text } => text,
        }
    }

    /// Returns true when the deterministic fallback was used.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// The model that produced the result, when one did.
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Model { model, .. } => Some(model),
            Self::Fallback { .. } => None,
        }
    }
}

/// Ordered cascade of completion model variants.
///
/// Cheap to clone; the model list is shared.
#[derive(Clone)]
pub struct ModelCascade {
    models: Arc<[Arc<dyn TextModel>]>,
}

impl ModelCascade {
    /// Creates a cascade from an ordered model list, cheapest first.
    pub fn new(models: Vec<Arc<dyn TextModel>>) -> Result<Self> {
        if models.is_empty() {
            return Err(Error::invalid_input("cascade requires at least one model"));
        }
        Ok(Self {
            models: models.into(),
        })
    }

    /// Number of model variants in the cascade.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns true if the cascade holds no models.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Invokes the cascade for one task.
    ///
    /// Attempts are strictly sequential. The first non-empty response that
    /// passes the task's acceptance check wins. On exhaustion, tasks with a
    /// safe fallback return [`Invocation::Fallback`]; terminal tasks
    /// (answer generation, OCR) surface [`Error::Exhausted`].
    pub async fn invoke(&self, task: &Task) -> Result<Invocation> {
        let mut last_error: Option<Error> = None;

        for model in self.models.iter() {
            match model.complete(task.prompt()).await {
                Ok(response) if task.accepts(&response) => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        task = %task.kind(),
                        model = %model.model_name(),
                        "task completed"
                    );
                    return Ok(Invocation::Model {
                        text: response.trim().to_string(),
                        model: model.model_name().to_string(),
                    });
                }
                Ok(_) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        task = %task.kind(),
                        model = %model.model_name(),
                        "response rejected by task validation"
                    );
                    last_error = Some(Error::model(
                        model.model_name(),
                        "response rejected by task validation",
                    ));
                }
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        task = %task.kind(),
                        model = %model.model_name(),
                        error = %error,
                        "model attempt failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        match task.fallback() {
            Some(text) => {
                tracing::info!(
                    target: TRACING_TARGET,
                    task = %task.kind(),
                    "cascade exhausted, using deterministic fallback"
                );
                Ok(Invocation::Fallback { text })
            }
            None => Err(Error::exhausted(
                self.models.len(),
                last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| format!("{} produced no result", task.kind())),
            )),
        }
    }
}

impl std::fmt::Debug for ModelCascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.models.iter().map(|m| m.model_name()).collect();
        f.debug_struct("ModelCascade").field("models", &names).finish()
    }
}

/// Ordered cascade of embedding model variants.
///
/// All variants must share one output dimensionality; the stored-chunk
/// invariant depends on it.
#[derive(Clone)]
pub struct EmbeddingCascade {
    embedders: Arc<[Arc<dyn TextEmbedder>]>,
    dimensions: usize,
}

impl EmbeddingCascade {
    /// Creates a cascade from an ordered embedder list.
    pub fn new(embedders: Vec<Arc<dyn TextEmbedder>>) -> Result<Self> {
        let dimensions = embedders
            .first()
            .map(|e| e.dimensions())
            .ok_or_else(|| Error::invalid_input("cascade requires at least one embedder"))?;

        if let Some(mismatched) = embedders.iter().find(|e| e.dimensions() != dimensions) {
            return Err(Error::invalid_input(format!(
                "embedding dimensionality mismatch: {} produces {} dims, expected {}",
                mismatched.model_name(),
                mismatched.dimensions(),
                dimensions
            )));
        }

        Ok(Self {
            embedders: embedders.into(),
            dimensions,
        })
    }

    /// Fixed dimensionality every variant produces.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embeds a single text, cascading on failure.
    ///
    /// Embedding has no safe fallback: exhaustion is a terminal error. A
    /// rate-limit error from the *first* variant is surfaced as-is so the
    /// caller can back off and retry instead of paying for richer models.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut last_error: Option<Error> = None;

        for embedder in self.embedders.iter() {
            match embedder.embed(text).await {
                Ok(vector) if vector.len() == self.dimensions => return Ok(vector),
                Ok(vector) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        model = %embedder.model_name(),
                        got = vector.len(),
                        expected = self.dimensions,
                        "embedding with wrong dimensionality rejected"
                    );
                    last_error = Some(Error::embedding(format!(
                        "{} returned {} dims, expected {}",
                        embedder.model_name(),
                        vector.len(),
                        self.dimensions
                    )));
                }
                Err(error) if error.is_rate_limited() && self.embedders.len() == 1 => {
                    return Err(error);
                }
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        model = %embedder.model_name(),
                        error = %error,
                        "embedding attempt failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        // Preserve the rate-limit signal when that is what exhausted us, so
        // ingestion can still back off and retry the chunk.
        match last_error {
            Some(error) if error.is_rate_limited() => Err(error),
            Some(error) => Err(Error::exhausted(self.embedders.len(), error.to_string())),
            None => Err(Error::exhausted(self.embedders.len(), "no embedders")),
        }
    }
}

impl std::fmt::Debug for EmbeddingCascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.embedders.iter().map(|e| e.model_name()).collect();
        f.debug_struct("EmbeddingCascade")
            .field("models", &names)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use warraq_core::text::Language;
    use warraq_core::types::QueryType;

    use super::*;
    use crate::mock::{MockEmbedder, MockModel};
    use crate::task::parse_query_type;

    fn cascade(models: Vec<Arc<dyn TextModel>>) -> ModelCascade {
        ModelCascade::new(models).unwrap()
    }

    #[tokio::test]
    async fn first_success_wins() {
        let c = cascade(vec![
            Arc::new(MockModel::succeeding("model-a", "hello")),
            Arc::new(MockModel::succeeding("model-b", "never reached")),
        ]);

        let result = c.invoke(&Task::translate("مرحبا", Language::En)).await.unwrap();
        assert_eq!(
            result,
            Invocation::Model {
                text: "hello".into(),
                model: "model-a".into()
            }
        );
    }

    #[tokio::test]
    async fn only_last_model_succeeding_yields_its_output() {
        // Three models, only the last succeeds: the final result is the last
        // model's output and the earlier attempts were each logged failures.
        let failing_a = MockModel::failing("model-a");
        let failing_b = MockModel::failing("model-b");
        let calls_a = failing_a.call_count();
        let calls_b = failing_b.call_count();

        let c = cascade(vec![
            Arc::new(failing_a),
            Arc::new(failing_b),
            Arc::new(MockModel::succeeding("model-c", "the answer")),
        ]);

        let result = c
            .invoke(&Task::translate("سؤال", Language::En))
            .await
            .unwrap();

        assert_eq!(result.text(), "the answer");
        assert_eq!(result.model(), Some("model-c"));
        assert_eq!(calls_a.get(), 1);
        assert_eq!(calls_b.get(), 1);
    }

    #[tokio::test]
    async fn attempts_are_sequential_not_concurrent() {
        let a = MockModel::succeeding("model-a", "done");
        let b = MockModel::succeeding("model-b", "unused");
        let calls_b = b.call_count();

        let c = cascade(vec![Arc::new(a), Arc::new(b)]);
        c.invoke(&Task::translate("نص", Language::En)).await.unwrap();

        // The second variant is never paid for when the first succeeds.
        assert_eq!(calls_b.get(), 0);
    }

    #[tokio::test]
    async fn translate_exhaustion_falls_back_to_original() {
        let c = cascade(vec![Arc::new(MockModel::failing("model-a"))]);

        let original = "ما حكم صلاة المسافر؟";
        let result = c.invoke(&Task::translate(original, Language::En)).await.unwrap();

        assert!(result.is_fallback());
        assert_eq!(result.text(), original);
    }

    #[tokio::test]
    async fn classify_exhaustion_falls_back_to_thematic() {
        let c = cascade(vec![Arc::new(MockModel::failing("model-a"))]);

        let result = c.invoke(&Task::classify("سؤال عام")).await.unwrap();
        assert!(result.is_fallback());
        assert_eq!(parse_query_type(result.text()), Some(QueryType::Thematic));
    }

    #[tokio::test]
    async fn generate_answer_exhaustion_is_terminal() {
        let c = cascade(vec![
            Arc::new(MockModel::failing("model-a")),
            Arc::new(MockModel::failing("model-b")),
        ]);

        let error = c
            .invoke(&Task::generate_answer("answer from context"))
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Exhausted { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn rejected_responses_cascade_to_next_model() {
        // First model answers with no recognizable label; classification
        // rejects it and moves on.
        let c = cascade(vec![
            Arc::new(MockModel::succeeding("model-a", "I cannot tell")),
            Arc::new(MockModel::succeeding("model-b", "factual")),
        ]);

        let result = c.invoke(&Task::classify("متى ولد المؤلف؟")).await.unwrap();
        assert_eq!(result.model(), Some("model-b"));
        assert_eq!(parse_query_type(result.text()), Some(QueryType::Factual));
    }

    #[tokio::test]
    async fn embedding_dimensions_must_agree() {
        let result = EmbeddingCascade::new(vec![
            Arc::new(MockEmbedder::new("emb-a", 8)),
            Arc::new(MockEmbedder::new("emb-b", 16)),
        ]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn embedding_exhaustion_is_terminal() {
        let c = EmbeddingCascade::new(vec![Arc::new(MockEmbedder::failing("emb-a", 8))]).unwrap();
        let error = c.embed("some text").await.unwrap_err();
        assert!(matches!(error, Error::Exhausted { .. }));
    }

    #[tokio::test]
    async fn embedding_cascades_to_second_variant() {
        let c = EmbeddingCascade::new(vec![
            Arc::new(MockEmbedder::failing("emb-a", 8)),
            Arc::new(MockEmbedder::new("emb-b", 8)),
        ])
        .unwrap();

        let vector = c.embed("some text").await.unwrap();
        assert_eq!(vector.len(), 8);
    }

    #[tokio::test]
    async fn rate_limit_from_sole_embedder_surfaces_as_rate_limit() {
        let c =
            EmbeddingCascade::new(vec![Arc::new(MockEmbedder::rate_limited("emb-a", 8))]).unwrap();
        let error = c.embed("some text").await.unwrap_err();
        assert!(error.is_rate_limited());
    }
}
