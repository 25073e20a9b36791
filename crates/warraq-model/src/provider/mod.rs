//! Model provider abstractions over rig-core.
//!
//! [`CompletionProvider`] and [`EmbeddingProvider`] wrap the rig client for
//! one concrete model variant each; the cascade layer holds an ordered list
//! of them behind the [`TextModel`] / [`TextEmbedder`] traits.

mod completion;
mod embedding;

pub use completion::{CompletionModelId, CompletionProvider, GeminiModel, OpenAiModel};
pub use embedding::{
    EmbeddingModelId, EmbeddingProvider, GeminiEmbeddingModel, OpenAiEmbeddingModel,
};

use warraq_core::{Error, Result};

/// Object-safe completion surface a cascade iterates over.
#[async_trait::async_trait]
pub trait TextModel: Send + Sync {
    /// The model identifier, used in logs and result attribution.
    fn model_name(&self) -> &str;

    /// Sends a single prompt and returns the completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Object-safe embedding surface a cascade iterates over.
#[async_trait::async_trait]
pub trait TextEmbedder: Send + Sync {
    /// The model identifier, used in logs and result attribution.
    fn model_name(&self) -> &str;

    /// Fixed dimensionality of vectors this model produces.
    fn dimensions(&self) -> usize;

    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds a batch of texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Maps a provider error message onto the workspace error taxonomy.
///
/// Quota and rate-limit signals must surface as [`Error::RateLimited`] so
/// the ingestion pipeline can back off instead of cascading.
pub(crate) fn classify_provider_error(model: &str, message: impl ToString) -> Error {
    let message = message.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("429")
        || lowered.contains("quota")
        || lowered.contains("rate limit")
        || lowered.contains("resource exhausted")
        || lowered.contains("resource_exhausted")
    {
        Error::rate_limited(format!("{model}: {message}"))
    } else {
        Error::model(model, message)
    }
}
