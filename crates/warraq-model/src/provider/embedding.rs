//! Embedding provider abstraction.

use std::sync::Arc;

use rig::embeddings::EmbeddingModel as RigEmbeddingModel;
use rig::prelude::EmbeddingsClient;
use rig::providers::{gemini, openai};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use warraq_core::Result;

use super::{TextEmbedder, classify_provider_error};
use crate::credentials::Credentials;

/// Google Gemini embedding models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GeminiEmbeddingModel {
    /// text-embedding-004 (768 dimensions)
    #[strum(serialize = "text-embedding-004")]
    TextEmbedding004,
}

impl GeminiEmbeddingModel {
    /// Fixed output dimensionality.
    pub fn dimensions(&self) -> usize {
        match self {
            Self::TextEmbedding004 => 768,
        }
    }
}

/// OpenAI embedding models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OpenAiEmbeddingModel {
    /// text-embedding-3-small (1536 dimensions)
    #[strum(serialize = "text-embedding-3-small")]
    TextEmbedding3Small,
    /// text-embedding-3-large (3072 dimensions)
    #[strum(serialize = "text-embedding-3-large")]
    TextEmbedding3Large,
}

impl OpenAiEmbeddingModel {
    /// Fixed output dimensionality.
    pub fn dimensions(&self) -> usize {
        match self {
            Self::TextEmbedding3Small => 1536,
            Self::TextEmbedding3Large => 3072,
        }
    }
}

/// Reference to an embedding model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", content = "model", rename_all = "snake_case")]
pub enum EmbeddingModelId {
    /// Google Gemini embedding models.
    Gemini(GeminiEmbeddingModel),
    /// OpenAI embedding models.
    OpenAi(OpenAiEmbeddingModel),
}

impl EmbeddingModelId {
    /// Returns the model identifier string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Gemini(m) => m.as_ref(),
            Self::OpenAi(m) => m.as_ref(),
        }
    }

    /// Fixed output dimensionality.
    pub fn dimensions(&self) -> usize {
        match self {
            Self::Gemini(m) => m.dimensions(),
            Self::OpenAi(m) => m.dimensions(),
        }
    }
}

/// Embedding provider that wraps one rig embedding model implementation.
///
/// This is a cheaply cloneable wrapper around an `Arc<EmbeddingService>`.
#[derive(Clone)]
pub struct EmbeddingProvider(Arc<EmbeddingService>);

enum EmbeddingService {
    Gemini {
        model: gemini::embedding::EmbeddingModel,
        model_name: String,
        dimensions: usize,
    },
    OpenAi {
        model: openai::EmbeddingModel,
        model_name: String,
        dimensions: usize,
    },
}

impl EmbeddingProvider {
    /// Connects a provider for one concrete embedding model.
    pub fn connect(credentials: &Credentials, params: EmbeddingModelId) -> Result<Self> {
        credentials.validate()?;

        let inner = match (credentials, &params) {
            (Credentials::Gemini(c), EmbeddingModelId::Gemini(m)) => {
                let client = gemini::Client::new(&c.api_key)
                    .map_err(|e| classify_provider_error(m.as_ref(), e.to_string()))?;
                EmbeddingService::Gemini {
                    model: client.embedding_model_with_ndims(m.as_ref(), m.dimensions()),
                    model_name: m.as_ref().to_string(),
                    dimensions: m.dimensions(),
                }
            }
            (Credentials::OpenAi(c), EmbeddingModelId::OpenAi(m)) => {
                let client = openai::Client::new(&c.api_key)
                    .map_err(|e| classify_provider_error(m.as_ref(), e.to_string()))?;
                EmbeddingService::OpenAi {
                    model: client.embedding_model_with_ndims(m.as_ref(), m.dimensions()),
                    model_name: m.as_ref().to_string(),
                    dimensions: m.dimensions(),
                }
            }
            (credentials, params) => {
                return Err(warraq_core::Error::invalid_input(format!(
                    "mismatched credentials ({}) and model ({})",
                    credentials.provider(),
                    params.as_str()
                )));
            }
        };
        Ok(Self(Arc::new(inner)))
    }

    /// Returns the provider name.
    pub fn provider_name(&self) -> &'static str {
        match self.0.as_ref() {
            EmbeddingService::Gemini { .. } => "gemini",
            EmbeddingService::OpenAi { .. } => "openai",
        }
    }
}

#[async_trait::async_trait]
impl TextEmbedder for EmbeddingProvider {
    fn model_name(&self) -> &str {
        match self.0.as_ref() {
            EmbeddingService::Gemini { model_name, .. } => model_name,
            EmbeddingService::OpenAi { model_name, .. } => model_name,
        }
    }

    fn dimensions(&self) -> usize {
        match self.0.as_ref() {
            EmbeddingService::Gemini { dimensions, .. } => *dimensions,
            EmbeddingService::OpenAi { dimensions, .. } => *dimensions,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model_name = self.model_name().to_string();

        let embedding = match self.0.as_ref() {
            EmbeddingService::Gemini { model, .. } => model.embed_text(text).await,
            EmbeddingService::OpenAi { model, .. } => model.embed_text(text).await,
        }
        .map_err(|e| classify_provider_error(&model_name, e.to_string()))?;

        Ok(embedding.vec.iter().map(|&x| x as f32).collect())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model_name = self.model_name().to_string();
        let texts = texts.to_vec();

        let embeddings = match self.0.as_ref() {
            EmbeddingService::Gemini { model, .. } => model.embed_texts(texts).await,
            EmbeddingService::OpenAi { model, .. } => model.embed_texts(texts).await,
        }
        .map_err(|e| classify_provider_error(&model_name, e.to_string()))?;

        Ok(embeddings
            .into_iter()
            .map(|e| e.vec.iter().map(|&x| x as f32).collect())
            .collect())
    }
}

impl std::fmt::Debug for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            EmbeddingService::Gemini {
                model_name,
                dimensions,
                ..
            } => f
                .debug_struct("EmbeddingProvider::Gemini")
                .field("model", model_name)
                .field("ndims", dimensions)
                .finish(),
            EmbeddingService::OpenAi {
                model_name,
                dimensions,
                ..
            } => f
                .debug_struct("EmbeddingProvider::OpenAi")
                .field("model", model_name)
                .field("ndims", dimensions)
                .finish(),
        }
    }
}
