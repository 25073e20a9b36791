//! Completion provider abstraction.

use std::sync::Arc;

use rig::completion::{AssistantContent, CompletionModel as RigCompletionModel};
use rig::one_or_many::OneOrMany;
use rig::prelude::CompletionClient;
use rig::providers::{gemini, openai};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use warraq_core::Result;

use super::{TextModel, classify_provider_error};
use crate::credentials::Credentials;

/// Google Gemini completion models, cheapest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GeminiModel {
    /// Gemini 2.0 Flash Lite (cheapest, most available)
    #[strum(serialize = "gemini-2.0-flash-lite")]
    Gemini20FlashLite,
    /// Gemini 2.0 Flash (fast, multimodal)
    #[strum(serialize = "gemini-2.0-flash")]
    Gemini20Flash,
    /// Gemini 1.5 Flash (fast)
    #[strum(serialize = "gemini-1.5-flash")]
    Gemini15Flash,
    /// Gemini 1.5 Pro (long context, most capable)
    #[strum(serialize = "gemini-1.5-pro")]
    Gemini15Pro,
}

/// OpenAI completion models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OpenAiModel {
    /// GPT-4o mini (fast, affordable)
    #[strum(serialize = "gpt-4o-mini")]
    Gpt4oMini,
    /// GPT-4o (multimodal flagship)
    #[strum(serialize = "gpt-4o")]
    Gpt4o,
}

/// Reference to a completion/chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", content = "model", rename_all = "snake_case")]
pub enum CompletionModelId {
    /// Google Gemini completion models.
    Gemini(GeminiModel),
    /// OpenAI completion models.
    OpenAi(OpenAiModel),
}

impl CompletionModelId {
    /// Returns the model identifier string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Gemini(m) => m.as_ref(),
            Self::OpenAi(m) => m.as_ref(),
        }
    }
}

/// Completion provider that wraps one rig completion model implementation.
///
/// This is a cheaply cloneable wrapper around an `Arc<CompletionService>`.
#[derive(Clone)]
pub struct CompletionProvider(Arc<CompletionService>);

enum CompletionService {
    Gemini {
        model: gemini::completion::CompletionModel,
        model_name: String,
    },
    OpenAi {
        model: openai::CompletionModel,
        model_name: String,
    },
}

impl CompletionProvider {
    /// Connects a provider for one concrete model variant.
    pub fn connect(credentials: &Credentials, params: CompletionModelId) -> Result<Self> {
        credentials.validate()?;

        let inner = match (credentials, params) {
            (Credentials::Gemini(c), CompletionModelId::Gemini(m)) => {
                let client = gemini::Client::new(&c.api_key)
                    .map_err(|e| classify_provider_error(m.as_ref(), e.to_string()))?;
                CompletionService::Gemini {
                    model: client.completion_model(m.as_ref()),
                    model_name: m.as_ref().to_string(),
                }
            }
            (Credentials::OpenAi(c), CompletionModelId::OpenAi(m)) => {
                let client = openai::Client::new(&c.api_key)
                    .map_err(|e| classify_provider_error(m.as_ref(), e.to_string()))?
                    .completions_api();
                CompletionService::OpenAi {
                    model: client.completion_model(m.as_ref()),
                    model_name: m.as_ref().to_string(),
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
            CompletionService::Gemini { .. } => "gemini",
            CompletionService::OpenAi { .. } => "openai",
        }
    }
}

#[async_trait::async_trait]
impl TextModel for CompletionProvider {
    fn model_name(&self) -> &str {
        match self.0.as_ref() {
            CompletionService::Gemini { model_name, .. } => model_name,
            CompletionService::OpenAi { model_name, .. } => model_name,
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let model_name = self.model_name().to_string();

        match self.0.as_ref() {
            CompletionService::Gemini { model, .. } => model
                .completion_request(prompt)
                .send()
                .await
                .map(|r| extract_text_content(&r.choice))
                .map_err(|e| classify_provider_error(&model_name, e.to_string())),
            CompletionService::OpenAi { model, .. } => model
                .completion_request(prompt)
                .send()
                .await
                .map(|r| extract_text_content(&r.choice))
                .map_err(|e| classify_provider_error(&model_name, e.to_string())),
        }
    }
}

/// Extracts text content from assistant content choices.
fn extract_text_content(choice: &OneOrMany<AssistantContent>) -> String {
    choice
        .iter()
        .filter_map(|content| match content {
            AssistantContent::Text(text) => Some(text.text()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

impl std::fmt::Debug for CompletionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            CompletionService::Gemini { model_name, .. } => f
                .debug_struct("CompletionProvider::Gemini")
                .field("model", model_name)
                .finish(),
            CompletionService::OpenAi { model_name, .. } => f
                .debug_struct("CompletionProvider::OpenAi")
                .field("model", model_name)
                .finish(),
        }
    }
}
