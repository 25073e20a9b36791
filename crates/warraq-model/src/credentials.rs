//! Shared credential types for model providers.

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use warraq_core::Error;

/// API key credentials for model providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyCredentials {
    /// API key.
    pub api_key: String,
}

/// Unified credentials for all supported model providers.
///
/// The same credentials serve both completion and embedding calls,
/// depending on the provider's capabilities.
#[derive(Debug, Clone, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "provider", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Credentials {
    /// Google Gemini credentials (completion, vision, and embedding).
    Gemini(ApiKeyCredentials),
    /// OpenAI credentials (completion, vision, and embedding).
    OpenAi(ApiKeyCredentials),
}

impl Credentials {
    /// Creates Gemini credentials from an API key.
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::Gemini(ApiKeyCredentials {
            api_key: api_key.into(),
        })
    }

    /// Creates OpenAI credentials from an API key.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::OpenAi(ApiKeyCredentials {
            api_key: api_key.into(),
        })
    }

    /// Returns the provider name as a string.
    pub fn provider(&self) -> &'static str {
        self.into()
    }

    /// Validates that the key is non-empty.
    pub fn validate(&self) -> Result<(), Error> {
        let key = match self {
            Self::Gemini(c) | Self::OpenAi(c) => &c.api_key,
        };
        if key.trim().is_empty() {
            return Err(Error::invalid_input(format!(
                "{} api key is empty",
                self.provider()
            )));
        }
        Ok(())
    }
}
