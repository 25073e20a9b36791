//! Qdrant backend.

mod backend;

pub use backend::QdrantChunkStore;

use serde::{Deserialize, Serialize};

/// Qdrant connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// Qdrant endpoint, e.g. `http://localhost:6334`.
    pub url: String,

    /// Optional API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Collection holding the library's chunks.
    pub collection: String,
}

impl QdrantConfig {
    /// Creates a configuration for a local unauthenticated instance.
    pub fn new(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            collection: collection.into(),
        }
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}
