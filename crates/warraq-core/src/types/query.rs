//! Query analysis types.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::text::Language;

/// Intent classification of a user question.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// Asks for a story, sequence of events, or account.
    Narrative,
    /// Asks for interpretation or reasoning over the text.
    Analytical,
    /// Asks for a specific fact, name, date, or number.
    Factual,
    /// Asks about a theme or topic across passages.
    Thematic,
    /// Asks to compare or relate two or more subjects.
    Comparative,
}

impl QueryType {
    /// Default classification used when every classifier model fails.
    pub const FALLBACK: QueryType = QueryType::Thematic;
}

/// Ephemeral product of query analysis, consumed immediately by retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// The question exactly as the user asked it.
    pub original_query: String,

    /// Translation into the document language, when one was performed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_query: Option<String>,

    /// Detected language of the original question.
    pub detected_language: Language,

    /// Search query plus expansion keywords; the string actually embedded.
    pub expanded_query: String,

    /// Classified intent (pattern match overrides the model).
    pub query_type: QueryType,

    /// Expansion keywords suggested by the model (or the naive fallback).
    pub keywords: Vec<String>,

    /// True when comparative patterns flag this as spanning documents.
    pub is_multi_document_query: bool,
}

impl QueryAnalysis {
    /// The query string retrieval should search with: the translation when
    /// one exists, otherwise the original.
    pub fn search_query(&self) -> &str {
        self.translated_query
            .as_deref()
            .unwrap_or(&self.original_query)
    }
}
