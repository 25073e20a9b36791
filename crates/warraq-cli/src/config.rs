//! CLI argument and service configuration.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use warraq_core::Result;
use warraq_core::text::Language;
use warraq_model::provider::{
    CompletionModelId, CompletionProvider, EmbeddingModelId, EmbeddingProvider, GeminiModel,
    GeminiEmbeddingModel,
};
use warraq_model::{Credentials, EmbeddingCascade, ModelCascade, TextEmbedder, TextModel};

/// warraq: chat with your PDF library.
#[derive(Debug, Parser)]
#[command(name = "warraq", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub services: ServiceArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Shared service connection arguments.
#[derive(Debug, Args)]
pub struct ServiceArgs {
    /// Path of the document registry database.
    #[arg(long, env = "WARRAQ_REGISTRY", default_value = "warraq.db")]
    pub registry: PathBuf,

    /// Qdrant endpoint.
    #[arg(long, env = "WARRAQ_QDRANT_URL", default_value = "http://localhost:6334")]
    pub qdrant_url: String,

    /// Qdrant collection name.
    #[arg(long, env = "WARRAQ_COLLECTION", default_value = "warraq-chunks")]
    pub collection: String,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register a PDF and embed it into the index.
    Ingest {
        /// Path of the PDF file.
        file: PathBuf,

        /// Display name; defaults to the file stem.
        #[arg(long)]
        name: Option<String>,
    },

    /// Ask a question over the selected corpus.
    Ask {
        /// The question.
        question: String,

        /// Language of the target documents.
        #[arg(long, default_value = "ar")]
        doc_language: LanguageArg,

        /// Enable multi-hop reasoning for complex questions.
        #[arg(long)]
        multi_hop: bool,

        /// Disable the rerank pass.
        #[arg(long)]
        no_rerank: bool,

        /// Disable the keyword widening pass.
        #[arg(long)]
        no_keywords: bool,
    },

    /// Run a correction sweep over one document's chunks.
    Sweep {
        /// The document id.
        document_id: uuid::Uuid,

        /// Bypass the corruption pre-filter.
        #[arg(long)]
        aggressive: bool,
    },

    /// List, select, or delete registered documents.
    Documents {
        #[command(subcommand)]
        action: DocumentsAction,
    },
}

/// Document management actions.
#[derive(Debug, Subcommand)]
pub enum DocumentsAction {
    /// List all documents.
    List,
    /// Include a document in the query corpus.
    Select { document_id: uuid::Uuid },
    /// Exclude a document from the query corpus.
    Deselect { document_id: uuid::Uuid },
    /// Delete a document and all of its chunks.
    Delete { document_id: uuid::Uuid },
}

/// Document language argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LanguageArg {
    Ar,
    En,
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::Ar => Language::Ar,
            LanguageArg::En => Language::En,
        }
    }
}

/// Builds the completion cascade, cheapest variant first.
pub fn completion_cascade(args: &ServiceArgs) -> Result<ModelCascade> {
    let credentials = Credentials::gemini(&args.gemini_api_key);

    let variants = [
        GeminiModel::Gemini20FlashLite,
        GeminiModel::Gemini20Flash,
        GeminiModel::Gemini15Flash,
        GeminiModel::Gemini15Pro,
    ];

    let models: Vec<Arc<dyn TextModel>> = variants
        .into_iter()
        .map(|model| {
            CompletionProvider::connect(&credentials, CompletionModelId::Gemini(model))
                .map(|p| Arc::new(p) as Arc<dyn TextModel>)
        })
        .collect::<Result<_>>()?;

    ModelCascade::new(models)
}

/// Builds the embedding cascade.
pub fn embedding_cascade(args: &ServiceArgs) -> Result<EmbeddingCascade> {
    let credentials = Credentials::gemini(&args.gemini_api_key);

    let embedder = EmbeddingProvider::connect(
        &credentials,
        EmbeddingModelId::Gemini(GeminiEmbeddingModel::TextEmbedding004),
    )?;

    EmbeddingCascade::new(vec![Arc::new(embedder) as Arc<dyn TextEmbedder>])
}
