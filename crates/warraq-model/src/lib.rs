#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod cascade;
mod credentials;
pub mod provider;
mod task;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

pub use cascade::{EmbeddingCascade, Invocation, ModelCascade};
pub use credentials::{ApiKeyCredentials, Credentials};
pub use provider::{
    CompletionModelId, CompletionProvider, EmbeddingModelId, EmbeddingProvider, TextEmbedder,
    TextModel,
};
pub use task::{Task, TaskKind, parse_keywords, parse_query_type, validate_correction};

/// Tracing target for the main library.
pub const TRACING_TARGET: &str = "warraq_model";
