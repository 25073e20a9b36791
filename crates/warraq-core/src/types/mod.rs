//! Domain types for the warraq pipeline.
//!
//! - [`Chunk`] is the atomic retrievable unit (§chunk in the glossary).
//! - [`Document`] is one registered PDF with its embedding lifecycle.
//! - [`QueryAnalysis`] is the ephemeral product of query analysis.
//! - [`RetrievalResult`] and the grouping types carry ranked search output.

mod chunk;
mod document;
mod query;
mod retrieval;

pub use chunk::{Chunk, ChunkMetadata};
pub use document::{Document, EmbeddingStatus};
pub use query::{QueryAnalysis, QueryType};
pub use retrieval::{
    DocumentGroup, PageGroup, RelevanceTier, RetrievalResult, RetrievalStrategy, group_chunks,
};
