#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod memory;
pub mod qdrant;
mod store;

pub use memory::MemoryChunkStore;
pub use qdrant::{QdrantChunkStore, QdrantConfig};
pub use store::{ChunkStore, VectorQuery};

/// Tracing target for the main library.
pub const TRACING_TARGET: &str = "warraq_vector";
