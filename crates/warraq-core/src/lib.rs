#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
pub mod text;
pub mod types;

pub use error::{Error, Result};

/// Minimum text length for a chunk to be persisted, in characters.
///
/// Anything shorter carries no retrievable signal and is dropped before
/// embedding.
pub const MIN_CHUNK_CHARACTERS: usize = 10;
