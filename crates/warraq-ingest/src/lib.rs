#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod parser;
mod pipeline;
mod render;
mod splitter;

pub use config::IngestConfig;
pub use parser::{DocumentParser, PdfParser};
pub use pipeline::{IngestPipeline, IngestProgress, IngestReport};
pub use render::{PageRenderer, PdftoppmRenderer};
pub use splitter::{SplitPiece, Splitter};

/// Tracing target for the main library.
pub const TRACING_TARGET: &str = "warraq_ingest";
