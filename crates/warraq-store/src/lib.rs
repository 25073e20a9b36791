#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod registry;
mod schema;

pub use registry::DocumentRegistry;

/// Tracing target for the main library.
pub const TRACING_TARGET: &str = "warraq_store";
