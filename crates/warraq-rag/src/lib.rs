#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod analyzer;
mod correction;
mod engine;
mod followup;
mod multihop;
mod patterns;
mod service;

pub use analyzer::QueryAnalyzer;
pub use correction::{CorrectionConfig, CorrectionLoop, SweepReport};
pub use engine::{RetrievalConfig, RetrievalEngine};
pub use followup::FollowUpDetector;
pub use multihop::{CompositeResult, MultiHopOptions, MultiHopReasoner, is_complex_query};
pub use patterns::{COMPARATIVE_PATTERNS, ComparativePattern, is_comparative_query};
pub use service::RagService;

/// Tracing target for the main library.
pub const TRACING_TARGET: &str = "warraq_rag";
