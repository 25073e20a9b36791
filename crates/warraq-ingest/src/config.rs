//! Ingestion configuration.

use std::time::Duration;

/// Tuning knobs for the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Below this many characters, native extraction is considered to have
    /// failed and the OCR fallback runs.
    pub min_native_characters: usize,

    /// Arabic-ratio above which a page is suspected Arabic and OCR is
    /// forced even when native extraction looked sufficient.
    pub arabic_suspect_ratio: f32,

    /// Maximum chunk size in characters.
    pub max_chunk_characters: usize,

    /// Overlap between consecutive chunks, in characters.
    pub chunk_overlap_characters: usize,

    /// Raster upscale factor for OCR rendering (1.0 = 72 dpi).
    pub render_scale: f32,

    /// Delay between pages, smoothing rate-limit pressure.
    pub inter_page_delay: Duration,

    /// Backoff before the single retry of a rate-limited chunk embedding.
    pub rate_limit_backoff: Duration,

    /// Run the inline correction pass on Arabic pages before chunking.
    pub correct_inline: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            min_native_characters: 100,
            arabic_suspect_ratio: 0.3,
            max_chunk_characters: 1000,
            chunk_overlap_characters: 200,
            render_scale: 2.0,
            inter_page_delay: Duration::from_millis(500),
            rate_limit_backoff: Duration::from_secs(5),
            correct_inline: false,
        }
    }
}
