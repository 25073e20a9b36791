//! Overlap-aware text splitting.

use text_splitter::{ChunkConfig, TextSplitter};
use warraq_core::MIN_CHUNK_CHARACTERS;

/// One split piece of a page's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPiece {
    /// Monotonically increasing index within the page.
    pub index: u32,
    /// The piece text.
    pub text: String,
}

/// Text splitter producing overlapping chunks.
///
/// Overlap preserves context across chunk boundaries so a sentence cut in
/// half is still retrievable from either side.
#[derive(Debug, Clone)]
pub struct Splitter {
    max_characters: usize,
    overlap: usize,
}

impl Splitter {
    /// Creates a splitter with the given chunk size and overlap.
    ///
    /// The overlap is clamped below the chunk size.
    pub fn new(max_characters: usize, overlap: usize) -> Self {
        Self {
            max_characters: max_characters.max(MIN_CHUNK_CHARACTERS),
            overlap: overlap.min(max_characters.saturating_sub(1)),
        }
    }

    /// Splits one page's text into indexed pieces.
    ///
    /// Pieces under the minimum chunk length are dropped; they carry no
    /// retrievable signal. Indices stay monotonic over the kept pieces.
    pub fn split(&self, text: &str) -> Vec<SplitPiece> {
        let config = ChunkConfig::new(self.max_characters)
            .with_overlap(self.overlap)
            .expect("overlap must be less than max_characters")
            .with_trim(true);
        let splitter = TextSplitter::new(config);

        splitter
            .chunks(text)
            .filter(|chunk| chunk.chars().count() >= MIN_CHUNK_CHARACTERS)
            .enumerate()
            .map(|(index, chunk)| SplitPiece {
                index: index as u32,
                text: chunk.to_string(),
            })
            .collect()
    }
}

impl Default for Splitter {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}
