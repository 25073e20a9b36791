//! Retrieval result shapes.
//!
//! Results are explicit typed structures rather than nested maps so that
//! grouping and sorting stay unit-testable: chunks group into
//! [`PageGroup`]s, pages into [`DocumentGroup`]s, each group carrying a
//! [`RelevanceTier`] derived from its best similarity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use uuid::Uuid;

use super::Chunk;

/// Which retrieval paths contributed to a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Vector similarity only.
    Vector,
    /// Vector widened with a lexical keyword pass.
    VectorKeyword,
    /// Vector plus keyword pass plus rerank over the merged set.
    VectorKeywordReranked,
    /// Vector plus rerank, no keyword widening.
    VectorReranked,
    /// Multi-hop composite assembled from chained retrievals.
    MultiHop,
}

/// Ranked, attributed retrieval output. Ephemeral.
///
/// `confidence` and `strategy` are advisory signals for the caller and the
/// answer prompt; they never gate whether chunks are returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Ranked chunks, best first.
    pub chunks: Vec<Chunk>,

    /// The retrieval path taken.
    pub strategy: RetrievalStrategy,

    /// Advisory quality score in [0, 1].
    pub confidence: f32,
}

impl RetrievalResult {
    /// An empty but successful result: no relevant information found.
    pub fn empty(strategy: RetrievalStrategy) -> Self {
        Self {
            chunks: Vec::new(),
            strategy,
            confidence: 0.0,
        }
    }

    /// Returns true when retrieval found nothing.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Relevance tier for presentation, derived from a group's best similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RelevanceTier {
    High,
    Medium,
    Low,
}

impl RelevanceTier {
    /// Tier boundaries over cosine similarity.
    pub fn from_similarity(similarity: f32) -> Self {
        if similarity >= 0.75 {
            Self::High
        } else if similarity >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Chunks of one page, ordered by in-page index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageGroup {
    /// 1-based page number.
    pub page_number: u32,

    /// Chunks from this page, in chunk-index order.
    pub chunks: Vec<Chunk>,

    /// Best similarity among the page's chunks.
    pub best_similarity: f32,

    /// Presentation tier derived from the best similarity.
    pub tier: RelevanceTier,
}

/// Pages of one document, ordered by page number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentGroup {
    /// The document all contained pages belong to.
    pub document_id: Uuid,

    /// Page groups in ascending page order.
    pub pages: Vec<PageGroup>,

    /// Best similarity across the whole document.
    pub best_similarity: f32,

    /// Presentation tier derived from the best similarity.
    pub tier: RelevanceTier,
}

/// Groups ranked chunks by document, then by page.
///
/// Document groups come back ordered by best similarity descending; pages
/// within a document ascend by page number, chunks within a page by index.
pub fn group_chunks(chunks: &[Chunk]) -> Vec<DocumentGroup> {
    let mut by_document: BTreeMap<Uuid, BTreeMap<u32, Vec<Chunk>>> = BTreeMap::new();

    for chunk in chunks {
        by_document
            .entry(chunk.document_id)
            .or_default()
            .entry(chunk.page_number)
            .or_default()
            .push(chunk.clone());
    }

    let mut groups: Vec<DocumentGroup> = by_document
        .into_iter()
        .map(|(document_id, pages)| {
            let pages: Vec<PageGroup> = pages
                .into_iter()
                .map(|(page_number, mut chunks)| {
                    chunks.sort_by_key(|c| c.metadata.chunk_index);
                    let best_similarity = chunks
                        .iter()
                        .map(Chunk::similarity_or_zero)
                        .fold(0.0_f32, f32::max);
                    PageGroup {
                        page_number,
                        chunks,
                        best_similarity,
                        tier: RelevanceTier::from_similarity(best_similarity),
                    }
                })
                .collect();

            let best_similarity = pages
                .iter()
                .map(|p| p.best_similarity)
                .fold(0.0_f32, f32::max);

            DocumentGroup {
                document_id,
                pages,
                best_similarity,
                tier: RelevanceTier::from_similarity(best_similarity),
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        b.best_similarity
            .partial_cmp(&a.best_similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(document_id: Uuid, page: u32, index: u32, similarity: f32) -> Chunk {
        Chunk::new(
            document_id,
            page,
            index,
            format!("chunk {index} on page {page}"),
            vec![0.0; 4],
        )
        .with_similarity(similarity)
    }

    #[test]
    fn groups_by_document_then_page() {
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();

        let chunks = vec![
            chunk(doc_a, 2, 0, 0.4),
            chunk(doc_a, 1, 1, 0.9),
            chunk(doc_a, 1, 0, 0.6),
            chunk(doc_b, 5, 0, 0.7),
        ];

        let groups = group_chunks(&chunks);
        assert_eq!(groups.len(), 2);

        // Best document first.
        assert_eq!(groups[0].document_id, doc_a);
        assert_eq!(groups[0].pages.len(), 2);
        assert_eq!(groups[0].pages[0].page_number, 1);
        assert_eq!(groups[0].pages[1].page_number, 2);

        // Chunks ascend by index within a page.
        let indices: Vec<u32> = groups[0].pages[0]
            .chunks
            .iter()
            .map(|c| c.metadata.chunk_index)
            .collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn tiers_follow_best_similarity() {
        assert_eq!(RelevanceTier::from_similarity(0.9), RelevanceTier::High);
        assert_eq!(RelevanceTier::from_similarity(0.6), RelevanceTier::Medium);
        assert_eq!(RelevanceTier::from_similarity(0.2), RelevanceTier::Low);
    }

    #[test]
    fn empty_input_groups_to_nothing() {
        assert!(group_chunks(&[]).is_empty());
    }
}
