//! Document registry types.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Embedding lifecycle status of a document.
///
/// Transitions are monotonic forward except on failure:
/// `Pending → Processing → Completed`, or `Processing → Failed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingStatus {
    /// Registered, not yet processed.
    Pending,
    /// Ingestion in progress.
    Processing,
    /// All pages processed, chunks stored.
    Completed,
    /// Ingestion failed before any chunk was stored.
    Failed,
}

impl EmbeddingStatus {
    /// Returns true if `next` is a legal transition from this status.
    ///
    /// Failure is only reachable from `Processing`; completed and failed
    /// documents never move again.
    pub fn can_transition_to(&self, next: EmbeddingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// Returns true once the document has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One uploaded PDF registered in the library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier.
    pub id: Uuid,

    /// Human-readable name shown in the library.
    pub display_name: String,

    /// Total pages, set once from the parsed PDF before per-page processing.
    pub total_pages: u32,

    /// Embedding lifecycle status.
    pub embedding_status: EmbeddingStatus,

    /// Number of chunks stored for this document.
    pub chunks_count: u32,

    /// Corpus membership flag: whether queries search this document.
    pub is_selected: bool,

    /// When the document was registered.
    pub created_at: jiff::Timestamp,
}

impl Document {
    /// Creates a new pending document.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            total_pages: 0,
            embedding_status: EmbeddingStatus::Pending,
            chunks_count: 0,
            is_selected: true,
            created_at: jiff::Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_are_monotonic() {
        use EmbeddingStatus::*;

        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));

        // No backward or skipping moves.
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Processing));
        assert!(!Completed.can_transition_to(Failed));
    }

    #[test]
    fn status_round_trips_through_strings() {
        use std::str::FromStr;

        for status in [
            EmbeddingStatus::Pending,
            EmbeddingStatus::Processing,
            EmbeddingStatus::Completed,
            EmbeddingStatus::Failed,
        ] {
            let s = status.as_ref().to_string();
            assert_eq!(EmbeddingStatus::from_str(&s).unwrap(), status);
        }
    }
}
