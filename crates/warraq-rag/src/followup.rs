//! Follow-up question detection.
//!
//! Classifies whether the current question continues the previous turn, so
//! the caller can reuse the last retrieved context instead of re-querying.
//! This is a caller-level optimization: the retrieval engine itself is
//! stateless and tolerates being skipped.

use std::sync::LazyLock;

use regex::Regex;

/// Questions at or under this many words lean on the previous turn.
const SHORT_QUERY_WORDS: usize = 4;

/// Continuation cues, English and Arabic, as data.
const FOLLOW_UP_PATTERNS: &[(&str, &str)] = &[
    ("en-what-about", r"(?i)^(what|how|and what|and how) about\b"),
    ("en-more", r"(?i)\b(tell me more|more details|elaborate|expand on that)\b"),
    ("en-anaphora", r"(?i)^(and|also|then|so)\b"),
    ("en-bare-pronoun", r"(?i)^(why|how|when|where)\s+(is|was|did|does)\s+(it|that|this|he|she|they)\b"),
    // ماذا عن: "what about"
    ("ar-what-about", "^ماذا عن|^وماذا عن"),
    // المزيد / وضح أكثر: "more / elaborate"
    ("ar-more", "المزيد|وضح أكثر|اشرح أكثر|بالتفصيل"),
    // Leading connective و followed by interrogative.
    ("ar-connective", "^و(لماذا|كيف|متى|أين|هل|ما)"),
    // Bare demonstrative reference.
    ("ar-demonstrative", "^(لماذا|كيف|متى|أين|هل) (هذا|ذلك|هذه|تلك)"),
];

static COMPILED: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    FOLLOW_UP_PATTERNS
        .iter()
        .filter_map(|(label, pattern)| Regex::new(pattern).ok().map(|r| (*label, r)))
        .collect()
});

/// Heuristic follow-up detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowUpDetector;

impl FollowUpDetector {
    /// Creates a detector.
    pub fn new() -> Self {
        Self
    }

    /// Returns true when `query` reads as a continuation of the previous
    /// turn. With no previous turn there is nothing to continue.
    pub fn is_follow_up(&self, query: &str, previous_query: Option<&str>) -> bool {
        if previous_query.is_none() {
            return false;
        }

        let trimmed = query.trim();
        if trimmed.is_empty() {
            return false;
        }

        if COMPILED.iter().any(|(_, regex)| regex.is_match(trimmed)) {
            return true;
        }

        // Very short questions rarely stand alone.
        trimmed.split_whitespace().count() <= SHORT_QUERY_WORDS
    }
}
