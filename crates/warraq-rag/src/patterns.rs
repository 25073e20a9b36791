//! Comparative query detection battery.
//!
//! A data-described rule set, like the corruption battery: pattern → signal
//! pairs covering English and Arabic comparative phrasing. The pattern
//! match is cheap and reliable signal the model classifier sometimes
//! misses, so a hit force-overrides the classification to comparative.

use std::sync::LazyLock;

use regex::Regex;

/// One comparative signal.
#[derive(Debug, Clone, Copy)]
pub struct ComparativePattern {
    /// Stable label used in logs.
    pub label: &'static str,
    /// The regex raising this signal.
    pub pattern: &'static str,
}

/// The comparative battery, as data.
pub const COMPARATIVE_PATTERNS: &[ComparativePattern] = &[
    ComparativePattern {
        label: "en-common",
        pattern: r"(?i)\bcommon\b",
    },
    ComparativePattern {
        label: "en-difference",
        pattern: r"(?i)\bdifferen(ce|ces|t)\b",
    },
    ComparativePattern {
        label: "en-compare",
        pattern: r"(?i)\b(compare|comparison|versus|vs\.?)\b",
    },
    ComparativePattern {
        label: "en-between-and",
        pattern: r"(?i)\bbetween\b.+\band\b",
    },
    ComparativePattern {
        label: "en-both-and",
        pattern: r"(?i)\bboth\b.+\band\b",
    },
    ComparativePattern {
        label: "en-similarities",
        pattern: r"(?i)\bsimilarit(y|ies)\b",
    },
    // الفرق / الاختلاف: "the difference"
    ComparativePattern {
        label: "ar-difference",
        pattern: "الفرق|الاختلاف|الإختلاف",
    },
    // قارن / مقارنة: "compare" / "comparison"
    ComparativePattern {
        label: "ar-compare",
        pattern: "قارن|مقارنة|المقارنة",
    },
    // المشترك / يشترك: "what is shared"
    ComparativePattern {
        label: "ar-common",
        pattern: "المشترك|مشترك|يشترك|القواسم",
    },
    // أوجه الشبه: "points of similarity"
    ComparativePattern {
        label: "ar-similarity",
        pattern: "أوجه الشبه|التشابه|الشبه",
    },
    // بين ... و: "between ... and"
    ComparativePattern {
        label: "ar-between-and",
        pattern: "بين .+ و",
    },
];

static COMPILED: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    COMPARATIVE_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p.pattern).ok().map(|r| (p.label, r)))
        .collect()
});

/// Returns true if the query matches any comparative pattern.
pub fn is_comparative_query(query: &str) -> bool {
    COMPILED.iter().any(|(_, regex)| regex.is_match(query))
}

/// Labels of every comparative signal the query raises.
pub fn comparative_signals(query: &str) -> Vec<&'static str> {
    COMPILED
        .iter()
        .filter(|(_, regex)| regex.is_match(query))
        .map(|(label, _)| *label)
        .collect()
}

/// Captures the two compared subjects from a "between A and B" phrasing,
/// in either language, for seeding per-subject sub-queries.
pub fn between_subjects(query: &str) -> Option<(String, String)> {
    static EN: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\bbetween\s+(.+?)\s+and\s+(.+?)(?:[?.!؟]|$)").expect("valid regex")
    });
    static AR: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new("بين\\s+(.+?)\\s+و\\s*(.+?)(?:[?.!؟]|$)").expect("valid regex")
    });

    for regex in [&*EN, &*AR] {
        if let Some(captures) = regex.captures(query) {
            let a = captures.get(1)?.as_str().trim().to_string();
            let b = captures.get(2)?.as_str().trim().to_string();
            if !a.is_empty() && !b.is_empty() {
                return Some((a, b));
            }
        }
    }
    None
}
