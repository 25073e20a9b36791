//! OCR corruption detection battery.
//!
//! A data-described rule set of pattern → signal pairs tuned to recurring
//! OCR failure modes in Arabic book scans. Matching any pattern makes a
//! text a *candidate* for correction — a cheap pre-filter, not a guarantee
//! of actual corruption. The list is illustrative and extensible: adding a
//! failure mode means adding a row and a test case.

use std::sync::LazyLock;

use regex::Regex;

/// One corruption signal: a stable label and the pattern that raises it.
#[derive(Debug, Clone, Copy)]
pub struct CorruptionPattern {
    /// Stable label used in logs and reports.
    pub label: &'static str,
    /// The regex raising this signal.
    pub pattern: &'static str,
}

/// The corruption battery, as data.
pub const CORRUPTION_PATTERNS: &[CorruptionPattern] = &[
    // Hamza dropped after a long vowel: bare alef directly followed by
    // another bare alef is not a valid Arabic sequence.
    CorruptionPattern {
        label: "doubled-alef",
        pattern: "\u{0627}\u{0627}+",
    },
    // Hamza on the wrong carrier: waw-hamza or ya-hamza immediately
    // repeated, a classic mis-segmentation of one glyph into two.
    CorruptionPattern {
        label: "doubled-hamza-carrier",
        pattern: "[\u{0624}\u{0626}]{2,}",
    },
    // Taa marbuta followed by a letter: it only occurs word-finally, so a
    // letter right after it means a lost space or a confused ending.
    CorruptionPattern {
        label: "taa-marbuta-midword",
        pattern: "\u{0629}[\u{0621}-\u{064A}]",
    },
    // Stray whitespace before Arabic punctuation.
    CorruptionPattern {
        label: "space-before-punctuation",
        pattern: "\\s+[\u{060C}\u{061B}\u{061F}!.،؛؟]",
    },
    // Tatweel runs: OCR stretches kashidas into long underscore-like runs.
    CorruptionPattern {
        label: "tatweel-run",
        pattern: "\u{0640}{3,}",
    },
    // Latin digits embedded mid-word in Arabic text (OCR confusing letters
    // with digits).
    CorruptionPattern {
        label: "digit-in-arabic-word",
        pattern: "[\u{0621}-\u{064A}][0-9]+[\u{0621}-\u{064A}]",
    },
    // A connector letter four or more times in a row: scanner echo.
    CorruptionPattern {
        label: "letter-echo",
        pattern: "\u{0644}{4,}|\u{0645}{4,}|\u{0648}{4,}|\u{064A}{4,}",
    },
];

static COMPILED: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    CORRUPTION_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p.pattern).ok().map(|r| (p.label, r)))
        .collect()
});

/// Labels of every corruption signal the text raises.
pub fn corruption_signals(text: &str) -> Vec<&'static str> {
    COMPILED
        .iter()
        .filter(|(_, regex)| regex.is_match(text))
        .map(|(label, _)| *label)
        .collect()
}

/// Returns true if any corruption pattern matches.
///
/// Texts that raise no signal must never reach the correction model: the
/// round-trip property is that a clean chunk costs zero model calls.
pub fn is_corruption_suspect(text: &str) -> bool {
    COMPILED.iter().any(|(_, regex)| regex.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_patterns_compile() {
        assert_eq!(COMPILED.len(), CORRUPTION_PATTERNS.len());
    }

    #[test]
    fn clean_arabic_raises_no_signal() {
        let clean = "بسم الله الرحمن الرحيم، الحمد لله رب العالمين.";
        assert!(corruption_signals(clean).is_empty());
        assert!(!is_corruption_suspect(clean));
    }

    #[test]
    fn doubled_alef_is_flagged() {
        assert!(corruption_signals("الكتاب االمذكور").contains(&"doubled-alef"));
    }

    #[test]
    fn space_before_punctuation_is_flagged() {
        assert!(corruption_signals("ما الحكم ؟").contains(&"space-before-punctuation"));
    }

    #[test]
    fn tatweel_run_is_flagged() {
        assert!(corruption_signals("كتـــــاب").contains(&"tatweel-run"));
    }

    #[test]
    fn digits_inside_arabic_words_are_flagged() {
        assert!(corruption_signals("الكت1ب").contains(&"digit-in-arabic-word"));
    }

    #[test]
    fn english_text_is_not_suspect() {
        assert!(!is_corruption_suspect("a perfectly ordinary sentence."));
    }
}
