//! Arabic-aware text utilities.
//!
//! Language routing across the pipeline is driven by the ratio of
//! Arabic-block characters to non-whitespace characters. The thresholds
//! here are shared by the query analyzer (routing translation), the
//! ingestion pipeline (forcing OCR on Arabic pages), and the correction
//! loop (deciding whether a page is worth correcting inline).

pub mod corruption;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Ratio above which a text is classified as Arabic.
pub const ARABIC_THRESHOLD: f32 = 0.7;

/// Ratio below which a text is classified as English.
pub const ENGLISH_THRESHOLD: f32 = 0.3;

/// Detected language of a text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Predominantly Arabic-script text.
    Ar,
    /// Predominantly non-Arabic (treated as English) text.
    En,
    /// A mixture of both scripts.
    Mixed,
}

impl Language {
    /// Returns the display name used in prompts and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ar => "Arabic",
            Self::En => "English",
            Self::Mixed => "mixed",
        }
    }
}

/// Returns true if the character falls in an Arabic Unicode block.
///
/// Covers the base block, the supplement, and the presentation forms that
/// OCR output frequently contains.
pub fn is_arabic_char(c: char) -> bool {
    matches!(
        c,
        '\u{0600}'..='\u{06FF}'   // Arabic
        | '\u{0750}'..='\u{077F}' // Arabic Supplement
        | '\u{08A0}'..='\u{08FF}' // Arabic Extended-A
        | '\u{FB50}'..='\u{FDFF}' // Presentation Forms-A
        | '\u{FE70}'..='\u{FEFF}' // Presentation Forms-B
    )
}

/// Counts Arabic-block characters in a text.
pub fn arabic_char_count(text: &str) -> usize {
    text.chars().filter(|c| is_arabic_char(*c)).count()
}

/// Ratio of Arabic-block characters to non-whitespace characters.
///
/// Returns 0.0 for texts with no non-whitespace content.
pub fn arabic_ratio(text: &str) -> f32 {
    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return 0.0;
    }
    arabic_char_count(text) as f32 / total as f32
}

/// Classifies a text as Arabic, English, or mixed.
///
/// Total and idempotent: every string maps to exactly one [`Language`].
/// A ratio above 0.7 is Arabic, below 0.3 English, anything between mixed.
pub fn detect_language(text: &str) -> Language {
    let ratio = arabic_ratio(text);
    if ratio > ARABIC_THRESHOLD {
        Language::Ar
    } else if ratio < ENGLISH_THRESHOLD {
        Language::En
    } else {
        Language::Mixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_arabic_maps_to_ar() {
        assert_eq!(detect_language("السلام عليكم ورحمة الله"), Language::Ar);
    }

    #[test]
    fn pure_english_maps_to_en() {
        assert_eq!(detect_language("hello there, general"), Language::En);
    }

    #[test]
    fn balanced_text_maps_to_mixed() {
        // Half Arabic, half Latin by non-whitespace count.
        assert_eq!(detect_language("كتاب book كتب read"), Language::Mixed);
    }

    #[test]
    fn empty_and_whitespace_map_to_en() {
        assert_eq!(detect_language(""), Language::En);
        assert_eq!(detect_language("   \n\t"), Language::En);
    }

    #[test]
    fn detection_is_idempotent() {
        let samples = ["مرحبا", "hello", "abc وعليكم"];
        for s in samples {
            assert_eq!(detect_language(s), detect_language(s));
        }
    }

    #[test]
    fn presentation_forms_count_as_arabic() {
        // U+FE8D is an Arabic presentation form of alef.
        assert!(is_arabic_char('\u{FE8D}'));
        assert!(!is_arabic_char('a'));
        assert!(!is_arabic_char('7'));
    }

    #[test]
    fn ratio_ignores_whitespace() {
        let text = "كتاب   \n  كتاب";
        assert!((arabic_ratio(text) - 1.0).abs() < f32::EPSILON);
    }
}
