//! Task abstraction for model invocation.
//!
//! Every component above this layer speaks in tasks, never in model
//! identities. A [`Task`] carries the prompt to send, the source text its
//! deterministic fallback derives from, and the task-specific acceptance
//! check applied to each candidate response.

use strum::{AsRefStr, Display};
use warraq_core::text::{Language, arabic_char_count};
use warraq_core::types::QueryType;

/// Maximum relative length deviation an accepted correction may show.
pub const CORRECTION_MAX_LENGTH_DEVIATION: f32 = 0.30;

/// Maximum relative Arabic-character-count deviation an accepted correction
/// may show.
pub const CORRECTION_MAX_ARABIC_DEVIATION: f32 = 0.20;

/// Keyword count bounds for query expansion.
const MIN_KEYWORDS: usize = 1;
const MAX_KEYWORDS: usize = 5;

/// Kind of model invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TaskKind {
    /// Translate a query into the document language.
    Translate,
    /// Classify a query's intent.
    Classify,
    /// Suggest expansion keywords for a query.
    ExpandKeywords,
    /// Repair OCR/transcription corruption in a text.
    CorrectText,
    /// Extract text from a rendered page image.
    OcrPage,
    /// Generate the final answer from retrieved context.
    GenerateAnswer,
}

impl TaskKind {
    /// Returns true when exhausting the cascade has a safe deterministic
    /// fallback; false means exhaustion is a terminal error.
    pub fn has_fallback(&self) -> bool {
        !matches!(self, Self::OcrPage | Self::GenerateAnswer)
    }
}

/// One logical model invocation: prompt, source text, and acceptance rules.
#[derive(Debug, Clone)]
pub struct Task {
    kind: TaskKind,
    prompt: String,
    source: String,
}

impl Task {
    /// Builds a translation task into the target language.
    pub fn translate(query: &str, target: Language) -> Self {
        let prompt = format!(
            "Translate the following question into {}. \
             Return only the translation, nothing else.\n\n{}",
            target.name(),
            query
        );
        Self {
            kind: TaskKind::Translate,
            prompt,
            source: query.to_string(),
        }
    }

    /// Builds an intent classification task.
    pub fn classify(query: &str) -> Self {
        let prompt = format!(
            "Classify the following question as exactly one of: \
             narrative, analytical, factual, thematic, comparative. \
             Answer with the single word only.\n\n{query}"
        );
        Self {
            kind: TaskKind::Classify,
            prompt,
            source: query.to_string(),
        }
    }

    /// Builds a keyword expansion task.
    pub fn expand_keywords(query: &str) -> Self {
        let prompt = format!(
            "Suggest 3 to 5 search keywords for the following question, \
             in the question's own language. \
             Return them comma-separated on one line.\n\n{query}"
        );
        Self {
            kind: TaskKind::ExpandKeywords,
            prompt,
            source: query.to_string(),
        }
    }

    /// Builds a text correction task.
    pub fn correct_text(text: &str, language: Language) -> Self {
        let prompt = format!(
            "The following {} text was produced by OCR and may contain \
             spelling mistakes, wrong hamza placement, confused letter \
             endings, or stray whitespace. Fix these artifacts while \
             preserving the meaning, wording, and length. \
             Return only the corrected text.\n\n{}",
            language.name(),
            text
        );
        Self {
            kind: TaskKind::CorrectText,
            prompt,
            source: text.to_string(),
        }
    }

    /// Builds a vision OCR task over a base64-encoded page image.
    pub fn ocr_page(image_base64: &str) -> Self {
        let prompt = format!(
            "Extract all text visible in this scanned book page. \
             Preserve the original paragraph structure. \
             If no text is visible, respond with an empty line.\n\n\
             [Image: {image_base64}]"
        );
        Self {
            kind: TaskKind::OcrPage,
            prompt,
            source: String::new(),
        }
    }

    /// Builds an answer generation task over a caller-assembled prompt.
    pub fn generate_answer(prompt: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::GenerateAnswer,
            prompt: prompt.into(),
            source: String::new(),
        }
    }

    /// The task kind.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// The prompt sent to each model in the cascade.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The input text fallbacks derive from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Task-specific sanity check applied to each candidate response.
    ///
    /// A rejected response moves the cascade on to the next model.
    pub fn accepts(&self, response: &str) -> bool {
        let trimmed = response.trim();
        if trimmed.is_empty() && self.kind != TaskKind::OcrPage {
            return false;
        }

        match self.kind {
            TaskKind::Classify => parse_query_type(trimmed).is_some(),
            TaskKind::ExpandKeywords => parse_keywords(trimmed).len() >= MIN_KEYWORDS,
            TaskKind::CorrectText => validate_correction(&self.source, trimmed),
            TaskKind::Translate | TaskKind::OcrPage | TaskKind::GenerateAnswer => true,
        }
    }

    /// Deterministic result used when every model in the cascade failed.
    ///
    /// `None` means the task is terminal: exhaustion must surface as an
    /// error to the caller.
    pub fn fallback(&self) -> Option<String> {
        match self.kind {
            // The untranslated query still retrieves something.
            TaskKind::Translate => Some(self.source.clone()),
            TaskKind::Classify => Some(QueryType::FALLBACK.to_string()),
            TaskKind::ExpandKeywords => Some(naive_keywords(&self.source).join(", ")),
            // Never degrade data: no change is the safe correction.
            TaskKind::CorrectText => Some(self.source.clone()),
            TaskKind::OcrPage | TaskKind::GenerateAnswer => None,
        }
    }
}

/// Parses a classification response into a query type.
///
/// Accepts the bare label or a label embedded in a short sentence.
pub fn parse_query_type(response: &str) -> Option<QueryType> {
    let lowered = response.to_lowercase();
    [
        QueryType::Comparative,
        QueryType::Narrative,
        QueryType::Analytical,
        QueryType::Factual,
        QueryType::Thematic,
    ]
    .into_iter()
    .find(|t| lowered.contains(t.as_ref()))
}

/// Parses a keyword expansion response into at most five keywords.
pub fn parse_keywords(response: &str) -> Vec<String> {
    response
        .split(|c: char| c == ',' || c == '\n' || c == '؛' || c == ';')
        .map(|s| s.trim().trim_matches(|c: char| c == '-' || c == '.').trim())
        .filter(|s| !s.is_empty() && s.chars().count() <= 60)
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect()
}

/// Naive length-filtered token list, the keyword fallback.
fn naive_keywords(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect()
}

/// Bounded-deviation acceptance check for corrected text.
///
/// Both bounds must hold: corrected length within 30% of the original
/// length, and Arabic character count within 20% of the original count.
/// Corrections violating either bound are never persisted.
pub fn validate_correction(original: &str, corrected: &str) -> bool {
    let original_len = original.chars().count();
    let corrected_len = corrected.chars().count();
    if original_len == 0 || corrected_len == 0 {
        return false;
    }

    let length_deviation =
        (corrected_len as f32 - original_len as f32).abs() / original_len as f32;
    if length_deviation > CORRECTION_MAX_LENGTH_DEVIATION {
        return false;
    }

    let original_arabic = arabic_char_count(original);
    let corrected_arabic = arabic_char_count(corrected);
    if original_arabic == 0 {
        // Nothing to bound against; length already checked.
        return true;
    }

    let arabic_deviation =
        (corrected_arabic as f32 - original_arabic as f32).abs() / original_arabic as f32;
    arabic_deviation <= CORRECTION_MAX_ARABIC_DEVIATION
}
