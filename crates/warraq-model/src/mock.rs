//! Mock model backends for testing.
//!
//! Deterministic [`TextModel`] / [`TextEmbedder`] implementations used by
//! cascade, pipeline, and retrieval tests. Available to downstream crates
//! through the `test-utils` feature.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use warraq_core::{Error, Result};

use crate::provider::{TextEmbedder, TextModel};

/// Shared call counter handle for asserting on attempt sequencing.
#[derive(Debug, Clone, Default)]
pub struct CallCount(Arc<AtomicUsize>);

impl CallCount {
    /// Number of calls observed so far.
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

enum MockBehavior {
    Succeed(String),
    Fail,
    /// Responses returned in order; the last one repeats.
    Script(Vec<String>),
    /// Response computed from the prompt.
    Respond(Box<dyn Fn(&str) -> Result<String> + Send + Sync>),
}

/// Deterministic completion model for tests.
pub struct MockModel {
    name: String,
    behavior: MockBehavior,
    calls: CallCount,
}

impl MockModel {
    /// A model that always returns `response`.
    pub fn succeeding(name: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: MockBehavior::Succeed(response.into()),
            calls: CallCount::default(),
        }
    }

    /// A model that always errors.
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: MockBehavior::Fail,
            calls: CallCount::default(),
        }
    }

    /// A model that replays `responses` in order, repeating the last.
    pub fn scripted(name: impl Into<String>, responses: Vec<String>) -> Self {
        Self {
            name: name.into(),
            behavior: MockBehavior::Script(responses),
            calls: CallCount::default(),
        }
    }

    /// A model that computes its response from the prompt, for tests that
    /// route several task kinds through one cascade.
    pub fn with_responder(
        name: impl Into<String>,
        responder: impl Fn(&str) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            behavior: MockBehavior::Respond(Box::new(responder)),
            calls: CallCount::default(),
        }
    }

    /// Handle to this model's call counter.
    pub fn call_count(&self) -> CallCount {
        self.calls.clone()
    }
}

#[async_trait::async_trait]
impl TextModel for MockModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let call_index = self.calls.get();
        self.calls.increment();

        match &self.behavior {
            MockBehavior::Succeed(response) => Ok(response.clone()),
            MockBehavior::Fail => Err(Error::model(&self.name, "mock failure")),
            MockBehavior::Script(responses) => {
                let index = call_index.min(responses.len().saturating_sub(1));
                responses
                    .get(index)
                    .cloned()
                    .ok_or_else(|| Error::model(&self.name, "empty script"))
            }
            MockBehavior::Respond(responder) => responder(prompt),
        }
    }
}

enum MockEmbedderBehavior {
    Succeed,
    Fail,
    RateLimited,
    /// Rate-limited for the first N calls, then succeed.
    RateLimitedTimes(usize),
}

/// Deterministic embedder for tests.
///
/// Successful embeddings are derived from the text's bytes so that equal
/// texts embed equally and different texts (usually) differ.
pub struct MockEmbedder {
    name: String,
    dimensions: usize,
    behavior: MockEmbedderBehavior,
    calls: CallCount,
}

impl MockEmbedder {
    /// An embedder that always succeeds.
    pub fn new(name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            dimensions,
            behavior: MockEmbedderBehavior::Succeed,
            calls: CallCount::default(),
        }
    }

    /// An embedder that always errors.
    pub fn failing(name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            dimensions,
            behavior: MockEmbedderBehavior::Fail,
            calls: CallCount::default(),
        }
    }

    /// An embedder that always reports a quota error.
    pub fn rate_limited(name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            dimensions,
            behavior: MockEmbedderBehavior::RateLimited,
            calls: CallCount::default(),
        }
    }

    /// An embedder that reports quota errors for the first `times` calls,
    /// then succeeds.
    pub fn rate_limited_times(name: impl Into<String>, dimensions: usize, times: usize) -> Self {
        Self {
            name: name.into(),
            dimensions,
            behavior: MockEmbedderBehavior::RateLimitedTimes(times),
            calls: CallCount::default(),
        }
    }

    /// Handle to this embedder's call counter.
    pub fn call_count(&self) -> CallCount {
        self.calls.clone()
    }

    /// The deterministic vector this mock produces for `text`.
    pub fn vector_for(text: &str, dimensions: usize) -> Vec<f32> {
        let mut vector = vec![0.0_f32; dimensions];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % dimensions] += byte as f32 / 255.0;
        }
        // Unit-normalize so cosine similarity behaves.
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait::async_trait]
impl TextEmbedder for MockEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let call_index = self.calls.get();
        self.calls.increment();

        match &self.behavior {
            MockEmbedderBehavior::Succeed => Ok(Self::vector_for(text, self.dimensions)),
            MockEmbedderBehavior::Fail => Err(Error::embedding("mock embedding failure")),
            MockEmbedderBehavior::RateLimited => Err(Error::rate_limited("mock quota exceeded")),
            MockEmbedderBehavior::RateLimitedTimes(times) => {
                if call_index < *times {
                    Err(Error::rate_limited("mock quota exceeded"))
                } else {
                    Ok(Self::vector_for(text, self.dimensions))
                }
            }
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}
