// Deterministic stand-ins for the model backends used by unit tests

use std::cell::{Cell, RefCell};

use crate::embeddings::Embedder;
use crate::generation::{GenerationConfig, TextGenerator};
use crate::{RagError, Result};

const VOCABULARY: &[&str] = &[
    "cat", "mammal", "sky", "blue", "color", "water", "wet", "rust", "fast",
];

/// Bag-of-words embedder over a tiny fixed vocabulary
#[derive(Debug, Default)]
pub(crate) struct KeywordEmbedder {
    pub calls: Cell<usize>,
    pub fail_on: Option<String>,
}

impl KeywordEmbedder {
    pub(crate) fn failing_on(fragment: &str) -> Self {
        Self {
            fail_on: Some(fragment.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn vector_for(text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        VOCABULARY
            .iter()
            .map(|term| {
                lowered
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|word| word.starts_with(term))
                    .count() as f32
            })
            .collect()
    }
}

impl Embedder for KeywordEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.set(self.calls.get() + 1);
        if let Some(fragment) = self.fail_on.as_deref() {
            if texts.iter().any(|text| text.contains(fragment)) {
                return Err(RagError::Embedding("embedding model crashed".to_string()));
            }
        }
        Ok(texts.iter().map(|text| Self::vector_for(text)).collect())
    }
}

/// Generator that answers from a script and records prompts
#[derive(Debug, Default)]
pub(crate) struct ScriptedGenerator {
    pub prompts: RefCell<Vec<String>>,
    pub fail_on: Option<String>,
    pub released: Cell<bool>,
}

impl ScriptedGenerator {
    pub(crate) fn failing_on(query_fragment: &str) -> Self {
        Self {
            fail_on: Some(query_fragment.to_string()),
            ..Self::default()
        }
    }
}

impl TextGenerator for ScriptedGenerator {
    fn complete(&self, prompt: &str, _config: &GenerationConfig) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());

        if self
            .fail_on
            .as_deref()
            .is_some_and(|fragment| prompt.contains(fragment))
        {
            return Err(RagError::Generation("model unavailable".to_string()));
        }

        let context = prompt
            .split("Context: ")
            .nth(1)
            .and_then(|rest| rest.split("\n\n").next())
            .unwrap_or_default();
        Ok(format!("Based on: {}", context))
    }

    fn release(&self) -> Result<()> {
        self.released.set(true);
        Ok(())
    }
}
