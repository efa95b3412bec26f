#[cfg(test)]
mod tests;

use itertools::Itertools;
use std::borrow::Cow;
use tracing::{debug, warn};

use crate::embeddings::chunking::estimate_token_count;
use crate::{RagError, Result};

/// Instruction template wrapped around the retrieved context and the query
pub const PROMPT_TEMPLATE: &str =
    "Answer the following question based on the context:\n\nContext: {context}\n\nQuestion: {query}";

/// Decoding parameters sent with every generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Prompt budget; longer prompts lose their tail
    pub max_input_tokens: usize,
    pub max_output_tokens: usize,
    /// Beam width for backends that support beam search
    pub beam_width: Option<u32>,
    pub early_stopping: bool,
}

impl Default for GenerationConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_input_tokens: 512,
            max_output_tokens: 150,
            beam_width: None,
            early_stopping: false,
        }
    }
}

impl GenerationConfig {
    /// Settings that have no effect on a backend without beam search
    #[inline]
    pub fn ignored_without_beam_search(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if self.beam_width.is_some_and(|width| width > 1) {
            ignored.push("beam_width");
        }
        if self.early_stopping {
            ignored.push("early_stopping");
        }
        ignored
    }
}

/// A handle to a generative text model
pub trait TextGenerator {
    /// Produce a completion for an already assembled prompt
    fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;

    #[inline]
    fn supports_beam_search(&self) -> bool {
        false
    }

    /// Release any resources held by the model
    #[inline]
    fn release(&self) -> Result<()> {
        Ok(())
    }
}

impl<G: TextGenerator + ?Sized> TextGenerator for &G {
    #[inline]
    fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        (**self).complete(prompt, config)
    }

    #[inline]
    fn supports_beam_search(&self) -> bool {
        (**self).supports_beam_search()
    }

    #[inline]
    fn release(&self) -> Result<()> {
        (**self).release()
    }
}

/// Assemble the prompt for `query` from the retrieved chunk texts
#[inline]
pub fn build_prompt<S: AsRef<str>>(query: &str, context_chunks: &[S]) -> String {
    let context = context_chunks.iter().map(AsRef::as_ref).join(" ");

    PROMPT_TEMPLATE
        .replace("{context}", &context)
        .replace("{query}", query)
}

/// Keep the first `max_tokens` tokens of `text`, dropping everything after
#[inline]
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> Cow<'_, str> {
    let mut tokens = 0;
    let mut in_token = false;

    for (offset, c) in text.char_indices() {
        if c.is_whitespace() {
            in_token = false;
        } else if !in_token {
            in_token = true;
            if tokens == max_tokens {
                let kept = text.get(..offset).unwrap_or(text).trim_end();
                return Cow::Owned(kept.to_string());
            }
            tokens += 1;
        }
    }

    Cow::Borrowed(text)
}

/// Answers queries from retrieved context using a [`TextGenerator`]
#[derive(Debug)]
pub struct Generator<G> {
    backend: G,
    config: GenerationConfig,
}

impl<G: TextGenerator> Generator<G> {
    #[inline]
    pub fn new(backend: G, config: GenerationConfig) -> Self {
        if !backend.supports_beam_search() {
            let ignored = config.ignored_without_beam_search();
            if !ignored.is_empty() {
                warn!(
                    "Beam search is not supported by this backend; ignoring {} and using greedy decoding",
                    ignored.join(", ")
                );
            }
        }

        Self { backend, config }
    }

    #[inline]
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    #[inline]
    pub fn backend(&self) -> &G {
        &self.backend
    }

    /// Generate an answer to `query` grounded in `context_chunks`
    #[inline]
    pub fn generate<S: AsRef<str>>(&self, query: &str, context_chunks: &[S]) -> Result<String> {
        let prompt = build_prompt(query, context_chunks);
        let prompt = truncate_to_tokens(&prompt, self.config.max_input_tokens);

        debug!(
            "Generating answer from {} chunks (prompt ~{} tokens)",
            context_chunks.len(),
            estimate_token_count(&prompt)
        );

        let response = self
            .backend
            .complete(&prompt, &self.config)
            .map_err(|e| match e {
                RagError::Generation(_) => e,
                other => RagError::Generation(other.to_string()),
            })?;

        let response = response.trim();
        if response.is_empty() {
            return Err(RagError::Generation(
                "Model returned an empty response".to_string(),
            ));
        }

        Ok(response.to_string())
    }

    /// Release the backend model
    #[inline]
    pub fn shutdown(self) -> Result<()> {
        self.backend.release()
    }
}
