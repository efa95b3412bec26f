// Embeddings module
// Chunking of raw documents and the embedding model boundary

pub mod chunking;


use crate::{RagError, Result};

pub use chunking::{Chunk, ChunkingConfig, chunk_document, estimate_token_count};

/// A handle to an embedding model.
///
/// Implementations are created once and reused for every call; the same
/// handle must produce every vector compared in one retrieval.
pub trait Embedder {
    /// Embed a batch of texts, returning one vector per input in input order
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    #[inline]
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("Model returned no embedding".to_string()))
    }
}

impl<E: Embedder + ?Sized> Embedder for &E {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed(texts)
    }

    #[inline]
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed_one(text)
    }
}
