
use serde::Serialize;
use tracing::debug;

use crate::store::VectorStore;
use crate::{RagError, Result};

pub const DEFAULT_TOP_N: usize = 3;

/// A stored chunk paired with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub score: f32,
}

/// Cosine similarity of two equal-length vectors.
///
/// Returns 0.0 when either vector has zero norm.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// Rank every stored chunk against `query` and keep the best `top_n`.
///
/// Results are ordered by descending similarity; equal scores keep store
/// insertion order.
#[inline]
pub fn retrieve(query: &[f32], store: &VectorStore, top_n: usize) -> Result<Vec<RetrievedChunk>> {
    if let Some(expected) = store.dimension() {
        if query.len() != expected {
            return Err(RagError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }
    }

    let mut scored: Vec<RetrievedChunk> = store
        .entries()
        .map(|(text, vector)| RetrievedChunk {
            text: text.to_string(),
            score: cosine_similarity(query, vector),
        })
        .collect();

    // `sort_by` is stable, so ties keep insertion order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_n);

    debug!(
        "Retrieved {} of {} chunks (best score {:?})",
        scored.len(),
        store.len(),
        scored.first().map(|c| c.score)
    );

    Ok(scored)
}
