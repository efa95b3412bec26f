
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_SEPARATOR: &str = "\n\n";
pub const DEFAULT_MAX_WORDS: usize = 100;

/// A bounded span of document text used as a retrieval unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text, trimmed and never empty
    pub text: String,
    /// Position of this chunk in document order
    pub index: usize,
}

/// Configuration for document chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Piece separator applied before word-bounding
    pub separator: String,
    /// Maximum number of words in a single chunk
    pub max_words: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            max_words: DEFAULT_MAX_WORDS,
        }
    }
}

/// Split document text into ordered, word-bounded chunks.
///
/// Pieces are produced by splitting on `config.separator`; each piece is
/// trimmed and empty pieces are dropped. Pieces longer than
/// `config.max_words` are split into consecutive word groups, the last of
/// which may be shorter.
#[inline]
pub fn chunk_document(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    let max_words = config.max_words.max(1);
    let mut chunks = Vec::new();

    for piece in split_pieces(text, &config.separator) {
        let words: Vec<&str> = piece.split_whitespace().collect();

        if words.len() <= max_words {
            chunks.push(Chunk {
                text: piece.to_string(),
                index: chunks.len(),
            });
            continue;
        }

        for group in words.chunks(max_words) {
            chunks.push(Chunk {
                text: group.join(" "),
                index: chunks.len(),
            });
        }
    }

    debug!(
        "Chunked {} chars into {} chunks (max {} words)",
        text.len(),
        chunks.len(),
        max_words
    );

    chunks
}

fn split_pieces<'a>(text: &'a str, separator: &'a str) -> impl Iterator<Item = &'a str> {
    let pieces: Box<dyn Iterator<Item = &'a str>> = if separator.is_empty() {
        Box::new(std::iter::once(text))
    } else {
        Box::new(text.split(separator))
    };

    pieces.map(str::trim).filter(|piece| !piece.is_empty())
}

/// Rough token estimate used for prompt budgeting
#[inline]
pub fn estimate_token_count(text: &str) -> usize {
    text.split_whitespace().count()
}
