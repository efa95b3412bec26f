
use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::embeddings::{Embedder, chunk_document};
use crate::generation::{Generator, TextGenerator};
use crate::retrieval::{RetrievedChunk, retrieve};
use crate::store::VectorStore;
use crate::{RagError, Result};

const DEFAULT_INGEST_BATCH_SIZE: usize = 16;

/// Retrieved context and generated answer for one query
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub retrieved: Vec<RetrievedChunk>,
    pub response: String,
}

/// Chunk, embed, retrieve and generate with injected model handles
#[derive(Debug)]
pub struct Pipeline<E, G> {
    embedder: E,
    generator: Generator<G>,
    config: PipelineConfig,
    store: VectorStore,
    batch_size: usize,
    progress: ProgressBar,
}

impl<E: Embedder, G: TextGenerator> Pipeline<E, G> {
    #[inline]
    pub fn new(embedder: E, generator: G, config: PipelineConfig) -> Self {
        let generator = Generator::new(generator, config.generation());

        Self {
            embedder,
            generator,
            config,
            store: VectorStore::new(),
            batch_size: DEFAULT_INGEST_BATCH_SIZE,
            progress: ProgressBar::hidden(),
        }
    }

    /// Start from previously persisted embeddings
    #[inline]
    pub fn with_store(mut self, store: VectorStore) -> Self {
        self.store = store;
        self
    }

    /// Number of chunks sent to the embedder per request during ingestion
    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Report ingestion progress on `progress`
    #[inline]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    #[inline]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[inline]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Chunk `text`, embed every chunk and add it to the store.
    ///
    /// Returns the number of chunks produced; zero means the document had
    /// no usable content. On error the store is left as it was.
    #[inline]
    pub fn ingest(&mut self, text: &str) -> Result<usize> {
        let chunks = chunk_document(text, &self.config.chunking());
        if chunks.is_empty() {
            info!("Document produced no chunks");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.into_iter().map(|chunk| chunk.text).collect();
        self.progress.set_length(texts.len() as u64);
        self.progress.set_position(0);

        // Written to a copy so a failed batch leaves the store untouched
        let mut staged = self.store.clone();
        let result = self.embed_into(&texts, &mut staged);
        self.progress.finish_and_clear();
        result?;
        self.store = staged;

        info!(
            "Ingested {} chunks ({} unique in store)",
            texts.len(),
            self.store.len()
        );
        Ok(texts.len())
    }

    fn embed_into(&self, texts: &[String], store: &mut VectorStore) -> Result<()> {
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.embedder.embed(batch)?;
            if vectors.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            for (text, vector) in batch.iter().zip(vectors) {
                store.put(text.as_str(), vector)?;
            }
            self.progress.inc(batch.len() as u64);
        }
        Ok(())
    }

    /// Top chunks for `query` using the configured top-n
    #[inline]
    pub fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        let query_vector = self.embedder.embed_one(query)?;
        retrieve(&query_vector, &self.store, self.config.top_n)
    }

    /// Retrieve context for `query` and generate an answer from it
    #[inline]
    pub fn answer(&self, query: &str) -> Result<Answer> {
        let retrieved = self.retrieve(query)?;
        debug!("Answering '{}' with {} chunks", query, retrieved.len());

        let context: Vec<&str> = retrieved.iter().map(|c| c.text.as_str()).collect();
        let response = self.generator.generate(query, &context)?;

        Ok(Answer {
            retrieved,
            response,
        })
    }

    /// End the model lifecycle, returning the store
    #[inline]
    pub fn shutdown(self) -> Result<VectorStore> {
        self.generator.shutdown()?;
        Ok(self.store)
    }
}
