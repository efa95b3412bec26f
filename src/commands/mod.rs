
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::Result;
use crate::config::Config;
use crate::document::{DocumentFetcher, DocumentSource, read_file};
use crate::embeddings::chunk_document;
use crate::ollama::OllamaClient;
use crate::pipeline::Pipeline;
use crate::session::Session;
use crate::store::VectorStore;

/// Connect to Ollama and verify both models are available.
///
/// Failure here is fatal to every command that needs the models.
#[inline]
pub fn connect(config: &Config) -> Result<OllamaClient> {
    let client = OllamaClient::new(&config.ollama)?;
    client.health_check()?;
    Ok(client)
}

fn embedding_progress() -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding chunks {wide_bar}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(0).with_style(style)
}

fn new_pipeline<'a>(
    client: &'a OllamaClient,
    config: &Config,
) -> Pipeline<&'a OllamaClient, &'a OllamaClient> {
    Pipeline::new(client, client, config.pipeline.clone())
        .with_batch_size(config.ollama.batch_size as usize)
        .with_progress(embedding_progress())
}

fn shutdown_pipeline(pipeline: Pipeline<&OllamaClient, &OllamaClient>) {
    if let Err(e) = pipeline.shutdown() {
        warn!("Failed to release generation model: {}", e);
    }
}

/// Chunk and embed a document, then save the embeddings
#[inline]
pub fn ingest(config: &Config, source: &str, output: Option<PathBuf>) -> Result<()> {
    let source = DocumentSource::parse(source);
    let output = output.unwrap_or_else(|| config.session.embeddings_path.clone());
    info!("Ingesting {} into {}", source, output.display());

    let fetcher = DocumentFetcher::new(&config.session.document_path);
    let text = fetcher.load(&source)?;
    if let DocumentSource::Url(_) = source {
        println!(
            "Saved page text to {}",
            style(fetcher.document_path().display()).cyan()
        );
    }

    let client = connect(config)?;
    let mut pipeline = new_pipeline(&client, config);

    let count = pipeline.ingest(&text)?;
    if count == 0 {
        println!("{}", style(format!("No content found in {}.", source)).yellow());
        shutdown_pipeline(pipeline);
        return Ok(());
    }

    pipeline.store().save(&output)?;
    println!(
        "{} {} chunks ({} unique) saved to {}",
        style("✓").green(),
        count,
        pipeline.store().len(),
        style(output.display()).cyan()
    );

    shutdown_pipeline(pipeline);
    Ok(())
}

/// Print the chunks a file would be split into
#[inline]
pub fn show_chunks(config: &Config, path: &Path) -> Result<()> {
    let text = read_file(path)?;
    let chunks = chunk_document(&text, &config.pipeline.chunking());

    if chunks.is_empty() {
        println!("{}", style(format!("No content found in {}.", path.display())).yellow());
        return Ok(());
    }

    println!("File successfully split into {} chunks.\n", chunks.len());
    for chunk in &chunks {
        println!("Chunk {}:\n{}\n{}", chunk.index + 1, chunk.text, "-".repeat(40));
    }

    Ok(())
}

/// Load saved embeddings and answer queries interactively
#[inline]
pub fn query(config: &Config, embeddings: Option<PathBuf>, top_n: Option<usize>) -> Result<()> {
    let path = embeddings.unwrap_or_else(|| config.session.embeddings_path.clone());

    let store = match VectorStore::load(&path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!(
                "Could not load embeddings from {}. Run `minirag ingest <SOURCE>` to create them.",
                style(path.display()).cyan()
            );
            return Err(e);
        }
    };

    let mut pipeline_config = config.pipeline.clone();
    if let Some(top_n) = top_n {
        pipeline_config.set_top_n(top_n)?;
    }

    let client = connect(config)?;
    let pipeline = Pipeline::new(&client, &client, pipeline_config).with_store(store);

    println!(
        "Loaded {} chunks from {}",
        pipeline.store().len(),
        style(path.display()).cyan()
    );

    let stdin = io::stdin();
    let mut session = Session::new(stdin.lock(), io::stdout(), config.session.max_attempts);
    session.run_queries(&pipeline)?;

    shutdown_pipeline(pipeline);
    Ok(())
}

/// Choose a document, ingest it and answer queries in one session
#[inline]
pub fn run(config: &Config) -> Result<()> {
    let client = connect(config)?;
    let mut pipeline = new_pipeline(&client, config);
    let fetcher = DocumentFetcher::new(&config.session.document_path);

    let stdin = io::stdin();
    let mut session = Session::new(stdin.lock(), io::stdout(), config.session.max_attempts);

    if !session.acquire_document(&fetcher, &mut pipeline)? {
        shutdown_pipeline(pipeline);
        return Ok(());
    }

    if let Err(e) = pipeline.store().save(&config.session.embeddings_path) {
        warn!(
            "Failed to save embeddings to {}: {}",
            config.session.embeddings_path.display(),
            e
        );
    }

    session.run_queries(&pipeline)?;
    shutdown_pipeline(pipeline);
    Ok(())
}
