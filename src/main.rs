use clap::{Parser, Subcommand};
use minirag::Result;
use minirag::commands::{ingest, query, run, show_chunks};
use minirag::config::{Config, get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "minirag")]
#[command(about = "Ask questions about a document with retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and pipeline settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Chunk and embed a document, saving the embeddings
    Ingest {
        /// URL or local file path of the document
        source: String,
        /// Where to write the embeddings (defaults to the configured path)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the chunks a file is split into
    Chunk {
        /// Local text file to split
        file: PathBuf,
    },
    /// Answer questions from previously saved embeddings
    Query {
        /// Embeddings file to load (defaults to the configured path)
        #[arg(long, short)]
        embeddings: Option<PathBuf>,
        /// Number of chunks retrieved per question
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Pick a document interactively, then answer questions about it
    Run,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = get_config_dir()?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Ingest { source, output } => {
            ingest(&Config::load(&config_dir)?, &source, output)?;
        }
        Commands::Chunk { file } => {
            show_chunks(&Config::load(&config_dir)?, &file)?;
        }
        Commands::Query { embeddings, top_n } => {
            query(&Config::load(&config_dir)?, embeddings, top_n)?;
        }
        Commands::Run => {
            run(&Config::load(&config_dir)?)?;
        }
    }

    Ok(())
}
