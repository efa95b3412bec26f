#[cfg(test)]
mod tests;

use console::style;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

use crate::document::{DocumentFetcher, DocumentSource, validate_url};
use crate::embeddings::Embedder;
use crate::generation::TextGenerator;
use crate::pipeline::{Answer, Pipeline};
use crate::Result;

pub const QUERY_PROMPT: &str = "Enter your query (or type 'exit' to quit): ";
pub const SOURCE_MENU_PROMPT: &str = "Enter '1' for URL or '2' for file: ";

/// State of the query loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingQuery,
    Terminated,
}

/// Line-based interactive driver over any reader and writer
#[derive(Debug)]
pub struct Session<R, W> {
    input: R,
    output: W,
    max_attempts: u32,
    state: SessionState,
}

impl<R: BufRead, W: Write> Session<R, W> {
    #[inline]
    pub fn new(input: R, output: W, max_attempts: u32) -> Self {
        Self {
            input,
            output,
            max_attempts: max_attempts.max(1),
            state: SessionState::AwaitingQuery,
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn into_output(self) -> W {
        self.output
    }

    /// Print `prompt` and read one trimmed line; `None` at end of input
    fn prompt_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask whether the document comes from a URL or a file.
    ///
    /// Invalid choices re-prompt up to the attempt limit; `None` when the
    /// limit is reached or input ends.
    #[inline]
    pub fn choose_source(&mut self) -> Result<Option<DocumentSource>> {
        for attempt in 1..=self.max_attempts {
            let Some(choice) = self.prompt_line(SOURCE_MENU_PROMPT)? else {
                return Ok(None);
            };

            match choice.as_str() {
                "1" => {
                    let Some(url) = self.prompt_line("Enter the URL: ")? else {
                        return Ok(None);
                    };
                    match validate_url(&url) {
                        Ok(url) => return Ok(Some(DocumentSource::Url(url))),
                        Err(e) => {
                            writeln!(self.output, "{} {}", style("Error:").red().bold(), e)?;
                        }
                    }
                }
                "2" => {
                    let Some(path) = self.prompt_line("Enter the file path: ")? else {
                        return Ok(None);
                    };
                    return Ok(Some(DocumentSource::File(path.into())));
                }
                _ => {
                    debug!("Invalid menu choice {:?} (attempt {})", choice, attempt);
                    writeln!(
                        self.output,
                        "{}",
                        style("Invalid choice. Please enter '1' or '2'.").yellow()
                    )?;
                }
            }
        }

        writeln!(
            self.output,
            "{}",
            style("Too many invalid attempts.").red()
        )?;
        Ok(None)
    }

    /// Acquire a document and ingest it into `pipeline`.
    ///
    /// Missing files, failed fetches and documents without content are
    /// reported and the user is asked for another source, up to the attempt
    /// limit. Returns whether a document was ingested.
    #[inline]
    pub fn acquire_document<E: Embedder, G: TextGenerator>(
        &mut self,
        fetcher: &DocumentFetcher,
        pipeline: &mut Pipeline<E, G>,
    ) -> Result<bool> {
        for _ in 0..self.max_attempts {
            let Some(source) = self.choose_source()? else {
                return Ok(false);
            };

            let text = match fetcher.load(&source) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to load {}: {}", source, e);
                    writeln!(self.output, "{} {}", style("Error:").red().bold(), e)?;
                    continue;
                }
            };

            match pipeline.ingest(&text) {
                Ok(0) => {
                    writeln!(
                        self.output,
                        "{}",
                        style(format!("No content found in {}.", source)).yellow()
                    )?;
                }
                Ok(count) => {
                    writeln!(
                        self.output,
                        "{}",
                        style(format!("Document split into {} chunks.", count)).green()
                    )?;
                    return Ok(true);
                }
                Err(e) => {
                    warn!("Failed to ingest {}: {}", source, e);
                    writeln!(self.output, "{} {}", style("Error:").red().bold(), e)?;
                }
            }
        }

        writeln!(
            self.output,
            "{}",
            style("No document loaded after repeated attempts.").red()
        )?;
        Ok(false)
    }

    /// Answer queries until `exit` or end of input; returns queries answered
    #[inline]
    pub fn run_queries<E: Embedder, G: TextGenerator>(
        &mut self,
        pipeline: &Pipeline<E, G>,
    ) -> Result<usize> {
        let mut answered = 0;
        self.state = SessionState::AwaitingQuery;

        while self.state == SessionState::AwaitingQuery {
            writeln!(self.output)?;
            let Some(query) = self.prompt_line(QUERY_PROMPT)? else {
                self.state = SessionState::Terminated;
                break;
            };

            if query.eq_ignore_ascii_case("exit") {
                self.state = SessionState::Terminated;
                break;
            }
            if query.is_empty() {
                continue;
            }

            match pipeline.answer(&query) {
                Ok(answer) => {
                    self.print_answer(&answer)?;
                    answered += 1;
                }
                Err(e) => {
                    warn!("Query failed: {}", e);
                    writeln!(self.output, "{} {}", style("Error:").red().bold(), e)?;
                    writeln!(self.output, "Please try again.")?;
                }
            }
        }

        debug!("Session terminated after {} answered queries", answered);
        Ok(answered)
    }

    fn print_answer(&mut self, answer: &Answer) -> Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "{}", style("📌 Retrieved Chunks:").bold().cyan())?;
        for (i, chunk) in answer.retrieved.iter().enumerate() {
            writeln!(self.output)?;
            writeln!(
                self.output,
                "Chunk {} {}: {}",
                i + 1,
                style(format!("(score {:.4})", chunk.score)).dim(),
                chunk.text
            )?;
        }

        writeln!(self.output)?;
        writeln!(self.output, "{}", style("🤖 AI Response:").bold().green())?;
        writeln!(self.output, "{}", answer.response)?;
        Ok(())
    }
}
