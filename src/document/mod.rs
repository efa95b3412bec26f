#[cfg(test)]
mod tests;

use itertools::Itertools;
use scraper::{Html, Selector};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use ureq::Agent;
use url::Url;

use crate::{RagError, Result};

const DEFAULT_USER_AGENT: &str = "minirag/0.1.0 (Document Fetcher)";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Where a document is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Url(Url),
    File(PathBuf),
}

impl DocumentSource {
    /// Interpret user input as an HTTP(S) URL, or else a file path
    #[inline]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match Url::parse(input) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Self::Url(url),
            _ => Self::File(PathBuf::from(input)),
        }
    }
}

impl fmt::Display for DocumentSource {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Validate a URL entered by the user
#[inline]
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str.trim())
        .map_err(|e| RagError::Network(format!("Invalid URL format '{}': {}", url_str, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(RagError::Network(format!(
            "URL must use HTTP or HTTPS scheme: {}",
            url_str
        )));
    }

    Ok(url)
}

/// Acquires document text from local files and web pages
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    agent: Agent,
    document_path: PathBuf,
}

impl DocumentFetcher {
    /// `document_path` receives the text extracted from fetched pages
    #[inline]
    pub fn new(document_path: impl Into<PathBuf>) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .into();

        Self {
            agent,
            document_path: document_path.into(),
        }
    }

    #[inline]
    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    #[inline]
    pub fn load(&self, source: &DocumentSource) -> Result<String> {
        match source {
            DocumentSource::Url(url) => self.fetch_url(url),
            DocumentSource::File(path) => read_file(path),
        }
    }

    /// Fetch a page, keep its paragraph text and save it to the document path
    #[inline]
    pub fn fetch_url(&self, url: &Url) -> Result<String> {
        debug!("Making HTTP GET request to: {}", url);

        let html = match self.agent.get(url.as_str()).call() {
            Ok(mut response) => response.body_mut().read_to_string().map_err(|e| {
                RagError::Network(format!("Failed to read response body from {}: {}", url, e))
            })?,
            Err(ureq::Error::StatusCode(status)) => {
                debug!("HTTP request failed with status {}: {}", status, url);
                return Err(RagError::Network(format!(
                    "Failed to retrieve {}: HTTP {}",
                    url, status
                )));
            }
            Err(e) => {
                debug!("HTTP request failed with transport error: {}", e);
                return Err(RagError::Network(format!(
                    "Failed to make HTTP request to {}: {}",
                    url, e
                )));
            }
        };

        let text = extract_paragraphs(&html);
        fs::write(&self.document_path, &text)?;

        info!(
            "Saved {} chars of paragraph text from {} to {}",
            text.len(),
            url,
            self.document_path.display()
        );
        Ok(text)
    }
}

/// Read a UTF-8 text file
#[inline]
pub fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(RagError::NotFound(format!(
            "The file '{}' does not exist",
            path.display()
        )));
    }

    let text = fs::read_to_string(path)?;
    debug!("Read {} chars from {}", text.len(), path.display());
    Ok(text)
}

/// Visible text of every `<p>` element, one paragraph per block
#[inline]
pub fn extract_paragraphs(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };

    document
        .select(&selector)
        .map(|paragraph| paragraph.text().collect::<String>())
        .map(|text| text.split_whitespace().join(" "))
        .filter(|text| !text.is_empty())
        .join("\n\n")
}
