
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::OllamaConfig;
use crate::embeddings::Embedder;
use crate::generation::{GenerationConfig, TextGenerator};
use crate::{RagError, Result};

/// HTTP client for a local Ollama server.
///
/// One client holds both the embedding and the generation model names and is
/// shared by reference for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    embedding_model: String,
    generation_model: String,
    batch_size: u32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_ctx: usize,
    num_predict: usize,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct UnloadRequest<'a> {
    model: &'a str,
    keep_alive: u32,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config.ollama_url()?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            batch_size: config.batch_size.max(1),
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    #[inline]
    pub fn generation_model(&self) -> &str {
        &self.generation_model
    }

    /// Verify the server is reachable and both configured models are pulled
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models()?;

        for model in [&self.embedding_model, &self.generation_model] {
            if !models.iter().any(|m| model_matches(&m.name, model)) {
                let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
                warn!(
                    "Model {} not found. Available models: {:?}",
                    model, available
                );
                return Err(RagError::NotFound(format!(
                    "Model '{}' is not available on {} (try `ollama pull {}`). Available models: {:?}",
                    model, self.base_url, model, available
                )));
            }
        }

        info!(
            "Health check passed for Ollama server at {} with models {} and {}",
            self.base_url, self.embedding_model, self.generation_model
        );
        Ok(())
    }

    /// List all models available on the server
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.endpoint("/api/tags")?;

        debug!("Fetching available models from {}", url);

        let response_text = self.make_request(&url, || {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let models_response: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Parse(format!("Failed to parse models response: {}", e)))?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    /// Embed `texts` in slices of the configured batch size
    #[inline]
    pub fn generate_embeddings_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            embeddings.extend(self.generate_embeddings_single_batch(batch)?);
        }

        Ok(embeddings)
    }

    fn generate_embeddings_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self.endpoint("/api/embed")?;
        let request = EmbedRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let request_json = serde_json::to_string(&request).map_err(|e| {
            RagError::Embedding(format!("Failed to serialize embedding request: {}", e))
        })?;

        let response_text = self.make_request(&url, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            RagError::Embedding(format!("Failed to parse embedding response: {}", e))
        })?;

        if response.embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        debug!(
            "Generated {} embeddings with {} dimensions",
            response.embeddings.len(),
            response.embeddings.first().map_or(0, Vec::len)
        );

        Ok(response.embeddings)
    }

    /// Run a single non-streaming completion on the generation model
    #[inline]
    pub fn generate_completion(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let url = self.endpoint("/api/generate")?;
        let request = GenerateRequest {
            model: &self.generation_model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_ctx: config.max_input_tokens,
                num_predict: config.max_output_tokens,
                temperature: 0.0,
            },
        };
        let request_json = serde_json::to_string(&request).map_err(|e| {
            RagError::Generation(format!("Failed to serialize generation request: {}", e))
        })?;

        debug!(
            "Requesting completion from {} ({} prompt chars)",
            self.generation_model,
            prompt.len()
        );

        let response_text = self
            .make_request(&url, || {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .map_err(|e| RagError::Generation(e.to_string()))?;

        let response: GenerateResponse = serde_json::from_str(&response_text).map_err(|e| {
            RagError::Generation(format!("Failed to parse generation response: {}", e))
        })?;

        Ok(response.response)
    }

    /// Ask the server to unload the generation model from memory
    #[inline]
    pub fn unload_generation_model(&self) -> Result<()> {
        let url = self.endpoint("/api/generate")?;
        let request_json = serde_json::to_string(&UnloadRequest {
            model: &self.generation_model,
            keep_alive: 0,
        })
        .map_err(|e| RagError::Generation(format!("Failed to serialize unload request: {}", e)))?;

        self.make_request(&url, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        info!("Unloaded model {}", self.generation_model);
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RagError::Network(format!("Failed to build URL for {}: {}", path, e)))
    }

    /// Perform one request, classifying failures. No retries.
    fn make_request<F>(&self, url: &Url, request_fn: F) -> Result<String>
    where
        F: FnOnce() -> std::result::Result<String, ureq::Error>,
    {
        request_fn().map_err(|error| match error {
            ureq::Error::StatusCode(status) => {
                warn!("HTTP {} from {}", status, url);
                RagError::Network(format!("HTTP {} from {}", status, url))
            }
            ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => {
                warn!("Could not connect to Ollama at {}", self.base_url);
                RagError::Network(format!(
                    "Could not connect to Ollama at {} (is `ollama serve` running?)",
                    self.base_url
                ))
            }
            other => {
                warn!("Request to {} failed: {}", url, other);
                RagError::Network(format!("Request to {} failed: {}", url, other))
            }
        })
    }
}

/// One `/api/embed` request per call; callers choose the batch boundaries
impl Embedder for OllamaClient {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.generate_embeddings_single_batch(texts)
    }
}

impl TextGenerator for OllamaClient {
    #[inline]
    fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        self.generate_completion(prompt, config)
    }

    #[inline]
    fn release(&self) -> Result<()> {
        self.unload_generation_model()
    }
}

/// Ollama reports untagged models with an explicit `:latest` tag
fn model_matches(available: &str, requested: &str) -> bool {
    available == requested
        || (!requested.contains(':') && available == format!("{}:latest", requested))
}
