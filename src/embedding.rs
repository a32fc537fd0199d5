//! Embedding provider implementations.
//!
//! Concrete backends for the core [`EmbeddingProvider`] trait:
//! - **[`DisabledEmbedder`]**: always fails; used when no provider is configured.
//! - **[`OpenAIEmbedder`]**: `POST /v1/embeddings` with optional retry and backoff.
//! - **[`OllamaEmbedder`]**: `POST /api/embed` against a local Ollama server.
//!
//! One request is made per text; batching across texts is the caller's
//! concern (see [`pdfqa_core::embedding::embed_texts`]).
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use pdfqa::config::EmbeddingConfig;
//! # use pdfqa::embedding::create_provider;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;

use pdfqa_core::embedding::EmbeddingProvider;
use pdfqa_core::RagError;

use crate::config::EmbeddingConfig;
use crate::http;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

// ============ Disabled ============

/// Embedder that refuses every request.
pub struct DisabledEmbedder {
    dims: usize,
}

impl DisabledEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl EmbeddingProvider for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed_one(&self, _text: &str) -> pdfqa_core::Result<Vec<f32>> {
        Err(RagError::EmbeddingProvider(
            "embedding provider is disabled; set [embedding].provider in the config".to_string(),
        ))
    }
}

// ============ OpenAI ============

/// Embedder backed by the OpenAI embeddings API.
///
/// The API key is read from `OPENAI_API_KEY` when the provider is built;
/// a missing key only fails once an embedding is actually requested.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;
        let base = config.url.as_deref().unwrap_or(OPENAI_BASE_URL);

        Ok(Self {
            client: http::client(config.timeout_secs)?,
            url: format!("{}/v1/embeddings", base.trim_end_matches('/')),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model,
            dims,
            max_retries: config.max_retries,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed_one(&self, text: &str) -> pdfqa_core::Result<Vec<f32>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            RagError::EmbeddingProvider("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let json = http::post_json(
            &self.client,
            &self.url,
            Some(api_key),
            &body,
            self.max_retries,
        )
        .await
        .map_err(|e| RagError::EmbeddingProvider(format!("OpenAI: {}", e)))?;
        parse_openai_response(&json)
    }
}

/// Extract `data[0].embedding`.
fn parse_openai_response(json: &serde_json::Value) -> pdfqa_core::Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(|item| item.get("embedding"))
        .ok_or_else(|| {
            RagError::EmbeddingProvider("invalid OpenAI response: missing data[0].embedding".to_string())
        })?;
    parse_vector(embedding)
}

// ============ Ollama ============

/// Embedder backed by a local Ollama server.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dims: usize,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;
        let base = config.url.as_deref().unwrap_or(OLLAMA_BASE_URL);

        Ok(Self {
            client: http::client(config.timeout_secs)?,
            url: format!("{}/api/embed", base.trim_end_matches('/')),
            model,
            dims,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed_one(&self, text: &str) -> pdfqa_core::Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let json = http::post_json(&self.client, &self.url, None, &body, self.max_retries)
            .await
            .map_err(|e| RagError::EmbeddingProvider(format!("Ollama: {}", e)))?;
        parse_ollama_response(&json)
    }
}

/// Extract `embeddings[0]`.
fn parse_ollama_response(json: &serde_json::Value) -> pdfqa_core::Result<Vec<f32>> {
    let embedding = json
        .get("embeddings")
        .and_then(|e| e.get(0))
        .ok_or_else(|| {
            RagError::EmbeddingProvider("invalid Ollama response: missing embeddings[0]".to_string())
        })?;
    parse_vector(embedding)
}

fn parse_vector(value: &serde_json::Value) -> pdfqa_core::Result<Vec<f32>> {
    let items = value.as_array().ok_or_else(|| {
        RagError::EmbeddingProvider("embedding is not an array".to_string())
    })?;
    items
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                RagError::EmbeddingProvider(format!("non-numeric embedding value: {}", v))
            })
        })
        .collect()
}

/// Create the configured [`EmbeddingProvider`].
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder::new(config.dimension()))),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
