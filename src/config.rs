//! TOML configuration.
//!
//! Every command reads one file (default `./config/pdfqa.toml`). Sections
//! other than `[db]` and `[index]` are optional and fall back to the
//! defaults below. [`load_config`] rejects invalid combinations up front so
//! commands can assume a consistent configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use pdfqa_core::chunk::{ChunkStrategy, ChunkingParams};
use pdfqa_core::index::Metric;
use pdfqa_core::tokenizer::DEFAULT_ENCODING;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    pub dir: PathBuf,
    #[serde(default)]
    pub metric: Metric,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default)]
    pub strategy: ChunkStrategy,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    #[serde(default = "default_min_tokens")]
    pub min_tokens: usize,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::default(),
            max_tokens: default_max_tokens(),
            overlap: default_overlap(),
            min_tokens: default_min_tokens(),
            encoding: default_encoding(),
        }
    }
}

impl ChunkingConfig {
    pub fn params(&self) -> ChunkingParams {
        ChunkingParams {
            strategy: self.strategy,
            max_tokens: self.max_tokens,
            overlap: self.overlap,
            min_tokens: self.min_tokens,
        }
    }
}

fn default_max_tokens() -> usize {
    500
}
fn default_overlap() -> usize {
    50
}
fn default_min_tokens() -> usize {
    100
}
fn default_encoding() -> String {
    DEFAULT_ENCODING.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override, e.g. `http://localhost:11434` for Ollama.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            timeout_secs: default_embedding_timeout(),
            max_retries: 0,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// Index dimensionality. A disabled provider still needs a fixed
    /// shape for the on-disk index.
    pub fn dimension(&self) -> usize {
        self.dims.unwrap_or(DISABLED_DIMS)
    }
}

/// Dimension used when no embedding model is configured.
pub const DISABLED_DIMS: usize = 1536;

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_answer_timeout")]
    pub timeout_secs: u64,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            timeout_secs: default_answer_timeout(),
        }
    }
}

impl AnswerConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_answer_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

const PROVIDERS: &[&str] = &["disabled", "openai", "ollama"];

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Chunking
    let chunking = &config.chunking;
    if chunking.max_tokens == 0 {
        anyhow::bail!("chunking.max_tokens must be > 0");
    }
    if chunking.strategy == ChunkStrategy::Fixed && chunking.overlap >= chunking.max_tokens {
        anyhow::bail!(
            "chunking.overlap ({}) must be < chunking.max_tokens ({})",
            chunking.overlap,
            chunking.max_tokens
        );
    }
    if chunking.strategy == ChunkStrategy::Semantic && chunking.min_tokens > chunking.max_tokens {
        anyhow::bail!(
            "chunking.min_tokens ({}) must be <= chunking.max_tokens ({})",
            chunking.min_tokens,
            chunking.max_tokens
        );
    }

    // Retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    // Embedding
    let embedding = &config.embedding;
    if !PROVIDERS.contains(&embedding.provider.as_str()) {
        anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            embedding.provider
        );
    }
    if embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if embedding.is_enabled() {
        if embedding.dims.is_none() {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                embedding.provider
            );
        }
        if embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                embedding.provider
            );
        }
    }

    // Answer
    let answer = &config.answer;
    if !PROVIDERS.contains(&answer.provider.as_str()) {
        anyhow::bail!(
            "Unknown answer provider: '{}'. Must be disabled, openai, or ollama.",
            answer.provider
        );
    }
    if answer.is_enabled() && answer.model.is_none() {
        anyhow::bail!(
            "answer.model must be specified when provider is '{}'",
            answer.provider
        );
    }

    Ok(())
}
