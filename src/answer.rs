//! Chat-completion backends for the core [`AnswerGenerator`] trait.
//!
//! Every backend sends the single prompt built by
//! [`build_prompt`](pdfqa_core::answer::build_prompt) as one user message
//! at temperature 0.2 and returns the trimmed reply.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;

use pdfqa_core::answer::{build_prompt, AnswerGenerator};
use pdfqa_core::models::Passage;
use pdfqa_core::RagError;

use crate::config::AnswerConfig;
use crate::embedding::{OLLAMA_BASE_URL, OPENAI_BASE_URL};
use crate::http;

const TEMPERATURE: f64 = 0.2;

/// Generator that refuses every request.
pub struct DisabledGenerator;

#[async_trait]
impl AnswerGenerator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _question: &str, _passages: &[Passage]) -> pdfqa_core::Result<String> {
        Err(RagError::AnswerProvider(
            "answer provider is disabled; set [answer].provider in the config".to_string(),
        ))
    }
}

/// `POST /v1/chat/completions`.
pub struct OpenAIChat {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAIChat {
    pub fn new(config: &AnswerConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("answer.model required for OpenAI provider"))?;
        let base = config.url.as_deref().unwrap_or(OPENAI_BASE_URL);
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            url: format!("{}/v1/chat/completions", base.trim_end_matches('/')),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[async_trait]
impl AnswerGenerator for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, question: &str, passages: &[Passage]) -> pdfqa_core::Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            RagError::AnswerProvider("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": build_prompt(question, passages)}],
            "temperature": TEMPERATURE,
        });
        let json = http::post_json(&self.client, &self.url, Some(api_key), &body, 0)
            .await
            .map_err(|e| RagError::AnswerProvider(format!("OpenAI: {}", e)))?;
        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(|c| c.trim().to_string())
            .ok_or_else(|| {
                RagError::AnswerProvider(
                    "invalid OpenAI response: missing choices[0].message.content".to_string(),
                )
            })
    }
}

/// `POST /api/chat` on a local Ollama server, non-streaming.
pub struct OllamaChat {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaChat {
    pub fn new(config: &AnswerConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("answer.model required for Ollama provider"))?;
        let base = config.url.as_deref().unwrap_or(OLLAMA_BASE_URL);
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            url: format!("{}/api/chat", base.trim_end_matches('/')),
            model,
        })
    }
}

#[async_trait]
impl AnswerGenerator for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, question: &str, passages: &[Passage]) -> pdfqa_core::Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": build_prompt(question, passages)}],
            "stream": false,
            "options": {"temperature": TEMPERATURE},
        });
        let json = http::post_json(&self.client, &self.url, None, &body, 0)
            .await
            .map_err(|e| RagError::AnswerProvider(format!("Ollama: {}", e)))?;
        json.pointer("/message/content")
            .and_then(|c| c.as_str())
            .map(|c| c.trim().to_string())
            .ok_or_else(|| {
                RagError::AnswerProvider("invalid Ollama response: missing message.content".to_string())
            })
    }
}

pub fn create_generator(config: &AnswerConfig) -> Result<Arc<dyn AnswerGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(OpenAIChat::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaChat::new(config)?)),
        other => bail!("Unknown answer provider: {}", other),
    }
}
