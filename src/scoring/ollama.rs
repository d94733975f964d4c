//! Ollama-backed relevance judge
//!
//! Non-streaming `POST /api/generate` with the rubric prompt; the model's
//! answer is parsed as a "D S" verdict.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::JudgeConfig;
use crate::errors::{Result, RetrievalError};
use crate::scoring::judge::{build_evaluation_prompt, parse_verdict, JudgeRequest, JudgeVerdict, RelevanceJudge};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default judge model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Transport backstop; attempts are normally cut shorter by the retry policy
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Judge client for a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaJudge {
    client: Client,
    base_url: String,
    model: String,
    temperature: f64,
}

impl OllamaJudge {
    /// Create judge with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_MODEL, 0.0)
    }

    /// Create judge with custom configuration
    pub fn with_config(base_url: &str, model: &str, temperature: f64) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(RetrievalError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
        })
    }

    pub fn from_config(config: &JudgeConfig) -> Result<Self> {
        Self::with_config(&config.base_url, &config.model, config.temperature)
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RetrievalError::ScorerTimeout {
                        duration_ms: REQUEST_TIMEOUT.as_millis() as u64,
                    }
                } else {
                    RetrievalError::ScorerUnavailable(format!("Failed to send request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RetrievalError::ScorerUnavailable(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::JudgeMalformed(format!("Failed to parse response: {}", e)))?;

        Ok(body.response)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RelevanceJudge for OllamaJudge {
    fn identifier(&self) -> &str {
        &self.model
    }

    async fn evaluate(&self, request: &JudgeRequest<'_>) -> Result<JudgeVerdict> {
        let prompt = build_evaluation_prompt(request);
        let answer = self.generate(prompt).await?;
        tracing::debug!(model = %self.model, answer = %answer.trim(), "judge answered");
        parse_verdict(&answer)
    }
}

/// Ollama generate request
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
}

/// Ollama generate response (non-streaming)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
