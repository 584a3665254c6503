//! Async LLM client for intent inference
//!
//! This is a model-agnostic HTTP client for calling LLM APIs.
//! Supports Anthropic, OpenAI-compatible (DeepSeek, etc) and Ollama APIs.
//! The model only ever proposes an intent; validation and execution stay
//! on this side of the boundary.

use crate::core::config::InferenceConfig;
use crate::core::error::{KernelError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// The external inference collaborator
///
/// Implementations return the model's raw text; callers treat it as
/// untrusted.
pub trait InferenceService: Send + Sync {
    fn complete(&self, system: &str, user: &str) -> impl Future<Output = Result<String>> + Send;

    /// Model name reported in status output
    fn model(&self) -> &str;
}

/// API format type
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
    Ollama,
}

/// Async LLM client for making API calls
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
    api_format: ApiFormat,
}

impl LlmClient {
    /// Create a new LLM client with explicit configuration
    pub fn new(api_key: Option<String>, api_url: String, model: String) -> Self {
        let api_format = Self::detect_api_format(&api_url);
        Self {
            client: Client::new(),
            api_key,
            api_url,
            model,
            api_format,
        }
    }

    /// Create a client from the inference section of the kernel config
    pub fn from_config(config: &InferenceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| KernelError::internal_with("failed to build HTTP client", e))?;
        let api_format = Self::detect_api_format(&config.api_url);

        if api_format != ApiFormat::Ollama && config.api_key.is_none() {
            return Err(KernelError::Config(format!(
                "{} requires an API key (set LLM_API_KEY)",
                config.api_url
            )));
        }

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_format,
        })
    }

    /// Detect API format from URL
    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else if url.contains("/api/generate") {
            ApiFormat::Ollama
        } else {
            // DeepSeek, OpenAI, and other compatible APIs use OpenAI format
            ApiFormat::OpenAI
        }
    }

    pub fn api_format(&self) -> &ApiFormat {
        &self.api_format
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            system: system.into(),
            messages: vec![Message {
                role: "user".into(),
                content: user.into(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", self.api_key.as_deref().unwrap_or_default())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(KernelError::BridgeUnavailable(format!("API error: {}", error_text)));
        }

        let completion: AnthropicResponse = response.json().await.map_err(transport_error)?;

        completion
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| KernelError::MalformedIntent("Empty response".into()))
    }

    async fn complete_openai(&self, system: &str, user: &str) -> Result<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            messages: vec![
                Message {
                    role: "system".into(),
                    content: system.into(),
                },
                Message {
                    role: "user".into(),
                    content: user.into(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.as_deref().unwrap_or_default()),
            )
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(KernelError::BridgeUnavailable(format!("API error: {}", error_text)));
        }

        let completion: OpenAIResponse = response.json().await.map_err(transport_error)?;

        completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| KernelError::MalformedIntent("Empty response".into()))
    }

    async fn complete_ollama(&self, system: &str, user: &str) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: user.into(),
            system: system.into(),
            stream: false,
            format: "json".into(),
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(KernelError::BridgeUnavailable(format!("API error: {}", error_text)));
        }

        let completion: OllamaResponse = response.json().await.map_err(transport_error)?;
        Ok(completion.response)
    }
}

impl InferenceService for LlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        match self.api_format {
            ApiFormat::Anthropic => self.complete_anthropic(system, user).await,
            ApiFormat::OpenAI => self.complete_openai(system, user).await,
            ApiFormat::Ollama => self.complete_ollama(system, user).await,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn transport_error(e: reqwest::Error) -> KernelError {
    if e.is_timeout() {
        KernelError::BridgeUnavailable("request timed out".into())
    } else {
        KernelError::BridgeUnavailable(e.to_string())
    }
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible API format (DeepSeek, OpenAI, etc.)
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

// Ollama generate API format
#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    system: String,
    stream: bool,
    format: String,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

// Shared
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}
