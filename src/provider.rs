//! Model Provider Abstraction
//!
//! Chat-completion clients for the generative service behind scene planning, code
//! generation, correction and prompt classification. OpenAI, Ollama and custom local
//! servers all speak the OpenAI-compatible `/chat/completions` protocol, so one HTTP
//! client covers them; `ProviderFactory` picks endpoint and credentials.

use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Provider kind as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    OpenAI,
    Ollama,
    #[serde(rename = "local")]
    LocalCustom,
}

/// `[provider]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub provider_type: ProviderType,

    #[serde(default = "default_model")]
    pub model: String,

    /// Falls back to `OPENAI_API_KEY` for the OpenAI provider
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL override (required for `local`)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Omitted from requests when unset; some reasoning models reject it
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Answer every generative call locally without contacting a provider
    #[serde(default)]
    pub offline: bool,
}

fn default_model() -> String {
    "o3-mini".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::default(),
            model: default_model(),
            api_key: None,
            endpoint: None,
            temperature: None,
            offline: false,
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!("Invalid endpoint URL: {}", endpoint));
            }
        }
        if self.provider_type == ProviderType::LocalCustom && self.endpoint.is_none() {
            return Err("Local provider requires an endpoint".to_string());
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("Temperature must be within 0.0-2.0, got {}", t));
            }
        }
        Ok(())
    }

    /// Resolve credentials and endpoint into a concrete provider.
    pub fn to_model_provider(&self) -> Result<ModelProvider, ProviderError> {
        match self.provider_type {
            ProviderType::OpenAI => {
                let api_key = self
                    .api_key
                    .clone()
                    .filter(|k| !k.is_empty())
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| {
                        ProviderError::NotConfigured(
                            "OpenAI API key missing (set provider.api_key or OPENAI_API_KEY)"
                                .to_string(),
                        )
                    })?;
                Ok(ModelProvider::OpenAI {
                    model: self.model.clone(),
                    api_key,
                    base_url: self.endpoint.clone(),
                })
            }
            ProviderType::Ollama => Ok(ModelProvider::Ollama {
                model: self.model.clone(),
                base_url: self.endpoint.clone(),
            }),
            ProviderType::LocalCustom => {
                let endpoint = self.endpoint.clone().ok_or_else(|| {
                    ProviderError::NotConfigured("Local provider requires an endpoint".to_string())
                })?;
                Ok(ModelProvider::LocalCustom {
                    model: self.model.clone(),
                    endpoint,
                    api_key: self.api_key.clone(),
                })
            }
        }
    }

    pub fn default_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            ..CompletionOptions::default()
        }
    }
}

/// Model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelProvider {
    OpenAI {
        model: String,
        api_key: String,
        base_url: Option<String>, // For custom endpoints (e.g., Azure OpenAI)
    },
    Ollama {
        model: String,
        base_url: Option<String>, // Default: http://localhost:11434/v1
    },
    LocalCustom {
        model: String,
        endpoint: String, // Full endpoint URL (e.g., http://localhost:8080/v1)
        api_key: Option<String>,
    },
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Completion options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON object answer
    pub json_response: bool,
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    /// Generate a completion from a list of messages
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the model name
    fn model_name(&self) -> &str;
}

// OpenAI-compatible API request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// Helper function to convert MessageRole to string
fn role_to_string(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

fn map_status(status: u16, detail: &str) -> ProviderError {
    match status {
        401 => ProviderError::AuthFailed(format!("Authentication failed: {}", detail)),
        429 => ProviderError::RateLimit(format!("Rate limit exceeded: {}", detail)),
        404 => ProviderError::ModelNotFound(format!("Model not found: {}", detail)),
        _ => ProviderError::RequestFailed(format!(
            "Request failed with status {}: {}",
            status, detail
        )),
    }
}

// Helper function to map HTTP errors to ProviderError
fn map_http_error(error: reqwest::Error) -> ProviderError {
    if let Some(status) = error.status() {
        map_status(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        ProviderError::RequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ProviderError::RequestFailed(format!("Connection error: {}", error))
    } else {
        ProviderError::Other(format!("HTTP error: {}", error))
    }
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn build_provider_http_client() -> Result<Client, ProviderError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::Other(format!("Failed to create HTTP client: {}", e)))
}

/// Client for any OpenAI-compatible chat-completions endpoint
pub struct ChatCompletionsClient {
    client: Client,
    provider_name: &'static str,
    model: String,
    api_key: Option<String>,
    base_url: String,
}

impl ChatCompletionsClient {
    pub fn new(
        provider_name: &'static str,
        model: String,
        api_key: Option<String>,
        base_url: String,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_provider_http_client()?,
            provider_name,
            model,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_request(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages
                .into_iter()
                .map(|msg| OpenAIMessage {
                    role: role_to_string(msg.role).to_string(),
                    content: msg.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options
                .json_response
                .then(|| json!({ "type": "json_object" })),
            stream: false,
        }
    }
}

#[async_trait]
impl ModelProviderClient for ChatCompletionsClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = self.build_request(messages, &options);
        let url = format!("{}/chat/completions", self.base_url);

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status(status, &error_text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Other(format!("Failed to parse response: {}", e)))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Other("No choices in response".to_string()))?;

        let usage = completion.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            model: completion.model,
            usage,
            finish_reason: choice.finish_reason,
        })
    }

    fn provider_name(&self) -> &str {
        self.provider_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Provider factory for creating provider clients
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(
        provider: &ModelProvider,
    ) -> Result<Arc<dyn ModelProviderClient>, ProviderError> {
        let client = match provider {
            ModelProvider::OpenAI {
                model,
                api_key,
                base_url,
            } => ChatCompletionsClient::new(
                "openai",
                model.clone(),
                Some(api_key.clone()),
                base_url.clone().unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            )?,
            ModelProvider::Ollama { model, base_url } => ChatCompletionsClient::new(
                "ollama",
                model.clone(),
                None,
                base_url.clone().unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            )?,
            ModelProvider::LocalCustom {
                model,
                endpoint,
                api_key,
            } => ChatCompletionsClient::new("local", model.clone(), api_key.clone(), endpoint.clone())?,
        };
        Ok(Arc::new(client))
    }
}
