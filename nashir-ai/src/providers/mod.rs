//! LLM provider clients
//!
//! Two wire formats behind one `LlmClient` enum: the Anthropic Messages
//! API and the OpenAI Chat Completions API. Which one serves a request
//! is a runtime decision from the `ai_provider` setting, so the desk
//! can switch providers without redeploying.
//!
//! API keys come from the environment (`ANTHROPIC_API_KEY`,
//! `OPENAI_API_KEY`), never from the database.

pub mod anthropic;
pub mod openai;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;

use nashir_common::config::{get_setting_i64, get_setting_string};

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

/// One conversational turn sent to a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// A provider-agnostic completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt; empty string means none
    pub system: String,
    /// Alternating user/assistant turns, most recent last
    pub messages: Vec<ChatTurn>,
}

impl CompletionRequest {
    /// Single-turn request: one system prompt, one user message
    pub fn single(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            messages: vec![ChatTurn {
                role: "user".to_string(),
                content: user.into(),
            }],
        }
    }
}

/// Provider client errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API key environment variable {0} is not set")]
    MissingKey(&'static str),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    /// True when the failure is a missing API key rather than an
    /// upstream fault
    pub fn is_missing_key(&self) -> bool {
        matches!(self, ProviderError::MissingKey(_))
    }
}

/// A configured LLM client, one variant per supported provider
pub enum LlmClient {
    Anthropic(AnthropicClient),
    OpenAi(OpenAiClient),
}

impl LlmClient {
    pub fn provider_name(&self) -> &'static str {
        match self {
            LlmClient::Anthropic(_) => "anthropic",
            LlmClient::OpenAi(_) => "openai",
        }
    }

    /// Run a completion and return the model's text answer
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        match self {
            LlmClient::Anthropic(client) => client.complete(request).await,
            LlmClient::OpenAi(client) => client.complete(request).await,
        }
    }
}

/// Build a client from the current settings and environment
///
/// Model, token and temperature settings are read per call so the desk
/// can tune them at runtime through the settings table.
pub async fn client_from_settings(
    db: &SqlitePool,
    http: &reqwest::Client,
) -> Result<LlmClient, ProviderError> {
    let provider = get_setting_string(db, "ai_provider", "anthropic")
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    match provider.as_str() {
        "anthropic" => {
            let api_key = std::env::var("ANTHROPIC_API_KEY")
                .map_err(|_| ProviderError::MissingKey("ANTHROPIC_API_KEY"))?;
            let model = get_setting_string(db, "ai_anthropic_model", "claude-3-5-sonnet-20241022")
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?;
            let max_tokens = get_setting_i64(db, "ai_max_tokens", 1024)
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?;
            Ok(LlmClient::Anthropic(AnthropicClient::new(
                http.clone(),
                api_key,
                model,
                max_tokens,
            )))
        }
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| ProviderError::MissingKey("OPENAI_API_KEY"))?;
            let model = get_setting_string(db, "ai_openai_model", "gpt-4o-mini")
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?;
            let temperature = get_setting_string(db, "ai_temperature", "0.3")
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?
                .parse::<f64>()
                .unwrap_or(0.3);
            Ok(LlmClient::OpenAi(OpenAiClient::new(
                http.clone(),
                api_key,
                model,
                temperature,
            )))
        }
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}

/// Strip Markdown code fences from a model answer
///
/// Models asked for pure JSON still wrap it in ``` fences often enough
/// that parsing must tolerate both forms.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line (```json)
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a JSON answer after fence stripping
pub fn parse_json_answer<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, ProviderError> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(cleaned).map_err(|e| ProviderError::Parse(e.to_string()))
}
