//! Anthropic Messages API client

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{CompletionRequest, ProviderError};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API
pub struct AnthropicClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: i64,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

impl AnthropicClient {
    pub fn new(http_client: reqwest::Client, api_key: String, model: String, max_tokens: i64) -> Self {
        Self {
            http_client,
            api_key,
            model,
            max_tokens,
        }
    }

    /// Send a completion request and return the first text block
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        debug!(model = %self.model, turns = request.messages.len(), "Anthropic completion request");

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": request.messages,
        });
        if !request.system.is_empty() {
            body["system"] = json!(request.system);
        }

        let response = self
            .http_client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), detail));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parsed
            .content
            .into_iter()
            .find(|block| block.block_type == "text")
            .map(|block| block.text)
            .ok_or_else(|| ProviderError::Parse("response contains no text block".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parses_first_text_block() {
        let raw = r#"{
            "content": [
                {"type": "text", "text": "hello"},
                {"type": "text", "text": "ignored"}
            ]
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        let text = parsed
            .content
            .into_iter()
            .find(|b| b.block_type == "text")
            .map(|b| b.text);
        assert_eq!(text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_response_tolerates_non_text_blocks() {
        let raw = r#"{"content": [{"type": "tool_use", "id": "x", "name": "y", "input": {}}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.content.iter().all(|b| b.block_type != "text"));
    }
}
