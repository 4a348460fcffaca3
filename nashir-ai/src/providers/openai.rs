//! OpenAI Chat Completions API client

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{ChatTurn, CompletionRequest, ProviderError};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Client for the OpenAI Chat Completions API
pub struct OpenAiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

impl OpenAiClient {
    pub fn new(http_client: reqwest::Client, api_key: String, model: String, temperature: f64) -> Self {
        Self {
            http_client,
            api_key,
            model,
            temperature,
        }
    }

    /// Send a completion request and return the first choice's content
    ///
    /// The system prompt travels as a leading `system` role message;
    /// the Chat Completions API has no separate system field.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        debug!(model = %self.model, turns = request.messages.len(), "OpenAI completion request");

        let mut messages: Vec<ChatTurn> = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(ChatTurn {
                role: "system".to_string(),
                content: request.system.clone(),
            });
        }
        messages.extend(request.messages.iter().cloned());

        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages,
        });

        let response = self
            .http_client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), detail));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Parse("response contains no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_takes_first_choice() {
        let raw = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "answer"}},
                {"message": {"role": "assistant", "content": "other"}}
            ]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let text = parsed.choices.into_iter().next().map(|c| c.message.content);
        assert_eq!(text.as_deref(), Some("answer"));
    }

    #[test]
    fn test_empty_choices_detected() {
        let raw = r#"{"choices": []}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.choices.is_empty());
    }
}
