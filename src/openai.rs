//! Client for OpenAI-compatible chat completion endpoints (DashScope, vLLM,
//! OpenAI itself, ...).

use crate::logging::{log_debug, log_error, log_info, log_trace};
use crate::provider::{AiProvider, AiResponse, PromptMessage, TokenUsage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    stream: bool,
    /// Qwen-style switch; endpoints that do not know it ignore it
    enable_thinking: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
    #[serde(default)]
    total_tokens: Option<u32>,
}

#[derive(Debug)]
pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(model: String, api_key: String, base_url: String) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();

        log_info(&format!(
            "Initializing OpenAI-compatible client with model: {} at {}",
            model, base_url
        ));

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url,
            api_key,
            model,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl AiProvider for OpenAiCompatClient {
    async fn generate(&self, messages: &[PromptMessage]) -> Result<AiResponse> {
        log_debug(&format!(
            "Sending chat completion request with {} message(s)",
            messages.len()
        ));

        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages,
            stream: false,
            enable_thinking: false,
        };

        log_trace(&format!("Request Debug: {:?}", request_body));

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .context("Failed to send chat completion request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log_error(&format!("Chat completion error: {} - {}", status, error_text));
            return Err(anyhow::anyhow!(
                "Request failed with status code {}: {}",
                status,
                error_text
            ));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        log_trace(&format!("Response Debug: {:?}", completion));

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            log_error("Generated text is empty");
            return Err(anyhow::anyhow!(
                "No content was generated by the AI. The response was empty or contained only whitespace."
            ));
        }

        log_info(&format!(
            "Received chat completion, length: {}",
            content.len()
        ));

        let usage = completion
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(AiResponse { content, usage })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = OpenAiCompatClient::new(
            "qwen-plus".to_string(),
            "sk-test".to_string(),
            "https://dashscope.aliyuncs.com/compatible-mode/v1/".to_string(),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let messages = [
            PromptMessage::system("only use tools"),
            PromptMessage::user("search rust"),
        ];
        let request = ChatCompletionRequest {
            model: "qwen-plus",
            messages: &messages,
            stream: false,
            enable_thinking: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "qwen-plus");
        assert_eq!(json["stream"], false);
        assert_eq!(json["enable_thinking"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "search rust");
    }

    #[test]
    fn test_response_parsing_takes_first_choice() {
        let body = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "[]"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13}
        }"#;
        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some("[]"));
        assert_eq!(response.usage.unwrap().total_tokens, Some(13));
    }
}
