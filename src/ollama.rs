use crate::constants::OLLAMA_BASE_URL;
use crate::logging::{log_debug, log_error, log_info, log_trace, log_warn};
use crate::provider::{AiProvider, AiResponse, PromptMessage, TokenUsage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    stream: bool,
    think: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[derive(Debug)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(model: String) -> Result<Self> {
        let base_url = OLLAMA_BASE_URL.to_string();

        log_info(&format!(
            "Initializing Ollama client with model: {} at {}",
            model, base_url
        ));

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300)) // local models can be slow to plan
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url,
            model,
            client,
        })
    }
}

#[async_trait]
impl AiProvider for OllamaClient {
    async fn generate(&self, messages: &[PromptMessage]) -> Result<AiResponse> {
        log_debug(&format!(
            "Sending chat request to Ollama API with {} message(s)",
            messages.len()
        ));

        let endpoint = format!("{}/api/chat", self.base_url);
        let request_body = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
            think: false,
        };

        log_trace(&format!("Sending request to Ollama API: {:?}", request_body));

        let response = self
            .client
            .post(&endpoint)
            .json(&request_body)
            .send()
            .await
            .context("Failed to send request to Ollama API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log_error(&format!("Ollama API error: {} - {}", status, error_text));
            return Err(anyhow::anyhow!(
                "Ollama API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        log_trace(&format!("Received response from Ollama: {:?}", chat_response));

        if !chat_response.done {
            log_warn("Received incomplete response from Ollama");
        }

        let content = chat_response.message.content;
        if content.trim().is_empty() {
            log_error("Generated text is empty");
            return Err(anyhow::anyhow!(
                "No content was generated by the AI. The response was empty or contained only whitespace."
            ));
        }

        log_info(&format!(
            "Received response from Ollama API, length: {}",
            content.len()
        ));

        let usage = TokenUsage {
            prompt_tokens: chat_response.prompt_eval_count,
            completion_tokens: chat_response.eval_count,
            total_tokens: match (chat_response.prompt_eval_count, chat_response.eval_count) {
                (Some(p), Some(c)) => Some(p + c),
                _ => None,
            },
        };

        Ok(AiResponse { content, usage })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "Ollama"
    }
}
