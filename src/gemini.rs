use crate::logging::{log_debug, log_error, log_info, log_trace};
use crate::provider::{AiProvider, AiResponse, ChatRole, PromptMessage, TokenUsage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatRequest};
use genai::resolver::{AuthData, AuthResolver};

#[derive(Debug)]
pub struct GeminiClient {
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(model: String, api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("No API key provided"));
        }

        log_info(&format!("Initializing Gemini API client with model: {model}"));

        Ok(Self { api_key, model })
    }

    fn to_genai_messages(messages: &[PromptMessage]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|msg| match msg.role {
                ChatRole::System => ChatMessage::system(msg.content.clone()),
                ChatRole::User => ChatMessage::user(msg.content.clone()),
                ChatRole::Assistant => ChatMessage::assistant(msg.content.clone()),
            })
            .collect()
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    async fn generate(&self, messages: &[PromptMessage]) -> Result<AiResponse> {
        log_debug(&format!(
            "Sending chat request to Gemini API with {} message(s)",
            messages.len()
        ));

        // Create client with explicit API key using AuthResolver
        let api_key = self.api_key.clone();
        let auth_resolver = AuthResolver::from_resolver_fn(move |_model_iden| {
            Ok(Some(AuthData::from_single(api_key.clone())))
        });
        let client = Client::builder().with_auth_resolver(auth_resolver).build();

        let chat_request = ChatRequest::new(Self::to_genai_messages(messages));
        log_trace(&format!("Request Debug: {:?}", chat_request));

        let chat_response = match client.exec_chat(&self.model, chat_request, None).await {
            Ok(response) => response,
            Err(e) => {
                log_debug(&format!("Raw genai error: {:?}", e));
                return Err(e).context("Failed to send chat request to Gemini API");
            }
        };

        log_trace(&format!("Response Debug: {:?}", chat_response));

        let usage = TokenUsage {
            prompt_tokens: chat_response.usage.prompt_tokens.map(|t| t as u32),
            completion_tokens: chat_response.usage.completion_tokens.map(|t| t as u32),
            total_tokens: chat_response.usage.total_tokens.map(|t| t as u32),
        };

        let generated_text = chat_response
            .first_text()
            .context("Failed to extract text from Gemini response")?;

        if generated_text.trim().is_empty() {
            log_error("Generated text is empty");
            return Err(anyhow::anyhow!(
                "No content was generated by the AI. The response was empty or contained only whitespace."
            ));
        }

        log_info(&format!(
            "Received response from Gemini API, length: {}",
            generated_text.len()
        ));

        Ok(AiResponse {
            content: generated_text.to_string(),
            usage,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(GeminiClient::new("gemini-2.5-flash".to_string(), " ".to_string()).is_err());
    }

    #[test]
    fn test_provider_metadata() {
        let client =
            GeminiClient::new("gemini-2.5-flash".to_string(), "AIza-test".to_string()).unwrap();
        assert_eq!(client.model_name(), "gemini-2.5-flash");
        assert_eq!(client.provider_name(), "Gemini");
    }
}
