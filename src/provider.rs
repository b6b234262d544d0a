use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::cli::Config;

/// Role tag of a message sent to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One role-tagged message of a completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: ChatRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Token usage information reported by the provider, when available
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl TokenUsage {
    /// Short log form, `?` for counts the provider did not report
    pub fn describe(&self) -> String {
        let count = |value: Option<u32>| value.map_or_else(|| "?".to_string(), |v| v.to_string());
        format!(
            "prompt={} completion={} total={}",
            count(self.prompt_tokens),
            count(self.completion_tokens),
            count(self.total_tokens)
        )
    }
}

/// Response from AI provider with content and usage information
#[derive(Debug)]
pub struct AiResponse {
    pub content: String,
    pub usage: TokenUsage,
}

/// Generic AI provider trait for abstraction across different AI services
///
/// Implementations issue exactly one non-streaming request per call and ask
/// the backend not to emit intermediate reasoning.
#[async_trait]
pub trait AiProvider: Debug + Send + Sync {
    /// Complete the given conversation
    async fn generate(&self, messages: &[PromptMessage]) -> Result<AiResponse>;

    /// Get the model name being used
    fn model_name(&self) -> &str;

    /// Get provider-specific information (e.g., "OpenAI", "Gemini", etc.)
    fn provider_name(&self) -> &str;
}

/// Configuration for creating AI providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
}

impl ProviderConfig {
    /// Build the provider configuration from the runtime config.
    /// Fails when the selected provider needs an API key and none is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = split_model(&config.model).0.to_lowercase();
        let api_key = if provider == "ollama" {
            None
        } else {
            Some(crate::api_key::get_api_key(&provider)?)
        };

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
        })
    }
}

/// Split a model string into provider and model name.
/// Model format: "`provider::model`" or just "model" (defaults to an OpenAI-compatible endpoint)
pub fn split_model(model: &str) -> (&str, &str) {
    match model.split_once("::") {
        Some((provider, name)) => (provider, name),
        None => ("openai", model),
    }
}

/// Factory for creating AI providers
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_provider(config: ProviderConfig) -> Result<Box<dyn AiProvider>> {
        let (provider_name, model_name) = split_model(&config.model);
        let require_key = || {
            config
                .api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("Provider '{provider_name}' requires an API key"))
        };

        match provider_name.to_lowercase().as_str() {
            "openai" => {
                let client = crate::openai::OpenAiCompatClient::new(
                    model_name.to_string(),
                    require_key()?,
                    config.base_url.clone(),
                )?;
                Ok(Box::new(client))
            }
            "gemini" => {
                let client =
                    crate::gemini::GeminiClient::new(model_name.to_string(), require_key()?)?;
                Ok(Box::new(client))
            }
            "ollama" => {
                let client = crate::ollama::OllamaClient::new(model_name.to_string())?;
                Ok(Box::new(client))
            }
            _ => Err(anyhow::anyhow!(
                "Unsupported provider: {provider_name}. Supported providers: openai, gemini, ollama"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_model_defaults_to_openai() {
        assert_eq!(split_model("qwen-plus"), ("openai", "qwen-plus"));
        assert_eq!(split_model("ollama::llama3.2"), ("ollama", "llama3.2"));
        assert_eq!(split_model("gemini::gemini-2.5-flash"), ("gemini", "gemini-2.5-flash"));
    }

    #[test]
    fn test_create_ollama_provider() {
        let config = ProviderConfig {
            model: "ollama::llama3.2".to_string(),
            api_key: None,
            base_url: String::new(),
        };
        let provider = ProviderFactory::create_provider(config).unwrap();
        assert_eq!(provider.provider_name(), "Ollama");
        assert_eq!(provider.model_name(), "llama3.2");
    }

    #[test]
    fn test_create_openai_provider() {
        let config = ProviderConfig {
            model: "qwen-plus".to_string(),
            api_key: Some("sk-test".to_string()),
            base_url: "http://localhost:9999/v1".to_string(),
        };
        let provider = ProviderFactory::create_provider(config).unwrap();
        assert_eq!(provider.provider_name(), "OpenAI");
        assert_eq!(provider.model_name(), "qwen-plus");
    }

    #[test]
    fn test_openai_provider_without_key_fails() {
        let config = ProviderConfig {
            model: "qwen-plus".to_string(),
            api_key: None,
            base_url: "http://localhost:9999/v1".to_string(),
        };
        assert!(ProviderFactory::create_provider(config).is_err());
    }

    #[test]
    fn test_unsupported_provider() {
        let config = ProviderConfig {
            model: "unknown::model".to_string(),
            api_key: None,
            base_url: String::new(),
        };
        assert!(ProviderFactory::create_provider(config).is_err());
    }

    #[test]
    fn test_token_usage_describe_marks_missing_counts() {
        let usage = TokenUsage {
            prompt_tokens: Some(12),
            completion_tokens: None,
            total_tokens: Some(13),
        };
        assert_eq!(usage.describe(), "prompt=12 completion=? total=13");
        assert_eq!(TokenUsage::default().describe(), "prompt=? completion=? total=?");
    }

    #[test]
    fn test_prompt_message_serializes_lowercase_role() {
        let json = serde_json::to_value(PromptMessage::system("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "hi"}));
    }
}
