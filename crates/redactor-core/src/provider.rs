use crate::ai::{AssistClient, ClaudeClient, CompletionEndpoint, OllamaClient, OpenAIClient};
use crate::config::Config;
use crate::error::AssistError;
use anyhow::Result;
use std::sync::Arc;

pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:latest";
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Assist,
    Ollama,
    Claude,
    OpenAI,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Assist => "assist",
            Provider::Ollama => "ollama",
            Provider::Claude => "claude",
            Provider::OpenAI => "openai",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "assist" => Some(Provider::Assist),
            "ollama" => Some(Provider::Ollama),
            "claude" => Some(Provider::Claude),
            "openai" => Some(Provider::OpenAI),
            _ => None,
        }
    }

    pub fn all() -> Vec<Provider> {
        vec![
            Provider::Assist,
            Provider::Ollama,
            Provider::Claude,
            Provider::OpenAI,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Assist => "Hosted assist endpoint",
            Provider::Ollama => "Ollama (Local)",
            Provider::Claude => "Claude (Anthropic)",
            Provider::OpenAI => "ChatGPT (OpenAI)",
        }
    }

    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            Provider::Assist => None,
            Provider::Ollama => Some(DEFAULT_OLLAMA_MODEL),
            Provider::Claude => Some(DEFAULT_CLAUDE_MODEL),
            Provider::OpenAI => Some(DEFAULT_OPENAI_MODEL),
        }
    }

    /// The provider named in `config`, or the hosted endpoint
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.provider.as_deref() {
            None => Ok(Provider::Assist),
            Some(name) => Provider::from_str(name)
                .ok_or_else(|| anyhow::anyhow!("Unknown provider '{}'", name)),
        }
    }

    /// Build the completion endpoint for this provider.
    ///
    /// `model` overrides the configured default model.
    pub fn connect(&self, config: &Config, model: Option<&str>) -> Result<Arc<dyn CompletionEndpoint>> {
        let model = model
            .or(config.default_model.as_deref())
            .or(self.default_model())
            .unwrap_or_default();

        let endpoint: Arc<dyn CompletionEndpoint> = match self {
            Provider::Assist => {
                let client = AssistClient::new(&config.assist_url()?);
                match config.assist_token.as_deref() {
                    Some(token) => Arc::new(client.with_token(token)),
                    None => Arc::new(client),
                }
            }
            Provider::Ollama => Arc::new(OllamaClient::new(config.ollama_url(), model)),
            Provider::Claude => {
                let key = config
                    .claude_api_key
                    .as_deref()
                    .ok_or(AssistError::MissingApiKey("claude"))?;
                Arc::new(ClaudeClient::new(key, model))
            }
            Provider::OpenAI => {
                let key = config
                    .openai_api_key
                    .as_deref()
                    .ok_or(AssistError::MissingApiKey("openai"))?;
                Arc::new(OpenAIClient::new(key, model))
            }
        };

        tracing::debug!(provider = self.as_str(), model, "connected completion endpoint");
        Ok(endpoint)
    }

    /// Models that can be used with this provider
    pub async fn list_models(&self, config: &Config) -> Result<Vec<String>> {
        Ok(match self {
            Provider::Assist => Vec::new(),
            Provider::Ollama => {
                OllamaClient::new(config.ollama_url(), DEFAULT_OLLAMA_MODEL)
                    .list_models()
                    .await?
            }
            Provider::Claude => ClaudeClient::list_models(),
            Provider::OpenAI => OpenAIClient::list_models(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_roundtrip() {
        for provider in Provider::all() {
            assert_eq!(Provider::from_str(provider.as_str()), Some(provider));
        }
        assert_eq!(Provider::from_str("OpenAI"), Some(Provider::OpenAI));
        assert_eq!(Provider::from_str("gemini"), None);
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            provider: Some("claude".to_string()),
            ..Config::default()
        };
        assert_eq!(Provider::from_config(&config).unwrap(), Provider::Claude);
        assert_eq!(Provider::from_config(&Config::default()).unwrap(), Provider::Assist);

        let config = Config {
            provider: Some("bard".to_string()),
            ..Config::default()
        };
        assert!(Provider::from_config(&config).is_err());
    }

    #[test]
    fn test_connect_requires_api_key() {
        let err = Provider::Claude
            .connect(&Config::default(), None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("claude"));
    }

    #[test]
    fn test_connect_assist_uses_configured_url() {
        let config = Config {
            assist_endpoint: Some("https://example.test/ai".to_string()),
            ..Config::default()
        };
        let endpoint = Provider::Assist.connect(&config, None).unwrap();
        assert_eq!(endpoint.name(), "assist");
    }
}
