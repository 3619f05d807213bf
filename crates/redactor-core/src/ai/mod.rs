pub mod assist;
pub mod claude;
pub mod ollama;
pub mod openai;

pub use assist::AssistClient;
pub use claude::ClaudeClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

use crate::error::Result;
use crate::state::Quota;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One request to a completion endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub feature: String,
    pub prompt: String,
    pub context: String,
}

impl CompletionRequest {
    /// Prompt and context folded into a single message, for providers that
    /// take one user prompt.
    pub fn combined_prompt(&self) -> String {
        if self.context.trim().is_empty() {
            return self.prompt.clone();
        }
        format!("{}\n\nEditing context:\n{}", self.prompt, self.context)
    }
}

/// Reply text plus whatever usage counters the endpoint reported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota: Option<Quota>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quota: None,
        }
    }
}

/// A remote service that turns a prompt into reply text
#[async_trait]
pub trait CompletionEndpoint: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
