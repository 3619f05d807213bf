use super::{Completion, CompletionEndpoint, CompletionRequest};
use crate::error::{AssistError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gpt-4o".to_string(),
            "gpt-4o-mini".to_string(),
            "gpt-4-turbo".to_string(),
        ]
    }
}

#[async_trait]
impl CompletionEndpoint for OpenAIClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let mut messages = Vec::new();
        if !request.context.trim().is_empty() {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: request.context.clone(),
            });
        }
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let body = OpenAIRequest {
            model: self.model.clone(),
            messages,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(AssistError::api("openai", status, text));
        }

        let openai_response: OpenAIResponse = response.json().await?;
        let text = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AssistError::invalid_response("openai", "no choices returned"))?
            .message
            .content
            .unwrap_or_default();
        Ok(Completion::text(text))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
