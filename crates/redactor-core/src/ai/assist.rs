use super::{Completion, CompletionEndpoint, CompletionRequest};
use crate::error::{AssistError, Result};
use crate::state::Quota;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct AssistResponse {
    #[serde(default)]
    text: Option<String>,
    // Decoded on its own so a malformed quota never costs the reply
    #[serde(default)]
    quota: Option<Value>,
}

#[derive(Deserialize)]
struct AssistErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Client for the hosted assist endpoint, which accepts
/// `{feature, prompt, context}` and answers `{text, quota?}`.
#[derive(Clone)]
pub struct AssistClient {
    client: Client,
    url: String,
    token: Option<String>,
}

impl AssistClient {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            token: None,
        }
    }

    /// Bearer token (the signed-in user's ID token) sent with every request
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}

/// Error message from a failed response body, falling back to the status
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<AssistErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| format!("AI request failed ({})", status))
}

fn decode_completion(body: &str) -> Result<Completion> {
    let response: AssistResponse = serde_json::from_str(body)
        .map_err(|e| AssistError::invalid_response("assist", e.to_string()))?;
    let quota = response.quota.and_then(|raw| match serde_json::from_value::<Quota>(raw) {
        Ok(quota) => Some(quota),
        Err(e) => {
            tracing::debug!("ignoring unreadable quota: {}", e);
            None
        }
    });
    Ok(Completion {
        text: response.text.unwrap_or_default(),
        quota,
    })
}

#[async_trait]
impl CompletionEndpoint for AssistClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let mut builder = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AssistError::api(
                "assist",
                status.as_u16(),
                error_message(status.as_u16(), &body),
            ));
        }

        decode_completion(&body)
    }

    fn name(&self) -> &'static str {
        "assist"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_completion_with_quota() {
        let completion =
            decode_completion(r#"{"text":"Done.","quota":{"used":3,"limit":20}}"#).unwrap();
        assert_eq!(completion.text, "Done.");
        assert_eq!(completion.quota, Some(Quota { used: 3.0, limit: 20.0 }));

        let completion =
            decode_completion(r#"{"text":"Done.","quota":{"used":2.0,"limit":20}}"#).unwrap();
        assert_eq!(completion.quota, Some(Quota { used: 2.0, limit: 20.0 }));
    }

    #[test]
    fn test_unreadable_quota_keeps_text() {
        let completion =
            decode_completion(r##"{"text":"#TITLE\nNew","quota":{"used":"lots"}}"##).unwrap();
        assert_eq!(completion.text, "#TITLE\nNew");
        assert!(completion.quota.is_none());

        let completion = decode_completion(r#"{"text":"Done.","quota":"n/a"}"#).unwrap();
        assert_eq!(completion.text, "Done.");
        assert!(completion.quota.is_none());
    }

    #[test]
    fn test_decode_completion_missing_text() {
        let completion = decode_completion("{}").unwrap();
        assert!(completion.text.is_empty());
        assert!(completion.quota.is_none());
    }

    #[test]
    fn test_decode_completion_rejects_non_json() {
        assert!(matches!(
            decode_completion("<html>"),
            Err(AssistError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_error_message_prefers_body() {
        assert_eq!(
            error_message(429, r#"{"error":"Daily AI limit reached"}"#),
            "Daily AI limit reached"
        );
        assert_eq!(error_message(502, "Bad Gateway"), "AI request failed (502)");
    }

    #[test]
    fn test_request_serializes_contract_fields() {
        let req = CompletionRequest {
            feature: "editor".to_string(),
            prompt: "p".to_string(),
            context: "c".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["feature"], "editor");
        assert_eq!(json["prompt"], "p");
        assert_eq!(json["context"], "c");
    }
}
