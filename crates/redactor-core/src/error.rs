use thiserror::Error;

/// Errors from a completion endpoint.
///
/// These never escape a session: the session stores the message for display
/// and the user can retry immediately.
#[derive(Debug, Error)]
pub enum AssistError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("no API key configured for {0}")]
    MissingApiKey(&'static str),

    #[error("invalid response from {provider}: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("assistant request did not complete: {0}")]
    Task(String),
}

impl AssistError {
    pub fn api(provider: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            provider,
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(provider: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssistError>;
