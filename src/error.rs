use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by the model provider. Carries the HTTP status so the
/// retry caller can distinguish rate-limit exhaustion (429) from everything
/// else, and the provider's retry-delay hint when one was present in the
/// error payload.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Model provider returned status {status}: {message}")]
pub struct ProviderError {
    pub status: u16,
    pub message: String,
    pub retry_delay: Option<Duration>,
}

impl ProviderError {
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Generation failed: {message}")]
    Generation {
        message: String,
        #[source]
        source: Box<Error>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn generation(message: impl Into<String>, source: Error) -> Self {
        Error::Generation {
            message: message.into(),
            source: Box::new(source),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message, details) = match self {
            Error::Config(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, None),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string(), None),
            Error::Json(err) => (StatusCode::BAD_REQUEST, err.to_string(), None),
            Error::Provider(err) => (StatusCode::BAD_GATEWAY, err.to_string(), None),
            Error::Parse(msg) => (StatusCode::BAD_GATEWAY, msg, None),
            Error::Generation { message, source } => {
                (StatusCode::BAD_GATEWAY, message, Some(source.to_string()))
            }
            Error::Reqwest(err) => (
                StatusCode::BAD_GATEWAY,
                format!("External service error: {}", err),
                None,
            ),
            Error::Anyhow(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), None),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        let body = match details {
            Some(details) => Json(json!({ "error": error_message, "details": details })),
            None => Json(json!({ "error": error_message })),
        };
        (status, body).into_response()
    }
}
