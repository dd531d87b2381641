use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::chat::proxy::ChatError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// The body is always `{ "error": <short sentence>, "code": <CODE>, "details"?: <diagnostic> }`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data fetch error: {0}")]
    DataFetch(String),

    #[error("Provider error: {diagnostic}")]
    Provider {
        diagnostic: String,
        details: Option<String>,
    },

    #[error("All providers failed: {diagnostic}")]
    AllProvidersFailed {
        diagnostic: String,
        details: Option<String>,
    },

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Converts a chat failure, attaching provider diagnostics to the body only when asked.
    pub fn from_chat(err: ChatError, expose_details: bool) -> Self {
        let diagnostic = err.to_string();
        let details = expose_details.then(|| diagnostic.clone());
        match err {
            ChatError::BadRequest => {
                AppError::Validation("Missing query or access token".to_string())
            }
            ChatError::Config(provider) => {
                AppError::Config(format!("{} is not set", provider.api_key_var()))
            }
            ChatError::Auth(_) => AppError::Unauthorized,
            ChatError::DataFetch(e) => AppError::DataFetch(e.to_string()),
            ChatError::Provider { .. } => AppError::Provider {
                diagnostic,
                details,
            },
            ChatError::AllProvidersFailed { .. } => AppError::AllProvidersFailed {
                diagnostic,
                details,
            },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthorized => AppError::Unauthorized,
            other => AppError::DataFetch(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Your session has expired, please sign in again".to_string(),
                None,
            ),
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR",
                    "The assistant is not configured".to_string(),
                    None,
                )
            }
            AppError::DataFetch(msg) => {
                tracing::error!("Error fetching connections: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATA_FETCH_ERROR",
                    "Failed to fetch user connections".to_string(),
                    None,
                )
            }
            AppError::Provider {
                diagnostic,
                details,
            } => {
                tracing::error!("Provider error: {diagnostic}");
                (
                    StatusCode::BAD_GATEWAY,
                    "PROVIDER_ERROR",
                    "The assistant is unavailable right now".to_string(),
                    details,
                )
            }
            AppError::AllProvidersFailed {
                diagnostic,
                details,
            } => {
                tracing::error!("All providers failed: {diagnostic}");
                (
                    StatusCode::BAD_GATEWAY,
                    "ALL_PROVIDERS_FAILED",
                    "The assistant is unavailable right now, please try again later".to_string(),
                    details,
                )
            }
            AppError::S3(msg) => {
                tracing::error!("S3 error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "S3_ERROR",
                    "A storage error occurred".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = json!(details);
        }

        (status, Json(body)).into_response()
    }
}
