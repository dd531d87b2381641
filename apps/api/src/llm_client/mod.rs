/// LLM Client: every chat-completion call in Nubble goes through a
/// [`ChatProvider`] from this module.
///
/// Two providers exist (Anthropic, OpenAI). They differ only in envelope shape;
/// both normalize to `Result<String, ProviderFailure>`. Exactly one HTTP attempt
/// is made per `complete` call. Fallback between providers lives in `chat::proxy`.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

pub mod anthropic;
pub mod openai;
pub mod prompts;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

/// Response length cap sent to every provider (~2-3 sentences of headroom).
pub const MAX_OUTPUT_TOKENS: u32 = 300;
pub const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderId {
    /// The other provider. There are exactly two.
    pub fn alternate(self) -> Self {
        match self {
            ProviderId::Anthropic => ProviderId::OpenAi,
            ProviderId::OpenAi => ProviderId::Anthropic,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::Anthropic => "anthropic",
            ProviderId::OpenAi => "openai",
        }
    }

    pub fn api_key_var(self) -> &'static str {
        match self {
            ProviderId::Anthropic => "ANTHROPIC_API_KEY",
            ProviderId::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderId::Anthropic),
            "openai" | "gpt" => Ok(ProviderId::OpenAi),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Why a single provider attempt failed. Every variant qualifies for fallback.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderFailure {
    /// Request never produced a response (connect error, timeout, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Success status, but the payload carries the provider's own error object.
    #[error("provider error: {0}")]
    Api(String),

    /// Success status, but no usable assistant text could be extracted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Provider-neutral chat completion request: one system instruction, one user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(system: &'a str, user: &'a str) -> Self {
        Self {
            system,
            user,
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

/// A hosted chat-completion API.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderFailure>;
}

/// The configured providers plus which one is preferred.
/// Only the preferred provider ever falls back, and only to its alternate.
#[derive(Clone)]
pub struct ProviderRegistry {
    preferred: ProviderId,
    anthropic: Option<Arc<dyn ChatProvider>>,
    openai: Option<Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    pub fn new(preferred: ProviderId) -> Self {
        Self {
            preferred,
            anthropic: None,
            openai: None,
        }
    }

    /// Registers a provider in the slot named by its `id()`.
    pub fn with_provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        match provider.id() {
            ProviderId::Anthropic => self.anthropic = Some(provider),
            ProviderId::OpenAi => self.openai = Some(provider),
        }
        self
    }

    /// Builds real HTTP providers for every key present in `config`.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let mut registry = Self::new(config.preferred_provider);
        if let Some(key) = config.provider_key(ProviderId::Anthropic) {
            registry = registry.with_provider(Arc::new(AnthropicProvider::new(
                key.to_string(),
                config.provider_timeout,
            )?));
        }
        if let Some(key) = config.provider_key(ProviderId::OpenAi) {
            registry = registry.with_provider(Arc::new(OpenAiProvider::new(
                key.to_string(),
                config.provider_timeout,
            )?));
        }
        Ok(registry)
    }

    pub fn preferred(&self) -> ProviderId {
        self.preferred
    }

    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn ChatProvider>> {
        match id {
            ProviderId::Anthropic => self.anthropic.clone(),
            ProviderId::OpenAi => self.openai.clone(),
        }
    }

    /// The single fallback hop for `primary`, if one applies.
    pub fn fallback_for(&self, primary: ProviderId) -> Option<Arc<dyn ChatProvider>> {
        if primary != self.preferred {
            return None;
        }
        self.get(primary.alternate())
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Sends the request once and returns the status with the raw body.
pub(crate) async fn send_once(request: RequestBuilder) -> Result<(u16, String), ProviderFailure> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderFailure::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderFailure::Transport(format!("failed to read body: {e}")))?;
    Ok((status, body))
}

/// Error envelope shared by both providers: `{"error": {"message": "..."}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl ErrorBody {
    pub fn describe(&self) -> String {
        match (&self.kind, &self.message) {
            (Some(kind), Some(message)) => format!("{kind}: {message}"),
            (None, Some(message)) => message.clone(),
            (Some(kind), None) => kind.clone(),
            (None, None) => "unspecified error".to_string(),
        }
    }
}

/// Maps a non-success status to a failure, preferring the provider's own message.
pub(crate) fn status_failure(status: u16, body: &str) -> ProviderFailure {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.describe())
        .unwrap_or_else(|_| body.to_string());
    ProviderFailure::Status { status, message }
}
