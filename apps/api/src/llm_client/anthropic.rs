use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    build_http_client, send_once, status_failure, ChatProvider, CompletionRequest, ErrorBody,
    ProviderFailure, ProviderId,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-3-haiku-20240307";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    error: Option<ErrorBody>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Anthropic Messages API.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(timeout)?,
            api_key,
            base_url: ANTHROPIC_API_URL.to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderFailure> {
        let body = AnthropicRequest {
            model: MODEL,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.user,
            }],
        };

        let (status, text) = send_once(
            self.client
                .post(format!("{}/v1/messages", self.base_url))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body),
        )
        .await?;

        interpret_response(status, &text)
    }
}

fn interpret_response(status: u16, body: &str) -> Result<String, ProviderFailure> {
    if !(200..300).contains(&status) {
        return Err(status_failure(status, body));
    }

    let parsed: AnthropicResponse = serde_json::from_str(body)
        .map_err(|e| ProviderFailure::InvalidResponse(format!("unparseable body: {e}")))?;

    if let Some(error) = parsed.error {
        return Err(ProviderFailure::Api(error.describe()));
    }

    if let Some(usage) = &parsed.usage {
        debug!(
            "Anthropic call succeeded: input_tokens={}, output_tokens={}",
            usage.input_tokens, usage.output_tokens
        );
    }

    parsed
        .content
        .iter()
        .find(|b| b.block_type == "text")
        .and_then(|b| b.text.as_deref())
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProviderFailure::InvalidResponse("empty response".to_string()))
}
