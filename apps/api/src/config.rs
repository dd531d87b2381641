use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::llm_client::ProviderId;

/// Hosted row store used when `ROW_STORE_URL` is not set.
pub const DEFAULT_ROW_STORE_URL: &str = "https://xixicikohbspyfdkatwv.supabase.co";

/// Application configuration loaded from environment variables.
/// Startup fails if the preferred provider has no API key.
#[derive(Debug, Clone)]
pub struct Config {
    pub row_store_url: String,
    /// Anon key sent as `apikey`. When unset the caller's access token is sent instead.
    pub row_store_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub preferred_provider: ProviderId,
    pub provider_timeout: Duration,
    pub expose_error_details: bool,
    pub upload_archive: Option<UploadArchiveConfig>,
    pub port: u16,
    pub rust_log: String,
}

/// S3-compatible bucket that receives raw CSV uploads.
#[derive(Debug, Clone)]
pub struct UploadArchiveConfig {
    pub bucket: String,
    pub endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let preferred_provider = match optional_env("PREFERRED_PROVIDER") {
            Some(raw) => raw
                .parse::<ProviderId>()
                .map_err(|e| anyhow::anyhow!("PREFERRED_PROVIDER: {e}"))?,
            None => ProviderId::Anthropic,
        };

        let upload_archive = match optional_env("UPLOAD_BUCKET") {
            Some(bucket) => Some(UploadArchiveConfig {
                bucket,
                endpoint: require_env("S3_ENDPOINT")?,
                aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            }),
            None => None,
        };

        let config = Config {
            row_store_url: optional_env("ROW_STORE_URL")
                .unwrap_or_else(|| DEFAULT_ROW_STORE_URL.to_string()),
            row_store_api_key: optional_env("ROW_STORE_API_KEY"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            preferred_provider,
            provider_timeout: Duration::from_secs(
                std::env::var("PROVIDER_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse::<u64>()
                    .context("PROVIDER_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            expose_error_details: std::env::var("EXPOSE_ERROR_DETAILS")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
            upload_archive,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// API key for the given provider, if configured.
    pub fn provider_key(&self, id: ProviderId) -> Option<&str> {
        match id {
            ProviderId::Anthropic => self.anthropic_api_key.as_deref(),
            ProviderId::OpenAi => self.openai_api_key.as_deref(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.provider_key(self.preferred_provider).is_none() {
            bail!(
                "Required environment variable '{}' is not set (preferred provider is {})",
                self.preferred_provider.api_key_var(),
                self.preferred_provider
            );
        }
        if self.provider_timeout.is_zero() {
            bail!("PROVIDER_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads a variable, treating blank values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
impl Config {
    /// Config with both providers keyed and no archive, for handler tests.
    pub fn for_tests() -> Self {
        Config {
            row_store_url: DEFAULT_ROW_STORE_URL.to_string(),
            row_store_api_key: None,
            anthropic_api_key: Some("test-anthropic".to_string()),
            openai_api_key: Some("test-openai".to_string()),
            preferred_provider: ProviderId::Anthropic,
            provider_timeout: Duration::from_secs(5),
            expose_error_details: false,
            upload_archive: None,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}
