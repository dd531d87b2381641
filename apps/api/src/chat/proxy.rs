//! Chat proxy. Turns `(query, access token)` into an assistant reply.
//!
//! Flow per request, strictly sequential:
//! validate → authenticate → fetch connections → summarize → primary provider
//! → (qualifying failure, primary is preferred) → one fallback provider.
//!
//! Each provider gets exactly one attempt. Nothing is written to the store.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm_client::prompts::assistant_system_prompt;
use crate::llm_client::{CompletionRequest, ProviderFailure, ProviderId, ProviderRegistry};
use crate::network::summary::summarize_connections;
use crate::store::{RowStore, RowStoreSession, StoreError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChatError {
    #[error("missing query or access token")]
    BadRequest,

    #[error("provider {0} is not configured")]
    Config(ProviderId),

    #[error("authentication failed: {0}")]
    Auth(StoreError),

    #[error("failed to fetch connections: {0}")]
    DataFetch(StoreError),

    #[error("{provider} failed: {failure}")]
    Provider {
        provider: ProviderId,
        failure: ProviderFailure,
    },

    #[error("all providers failed ({primary}: {primary_failure}; {fallback}: {fallback_failure})")]
    AllProvidersFailed {
        primary: ProviderId,
        primary_failure: ProviderFailure,
        fallback: ProviderId,
        fallback_failure: ProviderFailure,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatReply {
    pub response: String,
    pub provider: ProviderId,
}

pub struct ChatProxy<'a> {
    store: &'a dyn RowStore,
    providers: &'a ProviderRegistry,
}

impl<'a> ChatProxy<'a> {
    pub fn new(store: &'a dyn RowStore, providers: &'a ProviderRegistry) -> Self {
        Self { store, providers }
    }

    pub async fn handle_chat_request(
        &self,
        query: &str,
        access_token: &str,
        primary: ProviderId,
    ) -> Result<ChatReply, ChatError> {
        let query = query.trim();
        let access_token = access_token.trim();
        if query.is_empty() || access_token.is_empty() {
            return Err(ChatError::BadRequest);
        }

        let primary_provider = self
            .providers
            .get(primary)
            .ok_or(ChatError::Config(primary))?;

        let session = RowStoreSession::open(self.store, access_token)
            .await
            .map_err(store_failure)?;

        let connections = session.connections().await.map_err(store_failure)?;
        info!(
            "Fetched {} connections for user {}",
            connections.len(),
            session.user().id
        );

        let summary = summarize_connections(Some(connections.as_slice()));
        let system = assistant_system_prompt(&summary);
        let request = CompletionRequest::new(&system, query);

        let primary_failure = match primary_provider.complete(&request).await {
            Ok(response) => {
                info!("Chat answered by {}", primary);
                return Ok(ChatReply {
                    response,
                    provider: primary,
                });
            }
            Err(failure) => failure,
        };
        warn!("Primary provider {} failed: {}", primary, primary_failure);

        let Some(fallback_provider) = self.providers.fallback_for(primary) else {
            return Err(ChatError::Provider {
                provider: primary,
                failure: primary_failure,
            });
        };
        let fallback = fallback_provider.id();
        info!("Falling back from {} to {}", primary, fallback);

        match fallback_provider.complete(&request).await {
            Ok(response) => {
                info!("Chat answered by fallback {}", fallback);
                Ok(ChatReply {
                    response,
                    provider: fallback,
                })
            }
            Err(fallback_failure) => {
                warn!("Fallback provider {} failed: {}", fallback, fallback_failure);
                Err(ChatError::AllProvidersFailed {
                    primary,
                    primary_failure,
                    fallback,
                    fallback_failure,
                })
            }
        }
    }
}

/// A rejected token at any store step asks the caller to sign in again.
/// Everything else is a data failure.
fn store_failure(err: StoreError) -> ChatError {
    match err {
        StoreError::Unauthorized => ChatError::Auth(err),
        other => ChatError::DataFetch(other),
    }
}
