use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::auth::bearer_token;
use crate::chat::proxy::{ChatError, ChatProxy, ChatReply};
use crate::errors::AppError;
use crate::llm_client::ProviderId;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub access_token: String,
}

/// POST /api/v1/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, AppError> {
    let primary = state.providers.preferred();
    respond(&state, &headers, payload, primary).await
}

/// POST /api/v1/chat/:provider
pub async fn handle_chat_with_provider(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, AppError> {
    let primary = provider
        .parse::<ProviderId>()
        .map_err(AppError::Validation)?;
    respond(&state, &headers, payload, primary).await
}

async fn respond(
    state: &AppState,
    headers: &HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
    primary: ProviderId,
) -> Result<Json<ChatReply>, AppError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            info!("Rejected chat body: {rejection}");
            return Err(AppError::from_chat(
                ChatError::BadRequest,
                state.config.expose_error_details,
            ));
        }
    };

    let access_token = if request.access_token.trim().is_empty() {
        bearer_token(headers).unwrap_or_default()
    } else {
        request.access_token.as_str()
    };

    info!(
        "Chat request via {} (query {} chars, token provided: {})",
        primary,
        request.query.len(),
        !access_token.is_empty()
    );

    ChatProxy::new(state.store.as_ref(), &state.providers)
        .handle_chat_request(&request.query, access_token, primary)
        .await
        .map(Json)
        .map_err(|e| AppError::from_chat(e, state.config.expose_error_details))
}
