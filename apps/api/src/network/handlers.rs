use axum::{
    body::to_bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::auth::BearerToken;
use crate::errors::AppError;
use crate::models::connection::Connection;
use crate::network::csv_import::parse_contacts_csv;
use crate::network::summary::ConnectionSummary;
use crate::state::AppState;
use crate::store::RowStoreSession;

/// Largest CSV upload accepted, multipart or raw.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Serialize)]
pub struct ConnectionsResponse {
    pub total: usize,
    pub connections: Vec<Connection>,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub summary: ConnectionSummary,
    pub digest: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ImportResponse {
    pub imported: usize,
    pub skipped: usize,
    /// Header cells that matched no connection field and were not imported.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_key: Option<String>,
}

/// GET /api/v1/connections
pub async fn handle_list_connections(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<ConnectionsResponse>, AppError> {
    let session = RowStoreSession::open(state.store.as_ref(), &token).await?;
    let connections = session.connections().await?;
    Ok(Json(ConnectionsResponse {
        total: connections.len(),
        connections,
    }))
}

/// GET /api/v1/connections/summary
pub async fn handle_connection_summary(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<SummaryResponse>, AppError> {
    let session = RowStoreSession::open(state.store.as_ref(), &token).await?;
    let connections = session.connections().await?;
    let summary = ConnectionSummary::from_connections(&connections);
    let digest = summary.render();
    Ok(Json(SummaryResponse { summary, digest }))
}

/// POST /api/v1/connections/import
/// Accepts `multipart/form-data` (field `file`) or a raw CSV body.
pub async fn handle_import(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    request: Request,
) -> Result<Json<ImportResponse>, AppError> {
    let session = RowStoreSession::open(state.store.as_ref(), &token).await?;
    let user_id = session.user().id;

    let upload = read_upload(request, &state).await?;
    let text = std::str::from_utf8(&upload)
        .map_err(|_| AppError::Validation("CSV upload must be UTF-8 text".to_string()))?;
    if text.trim().is_empty() {
        return Err(AppError::Validation("CSV upload is empty".to_string()));
    }

    let parsed = parse_contacts_csv(text);
    let total = parsed.contacts.len();
    let rows: Vec<_> = parsed
        .contacts
        .into_iter()
        .filter_map(|c| c.into_new_connection(user_id))
        .collect();
    let skipped = total - rows.len();
    if !parsed.ignored_columns.is_empty() {
        info!("Ignoring unmapped CSV columns: {}", parsed.ignored_columns.join(", "));
    }

    let archived_key = match &state.archive {
        Some(archive) => Some(archive.store_upload(user_id, upload.clone()).await?),
        None => None,
    };

    let imported = session.insert_connections(rows).await?;
    info!(
        "Imported {} connections for user {} ({} skipped)",
        imported, user_id, skipped
    );

    Ok(Json(ImportResponse {
        imported,
        skipped,
        ignored_columns: parsed.ignored_columns,
        archived_key,
    }))
}

async fn read_upload(request: Request, state: &AppState) -> Result<Bytes, AppError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if !is_multipart {
        return to_bytes(request.into_body(), MAX_UPLOAD_BYTES)
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")));
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        if field.name() == Some("file") || field.file_name().is_some() {
            return field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(e.to_string()));
        }
    }

    Err(AppError::Validation(
        "Multipart upload has no 'file' field".to_string(),
    ))
}
