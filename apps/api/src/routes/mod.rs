pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::chat::handlers as chat;
use crate::network::handlers as network;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Assistant
        .route("/api/v1/chat", post(chat::handle_chat))
        .route("/api/v1/chat/:provider", post(chat::handle_chat_with_provider))
        // Connections
        .route("/api/v1/connections", get(network::handle_list_connections))
        .route(
            "/api/v1/connections/summary",
            get(network::handle_connection_summary),
        )
        .route(
            "/api/v1/connections/import",
            post(network::handle_import).layer(DefaultBodyLimit::max(network::MAX_UPLOAD_BYTES)),
        )
        .layer(cors_layer())
        .with_state(state)
}

/// Any origin, with the headers browser clients of the hosted backend send.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ])
}
