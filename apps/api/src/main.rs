mod auth;
mod chat;
mod config;
mod errors;
mod llm_client;
mod models;
mod network;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::ProviderRegistry;
use crate::network::archive::UploadArchive;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PostgrestStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast if the preferred provider has no key)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Nubble API v{}", env!("CARGO_PKG_VERSION"));

    // Row store
    let store = PostgrestStore::new(
        &config.row_store_url,
        config.row_store_api_key.clone(),
        config.provider_timeout,
    )?;
    info!("Row store client initialized ({})", config.row_store_url);

    // Chat providers
    let providers = ProviderRegistry::from_config(&config)?;
    let fallback = providers
        .fallback_for(providers.preferred())
        .map(|p| p.id().to_string())
        .unwrap_or_else(|| "none".to_string());
    info!(
        "Chat providers initialized (preferred: {}, fallback: {}, models: {} / {})",
        providers.preferred(),
        fallback,
        llm_client::anthropic::MODEL,
        llm_client::openai::MODEL
    );
    if providers.get(providers.preferred().alternate()).is_none() {
        info!(
            "{} not set; fallback disabled",
            providers.preferred().alternate().api_key_var()
        );
    }

    // Upload archive (optional)
    let archive = match &config.upload_archive {
        Some(archive_config) => {
            let archive = UploadArchive::from_config(archive_config).await;
            info!("Upload archive enabled (bucket: {})", archive_config.bucket);
            Some(archive)
        }
        None => None,
    };

    let state = AppState {
        config: config.clone(),
        store: Arc::new(store),
        providers,
        archive,
    };

    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
