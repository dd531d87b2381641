use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ProviderRegistry;
use crate::network::archive::UploadArchive;
use crate::store::RowStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Row store client. Per-request access goes through `RowStoreSession`.
    pub store: Arc<dyn RowStore>,
    pub providers: ProviderRegistry,
    /// Raw CSV upload archive; `None` when `UPLOAD_BUCKET` is unset.
    pub archive: Option<UploadArchive>,
}
