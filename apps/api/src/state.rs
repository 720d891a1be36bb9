use std::sync::Arc;

use crate::content::ContentRepository;
use crate::loader::loading::LoadingBus;
use crate::loader::Loader;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Snapshots served by the REST layer.
    pub content: Arc<ContentRepository>,
    /// Tiered loader used by the builder.
    pub loader: Loader,
    pub loading: Arc<LoadingBus>,
}
