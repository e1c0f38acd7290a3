//! Application setup and initialization
//!
//! All application initialization logic lives here instead of main.rs, so
//! integration tests can build the exact router the binary serves.

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use vidmill_core::Config;
use vidmill_processing::{FfmpegEngine, MediaEngine, OperationDispatcher, UploadSessionManager};
use vidmill_storage::LocalStorage;

use crate::state::AppState;

/// Initialize the tracing subscriber. Respects `RUST_LOG` when set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vidmill=debug,tower_http=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}

/// Initialize the entire application: storage, services, and routes.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    let engine = FfmpegEngine::new(config.ffmpeg_path.clone())
        .map_err(|e| anyhow::anyhow!("Invalid ffmpeg configuration: {}", e))?;
    let engine: Arc<dyn MediaEngine> = Arc::new(engine);

    let storage = Arc::new(
        LocalStorage::new(config.storage_root.clone())
            .await
            .context("Failed to initialize storage")?,
    );

    let state = build_state(config, storage, engine);
    let router = routes::setup_routes(state.clone());

    tracing::info!("Application initialized");

    Ok((state, router))
}

/// Assemble the application state from its capabilities. Tests call this
/// directly with an engine double instead of the real ffmpeg binary.
pub fn build_state(
    config: Config,
    storage: Arc<LocalStorage>,
    engine: Arc<dyn MediaEngine>,
) -> Arc<AppState> {
    let sessions = UploadSessionManager::new(Arc::clone(&storage));
    let dispatcher = OperationDispatcher::new(engine, Arc::clone(&storage));
    Arc::new(AppState::new(config, storage, sessions, dispatcher))
}
