//! Shared application state.

use std::sync::Arc;

use vidmill_core::Config;
use vidmill_processing::{OperationDispatcher, UploadSessionManager};
use vidmill_storage::LocalStorage;

/// Application state shared across all handlers, behind an `Arc`.
pub struct AppState {
    pub config: Config,
    pub storage: Arc<LocalStorage>,
    pub sessions: UploadSessionManager,
    pub dispatcher: OperationDispatcher,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<LocalStorage>,
        sessions: UploadSessionManager,
        dispatcher: OperationDispatcher,
    ) -> Self {
        Self {
            config,
            storage,
            sessions,
            dispatcher,
        }
    }
}
