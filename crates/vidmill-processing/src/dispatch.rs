//! Routing of validated operation descriptors to the media engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use vidmill_core::models::Operation;
use vidmill_core::AppError;
use vidmill_storage::{LocalStorage, StorageError};

use crate::engine::MediaEngine;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Transformation failed: {0}")]
    Transform(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Transform(msg) => AppError::Transform(msg),
            DispatchError::Storage(e) => e.into(),
        }
    }
}

/// A finished transformation output, addressed both by storage key and by
/// absolute path, with the metadata needed to serve it as a download.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub key: String,
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: &'static str,
}

/// Hands a merged input file to the engine and accounts for the output
/// artifact it produces.
///
/// Each execution gets a fresh uuid-named output key, so concurrent requests
/// never collide. The dispatcher does not delete the input file; the caller
/// owns the input's lifecycle.
#[derive(Clone)]
pub struct OperationDispatcher {
    engine: Arc<dyn MediaEngine>,
    storage: Arc<LocalStorage>,
}

impl OperationDispatcher {
    pub fn new(engine: Arc<dyn MediaEngine>, storage: Arc<LocalStorage>) -> Self {
        Self { engine, storage }
    }

    pub async fn execute(
        &self,
        input: &Path,
        operation: &Operation,
    ) -> Result<OutputArtifact, DispatchError> {
        let extension = operation.output_extension();
        let base_name = format!("processed_{}{}", Uuid::new_v4(), extension);
        let key = format!("work/{}", base_name);

        let output_path = self.storage.absolute_path(&key)?;
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StorageError::from)?;
        }

        tracing::info!(
            operation = operation.name(),
            input = %input.display(),
            output_key = %key,
            "Dispatching operation to engine"
        );

        if let Err(err) = self.engine.transform(input, operation, &output_path).await {
            // The engine may have left a partial output behind.
            if let Err(cleanup_err) = self.storage.delete(&key).await {
                tracing::warn!(
                    output_key = %key,
                    error = %cleanup_err,
                    "Failed to remove partial output after engine failure"
                );
            }
            return Err(DispatchError::Transform(err.to_string()));
        }

        // A successful exit status with no output file is still a failure.
        let size_bytes = match self.storage.content_length(&key).await {
            Ok(len) => len,
            Err(StorageError::NotFound(_)) => {
                return Err(DispatchError::Transform(
                    "Engine reported success but produced no output".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            operation = operation.name(),
            output_key = %key,
            size_bytes,
            "Transformation produced output"
        );

        Ok(OutputArtifact {
            path: output_path,
            file_name: format!("converted_{}", base_name),
            content_type: operation.output_content_type(),
            key,
        })
    }
}
