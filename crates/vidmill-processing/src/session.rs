//! Chunked upload sessions.
//!
//! Session state lives entirely on disk: each chunk is stored under
//! `staging/{session_id}/{index}.part`, so concurrent uploads for different
//! sessions need no coordination. `finalize` is the single point where the
//! all-or-nothing merge invariant is enforced, and it tears the session
//! down on every exit path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, Weak};

use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use vidmill_core::AppError;
use vidmill_storage::{LocalStorage, StorageError};

const MAX_SESSION_ID_LEN: usize = 128;
const DEFAULT_FILE_NAME: &str = "uploaded.mp4";

/// Upload session errors
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing chunk {0}")]
    MissingChunk(u32),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidInput(msg) => AppError::InvalidInput(msg),
            UploadError::MissingChunk(index) => AppError::MissingChunk(index),
            UploadError::Storage(e) => e.into(),
        }
    }
}

/// A fully merged upload, ready to hand to the dispatcher.
///
/// The artifact must not outlive the finalize request: whoever drives the
/// transformation deletes it once the engine has finished, success or not.
#[derive(Debug, Clone)]
pub struct MergedArtifact {
    /// Storage key of the merged file.
    pub key: String,
    /// Absolute filesystem path, for handing to the engine.
    pub path: PathBuf,
    /// Sanitized original file name, for extension/metadata purposes.
    pub file_name: String,
}

/// Owns chunk storage and merge logic for chunked uploads.
pub struct UploadSessionManager {
    storage: Arc<LocalStorage>,
    /// Per-session finalize locks. Weak entries so completed sessions do not
    /// accumulate; pruned opportunistically on each acquisition.
    finalize_locks: StdMutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl UploadSessionManager {
    pub fn new(storage: Arc<LocalStorage>) -> Self {
        Self {
            storage,
            finalize_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Store (or overwrite) one chunk of an upload session.
    ///
    /// Re-storing the same index replaces the previous content; upload retry
    /// logic at the transport layer relies on this being safe.
    pub async fn store_chunk(
        &self,
        session_id: &str,
        index: u32,
        payload: &[u8],
    ) -> Result<(), UploadError> {
        validate_session_id(session_id)?;
        if payload.is_empty() {
            return Err(UploadError::InvalidInput(
                "Chunk payload must not be empty".to_string(),
            ));
        }

        self.storage
            .write(&chunk_key(session_id, index), payload)
            .await?;

        tracing::info!(
            session_id = %session_id,
            chunk_index = index,
            size_bytes = payload.len(),
            "Stored chunk"
        );

        Ok(())
    }

    /// Merge all chunks of a session into a single artifact.
    ///
    /// Chunks are concatenated in strictly increasing index order from `0` to
    /// `total_chunks - 1`; a gap aborts with `MissingChunk` and nothing
    /// merged is left on disk. The session's staging directory is deleted on
    /// every exit path, including stray indices at or beyond `total_chunks`.
    pub async fn finalize(
        &self,
        session_id: &str,
        total_chunks: u32,
        file_name: Option<&str>,
    ) -> Result<MergedArtifact, UploadError> {
        validate_session_id(session_id)?;
        if total_chunks == 0 {
            return Err(UploadError::InvalidInput(
                "total_chunks must be a positive integer".to_string(),
            ));
        }

        // Serialize finalize calls per session; different sessions never contend.
        let lock = self.finalize_lock(session_id);
        let _guard = lock.lock().await;

        let mut combined = Vec::new();
        for index in 0..total_chunks {
            match self.storage.read(&chunk_key(session_id, index)).await {
                Ok(bytes) => combined.extend_from_slice(&bytes),
                Err(StorageError::NotFound(_)) => {
                    self.cleanup_session(session_id).await;
                    return Err(UploadError::MissingChunk(index));
                }
                Err(e) => {
                    self.cleanup_session(session_id).await;
                    return Err(e.into());
                }
            }
        }

        let file_name = sanitize_file_name(file_name);
        let merged_key = format!("work/merged_{}_{}", Uuid::new_v4(), file_name);

        let write_result = self.storage.write(&merged_key, &combined).await;
        self.cleanup_session(session_id).await;
        write_result?;

        let path = self.storage.absolute_path(&merged_key)?;

        tracing::info!(
            session_id = %session_id,
            total_chunks,
            merged_key = %merged_key,
            size_bytes = combined.len(),
            "Merged upload session"
        );

        Ok(MergedArtifact {
            key: merged_key,
            path,
            file_name,
        })
    }

    /// Best-effort removal of every stored chunk for a session.
    async fn cleanup_session(&self, session_id: &str) {
        if let Err(e) = self.storage.delete_dir(&session_dir(session_id)).await {
            tracing::warn!(
                session_id = %session_id,
                error = %e,
                "Failed to clean up session staging directory"
            );
        }
    }

    fn finalize_lock(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .finalize_locks
            .lock()
            .expect("finalize lock map poisoned");
        locks.retain(|_, weak| weak.strong_count() > 0);
        if let Some(existing) = locks.get(session_id).and_then(Weak::upgrade) {
            return existing;
        }
        let fresh = Arc::new(AsyncMutex::new(()));
        locks.insert(session_id.to_string(), Arc::downgrade(&fresh));
        fresh
    }
}

fn session_dir(session_id: &str) -> String {
    format!("staging/{}", session_id)
}

fn chunk_key(session_id: &str, index: u32) -> String {
    format!("staging/{}/{}.part", session_id, index)
}

fn validate_session_id(session_id: &str) -> Result<(), UploadError> {
    if session_id.is_empty() {
        return Err(UploadError::InvalidInput(
            "session_id must not be empty".to_string(),
        ));
    }
    if session_id.len() > MAX_SESSION_ID_LEN {
        return Err(UploadError::InvalidInput(format!(
            "session_id exceeds {} characters",
            MAX_SESSION_ID_LEN
        )));
    }
    let valid_chars = session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid_chars || session_id.contains("..") {
        return Err(UploadError::InvalidInput(
            "session_id may only contain alphanumerics, '.', '_' or '-'".to_string(),
        ));
    }
    Ok(())
}

/// Strip anything that could escape the working directory from a
/// caller-supplied file name; fall back to a default for empty results.
///
/// Dot runs are collapsed to a single dot so the result never contains
/// `..`, which storage keys reject.
fn sanitize_file_name(file_name: Option<&str>) -> String {
    let mut cleaned = String::new();
    for c in file_name.unwrap_or_default().chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '-') {
            cleaned.push(c);
        } else if c == '.' && !cleaned.ends_with('.') {
            cleaned.push('.');
        }
    }
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        cleaned
    }
}
