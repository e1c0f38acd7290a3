//! Filesystem storage capability.
//!
//! Keys are relative, slash-separated paths under a configured root
//! (e.g. `staging/{session_id}/{index}.part`, `work/processed_{uuid}.mp4`).
//! Path traversal is rejected at the key level.

mod local;

pub use local::{LocalStorage, StorageError, StorageResult};
