//! Upload session management and operation dispatch.
//!
//! This crate owns the two stateful pieces of the service: the chunked
//! upload session (store + all-or-nothing merge) and the dispatch of a
//! validated operation descriptor to the media engine.

pub mod dispatch;
pub mod engine;
pub mod session;

pub use dispatch::{DispatchError, OperationDispatcher, OutputArtifact};
pub use engine::{EngineError, FfmpegEngine, MediaEngine};
pub use session::{MergedArtifact, UploadError, UploadSessionManager};
