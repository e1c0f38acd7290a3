//! Media transformation engine capability.
//!
//! The dispatcher talks to the engine through the `MediaEngine` trait so
//! tests can substitute a double that returns canned outputs or errors
//! without invoking any real media-processing binary.

mod ffmpeg;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use vidmill_core::models::Operation;

pub use ffmpeg::FfmpegEngine;

/// Transformation engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine process ran but reported failure (bad codec, corrupt
    /// input, ...). Carries the engine's own diagnostics.
    #[error("{0}")]
    CommandFailed(String),

    /// The engine process could not be spawned or its output read.
    #[error("Failed to run engine: {0}")]
    Io(#[from] std::io::Error),

    /// The engine is misconfigured (e.g. an unusable binary path).
    #[error("Invalid engine configuration: {0}")]
    Config(String),
}

/// An external capability that turns an input file into an output file
/// according to an operation descriptor.
///
/// Invocations block until the engine finishes; nothing here is cancellable
/// mid-flight, and no timeout is imposed at this layer.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    async fn transform(
        &self,
        input: &Path,
        operation: &Operation,
        output: &Path,
    ) -> Result<(), EngineError>;
}
