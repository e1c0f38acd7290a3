//! Core types shared across the vidmill workspace: error taxonomy,
//! configuration, and the media operation catalog.

pub mod config;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
