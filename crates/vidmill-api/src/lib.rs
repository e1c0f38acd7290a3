//! Vidmill API Library
//!
//! This crate provides the HTTP API handlers, error conversion, and
//! application setup.

mod api_doc;

pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
