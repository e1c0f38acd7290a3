//! HTTP request handlers.

pub mod finalize;
pub mod health;
pub mod upload_chunk;
