//! Chunk ingestion handler.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use vidmill_core::AppError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ChunkAck {
    pub status: String,
    pub message: String,
}

/// Upload a single chunk of a session.
///
/// Chunks may arrive in any order and may be re-sent; the latest payload for
/// an index wins.
#[utoipa::path(
    post,
    path = "/upload_chunk",
    tag = "uploads",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Chunk stored", body = ChunkAck),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "Chunk too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn upload_chunk(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut session_id: Option<String> = None;
    let mut index: Option<u32> = None;
    let mut payload: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "session_id" => session_id = Some(field.text().await?),
            "index" => {
                let raw = field.text().await?;
                let parsed = raw.trim().parse::<u32>().map_err(|_| {
                    AppError::InvalidParameter {
                        name: "index".to_string(),
                        reason: format!("must be a non-negative integer, got '{}'", raw),
                    }
                })?;
                index = Some(parsed);
            }
            "payload" => payload = Some(field.bytes().await?.to_vec()),
            _ => {}
        }
    }

    let session_id =
        session_id.ok_or_else(|| AppError::MissingParameter("session_id".to_string()))?;
    let index = index.ok_or_else(|| AppError::MissingParameter("index".to_string()))?;
    let payload = payload.ok_or_else(|| AppError::MissingParameter("payload".to_string()))?;

    state
        .sessions
        .store_chunk(&session_id, index, &payload)
        .await?;

    Ok(Json(ChunkAck {
        status: "ok".to_string(),
        message: format!("chunk {} saved", index),
    }))
}
