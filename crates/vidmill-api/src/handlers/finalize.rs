//! Finalize handler: merge, transform, and return the converted file.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
};

use vidmill_core::models::{Operation, RawOperationParams};
use vidmill_core::AppError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Finalize an upload session: merge its chunks, run the requested
/// operation, and stream the converted file back as an attachment.
///
/// The merged input and the transformation output are both removed from
/// storage before the response is returned; nothing outlives the request.
#[utoipa::path(
    post,
    path = "/finalize",
    tag = "uploads",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Converted file", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid input or missing chunk", body = ErrorResponse),
        (status = 500, description = "Transformation failed", body = ErrorResponse)
    )
)]
pub async fn finalize_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let mut session_id: Option<String> = None;
    let mut total_chunks: Option<u32> = None;
    let mut file_name: Option<String> = None;
    let mut operation_name: Option<String> = None;
    let mut params = RawOperationParams::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field.text().await?;
        match name.as_str() {
            "session_id" => session_id = Some(value),
            "total_chunks" => {
                let parsed = value.trim().parse::<u32>().map_err(|_| {
                    AppError::InvalidParameter {
                        name: "total_chunks".to_string(),
                        reason: format!("must be a positive integer, got '{}'", value),
                    }
                })?;
                total_chunks = Some(parsed);
            }
            "file_name" => file_name = Some(value),
            "operation" => operation_name = Some(value),
            other => params.set_field(other, &value)?,
        }
    }

    let session_id =
        session_id.ok_or_else(|| AppError::MissingParameter("session_id".to_string()))?;
    let total_chunks =
        total_chunks.ok_or_else(|| AppError::MissingParameter("total_chunks".to_string()))?;

    // Resolve the operation before merging so invalid requests fail without
    // touching the stored chunks.
    let operation = Operation::resolve(operation_name.as_deref(), &params)?;

    let merged = state
        .sessions
        .finalize(&session_id, total_chunks, file_name.as_deref())
        .await?;

    tracing::info!(
        session_id = %session_id,
        operation = operation.name(),
        input_key = %merged.key,
        "Finalizing upload session"
    );

    let dispatch_result = state.dispatcher.execute(&merged.path, &operation).await;

    // The merged input is consumed by this request, success or not.
    if let Err(e) = state.storage.delete(&merged.key).await {
        tracing::warn!(
            input_key = %merged.key,
            error = %e,
            "Failed to delete merged input"
        );
    }

    let artifact = dispatch_result?;

    let read_result = state.storage.read(&artifact.key).await;
    if let Err(e) = state.storage.delete(&artifact.key).await {
        tracing::warn!(
            output_key = %artifact.key,
            error = %e,
            "Failed to delete transformation output"
        );
    }
    let bytes = read_result?;

    tracing::info!(
        session_id = %session_id,
        operation = operation.name(),
        file_name = %artifact.file_name,
        size_bytes = bytes.len(),
        "Returning converted file"
    );

    let headers = [
        (header::CONTENT_TYPE, artifact.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.file_name),
        ),
    ];

    Ok((headers, bytes).into_response())
}
