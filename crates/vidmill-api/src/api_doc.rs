//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vidmill API",
        version = "0.1.0",
        description = "Chunked media upload and transformation API. Upload a file in chunks, then finalize with one of the supported operations (compress, change_resolution, change_aspect_ratio, extract_audio, create_gif, create_webm) to receive the converted file."
    ),
    paths(
        handlers::upload_chunk::upload_chunk,
        handlers::finalize::finalize_upload,
        handlers::health::health_check,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::upload_chunk::ChunkAck,
        handlers::health::HealthResponse,
    )),
    tags(
        (name = "uploads", description = "Chunked upload and transformation endpoints"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;
