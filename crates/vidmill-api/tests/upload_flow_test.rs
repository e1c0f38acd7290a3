//! End-to-end tests for the chunked upload and transformation flow.
//!
//! The media engine is replaced with in-process doubles so tests run without
//! an ffmpeg binary; everything else is the real application wiring.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use tempfile::TempDir;

use vidmill::setup;
use vidmill_core::models::Operation;
use vidmill_core::Config;
use vidmill_processing::{EngineError, MediaEngine};

/// Engine double that copies the input file to the output path.
struct CopyEngine;

#[async_trait]
impl MediaEngine for CopyEngine {
    async fn transform(
        &self,
        input: &Path,
        _operation: &Operation,
        output: &Path,
    ) -> Result<(), EngineError> {
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

/// Engine double that always fails after writing a partial output.
struct FailEngine;

#[async_trait]
impl MediaEngine for FailEngine {
    async fn transform(
        &self,
        _input: &Path,
        _operation: &Operation,
        output: &Path,
    ) -> Result<(), EngineError> {
        tokio::fs::write(output, b"partial").await?;
        Err(EngineError::CommandFailed("simulated ffmpeg failure".to_string()))
    }
}

async fn test_server(engine: Arc<dyn MediaEngine>) -> (TempDir, TestServer) {
    test_server_with_config(engine, Config::default()).await
}

async fn test_server_with_config(
    engine: Arc<dyn MediaEngine>,
    config: Config,
) -> (TempDir, TestServer) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config {
        storage_root: dir.path().to_path_buf(),
        ..config
    };

    let storage = vidmill_storage::LocalStorage::new(dir.path())
        .await
        .expect("storage");
    let state = setup::build_state(config, Arc::new(storage), engine);
    let server = TestServer::new(setup::routes::setup_routes(state)).expect("test server");
    (dir, server)
}

async fn upload_chunk(server: &TestServer, session_id: &str, index: u32, payload: &[u8]) {
    let form = MultipartForm::new()
        .add_text("session_id", session_id)
        .add_text("index", index.to_string())
        .add_part(
            "payload",
            Part::bytes(payload.to_vec()).mime_type("application/octet-stream"),
        );

    let response = server.post("/upload_chunk").multipart(form).await;
    response.assert_status_ok();
    let ack: serde_json::Value = response.json();
    assert_eq!(ack["status"], "ok");
}

/// No file anywhere under the storage root once a request flow has finished.
fn assert_storage_empty(root: &Path) {
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).expect("read_dir") {
            let entry = entry.expect("dir entry");
            let path = entry.path();
            assert!(
                path.is_dir(),
                "leftover file in storage: {}",
                path.display()
            );
            pending.push(path);
        }
    }
}

#[tokio::test]
async fn test_full_upload_and_compress_flow() {
    let (dir, server) = test_server(Arc::new(CopyEngine)).await;

    // Chunks arrive out of order; the merge is by index.
    upload_chunk(&server, "sess-1", 2, b"CCC").await;
    upload_chunk(&server, "sess-1", 0, b"AAA").await;
    upload_chunk(&server, "sess-1", 1, b"BBB").await;

    let form = MultipartForm::new()
        .add_text("session_id", "sess-1")
        .add_text("total_chunks", "3")
        .add_text("file_name", "movie.mp4");

    let response = server.post("/finalize").multipart(form).await;
    response.assert_status_ok();

    assert_eq!(response.as_bytes().to_vec(), b"AAABBBCCC");

    let content_type = response.header("content-type");
    assert_eq!(content_type.to_str().unwrap(), "video/mp4");

    let disposition = response.header("content-disposition").to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"converted_processed_"));
    assert!(disposition.ends_with(".mp4\""));

    // Neither chunks nor intermediate artifacts survive the request.
    assert_storage_empty(dir.path());
}

#[tokio::test]
async fn test_extract_audio_changes_extension_and_content_type() {
    let (_dir, server) = test_server(Arc::new(CopyEngine)).await;

    upload_chunk(&server, "sess-audio", 0, b"media-bytes").await;

    let form = MultipartForm::new()
        .add_text("session_id", "sess-audio")
        .add_text("total_chunks", "1")
        .add_text("operation", "extract_audio");

    let response = server.post("/finalize").multipart(form).await;
    response.assert_status_ok();

    assert_eq!(response.header("content-type").to_str().unwrap(), "audio/mpeg");
    let disposition = response.header("content-disposition").to_str().unwrap().to_string();
    assert!(disposition.ends_with(".mp3\""));
}

#[tokio::test]
async fn test_finalize_with_missing_chunk_is_recoverable_400() {
    let (dir, server) = test_server(Arc::new(CopyEngine)).await;

    upload_chunk(&server, "sess-gap", 0, b"AAA").await;
    upload_chunk(&server, "sess-gap", 2, b"CCC").await;

    let form = MultipartForm::new()
        .add_text("session_id", "sess-gap")
        .add_text("total_chunks", "3");

    let response = server.post("/finalize").multipart(form).await;
    response.assert_status_bad_request();

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "MISSING_CHUNK");
    assert_eq!(body["recoverable"], true);
    assert_eq!(body["error"], "Missing chunk 1");

    // The failed session is torn down entirely.
    assert_storage_empty(dir.path());
}

#[tokio::test]
async fn test_unsupported_operation_rejected_before_merge() {
    let (dir, server) = test_server(Arc::new(CopyEngine)).await;

    upload_chunk(&server, "sess-op", 0, b"AAA").await;

    let form = MultipartForm::new()
        .add_text("session_id", "sess-op")
        .add_text("total_chunks", "1")
        .add_text("operation", "rotate");

    let response = server.post("/finalize").multipart(form).await;
    response.assert_status_bad_request();

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "UNSUPPORTED_OPERATION");

    // Operation validation happens before the merge, so the chunk is still
    // there for a corrected retry.
    let chunk = dir.path().join("staging/sess-op/0.part");
    assert!(chunk.exists());
}

#[tokio::test]
async fn test_change_resolution_requires_dimensions() {
    let (_dir, server) = test_server(Arc::new(CopyEngine)).await;

    upload_chunk(&server, "sess-res", 0, b"AAA").await;

    let form = MultipartForm::new()
        .add_text("session_id", "sess-res")
        .add_text("total_chunks", "1")
        .add_text("operation", "change_resolution")
        .add_text("width", "640");

    let response = server.post("/finalize").multipart(form).await;
    response.assert_status_bad_request();

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "MISSING_PARAMETER");
    assert_eq!(body["error"], "Missing parameter: height");
}

#[tokio::test]
async fn test_engine_failure_returns_500_and_cleans_up() {
    let (dir, server) = test_server(Arc::new(FailEngine)).await;

    upload_chunk(&server, "sess-fail", 0, b"AAA").await;

    let form = MultipartForm::new()
        .add_text("session_id", "sess-fail")
        .add_text("total_chunks", "1");

    let response = server.post("/finalize").multipart(form).await;
    response.assert_status_internal_server_error();

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "TRANSFORM_ERROR");
    assert_eq!(body["recoverable"], false);

    // Merged input, partial output, and staged chunks are all gone.
    assert_storage_empty(dir.path());
}

#[tokio::test]
async fn test_upload_chunk_requires_all_fields() {
    let (_dir, server) = test_server(Arc::new(CopyEngine)).await;

    let form = MultipartForm::new()
        .add_text("session_id", "sess-x")
        .add_text("index", "0");

    let response = server.post("/upload_chunk").multipart(form).await;
    response.assert_status_bad_request();

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "MISSING_PARAMETER");
    assert_eq!(body["error"], "Missing parameter: payload");
}

#[tokio::test]
async fn test_upload_chunk_rejects_bad_index() {
    let (_dir, server) = test_server(Arc::new(CopyEngine)).await;

    let form = MultipartForm::new()
        .add_text("session_id", "sess-x")
        .add_text("index", "not-a-number")
        .add_part("payload", Part::bytes(b"AAA".to_vec()));

    let response = server.post("/upload_chunk").multipart(form).await;
    response.assert_status_bad_request();

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INVALID_PARAMETER");
}

#[tokio::test]
async fn test_resent_chunk_overwrites_previous_payload() {
    let (_dir, server) = test_server(Arc::new(CopyEngine)).await;

    upload_chunk(&server, "sess-retry", 0, b"first").await;
    upload_chunk(&server, "sess-retry", 0, b"second").await;

    let form = MultipartForm::new()
        .add_text("session_id", "sess-retry")
        .add_text("total_chunks", "1");

    let response = server.post("/finalize").multipart(form).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().to_vec(), b"second");
}

#[tokio::test]
async fn test_oversized_chunk_gets_json_413() {
    let config = Config {
        max_upload_size_bytes: 1024,
        ..Config::default()
    };
    let (_dir, server) = test_server_with_config(Arc::new(CopyEngine), config).await;

    let form = MultipartForm::new()
        .add_text("session_id", "sess-big")
        .add_text("index", "0")
        .add_part(
            "payload",
            Part::bytes(vec![0u8; 8 * 1024]).mime_type("application/octet-stream"),
        );

    let response = server.post("/upload_chunk").multipart(form).await;
    response.assert_status(axum::http::StatusCode::PAYLOAD_TOO_LARGE);

    // The rejection uses the same JSON error shape as every other failure.
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(body["recoverable"], false);
}

#[tokio::test]
async fn test_finalize_accepts_file_name_with_dot_runs() {
    let (dir, server) = test_server(Arc::new(CopyEngine)).await;

    upload_chunk(&server, "sess-dots", 0, b"AAA").await;

    let form = MultipartForm::new()
        .add_text("session_id", "sess-dots")
        .add_text("total_chunks", "1")
        .add_text("file_name", "my..video.mp4");

    let response = server.post("/finalize").multipart(form).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().to_vec(), b"AAA");

    assert_storage_empty(dir.path());
}

#[tokio::test]
async fn test_health_check() {
    let (_dir, server) = test_server(Arc::new(CopyEngine)).await;

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
}
