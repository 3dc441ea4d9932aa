use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{multipart::Multipart, rejection::JsonRejection, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use piper_core::PiperError;
use piper_storage::display_name_for;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub fn compression_routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload-compress", post(upload_and_compress))
        .route("/api/compress-text", post(compress_text))
        .route("/api/download/{file_id}", get(download))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Successful upload response.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub original_filename: String,
    pub compressed_filename: String,
    pub original_size: u64,
    pub compressed_size: u64,
    pub compression_ratio: f64,
    /// The engine wrote no output and the input was stored as-is.
    pub output_fallback: bool,
    pub timestamp: String,
}

/// A client upload pulled out of a multipart body.
struct Upload {
    filename: String,
    content: Vec<u8>,
}

/// Accepts either a `file` part, or `text` plus `filename` parts.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    let mut file: Option<Upload> = None;
    let mut text: Option<String> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let invalid = |e: axum::extract::multipart::MultipartError| {
            ApiError::bad_request(format!("Invalid multipart body: {e}"))
        };
        match field.name() {
            // A `file` part without a filename attribute is not a file upload.
            Some("file") => {
                let Some(name) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let content = field.bytes().await.map_err(invalid)?.to_vec();
                file = Some(Upload { filename: name, content });
            }
            Some("text") => text = Some(field.text().await.map_err(invalid)?),
            Some("filename") => filename = Some(field.text().await.map_err(invalid)?),
            _ => {}
        }
    }

    match (file, text) {
        (Some(upload), _) => Ok(upload),
        (None, Some(text)) => Ok(Upload {
            filename: filename.unwrap_or_default(),
            content: text.into_bytes(),
        }),
        (None, None) => Err(ApiError::bad_request("No file provided")),
    }
}

async fn upload_and_compress(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await?;

    if upload.filename.is_empty() {
        return Err(ApiError::bad_request("No file selected"));
    }
    if !state.upload.is_allowed(&upload.filename) {
        return Err(ApiError::bad_request("File type not allowed"));
    }
    let text = String::from_utf8(upload.content)
        .map_err(|_| ApiError::bad_request("File must be a text file"))?;

    let original_filename = display_name_for(&upload.filename);
    let stored = state
        .orchestrator
        .compress_and_store(&original_filename, &text)
        .await?;

    info!(
        op = "upload.compressed",
        file_id = %stored.artifact.id,
        original_filename = %original_filename,
        "upload compressed"
    );

    Ok(Json(UploadResponse {
        file_id: stored.artifact.id.to_string(),
        original_filename,
        compressed_filename: stored.artifact.stored_name,
        original_size: stored.outcome.original_size,
        compressed_size: stored.outcome.compressed_size,
        compression_ratio: stored.outcome.stats.compression_ratio,
        output_fallback: stored.outcome.output_fallback,
        timestamp: stored.artifact.created_at.to_rfc3339(),
    }))
}

async fn download(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let artifact = state
        .orchestrator
        .store()
        .find_by_prefix(&file_id)
        .await
        .map_err(|e| match e {
            PiperError::ArtifactNotFound { .. } | PiperError::InvalidArtifactId(_) => ApiError::from(e),
            other => {
                warn!(op = "download.failed", file_id = %file_id, error = %other, "download failed");
                ApiError::internal(format!("Download failed: {other}"))
            }
        })?;

    let disposition = format!("attachment; filename=\"{}\"", artifact.stored_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.data,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct CompressTextRequest {
    #[serde(default)]
    pub text: String,
}

async fn compress_text(
    State(state): State<AppState>,
    payload: Result<Json<CompressTextRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?;
    if req.text.is_empty() {
        return Err(ApiError::bad_request("No text provided"));
    }

    let outcome = state.orchestrator.compress(&req.text).await?;
    let stats = outcome.stats;
    let result = format!(
        "Original size: {} bytes\nCompressed size: {} bytes\nReduction: {:.2}%\n\nCompressed data (hex): {}",
        stats.original_size,
        stats.compressed_size,
        stats.compression_ratio,
        to_hex(&outcome.data)
    );
    Ok(Json(json!({ "result": result })))
}

fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}
