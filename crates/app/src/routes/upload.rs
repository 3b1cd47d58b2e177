use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use pdf_chat_core::{has_pdf_extension, DocumentId, IngestError};
use std::sync::Arc;
use tracing::info;

use crate::api::{UploadResponse, UPLOAD_SUCCESS_MESSAGE};
use crate::app::AppState;
use crate::error::ApiError;

pub const EMPTY_PDF_DETAIL: &str =
    "No text could be extracted from the PDF. It might be empty or scanned.";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload/", post(upload_pdf))
        .route("/upload", post(upload_pdf))
        .route("/upload_pdf/", post(upload_pdf))
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// POST /upload/ - Index a PDF and return the id to chat against.
async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    if !has_pdf_extension(&upload.filename) {
        return Err(ApiError::validation("Only PDF files are allowed"));
    }

    let document_id = DocumentId::generate();
    let worker = Arc::clone(&state);
    let worker_id = document_id.clone();
    let bytes = upload.bytes;

    let document = tokio::task::spawn_blocking(move || worker.ingest_upload(worker_id, &bytes))
        .await
        .map_err(|error| ApiError::internal(format!("Error processing PDF: {error}")))?
        .map_err(|error| match error {
            IngestError::EmptyText(_) => ApiError::validation(EMPTY_PDF_DETAIL),
            other => ApiError::internal(format!("Error processing PDF: {other}")),
        })?;

    let chunks = document.chunk_count;
    state
        .registry
        .put(document_id.clone(), document.index)
        .await
        .map_err(|error| ApiError::internal(format!("Error processing PDF: {error}")))?;

    info!(
        pdf_id = %document_id,
        filename = %upload.filename,
        chunks,
        checksum = %document.checksum,
        "pdf indexed"
    );

    Ok(Json(UploadResponse {
        pdf_id: document_id.to_string(),
        session_id: document_id.to_string(),
        chunks,
        filename: upload.filename,
        message: UPLOAD_SUCCESS_MESSAGE.to_string(),
    }))
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
        return Ok(Upload { filename, bytes });
    }

    Err(ApiError::validation("No file provided"))
}

fn multipart_error(error: MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::TooLarge(error.body_text())
    } else {
        ApiError::validation(format!("Failed to read upload: {}", error.body_text()))
    }
}
