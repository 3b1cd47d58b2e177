use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use pdf_chat_core::DocumentId;
use std::sync::Arc;
use tracing::info;

use crate::api::{MessageResponse, SummaryResponse, SESSION_CLEARED_MESSAGE};
use crate::app::AppState;
use crate::error::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session/{session_id}", delete(clear_session))
        .route("/summary/{pdf_id}", get(summary))
}

/// DELETE /session/{session_id} - Forget an id and remove its stored index.
async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = DocumentId::parse(&session_id)
        .ok_or_else(|| ApiError::not_found("Session not found"))?;

    match state.registry.delete(&id).await {
        Ok(()) => {
            info!(pdf_id = %id, "session cleared");
            Ok(Json(MessageResponse {
                message: SESSION_CLEARED_MESSAGE.to_string(),
            }))
        }
        Err(error) if error.is_not_found() => Err(ApiError::not_found("Session not found")),
        Err(error) => Err(ApiError::internal(format!("Error clearing session: {error}"))),
    }
}

/// GET /summary/{pdf_id} - Short overview of an indexed PDF.
async fn summary(
    State(state): State<Arc<AppState>>,
    Path(pdf_id): Path<String>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let id = DocumentId::parse(&pdf_id).ok_or_else(|| ApiError::not_found("PDF not found"))?;

    let index = state.registry.get(&id).await.map_err(|error| {
        if error.is_not_found() {
            ApiError::not_found("PDF not found")
        } else {
            ApiError::internal(format!("Error generating summary: {error}"))
        }
    })?;

    Ok(Json(SummaryResponse {
        pdf_id: id.to_string(),
        summary: state.generator.summarize(&index),
    }))
}
