use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::warn;

use crate::api::{HealthResponse, MessageResponse};
use crate::app::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

/// GET /
async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "PDF Chat API is running".to_string(),
    })
}

/// GET /health - always 200 while the process is serving.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let indexes = match state.registry.known_ids().await {
        Ok(count) => count,
        Err(error) => {
            warn!(%error, "could not count stored indexes");
            0
        }
    };
    let inference = if state.generator.has_completion() {
        "hosted"
    } else {
        "fallback-only"
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "API is running".to_string(),
        indexes,
        inference: inference.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use crate::api::{HealthResponse, MessageResponse};
    use crate::routes::testing::TestApp;

    #[tokio::test]
    async fn root_and_health_respond() {
        let app = TestApp::spawn(None).await;

        let root: MessageResponse = app.get("/").await.json().await.unwrap();
        assert_eq!(root.message, "PDF Chat API is running");

        let response = app.get("/health").await;
        assert_eq!(response.status(), 200);
        let health: HealthResponse = response.json().await.unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.indexes, 0);
        assert_eq!(health.inference, "fallback-only");
    }

    #[tokio::test]
    async fn health_counts_stored_indexes() {
        let app = TestApp::spawn(None).await;
        app.upload_ok("a.pdf", &["Gearbox oil capacity is four litres."]).await;

        let health: HealthResponse = app.get("/health").await.json().await.unwrap();
        assert_eq!(health.indexes, 1);
    }
}
