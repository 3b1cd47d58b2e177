use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use pdf_chat_core::IndexError;
use std::sync::Arc;
use tracing::debug;

use crate::api::{ChatRequest, ChatResponse};
use crate::app::AppState;
use crate::error::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/", post(chat))
        .route("/chat", post(chat))
}

/// POST /chat/ - Answer a question from the chunks of the listed PDFs.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let ids = request.identifiers();
    if ids.is_empty() {
        return Err(ApiError::validation(
            "No PDF IDs provided. Please upload a PDF first.",
        ));
    }
    if request.question.trim().is_empty() {
        return Err(ApiError::validation("Question cannot be empty."));
    }

    let index = state.registry.resolve(&ids).await.map_err(|error| match error {
        IndexError::NoneResolved => ApiError::validation(error.to_string()),
        other => ApiError::internal(format!("Error processing chat: {other}")),
    })?;
    debug!(requested = ids.len(), chunks = index.len(), "indexes resolved");

    let answer = state
        .generator
        .answer(&request.question, &index)
        .await
        .map_err(|error| ApiError::internal(format!("Error processing chat: {error}")))?;

    Ok(Json(ChatResponse {
        answer: answer.answer,
        sources: answer.sources,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::ChatResponse;
    use crate::routes::testing::{detail_of, TestApp};
    use pdf_chat_core::{CompletionClient, HuggingFaceClient, InferenceConfig};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PUMPS: &str = "Hydraulic pumps convert mechanical power into fluid flow.\nThe gear pump keeps pressure steady.";
    const BELTS: &str = "Conveyor belts move cartons between packing stations.\nBelt tension is checked weekly.";
    const BREAD: &str = "Sourdough bread needs a long fermentation.\nBake the loaf in a hot oven.";

    fn squash(text: &str) -> String {
        text.split_whitespace().collect()
    }

    async fn hosted(server: &MockServer) -> Option<Arc<dyn CompletionClient>> {
        let client = HuggingFaceClient::new(InferenceConfig {
            endpoint: format!("{}/models", server.uri()),
            timeout: Duration::from_secs(2),
            ..InferenceConfig::new("hf_test_token")
        })
        .unwrap();
        Some(Arc::new(client))
    }

    #[tokio::test]
    async fn sources_only_come_from_requested_pdfs() {
        let app = TestApp::spawn(None).await;
        let a = app.upload_ok("pumps.pdf", &[PUMPS]).await;
        let b = app.upload_ok("belts.pdf", &[BELTS]).await;
        app.upload_ok("bread.pdf", &[BREAD]).await;

        let response = app
            .post_json(
                "/chat/",
                json!({"question": "How does the gear pump work?", "pdf_ids": [a.pdf_id, b.pdf_id]}),
            )
            .await;
        assert_eq!(response.status(), 200);
        let chat: ChatResponse = response.json().await.unwrap();

        assert!(!chat.answer.is_empty());
        assert!(!chat.sources.is_empty());
        for source in &chat.sources {
            let preview = squash(source.trim_end_matches("..."));
            assert!(
                squash(PUMPS).contains(&preview) || squash(BELTS).contains(&preview),
                "unexpected source {source}"
            );
            assert!(!squash(BREAD).contains(&preview));
        }
    }

    #[tokio::test]
    async fn unknown_ids_are_rejected() {
        let app = TestApp::spawn(None).await;
        let response = app
            .post_json(
                "/chat/",
                json!({"question": "Anything?", "pdf_ids": ["does-not-exist", "../etc"]}),
            )
            .await;

        assert_eq!(response.status(), 400);
        assert_eq!(
            detail_of(response).await,
            "No valid vector stores found for the provided PDF IDs."
        );
    }

    #[tokio::test]
    async fn unknown_ids_are_skipped_when_one_resolves() {
        let app = TestApp::spawn(None).await;
        let a = app.upload_ok("pumps.pdf", &[PUMPS]).await;

        let response = app
            .post_json(
                "/chat",
                json!({"question": "What does the pump do?", "pdf_ids": ["missing", a.pdf_id]}),
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn empty_ids_and_blank_questions_are_rejected() {
        let app = TestApp::spawn(None).await;

        let response = app
            .post_json("/chat/", json!({"question": "Hello?", "pdf_ids": []}))
            .await;
        assert_eq!(response.status(), 400);
        assert_eq!(
            detail_of(response).await,
            "No PDF IDs provided. Please upload a PDF first."
        );

        let a = app.upload_ok("pumps.pdf", &[PUMPS]).await;
        let response = app
            .post_json("/chat/", json!({"question": "   ", "pdf_ids": [a.pdf_id]}))
            .await;
        assert_eq!(response.status(), 400);
        assert_eq!(detail_of(response).await, "Question cannot be empty.");
    }

    #[tokio::test]
    async fn legacy_request_shape_is_answered() {
        let app = TestApp::spawn(None).await;
        let a = app.upload_ok("belts.pdf", &[BELTS]).await;

        let response = app
            .post_json(
                "/chat/",
                json!({"user_message": "How often is belt tension checked?", "session_id": a.session_id}),
            )
            .await;
        assert_eq!(response.status(), 200);
        let chat: ChatResponse = response.json().await.unwrap();
        assert!(!chat.answer.is_empty());
    }

    #[tokio::test]
    async fn failing_inference_still_answers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let app = TestApp::spawn(hosted(&server).await).await;
        let a = app.upload_ok("pumps.pdf", &[PUMPS]).await;

        let response = app
            .post_json(
                "/chat/",
                json!({"question": "What keeps pressure steady?", "pdf_ids": [a.pdf_id]}),
            )
            .await;
        assert_eq!(response.status(), 200);
        let chat: ChatResponse = response.json().await.unwrap();
        assert!(!chat.answer.trim().is_empty());
        assert_eq!(chat.sources.len(), 1);
    }

    #[tokio::test]
    async fn hosted_answer_is_returned_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"generated_text": "The gear pump keeps pressure steady."}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let app = TestApp::spawn(hosted(&server).await).await;
        let a = app.upload_ok("pumps.pdf", &[PUMPS]).await;

        let chat: ChatResponse = app
            .post_json(
                "/chat/",
                json!({"question": "What keeps pressure steady?", "pdf_ids": [a.pdf_id]}),
            )
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(chat.answer, "The gear pump keeps pressure steady.");
    }

    #[tokio::test]
    async fn apologetic_completion_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"generated_text": "I'm sorry, I cannot help."}])),
            )
            .mount(&server)
            .await;

        let app = TestApp::spawn(hosted(&server).await).await;
        let a = app.upload_ok("pumps.pdf", &[PUMPS]).await;

        let chat: ChatResponse = app
            .post_json(
                "/chat/",
                json!({"question": "What keeps pressure steady?", "pdf_ids": [a.pdf_id]}),
            )
            .await
            .json()
            .await
            .unwrap();
        assert!(!chat.answer.contains("I'm sorry"));
        assert!(!chat.answer.trim().is_empty());
    }
}
