use serde::{Deserialize, Serialize};

pub const UPLOAD_SUCCESS_MESSAGE: &str = "PDF uploaded and processed successfully";
pub const SESSION_CLEARED_MESSAGE: &str = "Session cleared successfully";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub pdf_id: String,
    /// Same value as `pdf_id`, kept for clients of the older upload route.
    pub session_id: String,
    pub chunks: usize,
    pub filename: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default, alias = "user_message")]
    pub question: String,
    #[serde(default)]
    pub pdf_ids: Vec<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    /// `pdf_ids` followed by `session_id`, when the latter is not already listed.
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids = self.pdf_ids.clone();
        if let Some(session) = self.session_id.as_ref().filter(|id| !id.trim().is_empty()) {
            if !ids.contains(session) {
                ids.push(session.clone());
            }
        }
        ids
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub pdf_id: String,
    pub summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub indexes: usize,
    pub inference: String,
}
