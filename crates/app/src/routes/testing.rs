use pdf_chat_core::fixtures::pdf_with_pages;
use pdf_chat_core::{CharacterNgramEmbedder, CompletionClient, DiskIndexStore, RetrievalOptions};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use super::build_router;
use crate::api::UploadResponse;
use crate::app::AppState;

/// A server bound to an ephemeral port with its own index root and staging
/// directory.
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub index_root: PathBuf,
    pub temp_dir: PathBuf,
    _workspace: TempDir,
}

impl TestApp {
    pub async fn spawn(completion: Option<Arc<dyn CompletionClient>>) -> Self {
        let workspace = tempfile::tempdir().unwrap();
        let index_root = workspace.path().join("faiss_index");
        let temp_dir = workspace.path().join("temp");

        let store = DiskIndexStore::open(&index_root).await.unwrap();
        let state = AppState::new(
            Arc::new(store),
            Arc::new(CharacterNgramEmbedder::default()),
            completion,
            RetrievalOptions::default(),
            temp_dir.clone(),
        );
        let router = build_router(Arc::new(state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            index_root,
            temp_dir,
            _workspace: workspace,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client.delete(self.url(path)).send().await.unwrap()
    }

    pub async fn post_json(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn upload(&self, route: &str, filename: &str, bytes: Vec<u8>) -> reqwest::Response {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .unwrap();
        self.client
            .post(self.url(route))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .unwrap()
    }

    /// Uploads a generated PDF and asserts it was accepted.
    pub async fn upload_ok(&self, filename: &str, pages: &[&str]) -> UploadResponse {
        let response = self.upload("/upload/", filename, pdf_with_pages(pages)).await;
        assert_eq!(response.status(), 200, "upload of {filename} failed");
        response.json().await.unwrap()
    }

    /// Names of the per-id directories under the index root.
    pub fn stored_ids(&self) -> Vec<String> {
        entries(&self.index_root)
    }

    pub fn staged_files(&self) -> Vec<String> {
        entries(&self.temp_dir)
    }
}

fn entries(dir: &Path) -> Vec<String> {
    let Ok(read) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = read
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub async fn detail_of(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["detail"].as_str().unwrap_or_default().to_string()
}
