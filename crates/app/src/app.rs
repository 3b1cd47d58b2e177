use crate::config::{EmbedderArg, ServiceArgs};
use pdf_chat_core::{
    ingest_folder_best_effort, ingest_pdf, shared_embedder, AnswerGenerator,
    CharacterNgramEmbedder, ChatAnswer, CompletionClient, DiskIndexStore, DocumentId, Embedder,
    HuggingFaceClient, IndexStore, IngestError, IngestedDocument, IngestionOptions,
    RetrievalOptions, SessionRegistry, SkippedPdf,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state.
pub struct AppState {
    pub registry: SessionRegistry,
    pub generator: AnswerGenerator,
    pub embedder: Arc<dyn Embedder>,
    pub ingestion: IngestionOptions,
    /// Uploads are staged here while they are processed.
    pub temp_dir: PathBuf,
}

/// One PDF indexed by [`AppState::ingest_folder`].
#[derive(Debug)]
pub struct IndexedPdf {
    pub path: PathBuf,
    pub pdf_id: DocumentId,
    pub chunks: usize,
}

pub struct FolderIngestion {
    pub indexed: Vec<IndexedPdf>,
    pub skipped: Vec<SkippedPdf>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn IndexStore>,
        embedder: Arc<dyn Embedder>,
        completion: Option<Arc<dyn CompletionClient>>,
        retrieval: RetrievalOptions,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(store),
            generator: AnswerGenerator::new(Arc::clone(&embedder), completion, retrieval),
            embedder,
            ingestion: IngestionOptions::default(),
            temp_dir,
        }
    }

    /// Opens the on-disk index root, loads the embedding model and wires the
    /// hosted model when a token is configured.
    pub async fn from_args(args: &ServiceArgs) -> anyhow::Result<Self> {
        let store = DiskIndexStore::open(&args.index_root).await?;
        info!(index_root = %args.index_root.display(), "index store opened");

        let embedder: Arc<dyn Embedder> = match args.embedder {
            EmbedderArg::Sentence => {
                let cache_dir = args.model_cache_dir.clone();
                tokio::task::spawn_blocking(move || shared_embedder(Some(cache_dir))).await??
            }
            EmbedderArg::Ngram => {
                warn!("using the n-gram embedder; retrieval only matches close wording");
                Arc::new(CharacterNgramEmbedder::default())
            }
        };

        let completion: Option<Arc<dyn CompletionClient>> = match args.inference_config() {
            Some(config) => {
                let model = config.model.clone();
                let client = HuggingFaceClient::new(config)?;
                info!(model = %model, url = %client.url(), "hosted inference enabled");
                Some(Arc::new(client))
            }
            None => {
                warn!("no inference token configured; answers use the local fallback");
                None
            }
        };

        tokio::fs::create_dir_all(&args.temp_dir).await?;

        Ok(Self::new(
            Arc::new(store),
            embedder,
            completion,
            args.retrieval_options(),
            args.temp_dir.clone(),
        ))
    }

    /// Writes the upload to a temporary file and ingests it. The file is
    /// removed when this returns, whatever the outcome. Blocking.
    pub fn ingest_upload(
        &self,
        document_id: DocumentId,
        bytes: &[u8],
    ) -> Result<IngestedDocument, IngestError> {
        std::fs::create_dir_all(&self.temp_dir)?;
        let mut staged = tempfile::Builder::new()
            .prefix("temp_upload_")
            .suffix(".pdf")
            .tempfile_in(&self.temp_dir)?;
        staged.write_all(bytes)?;
        staged.flush()?;

        ingest_pdf(
            staged.path(),
            document_id,
            &self.ingestion,
            self.embedder.as_ref(),
        )
    }

    /// Indexes every PDF under `folder` and registers each under a new id.
    /// Unreadable PDFs are reported, not fatal.
    pub async fn ingest_folder(&self, folder: &Path) -> anyhow::Result<FolderIngestion> {
        let options = self.ingestion.clone();
        let embedder = Arc::clone(&self.embedder);
        let scan = folder.to_path_buf();
        let report = tokio::task::spawn_blocking(move || {
            ingest_folder_best_effort(&scan, &options, embedder.as_ref())
        })
        .await??;

        for skipped in &report.skipped_files {
            warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
        }

        let mut indexed = Vec::with_capacity(report.documents.len());
        for (path, document) in report.documents {
            self.registry
                .put(document.document_id.clone(), document.index)
                .await?;
            info!(
                pdf_id = %document.document_id,
                chunks = document.chunk_count,
                checksum = %document.checksum,
                "pdf indexed"
            );
            indexed.push(IndexedPdf {
                path,
                pdf_id: document.document_id,
                chunks: document.chunk_count,
            });
        }

        info!(
            folder = %folder.display(),
            indexed = indexed.len(),
            skipped = report.skipped_files.len(),
            "ingestion finished"
        );
        Ok(FolderIngestion {
            indexed,
            skipped: report.skipped_files,
        })
    }

    pub async fn ask(&self, question: &str, pdf_ids: &[String]) -> anyhow::Result<ChatAnswer> {
        if question.trim().is_empty() {
            anyhow::bail!("Question cannot be empty.");
        }

        let index = self.registry.resolve(pdf_ids).await?;
        Ok(self.generator.answer(question, &index).await?)
    }
}
