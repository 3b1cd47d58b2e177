use crate::chunking::build_chunks;
use crate::embeddings::Embedder;
use crate::extractor::extract_text;
use crate::{DocumentId, FlatIndex, IngestError, IngestionOptions};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub fn has_pdf_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if entry.path().to_str().is_some_and(has_pdf_extension) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// A fully embedded document, not yet registered anywhere.
#[derive(Debug, Clone)]
pub struct IngestedDocument {
    pub document_id: DocumentId,
    pub index: FlatIndex,
    pub chunk_count: usize,
    pub checksum: String,
}

/// Extracts, chunks and embeds one PDF into a fresh index. Fails with
/// [`IngestError::EmptyText`] when the PDF has no text layer.
pub fn ingest_pdf(
    path: &Path,
    document_id: DocumentId,
    options: &IngestionOptions,
    embedder: &dyn Embedder,
) -> Result<IngestedDocument, IngestError> {
    let checksum = digest_file(path)?;
    let text = extract_text(path)?;
    if text.trim().is_empty() {
        return Err(IngestError::EmptyText(path.display().to_string()));
    }

    let chunks = build_chunks(document_id.as_str(), &text, options)?;
    let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
    let vectors = embedder.embed_batch(&texts)?;
    debug!(pdf_id = %document_id, chunk_count = chunks.len(), "chunks embedded");

    let chunk_count = chunks.len();
    let index = FlatIndex::build(chunks, vectors)?;

    Ok(IngestedDocument {
        document_id,
        index,
        chunk_count,
        checksum,
    })
}

pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IngestionReport {
    pub documents: Vec<(PathBuf, IngestedDocument)>,
    pub skipped_files: Vec<SkippedPdf>,
}

/// Ingests every PDF under `folder`, each under a freshly generated id.
/// Files that fail are reported instead of aborting the run.
pub fn ingest_folder_best_effort(
    folder: &Path,
    options: &IngestionOptions,
    embedder: &dyn Embedder,
) -> Result<IngestionReport, IngestError> {
    let files = discover_pdf_files(folder);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no pdf files found in {}",
            folder.display()
        )));
    }

    let mut documents = Vec::new();
    let mut skipped_files = Vec::new();

    for path in files {
        match ingest_pdf(&path, DocumentId::generate(), options, embedder) {
            Ok(document) => documents.push((path, document)),
            Err(error) => skipped_files.push(SkippedPdf {
                path,
                reason: error.to_string(),
            }),
        }
    }

    Ok(IngestionReport {
        documents,
        skipped_files,
    })
}
