pub mod answer;
pub mod chunking;
pub mod completion;
pub mod embeddings;
pub mod error;
pub mod extractor;
#[cfg(any(test, feature = "test-util"))]
pub mod fixtures;
pub mod index;
pub mod ingest;
pub mod models;
pub mod registry;
pub mod stores;
pub mod traits;

pub use answer::AnswerGenerator;
pub use chunking::{build_chunks, split_text, ChunkingConfig};
pub use completion::{HuggingFaceClient, InferenceConfig};
pub use embeddings::{
    shared_embedder, CharacterNgramEmbedder, Embedder, SentenceEmbedder,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{EmbeddingError, GenerationError, IndexError, IngestError};
pub use extractor::{extract_text, LopdfExtractor, PageText, PdfExtractor};
pub use index::FlatIndex;
pub use ingest::{
    discover_pdf_files, has_pdf_extension, ingest_folder_best_effort, ingest_pdf,
    IngestedDocument, IngestionReport, SkippedPdf,
};
pub use models::{
    AnswerStrategy, ChatAnswer, DocumentId, FallbackPolicy, IngestionOptions, RetrievalOptions,
    ScoredChunk, TextChunk,
};
pub use registry::SessionRegistry;
pub use stores::{DiskIndexStore, MemoryIndexStore};
pub use traits::{CompletionClient, IndexStore};
