use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("no text could be extracted from {0}")]
    EmptyText(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index build failed: {0}")]
    Index(#[from] IndexError),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("cannot build an index from zero chunks")]
    Empty,

    #[error("chunk count {chunks} does not match vector count {vectors}")]
    CountMismatch { chunks: usize, vectors: usize },

    #[error("embedding dimension {found} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("no index found for {0}")]
    NotFound(String),

    #[error("No valid vector stores found for the provided PDF IDs.")]
    NoneResolved,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt index data: {0}")]
    Corrupt(String),

    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
}

impl IndexError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model could not be loaded: {0}")]
    ModelLoad(String),

    #[error("embedding model failed: {0}")]
    Inference(String),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("inference endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("inference endpoint reported an error: {0}")]
    Api(String),

    #[error("unexpected response format: {0}")]
    UnexpectedPayload(String),
}
