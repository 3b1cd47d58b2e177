use clap::{Args, ValueEnum};
use pdf_chat_core::completion::{DEFAULT_INFERENCE_ENDPOINT, DEFAULT_INFERENCE_MODEL};
use pdf_chat_core::{FallbackPolicy, InferenceConfig, RetrievalOptions};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FallbackArg {
    /// Answer with the retrieved chunk that best matches the question.
    Extractive,
    /// Answer with the whole retrieved context.
    ContextDump,
}

impl From<FallbackArg> for FallbackPolicy {
    fn from(value: FallbackArg) -> Self {
        match value {
            FallbackArg::Extractive => FallbackPolicy::Extractive,
            FallbackArg::ContextDump => FallbackPolicy::ContextDump,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderArg {
    /// all-MiniLM-L6-v2 sentence embeddings, run locally.
    Sentence,
    /// Hashed character n-grams; no model download.
    Ngram,
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct ServiceArgs {
    /// Directory holding one index directory per PDF id
    #[arg(long, env = "PDF_CHAT_INDEX_ROOT", default_value = "vector_store/faiss_index", global = true)]
    pub index_root: PathBuf,

    /// Directory for uploads while they are being processed
    #[arg(long, env = "PDF_CHAT_TEMP_DIR", default_value = "temp", global = true)]
    pub temp_dir: PathBuf,

    /// Embedding backend; indexes must be queried with the one that built them
    #[arg(long, value_enum, env = "PDF_CHAT_EMBEDDER", default_value_t = EmbedderArg::Sentence, global = true)]
    pub embedder: EmbedderArg,

    /// Where the sentence-embedding model files are cached
    #[arg(long, env = "PDF_CHAT_MODEL_CACHE_DIR", default_value = ".fastembed_cache", global = true)]
    pub model_cache_dir: PathBuf,

    /// Hugging Face API token; without it answers come from the local fallback
    #[arg(long, env = "HUGGINGFACEHUB_API_TOKEN", hide_env_values = true, global = true)]
    pub hf_token: Option<String>,

    /// Base URL of the hosted inference API
    #[arg(long, env = "PDF_CHAT_HF_ENDPOINT", default_value = DEFAULT_INFERENCE_ENDPOINT, global = true)]
    pub hf_endpoint: String,

    /// Model used to generate answers
    #[arg(long, env = "PDF_CHAT_HF_MODEL", default_value = DEFAULT_INFERENCE_MODEL, global = true)]
    pub hf_model: String,

    /// Seconds to wait for the inference API before falling back
    #[arg(long, default_value = "30", global = true)]
    pub inference_timeout_secs: u64,

    /// Number of chunks retrieved per question
    #[arg(long, default_value = "5", global = true)]
    pub top_k: usize,

    /// Drop retrieved chunks at or beyond this distance (negative disables)
    #[arg(long, default_value = "0.8", allow_negative_numbers = true, global = true)]
    pub distance_threshold: f32,

    /// Answer strategy when the hosted model fails
    #[arg(long, value_enum, default_value_t = FallbackArg::Extractive, global = true)]
    pub fallback_policy: FallbackArg,
}

impl ServiceArgs {
    pub fn retrieval_options(&self) -> RetrievalOptions {
        RetrievalOptions {
            top_k: self.top_k.max(1),
            distance_threshold: (self.distance_threshold >= 0.0).then_some(self.distance_threshold),
            fallback: self.fallback_policy.into(),
            ..RetrievalOptions::default()
        }
    }

    /// `None` when no token is configured.
    pub fn inference_config(&self) -> Option<InferenceConfig> {
        let token = self
            .hf_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())?;

        Some(InferenceConfig {
            endpoint: self.hf_endpoint.clone(),
            model: self.hf_model.clone(),
            timeout: Duration::from_secs(self.inference_timeout_secs),
            ..InferenceConfig::new(token)
        })
    }
}
