//! Offline default `Embedder`: a local ONNX model via `fastembed`.
//!
//! Lazily initialized behind a `OnceLock`-guarded global so construction
//! stays cheap; the (large) model download only happens the first time
//! it's actually needed.

use std::sync::{Mutex, OnceLock};

use super::{truncate_to_dims, Embedder};
use crate::error::{MemoryError, Result};

pub const MAX_TEXT_LENGTH: usize = 8192;
pub const BATCH_SIZE: usize = 32;

#[cfg(feature = "embeddings")]
static MODEL: OnceLock<std::result::Result<Mutex<fastembed::TextEmbedding>, String>> = OnceLock::new();

#[cfg(feature = "embeddings")]
fn cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("FASTEMBED_CACHE_PATH") {
        return std::path::PathBuf::from(path);
    }
    if let Some(proj_dirs) = directories::ProjectDirs::from("rs", "recollect", "core") {
        return proj_dirs.cache_dir().join("fastembed");
    }
    if let Some(base_dirs) = directories::BaseDirs::new() {
        return base_dirs.home_dir().join(".cache/recollect/fastembed");
    }
    std::path::PathBuf::from(".fastembed_cache")
}

#[cfg(feature = "embeddings")]
fn get_model() -> std::result::Result<std::sync::MutexGuard<'static, fastembed::TextEmbedding>, String> {
    let result = MODEL.get_or_init(|| {
        let dir = cache_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!("failed to create embedding cache dir {:?}: {}", dir, e);
        }

        let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::BGESmallENV15)
            .with_show_download_progress(true)
            .with_cache_dir(dir);

        fastembed::TextEmbedding::try_new(options).map(Mutex::new).map_err(|e| {
            format!("failed to initialize embedding model: {e}. Ensure ONNX runtime is available and model files can be downloaded.")
        })
    });

    match result {
        Ok(model) => model.lock().map_err(|e| format!("embedding model lock poisoned: {e}")),
        Err(err) => Err(err.clone()),
    }
}

/// Local, fully-offline embedder. Base model output is truncated (if
/// necessary) and renormalized to the configured dimension count.
pub struct LocalEmbedder {
    dimensions: usize,
}

impl LocalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn is_ready(&self) -> bool {
        #[cfg(feature = "embeddings")]
        {
            get_model().is_ok()
        }
        #[cfg(not(feature = "embeddings"))]
        {
            false
        }
    }
}

/// Matches [`crate::vector_index::DEFAULT_DIMENSIONS`]; duplicated here so
/// this module doesn't require the `vector-search` feature on its own.
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

impl Default for LocalEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIMENSIONS)
    }
}

impl Embedder for LocalEmbedder {
    #[cfg(feature = "embeddings")]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(MemoryError::InvalidInput("text cannot be empty".into()));
        }
        let text = if text.len() > MAX_TEXT_LENGTH { &text[..MAX_TEXT_LENGTH] } else { text };

        let mut model = get_model().map_err(MemoryError::EmbeddingUnavailable)?;
        let embeddings = model
            .embed(vec![text], None)
            .map_err(|e| MemoryError::EmbeddingUnavailable(e.to_string()))?;
        let raw = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MemoryError::EmbeddingUnavailable("no embedding generated".into()))?;

        Ok(truncate_to_dims(raw, self.dimensions))
    }

    #[cfg(not(feature = "embeddings"))]
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(MemoryError::EmbeddingUnavailable("built without the `embeddings` feature".into()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
