//! Error taxonomy for the memory engine.
//!
//! One enum covers the whole crate rather than per-module error types,
//! since most call sites need to propagate across storage, retrieval,
//! and capability-collaborator boundaries uniformly.

/// Crate-wide error type.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Unit, entity, or document id not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Empty query, unsupported fact_type, negative budget, dimension mismatch, etc.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The embedder failed or is unavailable. Fatal to the query that needed it.
    #[error("embedder unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The cross-encoder failed or is unavailable. Non-fatal; caller falls back to RRF order.
    #[error("reranker degraded: {0}")]
    RerankerDegraded(String),

    /// The fact extractor failed or is unavailable.
    #[error("extractor unavailable: {0}")]
    ExtractorUnavailable(String),

    /// The temporal parser failed or is unavailable.
    #[error("temporal parser unavailable: {0}")]
    TemporalParserUnavailable(String),

    /// Persistence layer unreachable; callers may retry.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Per-query deadline elapsed; partial results may still have been produced.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Duplicate insertion by id.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Underlying SQLite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Underlying IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Store/cache initialization failure.
    #[error("initialization error: {0}")]
    Init(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MemoryError>;
