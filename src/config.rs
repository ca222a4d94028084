//! Explicit configuration surface.
//!
//! No environment variables and no CLI flags are part of the core
//! contract (the one exception, `FASTEMBED_CACHE_PATH`, is an
//! operational model-download concern handled inside
//! [`crate::embedder::local`], not a retrieval-behavior parameter).

use std::time::Duration;

/// Scoring weights used when combining activation, semantic similarity,
/// recency, and access frequency into a single final weight. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    pub activation: f32,
    pub semantic_similarity: f32,
    pub recency: f32,
    pub frequency: f32,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            activation: 0.30,
            semantic_similarity: 0.30,
            recency: 0.25,
            frequency: 0.15,
        }
    }
}

/// Thresholds consumed by [`crate::link_builder::LinkBuilder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkBuilderConfig {
    /// Half-width of the temporal link window.
    pub temporal_window: Duration,
    /// Candidate count for semantic-link construction.
    pub semantic_k: usize,
    /// Minimum similarity for a semantic link to be created.
    pub semantic_threshold: f32,
}

impl Default for LinkBuilderConfig {
    fn default() -> Self {
        Self {
            temporal_window: Duration::from_secs(24 * 60 * 60),
            semantic_k: 20,
            semantic_threshold: 0.7,
        }
    }
}

/// Top-level configuration for a [`crate::retrieval::Retriever`] (and,
/// transitively, the [`crate::ingest::Ingestor`] sharing the same store).
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Upper bound on candidates explored per retrieval path and on
    /// graph nodes visited during spreading activation.
    pub thinking_budget: usize,
    /// BPE-token ceiling (cl100k_base) on the returned `text` fields.
    pub max_tokens: usize,
    /// Whether to attach a [`crate::retrieval::SearchTrace`] to results.
    pub enable_trace: bool,
    /// Dimensionality of unit/query embeddings.
    pub embedding_dimensions: usize,
    /// Exact-or-near duplicate threshold used by the Ingestor's dedupe probe.
    pub dedupe_threshold: f32,
    /// RRF fusion constant.
    pub rrf_k: f32,
    /// Final linear-combination ranking weights.
    pub ranking_weights: RankingWeights,
    /// Link-construction thresholds.
    pub link_builder: LinkBuilderConfig,
    /// Per-retrieval-path deadline; on expiry a path returns its partial
    /// list and a `DeadlineExceeded` trace tag rather than failing the query.
    pub per_path_deadline: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            thinking_budget: 100,
            max_tokens: 4096,
            enable_trace: false,
            embedding_dimensions: 384,
            dedupe_threshold: 0.95,
            rrf_k: 60.0,
            ranking_weights: RankingWeights::default(),
            link_builder: LinkBuilderConfig::default(),
            per_path_deadline: Duration::from_secs(2),
        }
    }
}
