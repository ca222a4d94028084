//! Query-time retrieval: four parallel strategies, RRF fusion, reranking,
//! and token-budget filtering.

mod budget;
mod fuse;
mod graph;
mod keyword;
mod reranker;
mod retriever;
mod semantic;
mod temporal_graph;

pub use budget::BudgetFilter;
pub use fuse::reciprocal_rank_fusion;
pub use graph::GraphRetriever;
pub use keyword::KeywordRetriever;
pub use reranker::{LocalReranker, Reranker, RerankerConfig};
pub use retriever::{Retriever, SearchResult};
pub use semantic::SemanticRetriever;
pub use temporal_graph::TemporalGraphRetriever;

use serde::{Deserialize, Serialize};

/// Which of the four parallel strategies produced a candidate or entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalPath {
    Semantic,
    Keyword,
    Graph,
    TemporalGraph,
}

/// Why a candidate node was not expanded further during spreading activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneReason {
    AlreadyVisited,
    BelowActivationFloor,
    BudgetExhausted,
    LinkWeightBelowThreshold,
    OutsideTemporalRange,
    BelowTemporalSemanticFloor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPoint {
    pub node_id: String,
    pub path: RetrievalPath,
    pub similarity: f32,
}

/// One node's visit during a spreading-activation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeVisit {
    pub node_id: String,
    pub step: usize,
    pub parent_id: Option<String>,
    pub link_type: Option<crate::model::LinkType>,
    pub link_weight: Option<f32>,
    pub activation: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneRecord {
    pub node_id: String,
    pub reason: PruneReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDuration {
    pub stage: String,
    pub millis: u64,
}

/// Diagnostic record of one `Retriever::search` call, attached to results
/// only when the caller opts in (`RetrievalConfig::enable_trace`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchTrace {
    pub query: String,
    pub entry_points: Vec<EntryPoint>,
    pub visits: Vec<NodeVisit>,
    pub prunes: Vec<PruneRecord>,
    pub stage_durations: Vec<StageDuration>,
    pub degraded_paths: Vec<RetrievalPath>,
    pub reranker_degraded: bool,
}
