//! Top-level retrieval orchestrator: fans out to the four parallel
//! strategies, fuses, reranks, and applies the token budget.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use lru::LruCache;

use crate::config::RetrievalConfig;
use crate::embedder::Embedder;
use crate::error::{MemoryError, Result};
use crate::model::{FactType, MemoryUnit};
use crate::store::Store;
use crate::temporal_parser::TemporalParser;

const QUERY_CACHE_CAPACITY: usize = 100;

use super::budget::BudgetFilter;
use super::fuse::reciprocal_rank_fusion;
use super::graph::GraphRetriever;
use super::keyword::KeywordRetriever;
use super::reranker::Reranker;
use super::semantic::SemanticRetriever;
use super::temporal_graph::TemporalGraphRetriever;
use super::{EntryPoint, NodeVisit, PruneRecord, RetrievalPath, SearchTrace, StageDuration};

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub unit: MemoryUnit,
    pub rerank_score: f32,
}

/// Awaits a retrieval path's `spawn_blocking` handle, bounding it by
/// `deadline`. A path that neither finishes nor panics in time surfaces as
/// [`MemoryError::DeadlineExceeded`] so the caller can mark it degraded
/// exactly like any other path failure.
async fn await_with_deadline<T>(handle: tokio::task::JoinHandle<Result<T>>, deadline: std::time::Duration) -> Result<T> {
    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(inner)) => inner,
        Ok(Err(join_err)) => Err(MemoryError::Init(join_err.to_string())),
        Err(_elapsed) => Err(MemoryError::DeadlineExceeded),
    }
}

pub struct Retriever {
    store: Arc<Store>,
    embedder: Arc<dyn Embedder>,
    temporal_parser: Arc<dyn TemporalParser>,
    reranker: Arc<dyn Reranker>,
    budget_filter: Arc<BudgetFilter>,
    config: RetrievalConfig,
    /// Caches query text -> embedding so repeated queries skip re-embedding.
    query_cache: Arc<Mutex<LruCache<String, Vec<f32>>>>,
}

impl Retriever {
    pub fn new(
        store: Arc<Store>,
        embedder: Arc<dyn Embedder>,
        temporal_parser: Arc<dyn TemporalParser>,
        reranker: Arc<dyn Reranker>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        let query_cache = Arc::new(Mutex::new(LruCache::new(NonZeroUsize::new(QUERY_CACHE_CAPACITY).expect("capacity is non-zero"))));
        Ok(Self { store, embedder, temporal_parser, reranker, budget_filter: Arc::new(BudgetFilter::new()?), config, query_cache })
    }

    pub async fn search(&self, agent_id: &str, query: &str, fact_type: Option<FactType>) -> Result<(Vec<SearchResult>, Option<SearchTrace>)> {
        let mut trace = self.config.enable_trace.then(SearchTrace::default);
        if let Some(t) = &mut trace {
            t.query = query.to_string();
        }

        let thinking_budget = self.config.thinking_budget;
        let agent_id = agent_id.to_string();
        let query_owned = query.to_string();
        let now = Utc::now();

        let cached_vec = self.query_cache.lock().map_err(|_| crate::error::MemoryError::Init("query cache lock poisoned".into()))?.get(&query_owned).cloned();

        let embed_start = Instant::now();
        let (query_vec, temporal_range) = if let Some(cached) = cached_vec {
            let temporal_parser = Arc::clone(&self.temporal_parser);
            let parse_query = query_owned.clone();
            let range = tokio::task::spawn_blocking(move || temporal_parser.parse(&parse_query, now))
                .await
                .map_err(|e| crate::error::MemoryError::Init(e.to_string()))?;
            (cached, range)
        } else {
            let embedder = Arc::clone(&self.embedder);
            let temporal_parser = Arc::clone(&self.temporal_parser);
            let embed_query = query_owned.clone();
            let parse_query = query_owned.clone();
            let (vec_result, range_result) = tokio::join!(
                tokio::task::spawn_blocking(move || embedder.embed(&embed_query)),
                tokio::task::spawn_blocking(move || temporal_parser.parse(&parse_query, now)),
            );
            let vec_result = vec_result.map_err(|e| crate::error::MemoryError::Init(e.to_string()))??;
            let range_result = range_result.map_err(|e| crate::error::MemoryError::Init(e.to_string()))?;
            if let Ok(mut cache) = self.query_cache.lock() {
                cache.put(query_owned.clone(), vec_result.clone());
            }
            (vec_result, range_result)
        };
        if let Some(t) = &mut trace {
            t.stage_durations.push(StageDuration { stage: "embed_and_parse".into(), millis: embed_start.elapsed().as_millis() as u64 });
        }

        let fanout_start = Instant::now();
        let semantic_handle = {
            let store = Arc::clone(&self.store);
            let agent_id = agent_id.clone();
            let query_vec = query_vec.clone();
            tokio::task::spawn_blocking(move || SemanticRetriever::new(&store).query(&agent_id, fact_type, &query_vec, thinking_budget))
        };
        let keyword_handle = {
            let store = Arc::clone(&self.store);
            let agent_id = agent_id.clone();
            let query_text = query_owned.clone();
            tokio::task::spawn_blocking(move || KeywordRetriever::new(&store).query(&agent_id, fact_type, &query_text, thinking_budget))
        };
        let graph_handle = {
            let store = Arc::clone(&self.store);
            let agent_id = agent_id.clone();
            let query_vec = query_vec.clone();
            tokio::task::spawn_blocking(move || GraphRetriever::new(&store).query(&agent_id, fact_type, &query_vec, thinking_budget))
        };
        let temporal_graph_handle = temporal_range.map(|range| {
            let store = Arc::clone(&self.store);
            let agent_id = agent_id.clone();
            let query_vec = query_vec.clone();
            tokio::task::spawn_blocking(move || TemporalGraphRetriever::new(&store).query(&agent_id, fact_type, &query_vec, range, thinking_budget))
        });

        let deadline = self.config.per_path_deadline;
        let semantic_result = await_with_deadline(semantic_handle, deadline).await;
        let keyword_result = await_with_deadline(keyword_handle, deadline).await;
        let graph_result = await_with_deadline(graph_handle, deadline).await;
        let temporal_graph_result = match temporal_graph_handle {
            Some(handle) => Some(await_with_deadline(handle, deadline).await),
            None => None,
        };

        if let Some(t) = &mut trace {
            t.stage_durations.push(StageDuration { stage: "fan_out".into(), millis: fanout_start.elapsed().as_millis() as u64 });
        }

        let mut lists: Vec<Vec<String>> = Vec::new();
        let mut degraded = Vec::new();

        match semantic_result {
            Ok(ids) => lists.push(ids.into_iter().map(|(id, _)| id).collect()),
            Err(e) => {
                tracing::warn!("semantic retrieval failed: {e}");
                degraded.push(RetrievalPath::Semantic);
            }
        }
        match keyword_result {
            Ok(ids) => lists.push(ids.into_iter().map(|(id, _)| id).collect()),
            Err(e) => {
                tracing::warn!("keyword retrieval failed: {e}");
                degraded.push(RetrievalPath::Keyword);
            }
        }
        match graph_result {
            Ok(r) => {
                if let Some(t) = &mut trace {
                    t.entry_points.extend(r.entry_points);
                    t.visits.extend(r.visits);
                    t.prunes.extend(r.prunes);
                }
                lists.push(r.ranked.into_iter().map(|(id, _)| id).collect());
            }
            Err(e) => {
                tracing::warn!("graph retrieval failed: {e}");
                degraded.push(RetrievalPath::Graph);
            }
        }
        if let Some(result) = temporal_graph_result {
            match result {
                Ok(r) => {
                    if let Some(t) = &mut trace {
                        t.entry_points.extend(r.entry_points);
                        t.visits.extend(r.visits);
                        t.prunes.extend(r.prunes);
                    }
                    lists.push(r.ranked.into_iter().map(|(id, _)| id).collect());
                }
                Err(e) => {
                    tracing::warn!("temporal graph retrieval failed: {e}");
                    degraded.push(RetrievalPath::TemporalGraph);
                }
            }
        }
        if let Some(t) = &mut trace {
            t.degraded_paths = degraded;
        }

        let fuse_start = Instant::now();
        let fused = reciprocal_rank_fusion(&lists, self.config.rrf_k);
        let top_fused: Vec<String> = fused.into_iter().take(thinking_budget).map(|(id, _)| id).collect();
        if let Some(t) = &mut trace {
            t.stage_durations.push(StageDuration { stage: "fuse".into(), millis: fuse_start.elapsed().as_millis() as u64 });
        }

        let units = self.fetch_units(&top_fused)?;

        let rerank_start = Instant::now();
        let rerank_scores = match self.reranker.rerank(query, &units) {
            Ok(scores) => scores.into_iter().collect::<std::collections::HashMap<_, _>>(),
            Err(e) => {
                tracing::warn!("reranker degraded, passing through fusion order: {e}");
                if let Some(t) = &mut trace {
                    t.reranker_degraded = true;
                }
                std::collections::HashMap::new()
            }
        };
        if let Some(t) = &mut trace {
            t.stage_durations.push(StageDuration { stage: "rerank".into(), millis: rerank_start.elapsed().as_millis() as u64 });
        }

        let mut ranked_units: Vec<(MemoryUnit, f32)> = units
            .into_iter()
            .enumerate()
            .map(|(fused_rank, unit)| {
                let score = rerank_scores.get(&unit.id).copied().unwrap_or_else(|| 1.0 / (1.0 + fused_rank as f32));
                (unit, score)
            })
            .collect();
        ranked_units.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));

        let budget_start = Instant::now();
        let ranked_only_units: Vec<MemoryUnit> = ranked_units.iter().map(|(u, _)| u.clone()).collect();
        let filtered = self.budget_filter.filter(ranked_only_units, self.config.max_tokens);
        if let Some(t) = &mut trace {
            t.stage_durations.push(StageDuration { stage: "budget_filter".into(), millis: budget_start.elapsed().as_millis() as u64 });
        }

        let scores_by_id: std::collections::HashMap<String, f32> = ranked_units.into_iter().map(|(u, s)| (u.id, s)).collect();
        let results: Vec<SearchResult> = filtered
            .into_iter()
            .map(|unit| {
                let score = *scores_by_id.get(&unit.id).unwrap_or(&0.0);
                SearchResult { unit, rerank_score: score }
            })
            .collect();

        let returned_ids: Vec<String> = results.iter().map(|r| r.unit.id.clone()).collect();
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.increment_access(&returned_ids) {
                tracing::warn!("failed to increment access counts: {e}");
            }
        });

        Ok((results, trace))
    }

    fn fetch_units(&self, ids: &[String]) -> Result<Vec<MemoryUnit>> {
        let mut units = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(unit) = self.store.get_unit(id)? {
                units.push(unit);
            }
        }
        Ok(units)
    }
}

/// Final linearly-combined weight (§ ranking weights), for callers that
/// want a single score blending activation, semantic similarity, recency,
/// and access frequency alongside (or instead of) the reranker's score.
pub fn linear_combination(
    activation: f32,
    semantic_similarity: f32,
    days_since_event: f32,
    access_count: u64,
    weights: &crate::config::RankingWeights,
) -> f32 {
    let recency = 1.0 / (1.0 + (1.0 + days_since_event / 365.0).ln());
    let frequency = (((access_count + 1) as f32).ln() / 10.0_f32.ln()).min(1.0);
    weights.activation * activation + weights.semantic_similarity * semantic_similarity + weights.recency * recency + weights.frequency * frequency
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::LocalEmbedder;
    use crate::retrieval::reranker::LocalReranker;
    use crate::temporal_parser::HeuristicTemporalParser;

    #[test]
    fn linear_combination_weights_sum_is_respected() {
        let weights = crate::config::RankingWeights::default();
        let score = linear_combination(1.0, 1.0, 0.0, 100, &weights);
        assert!(score > 0.0 && score <= 1.0 + 1e-3);
    }

    #[tokio::test]
    async fn search_on_empty_store_returns_no_results() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let embedder: Arc<dyn Embedder> = Arc::new(LocalEmbedder::default());
        let temporal_parser: Arc<dyn TemporalParser> = Arc::new(HeuristicTemporalParser);
        let reranker: Arc<dyn Reranker> = Arc::new(LocalReranker::default());
        let retriever = Retriever::new(store, embedder, temporal_parser, reranker, RetrievalConfig::default()).unwrap();

        let (results, _trace) = retriever.search("agent-1", "what happened today?", None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn a_path_slower_than_the_deadline_surfaces_as_deadline_exceeded() {
        let handle = tokio::task::spawn_blocking(|| -> Result<()> {
            std::thread::sleep(std::time::Duration::from_millis(50));
            Ok(())
        });
        let result = await_with_deadline(handle, std::time::Duration::from_millis(1)).await;
        assert!(matches!(result, Err(MemoryError::DeadlineExceeded)));
    }
}
