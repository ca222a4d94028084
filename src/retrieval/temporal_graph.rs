//! Time-filtered spreading activation, active only when a query resolves
//! to a concrete date range.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::embedder::cosine_similarity;
use crate::error::Result;
use crate::model::{FactType, LinkType};
use crate::store::Store;

use super::{EntryPoint, NodeVisit, PruneReason, PruneRecord, RetrievalPath};

const ENTRY_MIN_SIM: f32 = 0.4;
const DECAY: f32 = 0.7;

#[derive(Debug, Clone)]
struct QueueItem {
    activation: f32,
    node_id: String,
    parent_id: Option<String>,
    link_weight: Option<f32>,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.activation == other.activation && self.node_id == other.node_id
    }
}
impl Eq for QueueItem {}
impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.activation.total_cmp(&other.activation)
    }
}

pub struct TemporalGraphQueryResult {
    pub ranked: Vec<(String, f32)>,
    pub entry_points: Vec<EntryPoint>,
    pub visits: Vec<NodeVisit>,
    pub prunes: Vec<PruneRecord>,
}

pub struct TemporalGraphRetriever<'a> {
    store: &'a Store,
}

impl<'a> TemporalGraphRetriever<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn query(
        &self,
        agent_id: &str,
        fact_type: Option<FactType>,
        query_vec: &[f32],
        range: (DateTime<Utc>, DateTime<Utc>),
        thinking_budget: usize,
    ) -> Result<TemporalGraphQueryResult> {
        let (start, end) = range;
        let midpoint = start + (end - start) / 2;
        let radius_secs = (end - start).num_seconds().max(1) as f32 / 2.0;

        let candidates = self.store.units_in_time_range(agent_id, fact_type, start, end)?;

        let mut entry_points = Vec::new();
        let mut queue: BinaryHeap<QueueItem> = BinaryHeap::new();
        let mut prunes = Vec::new();
        for candidate in &candidates {
            let Some(embedding) = &candidate.embedding else { continue };
            let sim = cosine_similarity(embedding, query_vec);
            if sim < ENTRY_MIN_SIM {
                prunes.push(PruneRecord { node_id: candidate.id.clone(), reason: PruneReason::BelowTemporalSemanticFloor });
                continue;
            }
            let temporal_proximity = (1.0 - (candidate.event_date - midpoint).num_seconds().unsigned_abs() as f32 / radius_secs).clamp(0.0, 1.0);
            let activation = (temporal_proximity + sim).min(1.0);
            entry_points.push(EntryPoint { node_id: candidate.id.clone(), path: RetrievalPath::TemporalGraph, similarity: sim });
            queue.push(QueueItem { activation, node_id: candidate.id.clone(), parent_id: None, link_weight: None });
        }

        let in_range: HashSet<String> = candidates.iter().map(|u| u.id.clone()).collect();
        let mut visited: HashSet<String> = HashSet::new();
        let mut result: HashMap<String, f32> = HashMap::new();
        let mut visits = Vec::new();
        let mut step = 0usize;

        while visited.len() < thinking_budget {
            let Some(item) = queue.pop() else { break };
            if visited.contains(&item.node_id) {
                prunes.push(PruneRecord { node_id: item.node_id.clone(), reason: PruneReason::AlreadyVisited });
                continue;
            }
            visited.insert(item.node_id.clone());
            result.insert(item.node_id.clone(), item.activation);
            visits.push(NodeVisit {
                node_id: item.node_id.clone(),
                step,
                parent_id: item.parent_id.clone(),
                link_type: Some(LinkType::Temporal),
                link_weight: item.link_weight,
                activation: item.activation,
            });
            step += 1;

            let links = self.store.neighbors(&item.node_id, 0.0)?;
            for link in links.into_iter().filter(|l| l.link_type == LinkType::Temporal) {
                if !in_range.contains(&link.to_id) {
                    prunes.push(PruneRecord { node_id: link.to_id.clone(), reason: PruneReason::OutsideTemporalRange });
                    continue;
                }
                let propagated = item.activation * link.weight * DECAY;
                let better_than_known = result.get(&link.to_id).is_none_or(|&existing| propagated > existing);
                if !visited.contains(&link.to_id) && better_than_known {
                    queue.push(QueueItem {
                        activation: propagated,
                        node_id: link.to_id.clone(),
                        parent_id: Some(item.node_id.clone()),
                        link_weight: Some(link.weight),
                    });
                }
            }

            if visited.len() >= thinking_budget && !queue.is_empty() {
                for remaining in queue.drain() {
                    prunes.push(PruneRecord { node_id: remaining.node_id, reason: PruneReason::BudgetExhausted });
                }
            }
        }

        let mut ranked: Vec<(String, f32)> = result.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(TemporalGraphQueryResult { ranked, entry_points, visits, prunes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryUnit;
    use chrono::Duration;

    fn unit_at(agent: &str, text: &str, event_date: DateTime<Utc>, embedding: Vec<f32>) -> MemoryUnit {
        let mut u = MemoryUnit::new(agent, text, FactType::World, event_date);
        u.embedding = Some(embedding);
        u
    }

    #[test]
    fn units_outside_range_are_never_entry_points() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        let inside = unit_at("agent-1", "inside", now, vec![1.0, 0.0]);
        let outside = unit_at("agent-1", "outside", now - Duration::days(30), vec![1.0, 0.0]);
        store.insert_unit(&inside).unwrap();
        store.insert_unit(&outside).unwrap();

        let retriever = TemporalGraphRetriever::new(&store);
        let result = retriever
            .query("agent-1", None, &[1.0, 0.0], (now - Duration::days(1), now + Duration::days(1)), 10)
            .unwrap();

        assert!(result.ranked.iter().any(|(id, _)| *id == inside.id));
        assert!(!result.ranked.iter().any(|(id, _)| *id == outside.id));
    }

    #[test]
    fn low_semantic_similarity_excludes_entry_even_in_range() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        let dissimilar = unit_at("agent-1", "dissimilar", now, vec![0.0, 1.0]);
        store.insert_unit(&dissimilar).unwrap();

        let retriever = TemporalGraphRetriever::new(&store);
        let result = retriever
            .query("agent-1", None, &[1.0, 0.0], (now - Duration::days(1), now + Duration::days(1)), 10)
            .unwrap();

        assert!(result.ranked.is_empty());
    }
}
