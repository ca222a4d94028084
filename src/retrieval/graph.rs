//! Spreading-activation traversal from semantic entry points (Collins &
//! Loftus 1975).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::error::Result;
use crate::model::FactType;
use crate::store::Store;

use super::{EntryPoint, NodeVisit, PruneReason, PruneRecord, RetrievalPath};

const ENTRY_K: usize = 5;
const ENTRY_MIN_SIM: f32 = 0.5;
const LINK_WEIGHT_FLOOR: f32 = 0.1;
const ACTIVATION_FLOOR: f32 = 0.1;
const DECAY: f32 = 0.8;

#[derive(Debug, Clone)]
struct QueueItem {
    activation: f32,
    node_id: String,
    parent_id: Option<String>,
    link_type: Option<crate::model::LinkType>,
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

pub struct GraphQueryResult {
    pub ranked: Vec<(String, f32)>,
    pub entry_points: Vec<EntryPoint>,
    pub visits: Vec<NodeVisit>,
    pub prunes: Vec<PruneRecord>,
}

pub struct GraphRetriever<'a> {
    store: &'a Store,
}

impl<'a> GraphRetriever<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn query(&self, agent_id: &str, fact_type: Option<FactType>, query_vec: &[f32], thinking_budget: usize) -> Result<GraphQueryResult> {
        let entries = self.store.vector_knn(agent_id, fact_type, query_vec, ENTRY_K, ENTRY_MIN_SIM)?;

        let mut entry_points = Vec::with_capacity(entries.len());
        let mut queue: BinaryHeap<QueueItem> = BinaryHeap::new();
        for (id, sim) in &entries {
            entry_points.push(EntryPoint { node_id: id.clone(), path: RetrievalPath::Graph, similarity: *sim });
            queue.push(QueueItem { activation: *sim, node_id: id.clone(), parent_id: None, link_type: None, link_weight: None });
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut result: HashMap<String, f32> = HashMap::new();
        let mut visits = Vec::new();
        let mut prunes = Vec::new();
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
                link_type: item.link_type,
                link_weight: item.link_weight,
                activation: item.activation,
            });
            step += 1;

            let links = self.store.neighbors(&item.node_id, 0.0)?;
            for link in links {
                if link.weight < LINK_WEIGHT_FLOOR {
                    prunes.push(PruneRecord { node_id: link.to_id.clone(), reason: PruneReason::LinkWeightBelowThreshold });
                    continue;
                }
                let propagated = item.activation * link.weight * DECAY;
                if propagated <= ACTIVATION_FLOOR {
                    prunes.push(PruneRecord { node_id: link.to_id.clone(), reason: PruneReason::BelowActivationFloor });
                    continue;
                }
                let better_than_known = result.get(&link.to_id).is_none_or(|&existing| propagated > existing);
                if !visited.contains(&link.to_id) && better_than_known {
                    queue.push(QueueItem {
                        activation: propagated,
                        node_id: link.to_id.clone(),
                        parent_id: Some(item.node_id.clone()),
                        link_type: Some(link.link_type),
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

        Ok(GraphQueryResult { ranked, entry_points, visits, prunes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinkMetadata, LinkType, MemoryUnit};
    use chrono::Utc;

    fn unit_with_embedding(agent: &str, text: &str, embedding: Vec<f32>) -> MemoryUnit {
        let mut u = MemoryUnit::new(agent, text, FactType::World, Utc::now());
        u.embedding = Some(embedding);
        u
    }

    #[test]
    fn activation_decays_monotonically_along_a_path() {
        let store = Store::open_in_memory().unwrap();
        let a = unit_with_embedding("agent-1", "a", vec![1.0, 0.0, 0.0, 0.0]);
        let b = unit_with_embedding("agent-1", "b", vec![0.0, 1.0, 0.0, 0.0]);
        store.insert_unit(&a).unwrap();
        store.insert_unit(&b).unwrap();
        store.upsert_link(&a.id, &b.id, LinkType::Semantic, 0.9, &LinkMetadata::default()).unwrap();

        let retriever = GraphRetriever::new(&store);
        let result = retriever.query("agent-1", None, &[1.0, 0.0, 0.0, 0.0], 10).unwrap();

        let a_activation = result.ranked.iter().find(|(id, _)| *id == a.id).unwrap().1;
        if let Some((_, b_activation)) = result.ranked.iter().find(|(id, _)| *id == b.id) {
            assert!(*b_activation <= a_activation);
        }
    }

    #[test]
    fn weak_links_are_not_traversed() {
        let store = Store::open_in_memory().unwrap();
        let a = unit_with_embedding("agent-1", "a", vec![1.0, 0.0, 0.0, 0.0]);
        let b = unit_with_embedding("agent-1", "b", vec![0.0, 1.0, 0.0, 0.0]);
        store.insert_unit(&a).unwrap();
        store.insert_unit(&b).unwrap();
        store.upsert_link(&a.id, &b.id, LinkType::Semantic, 0.05, &LinkMetadata::default()).unwrap();

        let retriever = GraphRetriever::new(&store);
        let result = retriever.query("agent-1", None, &[1.0, 0.0, 0.0, 0.0], 10).unwrap();
        assert!(!result.ranked.iter().any(|(id, _)| *id == b.id));
    }
}
