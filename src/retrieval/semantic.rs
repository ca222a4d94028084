//! Dense vector similarity retrieval path.

use crate::error::Result;
use crate::model::FactType;
use crate::store::Store;

const MIN_SIMILARITY: f32 = 0.3;

pub struct SemanticRetriever<'a> {
    store: &'a Store,
}

impl<'a> SemanticRetriever<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Ranked by (similarity desc, id asc), capped at `thinking_budget`.
    pub fn query(&self, agent_id: &str, fact_type: Option<FactType>, query_vec: &[f32], thinking_budget: usize) -> Result<Vec<(String, f32)>> {
        self.store.vector_knn(agent_id, fact_type, query_vec, thinking_budget, MIN_SIMILARITY)
    }
}
