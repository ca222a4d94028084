//! Full-text (BM25) retrieval path.

use crate::error::Result;
use crate::model::FactType;
use crate::store::Store;

pub struct KeywordRetriever<'a> {
    store: &'a Store,
}

impl<'a> KeywordRetriever<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Empty result if the query has no indexable terms after sanitization.
    pub fn query(&self, agent_id: &str, fact_type: Option<FactType>, query_text: &str, thinking_budget: usize) -> Result<Vec<(String, f32)>> {
        self.store.bm25_search(agent_id, fact_type, query_text, thinking_budget)
    }
}
