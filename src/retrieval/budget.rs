//! Token-budget filtering over ranked candidates.

use tiktoken_rs::CoreBPE;

use crate::error::{MemoryError, Result};
use crate::model::MemoryUnit;

/// Admits candidates in rank order while their cumulative `text` token
/// count (cl100k_base BPE) stays within `max_tokens`; stops at first
/// overflow. Preserves the incoming order.
pub struct BudgetFilter {
    bpe: CoreBPE,
}

impl BudgetFilter {
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| MemoryError::Init(format!("failed to load cl100k_base tokenizer: {e}")))?;
        Ok(Self { bpe })
    }

    pub fn filter(&self, ranked: Vec<MemoryUnit>, max_tokens: usize) -> Vec<MemoryUnit> {
        let mut out = Vec::with_capacity(ranked.len());
        let mut used = 0usize;
        for unit in ranked {
            let tokens = self.bpe.encode_with_special_tokens(&unit.text).len();
            if used + tokens > max_tokens {
                break;
            }
            used += tokens;
            out.push(unit);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FactType;
    use chrono::Utc;

    fn unit(text: &str) -> MemoryUnit {
        MemoryUnit::new("agent-1", text, FactType::World, Utc::now())
    }

    #[test]
    fn stops_at_first_overflow() {
        let filter = BudgetFilter::new().unwrap();
        let ranked = vec![unit("short one"), unit(&"word ".repeat(5000)), unit("should not be reached")];
        let filtered = filter.filter(ranked, 4096);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].text, "short one");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let filter = BudgetFilter::new().unwrap();
        assert!(filter.filter(vec![], 4096).is_empty());
    }
}
