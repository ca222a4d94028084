//! Cross-encoder reranking with date-augmented candidate text.

use std::sync::{Mutex, OnceLock};

use crate::error::{MemoryError, Result};
use crate::model::{date_prefix, MemoryUnit};

#[cfg(feature = "embeddings")]
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};

/// Capability trait for scoring `(query, candidate)` pairs.
pub trait Reranker: Send + Sync {
    /// Ranked `(unit_id, score)` pairs, desc by score then id ascending.
    fn rerank(&self, query: &str, candidates: &[MemoryUnit]) -> Result<Vec<(String, f32)>>;
}

#[derive(Debug, Clone, Default)]
pub struct RerankerConfig {
    /// Results below this score are dropped after reranking.
    pub min_score: Option<f32>,
}

/// Jina Reranker v1 Turbo via `fastembed`, lazily initialized so
/// construction stays cheap and test-friendly; falls back to a BM25-like
/// term-overlap score when the cross-encoder is unavailable.
pub struct LocalReranker {
    config: RerankerConfig,
}

#[cfg(feature = "embeddings")]
static CROSS_ENCODER: OnceLock<Mutex<Option<TextRerank>>> = OnceLock::new();

#[cfg(feature = "embeddings")]
fn cross_encoder() -> &'static Mutex<Option<TextRerank>> {
    CROSS_ENCODER.get_or_init(|| {
        let options = RerankInitOptions::new(RerankerModel::JINARerankerV1TurboEn).with_show_download_progress(false);
        match TextRerank::try_new(options) {
            Ok(model) => {
                tracing::info!("cross-encoder reranker loaded (Jina Reranker v1 Turbo)");
                Mutex::new(Some(model))
            }
            Err(e) => {
                tracing::warn!("cross-encoder unavailable, using term-overlap fallback: {e}");
                Mutex::new(None)
            }
        }
    })
}

impl Default for LocalReranker {
    fn default() -> Self {
        Self::new(RerankerConfig::default())
    }
}

impl LocalReranker {
    pub fn new(config: RerankerConfig) -> Self {
        Self { config }
    }

    fn input_text(unit: &MemoryUnit) -> String {
        let prefix = date_prefix(unit.event_date);
        match &unit.context {
            Some(context) if !context.is_empty() => format!("{prefix}{context}: {}", unit.text),
            _ => format!("{prefix}{}", unit.text),
        }
    }

    /// BM25-inspired term overlap score, used when the cross-encoder is
    /// unavailable.
    fn term_overlap_score(query: &str, document: &str) -> f32 {
        let query_terms: Vec<String> = query.to_lowercase().split_whitespace().map(str::to_string).collect();
        let doc_lower = document.to_lowercase();
        let doc_len = document.len() as f32;
        if doc_len == 0.0 || query_terms.is_empty() {
            return 0.0;
        }

        const K1: f32 = 1.2;
        const B: f32 = 0.75;
        const AVG_DOC_LEN: f32 = 500.0;

        let mut score = 0.0;
        for term in &query_terms {
            let tf = doc_lower.matches(term.as_str()).count() as f32;
            if tf > 0.0 {
                let numerator = tf * (K1 + 1.0);
                let denominator = tf + K1 * (1.0 - B + B * (doc_len / AVG_DOC_LEN));
                score += numerator / denominator;
            }
        }
        score / query_terms.len() as f32
    }
}

fn logistic(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl Reranker for LocalReranker {
    fn rerank(&self, query: &str, candidates: &[MemoryUnit]) -> Result<Vec<(String, f32)>> {
        if query.is_empty() {
            return Err(MemoryError::InvalidInput("rerank query cannot be empty".into()));
        }
        if candidates.is_empty() {
            return Ok(vec![]);
        }

        let inputs: Vec<String> = candidates.iter().map(Self::input_text).collect();

        #[cfg(feature = "embeddings")]
        {
            let mut guard = cross_encoder().lock().map_err(|_| MemoryError::Init("reranker lock poisoned".into()))?;
            if let Some(model) = guard.as_mut() {
                let documents: Vec<&str> = inputs.iter().map(String::as_str).collect();
                if let Ok(raw) = model.rerank(query, &documents, false, None) {
                    let mut scored: Vec<(String, f32)> = raw
                        .into_iter()
                        .filter_map(|r| candidates.get(r.index).map(|c| (c.id.clone(), logistic(r.score))))
                        .collect();
                    if let Some(min_score) = self.config.min_score {
                        scored.retain(|(_, score)| *score >= min_score);
                    }
                    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                    return Ok(scored);
                }
            }
        }

        let mut scored: Vec<(String, f32)> = candidates
            .iter()
            .zip(inputs.iter())
            .map(|(unit, text)| (unit.id.clone(), Self::term_overlap_score(query, text)))
            .collect();
        if let Some(min_score) = self.config.min_score {
            scored.retain(|(_, score)| *score >= min_score);
        }
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(scored)
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
    fn empty_query_is_an_error() {
        let reranker = LocalReranker::default();
        let candidates = vec![unit("some text")];
        assert!(reranker.rerank("", &candidates).is_err());
    }

    #[test]
    fn empty_candidates_returns_empty() {
        let reranker = LocalReranker::default();
        assert!(reranker.rerank("query", &[]).unwrap().is_empty());
    }

    #[test]
    fn term_overlap_prefers_matching_document() {
        let reranker = LocalReranker::default();
        let candidates = vec![unit("the quick brown fox"), unit("a lazy dog sleeps")];
        let ranked = reranker.rerank("fox", &candidates).unwrap();
        assert_eq!(ranked[0].0, candidates[0].id);
    }
}
