//! Ingestion pipeline: raw content → extracted facts → stored, linked,
//! entity-resolved memory units.

use chrono::{DateTime, Utc};

use crate::config::RetrievalConfig;
use crate::embedder::{validate_dimensions, Embedder};
use crate::entity_resolver::EntityResolver;
use crate::error::Result;
use crate::extractor::FactExtractor;
use crate::link_builder::LinkBuilder;
use crate::model::{date_prefix, FactType, MemoryUnit};
use crate::store::Store;

/// Outcome of ingesting one piece of content.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub units_inserted: usize,
    pub units_failed: usize,
}

pub struct Ingestor<'a> {
    store: &'a Store,
    extractor: &'a dyn FactExtractor,
    embedder: &'a dyn Embedder,
    config: RetrievalConfig,
}

impl<'a> Ingestor<'a> {
    pub fn new(store: &'a Store, extractor: &'a dyn FactExtractor, embedder: &'a dyn Embedder, config: RetrievalConfig) -> Self {
        Self { store, extractor, embedder, config }
    }

    /// Ingest `content` for `agent_id`. When `document_id` is `Some`, any
    /// units previously ingested under the same document are deleted first
    /// (cascading their links and mentions) so re-ingestion replaces rather
    /// than accumulates.
    pub fn ingest(&self, agent_id: &str, content: &str, event_date: DateTime<Utc>, document_id: Option<&str>) -> Result<IngestReport> {
        if let Some(doc_id) = document_id {
            self.replace_document(agent_id, doc_id)?;
        }

        let facts = match self.extractor.extract(content, event_date) {
            Ok(facts) => facts,
            Err(e) => {
                tracing::warn!("fact extraction failed for agent {agent_id}: {e}");
                return Ok(IngestReport::default());
            }
        };

        let resolver = EntityResolver::new(self.store);
        let mut report = IngestReport::default();

        for fact in facts {
            match self.ingest_one(agent_id, &fact, event_date, document_id, &resolver) {
                Ok(()) => report.units_inserted += 1,
                Err(e) => {
                    tracing::warn!("failed to ingest one fact for agent {agent_id}: {e}");
                    report.units_failed += 1;
                }
            }
        }

        Ok(report)
    }

    fn ingest_one(
        &self,
        agent_id: &str,
        fact: &crate::extractor::ExtractedFact,
        event_date: DateTime<Utc>,
        document_id: Option<&str>,
        resolver: &EntityResolver,
    ) -> Result<()> {
        if self.store.unit_with_exact_text(agent_id, fact.fact_type, &fact.text)?.is_some() {
            return Ok(());
        }

        let augmented = format!("{}{}", date_prefix(event_date), fact.text);
        let embedding = self.embed_with_retry(&augmented);

        if let Some(embedding) = &embedding {
            if self.is_duplicate(agent_id, fact.fact_type, embedding)? {
                return Ok(());
            }
        }

        // Resolve entities in co-mention order: earlier mentions in the
        // same fact become part of the co-occurrence signal for later ones.
        let mut resolved_ids = Vec::with_capacity(fact.entity_mentions.len());
        for mention in &fact.entity_mentions {
            let entity_id = resolver.resolve(agent_id, mention, &resolved_ids, event_date)?;
            resolved_ids.push(entity_id);
        }

        let mut unit = MemoryUnit::new(agent_id, &fact.text, fact.fact_type, event_date);
        unit.embedding = embedding;
        unit.document_id = document_id.map(str::to_string);

        self.store.insert_unit(&unit)?;
        for entity_id in &resolved_ids {
            self.store.insert_mention(&unit.id, entity_id)?;
        }

        let link_builder = LinkBuilder::new(self.store, self.config.link_builder.clone());
        link_builder.build_links(&unit, &resolved_ids)?;

        Ok(())
    }

    /// Embeds with up to 3 attempts; a terminal failure degrades this one
    /// fact to an unembedded unit rather than aborting the whole batch. A
    /// successfully produced embedding that doesn't match the configured
    /// dimensionality is rejected the same way, since persisting it would
    /// corrupt the vector index rather than just degrade this unit.
    fn embed_with_retry(&self, text: &str) -> Option<Vec<f32>> {
        const ATTEMPTS: u32 = 3;
        let mut last_err = None;
        for attempt in 0..ATTEMPTS {
            match self.embedder.embed(text) {
                Ok(v) => match validate_dimensions(&v, self.config.embedding_dimensions) {
                    Ok(()) => return Some(v),
                    Err(e) => {
                        tracing::warn!("embedder produced an unusable embedding: {e}");
                        return None;
                    }
                },
                Err(e) => {
                    last_err = Some(e);
                    if attempt + 1 < ATTEMPTS {
                        std::thread::sleep(std::time::Duration::from_millis(50 * 2u64.pow(attempt)));
                    }
                }
            }
        }
        if let Some(e) = last_err {
            tracing::warn!("embedding failed after {ATTEMPTS} attempts: {e}");
        }
        None
    }

    fn is_duplicate(&self, agent_id: &str, fact_type: FactType, embedding: &[f32]) -> Result<bool> {
        let matches = self.store.vector_knn(agent_id, Some(fact_type), embedding, 1, self.config.dedupe_threshold)?;
        Ok(!matches.is_empty())
    }

    fn replace_document(&self, agent_id: &str, document_id: &str) -> Result<()> {
        let existing = self.store.units_in_time_range(
            agent_id,
            None,
            DateTime::<Utc>::MIN_UTC,
            DateTime::<Utc>::MAX_UTC,
        )?;
        for unit in existing.into_iter().filter(|u| u.document_id.as_deref() == Some(document_id)) {
            self.store.delete_unit(&unit.id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::Embedder as _;
    use crate::extractor::SentenceSplitExtractor;

    struct StubEmbedder;
    impl Embedder for StubEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; 8];
            for (i, b) in text.bytes().enumerate() {
                v[i % 8] += b as f32;
            }
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for x in v.iter_mut() {
                    *x /= norm;
                }
            }
            Ok(v)
        }
        fn dimensions(&self) -> usize {
            8
        }
    }

    #[test]
    fn ingest_inserts_units_and_mentions() {
        let store = Store::open_in_memory().unwrap();
        let extractor = SentenceSplitExtractor;
        let embedder = StubEmbedder;
        let ingestor = Ingestor::new(&store, &extractor, &embedder, RetrievalConfig::default());

        let report = ingestor.ingest("agent-1", "Alice Chen works at Acme Corp.", Utc::now(), None).unwrap();
        assert_eq!(report.units_inserted, 1);
    }

    struct WrongDimEmbedder;
    impl Embedder for WrongDimEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0; 8])
        }
        fn dimensions(&self) -> usize {
            384
        }
    }

    #[test]
    fn embedding_with_wrong_dimensions_is_rejected_not_persisted() {
        let store = Store::open_in_memory().unwrap();
        let extractor = SentenceSplitExtractor;
        let embedder = WrongDimEmbedder;
        let ingestor = Ingestor::new(&store, &extractor, &embedder, RetrievalConfig::default());

        let report = ingestor.ingest("agent-1", "Alice works at Acme Corp.", Utc::now(), None).unwrap();
        assert_eq!(report.units_inserted, 1);

        let remaining = store.units_in_time_range("agent-1", None, DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC).unwrap();
        assert!(remaining[0].embedding.is_none());
    }

    #[test]
    fn reingesting_same_document_replaces_prior_units() {
        let store = Store::open_in_memory().unwrap();
        let extractor = SentenceSplitExtractor;
        let embedder = StubEmbedder;
        let ingestor = Ingestor::new(&store, &extractor, &embedder, RetrievalConfig::default());

        ingestor.ingest("agent-1", "First version of the document.", Utc::now(), Some("doc-1")).unwrap();
        ingestor.ingest("agent-1", "Second version of the document.", Utc::now(), Some("doc-1")).unwrap();

        let remaining = store.units_in_time_range("agent-1", None, DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "Second version of the document.");
    }
}
