//! Link construction: after a unit is inserted, create temporal, semantic,
//! and entity links against the rest of the store.
//!
//! All three passes run against the same store snapshot; there is no
//! ordering dependency among them.

use chrono::Duration as ChronoDuration;

use crate::config::LinkBuilderConfig;
use crate::error::Result;
use crate::model::{LinkMetadata, LinkType, MemoryUnit};
use crate::store::Store;

pub struct LinkBuilder<'a> {
    store: &'a Store,
    config: LinkBuilderConfig,
}

impl<'a> LinkBuilder<'a> {
    pub fn new(store: &'a Store, config: LinkBuilderConfig) -> Self {
        Self { store, config }
    }

    /// Build all three link classes for a just-inserted unit.
    pub fn build_links(&self, unit: &MemoryUnit, resolved_entity_ids: &[String]) -> Result<()> {
        self.build_temporal_links(unit)?;
        if let Some(embedding) = &unit.embedding {
            self.build_semantic_links(unit, embedding)?;
        }
        self.build_entity_links(unit, resolved_entity_ids)?;
        Ok(())
    }

    fn build_temporal_links(&self, unit: &MemoryUnit) -> Result<()> {
        let window = ChronoDuration::from_std(self.config.temporal_window).unwrap_or_else(|_| ChronoDuration::hours(24));
        let window_secs = window.num_seconds().max(1) as f32;

        let start = unit.event_date - window;
        let end = unit.event_date + window;
        let neighbors = self.store.units_in_time_range(&unit.agent_id, None, start, end)?;

        for other in neighbors {
            if other.id == unit.id {
                continue;
            }
            let delta_secs = (unit.event_date - other.event_date).num_seconds();
            let weight = (1.0 - (delta_secs.unsigned_abs() as f32 / window_secs)).max(0.3);
            let metadata = LinkMetadata { time_delta_seconds: Some(delta_secs), ..Default::default() };
            self.store.upsert_link(&unit.id, &other.id, LinkType::Temporal, weight, &metadata)?;
            self.store.upsert_link(&other.id, &unit.id, LinkType::Temporal, weight, &metadata)?;
        }
        Ok(())
    }

    fn build_semantic_links(&self, unit: &MemoryUnit, embedding: &[f32]) -> Result<()> {
        let matches = self.store.vector_knn(&unit.agent_id, None, embedding, self.config.semantic_k, self.config.semantic_threshold)?;

        for (other_id, similarity) in matches {
            if other_id == unit.id {
                continue;
            }
            let metadata = LinkMetadata { similarity: Some(similarity), ..Default::default() };
            self.store.upsert_link(&unit.id, &other_id, LinkType::Semantic, similarity, &metadata)?;
            self.store.upsert_link(&other_id, &unit.id, LinkType::Semantic, similarity, &metadata)?;
        }
        Ok(())
    }

    fn build_entity_links(&self, unit: &MemoryUnit, resolved_entity_ids: &[String]) -> Result<()> {
        for entity_id in resolved_entity_ids {
            let prior_units = self.store.units_for_entity(entity_id)?;
            for other_id in prior_units {
                if other_id == unit.id {
                    continue;
                }
                let metadata = LinkMetadata { entity_id: Some(entity_id.clone()), ..Default::default() };
                self.store.upsert_link(&unit.id, &other_id, LinkType::Entity, 1.0, &metadata)?;
                self.store.upsert_link(&other_id, &unit.id, LinkType::Entity, 1.0, &metadata)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FactType;
    use chrono::Utc;

    #[test]
    fn temporal_links_created_within_window() {
        let store = Store::open_in_memory().unwrap();
        let builder = LinkBuilder::new(&store, LinkBuilderConfig::default());

        let now = Utc::now();
        let a = MemoryUnit::new("agent-1", "fact a", FactType::World, now);
        store.insert_unit(&a).unwrap();
        builder.build_links(&a, &[]).unwrap();

        let b = MemoryUnit::new("agent-1", "fact b", FactType::World, now + chrono::Duration::hours(2));
        store.insert_unit(&b).unwrap();
        builder.build_links(&b, &[]).unwrap();

        let neighbors = store.neighbors(&b.id, 0.0).unwrap();
        assert!(neighbors.iter().any(|l| l.to_id == a.id && l.link_type == LinkType::Temporal));
    }

    #[test]
    fn entity_links_connect_all_prior_units() {
        let store = Store::open_in_memory().unwrap();
        let builder = LinkBuilder::new(&store, LinkBuilderConfig::default());

        let entity_id = "entity-1".to_string();
        let a = MemoryUnit::new("agent-1", "Alice works at Google.", FactType::World, Utc::now());
        store.insert_unit(&a).unwrap();
        store.insert_mention(&a.id, &entity_id).unwrap();
        builder.build_links(&a, &[entity_id.clone()]).unwrap();

        let b = MemoryUnit::new("agent-1", "Alice loves hiking.", FactType::World, Utc::now());
        store.insert_unit(&b).unwrap();
        store.insert_mention(&b.id, &entity_id).unwrap();
        builder.build_links(&b, &[entity_id.clone()]).unwrap();

        let neighbors = store.neighbors(&b.id, 0.0).unwrap();
        assert!(neighbors.iter().any(|l| l.to_id == a.id && l.link_type == LinkType::Entity && (l.weight - 1.0).abs() < 1e-6));
    }
}
