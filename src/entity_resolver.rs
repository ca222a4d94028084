//! Entity resolution: map an extracted mention to an existing entity or
//! allocate a new one, deterministically per agent.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::extractor::ExtractedMention;
use crate::model::Entity;
use crate::store::Store;

const PERSON_EXACT_NAME_THRESHOLD: f32 = 0.4;
const DEFAULT_THRESHOLD: f32 = 0.6;
const TEMPORAL_HORIZON_DAYS: f32 = 180.0;

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Normalized Levenshtein similarity in `[0, 1]`.
fn name_similarity(a: &str, b: &str) -> f32 {
    let a = normalize(a);
    let b = normalize(b);
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein(&a, &b);
    1.0 - (distance as f32 / max_len as f32)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Deterministic per-agent entity resolution policy.
pub struct EntityResolver<'a> {
    store: &'a Store,
}

impl<'a> EntityResolver<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Resolve a mention, co-occurring with `co_mentioned_entity_ids` within
    /// the same extraction batch, to a (possibly newly allocated) entity id.
    pub fn resolve(
        &self,
        agent_id: &str,
        mention: &ExtractedMention,
        co_mentioned_entity_ids: &[String],
        event_date: DateTime<Utc>,
    ) -> Result<String> {
        let candidates = self.store.candidate_entities(agent_id, mention.entity_type, &mention.surface_form)?;

        let mut scored: Vec<(Entity, f32, f32)> = Vec::new();
        for candidate in candidates {
            let name_sim = candidate
                .aliases
                .iter()
                .chain(std::iter::once(&candidate.canonical_name))
                .map(|alias| name_similarity(alias, &mention.surface_form))
                .fold(0.0_f32, f32::max);

            let co_occurrence = if co_mentioned_entity_ids.is_empty() {
                0.0
            } else {
                let prior_units = self.store.units_for_entity(&candidate.id)?;
                let prior_entity_ids: std::collections::HashSet<String> = prior_units
                    .iter()
                    .flat_map(|unit_id| self.store.neighbors(unit_id, 0.0).unwrap_or_default())
                    .filter_map(|link| link.metadata.entity_id)
                    .collect();
                let hits = co_mentioned_entity_ids.iter().filter(|id| prior_entity_ids.contains(*id)).count();
                hits as f32 / co_mentioned_entity_ids.len() as f32
            };

            let days_delta = (event_date - candidate.last_seen).num_seconds().unsigned_abs() as f32 / 86_400.0;
            let temporal_proximity = (1.0 - (days_delta / TEMPORAL_HORIZON_DAYS)).clamp(0.0, 1.0);

            let score = 0.5 * name_sim + 0.3 * co_occurrence + 0.2 * temporal_proximity;
            scored.push((candidate, score, name_sim));
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.first_seen.cmp(&b.0.first_seen)));

        if let Some((best, score, name_sim)) = scored.first() {
            let threshold = if mention.entity_type == crate::model::EntityType::Person && *name_sim >= 0.999 {
                PERSON_EXACT_NAME_THRESHOLD
            } else {
                DEFAULT_THRESHOLD
            };

            // Ambiguity between the top two candidates: deterministically
            // prefer the earlier-seen entity rather than accept either one
            // on a coin flip.
            if scored.len() > 1 && (scored[0].1 - scored[1].1).abs() < 0.02 {
                let earlier = if scored[0].0.first_seen <= scored[1].0.first_seen { &scored[0] } else { &scored[1] };
                if earlier.1 >= threshold {
                    return self.accept(earlier.0.clone(), mention, event_date);
                }
            } else if *score >= threshold {
                return self.accept(best.clone(), mention, event_date);
            }
        }

        self.allocate(agent_id, mention, event_date)
    }

    fn accept(&self, entity: Entity, mention: &ExtractedMention, event_date: DateTime<Utc>) -> Result<String> {
        let mut aliases = entity.aliases.clone();
        if !aliases.iter().any(|a| a.eq_ignore_ascii_case(&mention.surface_form)) {
            aliases.push(mention.surface_form.clone());
        }
        let last_seen = entity.last_seen.max(event_date);
        self.store.update_entity_aliases_and_last_seen(&entity.id, &aliases, last_seen)?;
        Ok(entity.id)
    }

    fn allocate(&self, agent_id: &str, mention: &ExtractedMention, event_date: DateTime<Utc>) -> Result<String> {
        let entity = Entity {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.to_string(),
            entity_type: mention.entity_type,
            canonical_name: mention.surface_form.clone(),
            aliases: vec![mention.surface_form.clone()],
            first_seen: event_date,
            last_seen: event_date,
        };
        self.store.insert_entity(&entity)?;
        Ok(entity.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityType;

    fn mention(name: &str) -> ExtractedMention {
        ExtractedMention { surface_form: name.to_string(), entity_type: EntityType::Person }
    }

    #[test]
    fn first_mention_allocates_new_entity() {
        let store = Store::open_in_memory().unwrap();
        let resolver = EntityResolver::new(&store);
        let id = resolver.resolve("agent-1", &mention("Alice"), &[], Utc::now()).unwrap();
        assert!(store.get_entity(&id).unwrap().is_some());
    }

    #[test]
    fn exact_repeat_name_resolves_to_same_entity() {
        let store = Store::open_in_memory().unwrap();
        let resolver = EntityResolver::new(&store);
        let now = Utc::now();
        let id1 = resolver.resolve("agent-1", &mention("Alice"), &[], now).unwrap();
        let id2 = resolver.resolve("agent-1", &mention("Alice"), &[], now).unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn distant_unrelated_mention_allocates_new_entity() {
        let store = Store::open_in_memory().unwrap();
        let resolver = EntityResolver::new(&store);
        let id1 = resolver.resolve("agent-1", &mention("Alice Chen"), &[], Utc::now() - chrono::Duration::days(900)).unwrap();
        let id2 = resolver.resolve("agent-1", &mention("Dr. Alice Chen"), &[], Utc::now()).unwrap();
        assert_ne!(id1, id2);
    }

    #[test]
    fn name_similarity_exact_match_is_one() {
        assert!((name_similarity("Alice", "Alice") - 1.0).abs() < 1e-6);
    }

    #[test]
    fn longer_mention_of_a_shorter_stored_name_resolves_to_same_entity_with_shared_co_mention() {
        use crate::link_builder::LinkBuilder;
        use crate::model::MemoryUnit;

        let store = Store::open_in_memory().unwrap();
        let resolver = EntityResolver::new(&store);
        let builder = LinkBuilder::new(&store, crate::config::LinkBuilderConfig::default());
        let now = Utc::now();

        let google = ExtractedMention { surface_form: "Google".to_string(), entity_type: EntityType::Org };
        let google_id = resolver.resolve("agent-1", &google, &[], now).unwrap();
        let unit_a = MemoryUnit::new("agent-1", "Google released a product.", crate::model::FactType::World, now);
        store.insert_unit(&unit_a).unwrap();
        store.insert_mention(&unit_a.id, &google_id).unwrap();
        builder.build_links(&unit_a, &[google_id.clone()]).unwrap();

        let alice_id = resolver.resolve("agent-1", &mention("Alice"), &[], now).unwrap();
        let unit_b = MemoryUnit::new("agent-1", "Alice works at Google.", crate::model::FactType::World, now);
        store.insert_unit(&unit_b).unwrap();
        store.insert_mention(&unit_b.id, &alice_id).unwrap();
        store.insert_mention(&unit_b.id, &google_id).unwrap();
        builder.build_links(&unit_b, &[alice_id.clone(), google_id.clone()]).unwrap();

        // A longer form of the same name, co-mentioned with the same "Google" entity,
        // should resolve to the existing "Alice" entity rather than allocate a new one.
        let id2 = resolver.resolve("agent-1", &mention("Alice Chen"), &[google_id], now).unwrap();
        assert_eq!(alice_id, id2);
    }
}
