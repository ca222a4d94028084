//! Graph data model: [`MemoryUnit`], [`Entity`], [`EntityMention`], [`Link`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse partitioning tag applied as a retrieval filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    World,
    Agent,
    Opinion,
}

impl FactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactType::World => "world",
            FactType::Agent => "agent",
            FactType::Opinion => "opinion",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "world" => Some(FactType::World),
            "agent" => Some(FactType::Agent),
            "opinion" => Some(FactType::Opinion),
            _ => None,
        }
    }
}

/// The atomic retrievable fact.
///
/// `text` and `embedding` are immutable after insertion; an update is
/// always expressed as a new unit (see [`crate::ingest::Ingestor`]'s
/// `document_id` upsert semantics).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUnit {
    pub id: String,
    pub agent_id: String,
    pub text: String,
    pub fact_type: FactType,
    pub event_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// L2-normalized, fixed-dimension vector. `None` until embedded.
    pub embedding: Option<Vec<f32>>,
    pub access_count: u64,
    pub context: Option<String>,
    pub document_id: Option<String>,
}

impl MemoryUnit {
    pub fn new(agent_id: impl Into<String>, text: impl Into<String>, fact_type: FactType, event_date: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            text: text.into(),
            fact_type,
            event_date,
            created_at: Utc::now(),
            embedding: None,
            access_count: 0,
            context: None,
            document_id: None,
        }
    }
}

/// A canonical identity shared across units of the same agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub agent_id: String,
    pub entity_type: EntityType,
    pub canonical_name: String,
    pub aliases: Vec<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Person,
    Org,
    Location,
    Product,
    Concept,
    Other,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "PERSON",
            EntityType::Org => "ORG",
            EntityType::Location => "LOCATION",
            EntityType::Product => "PRODUCT",
            EntityType::Concept => "CONCEPT",
            EntityType::Other => "OTHER",
        }
    }

    pub fn parse_name(s: &str) -> Self {
        match s {
            "PERSON" => EntityType::Person,
            "ORG" => EntityType::Org,
            "LOCATION" => EntityType::Location,
            "PRODUCT" => EntityType::Product,
            "CONCEPT" => EntityType::Concept,
            _ => EntityType::Other,
        }
    }
}

/// Junction between a unit and an entity it mentions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMention {
    pub unit_id: String,
    pub entity_id: String,
}

/// A typed, weighted edge between two units.
///
/// Stored bidirectionally at write time (see [`crate::link_builder::LinkBuilder`]):
/// `neighbors()` never needs a runtime union-adapter over a directed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Temporal,
    Semantic,
    Entity,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Temporal => "temporal",
            LinkType::Semantic => "semantic",
            LinkType::Entity => "entity",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "temporal" => Some(LinkType::Temporal),
            "semantic" => Some(LinkType::Semantic),
            "entity" => Some(LinkType::Entity),
            _ => None,
        }
    }
}

/// `"[Date: <Month D, YYYY> (YYYY-MM-DD)] "`, shared by the embedder's
/// date-augmented input and the reranker's date-augmented input so both
/// collaborators see the same temporal framing of a unit's text.
pub fn date_prefix(event_date: DateTime<Utc>) -> String {
    format!("[Date: {} ({})] ", event_date.format("%B %-d, %Y"), event_date.format("%Y-%m-%d"))
}

/// An edge's metadata payload; shape depends on `link_type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkMetadata {
    pub similarity: Option<f32>,
    pub time_delta_seconds: Option<i64>,
    pub entity_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub from_id: String,
    pub to_id: String,
    pub link_type: LinkType,
    pub weight: f32,
    pub metadata: LinkMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_type_roundtrip() {
        for ft in [FactType::World, FactType::Agent, FactType::Opinion] {
            assert_eq!(FactType::parse_name(ft.as_str()), Some(ft));
        }
    }

    #[test]
    fn entity_type_roundtrip() {
        for et in [
            EntityType::Person,
            EntityType::Org,
            EntityType::Location,
            EntityType::Product,
            EntityType::Concept,
            EntityType::Other,
        ] {
            assert_eq!(EntityType::parse_name(et.as_str()), et);
        }
    }

    #[test]
    fn link_type_roundtrip() {
        for lt in [LinkType::Temporal, LinkType::Semantic, LinkType::Entity] {
            assert_eq!(LinkType::parse_name(lt.as_str()), Some(lt));
        }
    }

    #[test]
    fn new_unit_has_no_embedding() {
        let u = MemoryUnit::new("agent-1", "Alice works at Google.", FactType::World, Utc::now());
        assert!(u.embedding.is_none());
        assert_eq!(u.access_count, 0);
    }
}
