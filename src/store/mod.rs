//! Persistent storage: memory units, entities, mentions, links, and the
//! three indexes retrieval depends on (vector kNN, full-text, entity→units).
//!
//! Built on `rusqlite` with WAL journaling and a `usearch` HNSW index held
//! behind its own mutex, keeping relational storage and the in-process ANN
//! index independent of each other.

mod migrations;

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{MemoryError, Result};
use crate::model::{EntityType, FactType, Link, LinkMetadata, LinkType, MemoryUnit};

#[cfg(feature = "vector-search")]
use crate::vector_index::VectorIndex;

/// Durable storage for a single engine instance.
///
/// All methods take `&self`: readers and writers are concurrent behind
/// independent connection mutexes, so the type is `Send + Sync` by
/// construction and callers can share it via `Arc` without an outer lock.
pub struct Store {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    #[cfg(feature = "vector-search")]
    vector_index: Mutex<VectorIndex>,
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -64000;
         PRAGMA temp_store = MEMORY;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA mmap_size = 268435456;
         PRAGMA journal_size_limit = 67108864;",
    )?;
    Ok(())
}

/// In-memory databases can't use WAL; a shared-cache `:memory:` connection
/// still needs its own PRAGMA set.
fn configure_memory_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

fn row_to_unit(row: &rusqlite::Row) -> rusqlite::Result<MemoryUnit> {
    let fact_type_str: String = row.get("fact_type")?;
    Ok(MemoryUnit {
        id: row.get("id")?,
        agent_id: row.get("agent_id")?,
        text: row.get("text")?,
        fact_type: FactType::parse_name(&fact_type_str).unwrap_or(FactType::World),
        event_date: row.get("event_date")?,
        created_at: row.get("created_at")?,
        embedding: None,
        access_count: row.get::<_, i64>("access_count")? as u64,
        context: row.get("context")?,
        document_id: row.get("document_id")?,
    })
}

impl Store {
    /// Open (creating if necessary) storage at `db_path`, or the platform
    /// default data directory when `None`.
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("rs", "recollect", "core")
                    .ok_or_else(|| MemoryError::Init("could not determine project directories".into()))?;
                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let _ = std::fs::set_permissions(data_dir, std::fs::Permissions::from_mode(0o700));
                }
                data_dir.join("recollect.db")
            }
        };

        let writer_conn = Connection::open(&path)?;
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
        }
        configure_connection(&writer_conn)?;
        migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        configure_connection(&reader_conn)?;

        #[cfg(feature = "vector-search")]
        let vector_index = VectorIndex::new().map_err(|e| MemoryError::Init(format!("failed to create vector index: {e}")))?;

        let store = Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            #[cfg(feature = "vector-search")]
            vector_index: Mutex::new(vector_index),
        };

        #[cfg(feature = "vector-search")]
        store.load_embeddings_into_index()?;

        Ok(store)
    }

    /// In-memory store, primarily for tests.
    ///
    /// Both connections open the same named in-memory database via a
    /// `cache=shared` URI; a plain `Connection::open_in_memory()` pair
    /// would otherwise see two independent, empty databases.
    pub fn open_in_memory() -> Result<Self> {
        use rusqlite::OpenFlags;
        let uri = format!("file:recollect-{}?mode=memory&cache=shared", uuid::Uuid::new_v4());
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_URI;

        let writer_conn = Connection::open_with_flags(&uri, flags)?;
        configure_memory_connection(&writer_conn)?;
        migrations::apply_migrations(&writer_conn)?;
        let reader_conn = Connection::open_with_flags(&uri, flags)?;
        configure_memory_connection(&reader_conn)?;

        #[cfg(feature = "vector-search")]
        let vector_index = VectorIndex::new().map_err(|e| MemoryError::Init(format!("failed to create vector index: {e}")))?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            #[cfg(feature = "vector-search")]
            vector_index: Mutex::new(vector_index),
        })
    }

    #[cfg(feature = "vector-search")]
    fn load_embeddings_into_index(&self) -> Result<()> {
        let writer = self.writer.lock().map_err(|_| MemoryError::Init("writer lock poisoned".into()))?;
        let mut stmt = writer.prepare("SELECT unit_id, embedding FROM unit_embeddings")?;
        let rows: Vec<(String, Vec<u8>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        drop(stmt);
        drop(writer);

        let mut index = self.vector_index.lock().map_err(|_| MemoryError::Init("vector index lock poisoned".into()))?;
        for (unit_id, bytes) in rows {
            let vector = bytes_to_vector(&bytes);
            if vector.len() == index.dimensions() {
                if let Err(e) = index.add(&unit_id, &vector) {
                    tracing::warn!("failed to load embedding for {unit_id}: {e}");
                }
            }
        }
        Ok(())
    }

    /// Insert a unit (and its embedding, if present). Links are the
    /// caller's responsibility (see [`crate::link_builder::LinkBuilder`]).
    pub fn insert_unit(&self, unit: &MemoryUnit) -> Result<String> {
        let writer = self.writer.lock().map_err(|_| MemoryError::Init("writer lock poisoned".into()))?;
        writer.execute(
            "INSERT INTO memory_units (id, agent_id, text, fact_type, event_date, created_at, access_count, context, document_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                unit.id,
                unit.agent_id,
                unit.text,
                unit.fact_type.as_str(),
                unit.event_date,
                unit.created_at,
                unit.access_count as i64,
                unit.context,
                unit.document_id,
            ],
        ).map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation => {
                MemoryError::Conflict(unit.id.clone())
            }
            other => MemoryError::Database(other),
        })?;

        if let Some(embedding) = &unit.embedding {
            writer.execute(
                "INSERT INTO unit_embeddings (unit_id, embedding, dimensions) VALUES (?1, ?2, ?3)",
                params![unit.id, vector_to_bytes(embedding), embedding.len() as i64],
            )?;

            #[cfg(feature = "vector-search")]
            {
                let mut index = self.vector_index.lock().map_err(|_| MemoryError::Init("vector index lock poisoned".into()))?;
                index
                    .add(&unit.id, embedding)
                    .map_err(|e| MemoryError::InvalidInput(e.to_string()))?;
            }
        }

        Ok(unit.id.clone())
    }

    pub fn get_unit(&self, id: &str) -> Result<Option<MemoryUnit>> {
        let reader = self.reader.lock().map_err(|_| MemoryError::Init("reader lock poisoned".into()))?;
        let mut unit: Option<MemoryUnit> = reader
            .query_row("SELECT * FROM memory_units WHERE id = ?1", params![id], row_to_unit)
            .optional()?;

        if let Some(u) = &mut unit {
            let embedding: Option<Vec<u8>> = reader
                .query_row("SELECT embedding FROM unit_embeddings WHERE unit_id = ?1", params![id], |r| r.get(0))
                .optional()?;
            u.embedding = embedding.map(|b| bytes_to_vector(&b));
        }

        Ok(unit)
    }

    pub fn delete_unit(&self, id: &str) -> Result<()> {
        let writer = self.writer.lock().map_err(|_| MemoryError::Init("writer lock poisoned".into()))?;
        writer.execute("DELETE FROM memory_units WHERE id = ?1", params![id])?;

        #[cfg(feature = "vector-search")]
        {
            let mut index = self.vector_index.lock().map_err(|_| MemoryError::Init("vector index lock poisoned".into()))?;
            let _ = index.remove(id);
        }
        Ok(())
    }

    pub fn delete_agent(&self, agent_id: &str) -> Result<()> {
        let writer = self.writer.lock().map_err(|_| MemoryError::Init("writer lock poisoned".into()))?;
        let ids: Vec<String> = {
            let mut stmt = writer.prepare("SELECT id FROM memory_units WHERE agent_id = ?1")?;
            stmt.query_map(params![agent_id], |r| r.get(0))?.filter_map(|r| r.ok()).collect()
        };
        writer.execute("DELETE FROM memory_units WHERE agent_id = ?1", params![agent_id])?;
        drop(writer);

        #[cfg(feature = "vector-search")]
        {
            let mut index = self.vector_index.lock().map_err(|_| MemoryError::Init("vector index lock poisoned".into()))?;
            for id in &ids {
                let _ = index.remove(id);
            }
        }
        Ok(())
    }

    /// Approximate-nearest-neighbor search, optionally filtered to an
    /// agent and fact_type. Ties broken by id ascending.
    pub fn vector_knn(
        &self,
        agent_id: &str,
        fact_type: Option<FactType>,
        query_vec: &[f32],
        k: usize,
        min_sim: f32,
    ) -> Result<Vec<(String, f32)>> {
        #[cfg(feature = "vector-search")]
        {
            let index = self.vector_index.lock().map_err(|_| MemoryError::Init("vector index lock poisoned".into()))?;
            // usearch has no native per-agent filter; over-fetch and filter
            // in SQL against the oversampled candidate ids.
            let oversample = (k * 4).max(k + 16);
            let candidates = index
                .search_with_threshold(query_vec, oversample, min_sim)
                .map_err(|e| MemoryError::InvalidInput(e.to_string()))?;

            if candidates.is_empty() {
                return Ok(vec![]);
            }

            let reader = self.reader.lock().map_err(|_| MemoryError::Init("reader lock poisoned".into()))?;
            let mut out = Vec::new();
            for (id, sim) in candidates {
                let matches: bool = reader
                    .query_row(
                        "SELECT 1 FROM memory_units WHERE id = ?1 AND agent_id = ?2 AND (?3 IS NULL OR fact_type = ?3)",
                        params![id, agent_id, fact_type.map(|f| f.as_str())],
                        |_| Ok(true),
                    )
                    .optional()?
                    .unwrap_or(false);
                if matches {
                    out.push((id, sim));
                }
            }
            out.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
            out.truncate(k);
            Ok(out)
        }
        #[cfg(not(feature = "vector-search"))]
        {
            let _ = (agent_id, fact_type, query_vec, k, min_sim);
            Ok(vec![])
        }
    }

    /// Exact-text match within the same agent and fact_type, used by the
    /// Ingestor's dedupe probe alongside the vector similarity check.
    pub fn unit_with_exact_text(&self, agent_id: &str, fact_type: FactType, text: &str) -> Result<Option<String>> {
        let reader = self.reader.lock().map_err(|_| MemoryError::Init("reader lock poisoned".into()))?;
        reader
            .query_row(
                "SELECT id FROM memory_units WHERE agent_id = ?1 AND fact_type = ?2 AND text = ?3 LIMIT 1",
                params![agent_id, fact_type.as_str(), text],
                |r| r.get(0),
            )
            .optional()
            .map_err(MemoryError::from)
    }

    /// BM25 full-text search via SQLite FTS5 (porter-stemmed).
    pub fn bm25_search(&self, agent_id: &str, fact_type: Option<FactType>, query_text: &str, k: usize) -> Result<Vec<(String, f32)>> {
        let sanitized = sanitize_fts5_query(query_text);
        if sanitized.is_empty() {
            return Ok(vec![]);
        }

        let reader = self.reader.lock().map_err(|_| MemoryError::Init("reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT m.id, bm25(memory_units_fts) AS rank
             FROM memory_units_fts fts
             JOIN memory_units m ON m.id = fts.id
             WHERE memory_units_fts MATCH ?1 AND m.agent_id = ?2 AND (?3 IS NULL OR m.fact_type = ?3)
             ORDER BY rank ASC
             LIMIT ?4",
        )?;

        let rows: Vec<(String, f64)> = stmt
            .query_map(params![sanitized, agent_id, fact_type.map(|f| f.as_str()), k as i64], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .filter_map(|r| r.ok())
            .collect();

        // FTS5 bm25() returns lower-is-better; negate and clip to [0, 1]-ish
        // for a score that composes with the rest of the ranking pipeline.
        Ok(rows.into_iter().map(|(id, rank)| (id, (-rank as f32).max(0.0))).collect())
    }

    /// All outgoing links from a unit with weight at or above `min_weight`.
    pub fn neighbors(&self, unit_id: &str, min_weight: f32) -> Result<Vec<Link>> {
        let reader = self.reader.lock().map_err(|_| MemoryError::Init("reader lock poisoned".into()))?;
        let mut stmt = reader.prepare("SELECT from_id, to_id, link_type, weight, metadata FROM links WHERE from_id = ?1 AND weight >= ?2")?;
        let rows = stmt.query_map(params![unit_id, min_weight], |row| {
            let link_type: String = row.get(2)?;
            let metadata_json: String = row.get(4)?;
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, link_type, row.get::<_, f64>(3)?, metadata_json))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (from_id, to_id, link_type, weight, metadata_json) = row?;
            out.push(Link {
                from_id,
                to_id,
                link_type: LinkType::parse_name(&link_type).unwrap_or(LinkType::Semantic),
                weight: weight as f32,
                metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
            });
        }
        Ok(out)
    }

    pub fn units_for_entity(&self, entity_id: &str) -> Result<Vec<String>> {
        let reader = self.reader.lock().map_err(|_| MemoryError::Init("reader lock poisoned".into()))?;
        let mut stmt = reader.prepare("SELECT unit_id FROM entity_mentions WHERE entity_id = ?1")?;
        let ids = stmt.query_map(params![entity_id], |r| r.get(0))?.filter_map(|r| r.ok()).collect();
        Ok(ids)
    }

    pub fn insert_mention(&self, unit_id: &str, entity_id: &str) -> Result<()> {
        let writer = self.writer.lock().map_err(|_| MemoryError::Init("writer lock poisoned".into()))?;
        writer.execute(
            "INSERT OR IGNORE INTO entity_mentions (unit_id, entity_id) VALUES (?1, ?2)",
            params![unit_id, entity_id],
        )?;
        Ok(())
    }

    /// Upsert a link; if one already exists for `(from, to, link_type)` its
    /// weight becomes `max(existing, weight)`.
    pub fn upsert_link(&self, from_id: &str, to_id: &str, link_type: LinkType, weight: f32, metadata: &LinkMetadata) -> Result<()> {
        let writer = self.writer.lock().map_err(|_| MemoryError::Init("writer lock poisoned".into()))?;
        let metadata_json = serde_json::to_string(metadata)?;
        writer.execute(
            "INSERT INTO links (from_id, to_id, link_type, weight, metadata) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(from_id, to_id, link_type) DO UPDATE SET weight = MAX(weight, excluded.weight)",
            params![from_id, to_id, link_type.as_str(), weight, metadata_json],
        )?;
        Ok(())
    }

    pub fn increment_access(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let writer = self.writer.lock().map_err(|_| MemoryError::Init("writer lock poisoned".into()))?;
        for id in ids {
            writer.execute("UPDATE memory_units SET access_count = access_count + 1 WHERE id = ?1", params![id])?;
        }
        Ok(())
    }

    /// Units of `agent_id` (optionally `fact_type`) within `[start, end)` of
    /// `event_date`, used by temporal-link construction and the
    /// temporal-graph retrieval path.
    pub fn units_in_time_range(
        &self,
        agent_id: &str,
        fact_type: Option<FactType>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MemoryUnit>> {
        let reader = self.reader.lock().map_err(|_| MemoryError::Init("reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT * FROM memory_units WHERE agent_id = ?1 AND (?2 IS NULL OR fact_type = ?2) AND event_date >= ?3 AND event_date < ?4",
        )?;
        let rows = stmt
            .query_map(params![agent_id, fact_type.map(|f| f.as_str()), start, end], row_to_unit)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    // -- entity resolution support --------------------------------------

    /// Finds entities whose stored name could plausibly refer to `token`,
    /// matching in both directions: `token` contains the stored name (so a
    /// new, longer mention like "Alice Chen" still finds a prior shorter
    /// entry "alice") or the stored name contains `token` (the reverse: a
    /// later short mention finds a prior longer entry). The caller's
    /// similarity scoring makes the final accept/reject call.
    pub fn candidate_entities(&self, agent_id: &str, entity_type: EntityType, token: &str) -> Result<Vec<crate::model::Entity>> {
        let reader = self.reader.lock().map_err(|_| MemoryError::Init("reader lock poisoned".into()))?;
        let lowered = token.to_lowercase();
        let pattern = format!("%{}%", lowered);
        let mut stmt = reader.prepare(
            "SELECT id, agent_id, entity_type, canonical_name, aliases, first_seen, last_seen FROM entities
             WHERE agent_id = ?1 AND entity_type = ?2 AND (
                 LOWER(canonical_name) LIKE ?3 OR LOWER(aliases) LIKE ?3
                 OR ?4 LIKE '%' || LOWER(canonical_name) || '%'
                 OR ?4 LIKE '%' || LOWER(aliases) || '%'
             )",
        )?;
        let rows = stmt
            .query_map(params![agent_id, entity_type.as_str(), pattern, lowered], row_to_entity)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn get_entity(&self, id: &str) -> Result<Option<crate::model::Entity>> {
        let reader = self.reader.lock().map_err(|_| MemoryError::Init("reader lock poisoned".into()))?;
        reader
            .query_row(
                "SELECT id, agent_id, entity_type, canonical_name, aliases, first_seen, last_seen FROM entities WHERE id = ?1",
                params![id],
                row_to_entity,
            )
            .optional()
            .map_err(MemoryError::from)
    }

    pub fn insert_entity(&self, entity: &crate::model::Entity) -> Result<()> {
        let writer = self.writer.lock().map_err(|_| MemoryError::Init("writer lock poisoned".into()))?;
        writer.execute(
            "INSERT INTO entities (id, agent_id, entity_type, canonical_name, aliases, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entity.id,
                entity.agent_id,
                entity.entity_type.as_str(),
                entity.canonical_name,
                serde_json::to_string(&entity.aliases)?,
                entity.first_seen,
                entity.last_seen,
            ],
        )?;
        Ok(())
    }

    pub fn update_entity_aliases_and_last_seen(&self, id: &str, aliases: &[String], last_seen: DateTime<Utc>) -> Result<()> {
        let writer = self.writer.lock().map_err(|_| MemoryError::Init("writer lock poisoned".into()))?;
        writer.execute(
            "UPDATE entities SET aliases = ?1, last_seen = MAX(last_seen, ?2) WHERE id = ?3",
            params![serde_json::to_string(aliases)?, last_seen, id],
        )?;
        Ok(())
    }
}

fn row_to_entity(row: &rusqlite::Row) -> rusqlite::Result<crate::model::Entity> {
    let entity_type: String = row.get(2)?;
    let aliases_json: String = row.get(4)?;
    Ok(crate::model::Entity {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        entity_type: EntityType::parse_name(&entity_type),
        canonical_name: row.get(3)?,
        aliases: serde_json::from_str(&aliases_json).unwrap_or_default(),
        first_seen: row.get(5)?,
        last_seen: row.get(6)?,
    })
}

fn vector_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_vector(b: &[u8]) -> Vec<f32> {
    b.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
}

/// Strip FTS5 special characters so user-supplied query text can't be
/// mistaken for FTS5 query syntax (unbalanced quotes, bare operators).
pub fn sanitize_fts5_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| term.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect::<String>())
        .filter(|term: &String| !term.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryUnit;
    use chrono::Utc;

    fn unit(agent: &str, text: &str) -> MemoryUnit {
        MemoryUnit::new(agent, text, FactType::World, Utc::now())
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let u = unit("agent-1", "Alice works at Google.");
        store.insert_unit(&u).unwrap();
        let fetched = store.get_unit(&u.id).unwrap().unwrap();
        assert_eq!(fetched.text, u.text);
        assert_eq!(fetched.agent_id, "agent-1");
    }

    #[test]
    fn bm25_search_is_agent_isolated() {
        let store = Store::open_in_memory().unwrap();
        let a = unit("agent-1", "Alice loves hiking in Yosemite");
        let b = unit("agent-2", "Alice loves hiking in Yosemite");
        store.insert_unit(&a).unwrap();
        store.insert_unit(&b).unwrap();

        let results = store.bm25_search("agent-1", None, "hiking Yosemite", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, a.id);
    }

    #[test]
    fn sanitize_strips_operators() {
        assert_eq!(sanitize_fts5_query("hello \"world\" OR -bad"), "hello world OR bad");
    }

    #[test]
    fn upsert_link_keeps_max_weight() {
        let store = Store::open_in_memory().unwrap();
        let a = unit("agent-1", "fact a");
        let b = unit("agent-1", "fact b");
        store.insert_unit(&a).unwrap();
        store.insert_unit(&b).unwrap();

        store.upsert_link(&a.id, &b.id, LinkType::Semantic, 0.4, &LinkMetadata::default()).unwrap();
        store.upsert_link(&a.id, &b.id, LinkType::Semantic, 0.9, &LinkMetadata::default()).unwrap();

        let neighbors = store.neighbors(&a.id, 0.0).unwrap();
        assert_eq!(neighbors.len(), 1);
        assert!((neighbors[0].weight - 0.9).abs() < 1e-6);
    }

    #[test]
    fn delete_unit_cascades_links_and_mentions() {
        let store = Store::open_in_memory().unwrap();
        let a = unit("agent-1", "fact a");
        let b = unit("agent-1", "fact b");
        store.insert_unit(&a).unwrap();
        store.insert_unit(&b).unwrap();
        store.upsert_link(&a.id, &b.id, LinkType::Temporal, 0.5, &LinkMetadata::default()).unwrap();

        store.delete_unit(&a.id).unwrap();
        assert!(store.get_unit(&a.id).unwrap().is_none());
        assert!(store.neighbors(&b.id, 0.0).unwrap().is_empty());
    }
}
