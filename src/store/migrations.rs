//! Schema migrations, applied in order against a fresh or existing database.

pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema: memory units, entities, mentions, links, FTS5 index",
    up: MIGRATION_V1_UP,
}];

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS memory_units (
    id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL,
    text TEXT NOT NULL,
    fact_type TEXT NOT NULL DEFAULT 'world',
    event_date TEXT NOT NULL,
    created_at TEXT NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    context TEXT,
    document_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_units_agent_type_date ON memory_units(agent_id, fact_type, event_date);
CREATE INDEX IF NOT EXISTS idx_units_document ON memory_units(document_id);

-- Embeddings stored separately (binary blob) so the hot metadata table
-- stays cache-resident; reloaded into the in-process HNSW index at startup.
CREATE TABLE IF NOT EXISTS unit_embeddings (
    unit_id TEXT PRIMARY KEY REFERENCES memory_units(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    dimensions INTEGER NOT NULL
);

CREATE VIRTUAL TABLE IF NOT EXISTS memory_units_fts USING fts5(
    id,
    text,
    tokenize = 'porter',
    content='memory_units',
    content_rowid='rowid'
);

CREATE TRIGGER IF NOT EXISTS memory_units_ai AFTER INSERT ON memory_units BEGIN
    INSERT INTO memory_units_fts(rowid, id, text) VALUES (NEW.rowid, NEW.id, NEW.text);
END;

CREATE TRIGGER IF NOT EXISTS memory_units_ad AFTER DELETE ON memory_units BEGIN
    INSERT INTO memory_units_fts(memory_units_fts, rowid, id, text) VALUES ('delete', OLD.rowid, OLD.id, OLD.text);
END;

CREATE TRIGGER IF NOT EXISTS memory_units_au AFTER UPDATE ON memory_units BEGIN
    INSERT INTO memory_units_fts(memory_units_fts, rowid, id, text) VALUES ('delete', OLD.rowid, OLD.id, OLD.text);
    INSERT INTO memory_units_fts(rowid, id, text) VALUES (NEW.rowid, NEW.id, NEW.text);
END;

CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    canonical_name TEXT NOT NULL,
    aliases TEXT NOT NULL DEFAULT '[]',
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entities_agent_type ON entities(agent_id, entity_type);

CREATE TABLE IF NOT EXISTS entity_mentions (
    unit_id TEXT NOT NULL REFERENCES memory_units(id) ON DELETE CASCADE,
    entity_id TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    PRIMARY KEY (unit_id, entity_id)
);

CREATE INDEX IF NOT EXISTS idx_mentions_entity ON entity_mentions(entity_id);

CREATE TABLE IF NOT EXISTS links (
    from_id TEXT NOT NULL REFERENCES memory_units(id) ON DELETE CASCADE,
    to_id TEXT NOT NULL REFERENCES memory_units(id) ON DELETE CASCADE,
    link_type TEXT NOT NULL,
    weight REAL NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (from_id, to_id, link_type)
);

CREATE INDEX IF NOT EXISTS idx_links_from ON links(from_id, weight);
CREATE INDEX IF NOT EXISTS idx_links_to ON links(to_id, weight);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL)",
        [],
    )?;

    let current: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
        .unwrap_or(0);

    for migration in MIGRATIONS {
        if i64::from(migration.version) > current {
            conn.execute_batch(migration.up)?;
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
                rusqlite::params![migration.version],
            )?;
        }
    }

    Ok(())
}
