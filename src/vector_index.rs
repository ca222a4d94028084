//! HNSW approximate nearest-neighbor index over unit embeddings.
//!
//! Thin wrapper around `usearch`, in the same shape as the hybrid-search
//! crates this engine draws its "how" from: string keys mapped to dense
//! internal ids, cosine distance converted to similarity at the boundary.

use std::collections::HashMap;
use std::path::Path;

#[cfg(feature = "vector-search")]
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

pub const DEFAULT_DIMENSIONS: usize = 384;
pub const DEFAULT_CONNECTIVITY: usize = 16;
pub const DEFAULT_EXPANSION_ADD: usize = 128;
pub const DEFAULT_EXPANSION_SEARCH: usize = 64;

#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum VectorIndexError {
    IndexCreation(String),
    IndexAdd(String),
    IndexSearch(String),
    IndexPersistence(String),
    InvalidDimensions(usize, usize),
}

impl std::fmt::Display for VectorIndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorIndexError::IndexCreation(e) => write!(f, "index creation failed: {e}"),
            VectorIndexError::IndexAdd(e) => write!(f, "failed to add vector: {e}"),
            VectorIndexError::IndexSearch(e) => write!(f, "search failed: {e}"),
            VectorIndexError::IndexPersistence(e) => write!(f, "persistence failed: {e}"),
            VectorIndexError::InvalidDimensions(expected, got) => {
                write!(f, "invalid dimensions: expected {expected}, got {got}")
            }
        }
    }
}

impl std::error::Error for VectorIndexError {}

#[derive(Debug, Clone)]
pub struct VectorIndexConfig {
    pub dimensions: usize,
    pub connectivity: usize,
    pub expansion_add: usize,
    pub expansion_search: usize,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            connectivity: DEFAULT_CONNECTIVITY,
            expansion_add: DEFAULT_EXPANSION_ADD,
            expansion_search: DEFAULT_EXPANSION_SEARCH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorIndexStats {
    pub total_vectors: usize,
    pub dimensions: usize,
}

/// HNSW index keyed by unit id. Held behind a `Mutex` by
/// [`crate::store::Store`], updated synchronously on unit insertion so the
/// index is visible to retrieval as soon as `Store::insert_unit` returns.
#[cfg(feature = "vector-search")]
pub struct VectorIndex {
    index: Index,
    config: VectorIndexConfig,
    key_to_id: HashMap<String, u64>,
    id_to_key: HashMap<u64, String>,
    next_id: u64,
}

#[cfg(feature = "vector-search")]
impl VectorIndex {
    pub fn new() -> Result<Self, VectorIndexError> {
        Self::with_config(VectorIndexConfig::default())
    }

    pub fn with_config(config: VectorIndexConfig) -> Result<Self, VectorIndexError> {
        let options = IndexOptions {
            dimensions: config.dimensions,
            metric: MetricKind::Cos,
            quantization: ScalarKind::I8,
            connectivity: config.connectivity,
            expansion_add: config.expansion_add,
            expansion_search: config.expansion_search,
            multi: false,
        };

        let index = Index::new(&options).map_err(|e| VectorIndexError::IndexCreation(e.to_string()))?;

        Ok(Self {
            index,
            config,
            key_to_id: HashMap::new(),
            id_to_key: HashMap::new(),
            next_id: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    pub fn reserve(&self, capacity: usize) -> Result<(), VectorIndexError> {
        self.index
            .reserve(capacity)
            .map_err(|e| VectorIndexError::IndexCreation(format!("failed to reserve capacity: {e}")))
    }

    pub fn add(&mut self, key: &str, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.config.dimensions {
            return Err(VectorIndexError::InvalidDimensions(self.config.dimensions, vector.len()));
        }

        if let Some(&existing_id) = self.key_to_id.get(key) {
            self.index
                .remove(existing_id)
                .map_err(|e| VectorIndexError::IndexAdd(e.to_string()))?;
            self.reserve(self.index.size() + 1)?;
            self.index
                .add(existing_id, vector)
                .map_err(|e| VectorIndexError::IndexAdd(e.to_string()))?;
            return Ok(());
        }

        let current_capacity = self.index.capacity();
        let current_size = self.index.size();
        if current_size >= current_capacity {
            let new_capacity = std::cmp::max(current_capacity * 2, 16);
            self.reserve(new_capacity)?;
        }

        let id = self.next_id;
        self.next_id += 1;

        self.index
            .add(id, vector)
            .map_err(|e| VectorIndexError::IndexAdd(e.to_string()))?;

        self.key_to_id.insert(key.to_string(), id);
        self.id_to_key.insert(id, key.to_string());

        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<bool, VectorIndexError> {
        if let Some(id) = self.key_to_id.remove(key) {
            self.id_to_key.remove(&id);
            self.index
                .remove(id)
                .map_err(|e| VectorIndexError::IndexAdd(e.to_string()))?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.key_to_id.contains_key(key)
    }

    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(String, f32)>, VectorIndexError> {
        if query.len() != self.config.dimensions {
            return Err(VectorIndexError::InvalidDimensions(self.config.dimensions, query.len()));
        }
        if self.is_empty() {
            return Ok(vec![]);
        }

        let results = self
            .index
            .search(query, limit)
            .map_err(|e| VectorIndexError::IndexSearch(e.to_string()))?;

        let mut out = Vec::with_capacity(results.keys.len());
        for (key, distance) in results.keys.iter().zip(results.distances.iter()) {
            if let Some(string_key) = self.id_to_key.get(key) {
                out.push((string_key.clone(), 1.0 - distance));
            }
        }
        Ok(out)
    }

    pub fn search_with_threshold(
        &self,
        query: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<(String, f32)>, VectorIndexError> {
        let results = self.search(query, limit)?;
        Ok(results.into_iter().filter(|(_, score)| *score >= min_similarity).collect())
    }

    pub fn save(&self, path: &Path) -> Result<(), VectorIndexError> {
        let path_str = path.to_str().ok_or_else(|| VectorIndexError::IndexPersistence("invalid path".into()))?;
        self.index.save(path_str).map_err(|e| VectorIndexError::IndexPersistence(e.to_string()))?;

        let mappings_path = path.with_extension("mappings.json");
        let mappings = serde_json::json!({ "key_to_id": self.key_to_id, "next_id": self.next_id });
        let mappings_str = serde_json::to_string(&mappings).map_err(|e| VectorIndexError::IndexPersistence(e.to_string()))?;
        std::fs::write(&mappings_path, mappings_str).map_err(|e| VectorIndexError::IndexPersistence(e.to_string()))?;
        Ok(())
    }

    pub fn load(path: &Path, config: VectorIndexConfig) -> Result<Self, VectorIndexError> {
        let path_str = path.to_str().ok_or_else(|| VectorIndexError::IndexPersistence("invalid path".into()))?;

        let options = IndexOptions {
            dimensions: config.dimensions,
            metric: MetricKind::Cos,
            quantization: ScalarKind::I8,
            connectivity: config.connectivity,
            expansion_add: config.expansion_add,
            expansion_search: config.expansion_search,
            multi: false,
        };
        let index = Index::new(&options).map_err(|e| VectorIndexError::IndexCreation(e.to_string()))?;
        index.load(path_str).map_err(|e| VectorIndexError::IndexPersistence(e.to_string()))?;

        let mappings_path = path.with_extension("mappings.json");
        let mappings_str = std::fs::read_to_string(&mappings_path).map_err(|e| VectorIndexError::IndexPersistence(e.to_string()))?;
        let mappings: serde_json::Value =
            serde_json::from_str(&mappings_str).map_err(|e| VectorIndexError::IndexPersistence(e.to_string()))?;

        let key_to_id: HashMap<String, u64> =
            serde_json::from_value(mappings["key_to_id"].clone()).map_err(|e| VectorIndexError::IndexPersistence(e.to_string()))?;
        let next_id: u64 = mappings["next_id"].as_u64().ok_or_else(|| VectorIndexError::IndexPersistence("invalid next_id".into()))?;
        let id_to_key: HashMap<u64, String> = key_to_id.iter().map(|(k, &v)| (v, k.clone())).collect();

        Ok(Self { index, config, key_to_id, id_to_key, next_id })
    }

    pub fn stats(&self) -> VectorIndexStats {
        VectorIndexStats { total_vectors: self.len(), dimensions: self.config.dimensions }
    }
}

#[cfg(all(test, feature = "vector-search"))]
mod tests {
    use super::*;

    fn vec_seeded(seed: f32, dims: usize) -> Vec<f32> {
        (0..dims).map(|i| ((i as f32 + seed) / dims as f32).sin()).collect()
    }

    #[test]
    fn add_and_search() {
        let mut index = VectorIndex::new().unwrap();
        let v1 = vec_seeded(1.0, DEFAULT_DIMENSIONS);
        let v2 = vec_seeded(2.0, DEFAULT_DIMENSIONS);
        let v3 = vec_seeded(100.0, DEFAULT_DIMENSIONS);

        index.add("unit-1", &v1).unwrap();
        index.add("unit-2", &v2).unwrap();
        index.add("unit-3", &v3).unwrap();

        assert_eq!(index.len(), 3);
        let results = index.search(&v1, 3).unwrap();
        assert_eq!(results[0].0, "unit-1");
    }

    #[test]
    fn rejects_wrong_dimensions() {
        let mut index = VectorIndex::new().unwrap();
        assert!(index.add("unit-1", &[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn remove_then_absent() {
        let mut index = VectorIndex::new().unwrap();
        let v1 = vec_seeded(1.0, DEFAULT_DIMENSIONS);
        index.add("unit-1", &v1).unwrap();
        assert!(index.remove("unit-1").unwrap());
        assert!(!index.contains("unit-1"));
    }

    #[test]
    fn threshold_filters_dissimilar() {
        let mut index = VectorIndex::new().unwrap();
        let v1 = vec_seeded(1.0, DEFAULT_DIMENSIONS);
        let v2 = vec_seeded(100.0, DEFAULT_DIMENSIONS);
        index.add("similar", &v1).unwrap();
        index.add("different", &v2).unwrap();

        let results = index.search_with_threshold(&v1, 10, 0.9).unwrap();
        assert!(results.iter().any(|(k, _)| k == "similar"));
    }
}
