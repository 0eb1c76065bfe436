//! Knowledge graph store
//!
//! Entities and relationships live in memory behind a [`parking_lot::RwLock`]
//! and are mirrored to an [`ObjectStore`] as JSON records plus a binary
//! vector-index snapshot. Writes commit records before the snapshot, so a
//! crash between the two leaves records whose vectors simply have not been
//! indexed yet, never a snapshot pointing at missing records.

pub mod types;
pub mod vector_index;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::constants::{
    ENTITIES_PREFIX, INDEX_KEY, RELATIONSHIPS_PREFIX, TEXT_MATCH_THRESHOLD, VECTOR_OVERSAMPLE,
};
use crate::errors::{KnowledgeError, Result};
use crate::storage::ObjectStore;
use types::{Entity, EntityId, EntityType, Relationship, RelationshipId, RelationshipType};

/// A scored search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredEntity {
    pub entity: Entity,
    pub score: f32,
}

/// Counters for the current in-memory graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub entity_count: usize,
    pub relationship_count: usize,
    pub indexed_count: usize,
    pub entity_types: HashMap<String, usize>,
    pub relationship_types: HashMap<String, usize>,
}

struct StoreInner {
    entities: HashMap<EntityId, Entity>,
    relationships: HashMap<RelationshipId, Relationship>,
    triples: HashMap<(EntityId, EntityId, RelationshipType), RelationshipId>,
    index: vector_index::VectorIndex,
}

pub struct KnowledgeStore {
    store: Arc<dyn ObjectStore>,
    inner: RwLock<StoreInner>,
}

impl KnowledgeStore {
    /// Open a store over the given backend
    ///
    /// Loads the persisted index snapshot when one exists; entity and
    /// relationship records are loaded separately via [`hydrate`].
    ///
    /// [`hydrate`]: KnowledgeStore::hydrate
    pub fn new(store: Arc<dyn ObjectStore>, dimension: usize) -> Result<Self> {
        let index = match store.get(INDEX_KEY)? {
            Some(bytes) => {
                let index = vector_index::VectorIndex::from_bytes(&bytes)?;
                debug!("Loaded index snapshot with {} vectors", index.len());
                index
            }
            None => vector_index::VectorIndex::new(dimension),
        };
        Ok(Self {
            store,
            inner: RwLock::new(StoreInner {
                entities: HashMap::new(),
                relationships: HashMap::new(),
                triples: HashMap::new(),
                index,
            }),
        })
    }

    /// Load all persisted entity and relationship records into memory
    ///
    /// Corrupt records are skipped with a warning rather than failing the
    /// whole load. Returns `(entity_count, relationship_count)`.
    pub fn hydrate(&self) -> Result<(usize, usize)> {
        let mut inner = self.inner.write();

        for key in self.store.list(ENTITIES_PREFIX)? {
            let Some(bytes) = self.store.get(&key)? else {
                continue;
            };
            match serde_json::from_slice::<Entity>(&bytes) {
                Ok(entity) => {
                    inner.entities.insert(entity.entity_id, entity);
                }
                Err(e) => warn!("Skipping corrupt entity record {key}: {e}"),
            }
        }

        for key in self.store.list(RELATIONSHIPS_PREFIX)? {
            let Some(bytes) = self.store.get(&key)? else {
                continue;
            };
            match serde_json::from_slice::<Relationship>(&bytes) {
                Ok(relationship) => {
                    inner.triples.insert(
                        relationship.triple(),
                        relationship.relationship_id,
                    );
                    inner
                        .relationships
                        .insert(relationship.relationship_id, relationship);
                }
                Err(e) => warn!("Skipping corrupt relationship record {key}: {e}"),
            }
        }

        let counts = (inner.entities.len(), inner.relationships.len());
        info!(
            "Hydrated {} entities and {} relationships",
            counts.0, counts.1
        );
        Ok(counts)
    }

    /// Add or merge a batch of entities
    ///
    /// Known ids are merged: source documents union, scalar fields and
    /// contexts take the incoming values, and the embedding is replaced only
    /// when the incoming record carries one. Records are persisted before
    /// the index snapshot.
    pub fn add_entities(&self, incoming: Vec<Entity>) -> Result<Vec<EntityId>> {
        let mut inner = self.inner.write();
        let mut ids = Vec::with_capacity(incoming.len());
        let mut vectors: Vec<(EntityId, Vec<f32>)> = Vec::new();

        for entity in incoming {
            let id = entity.entity_id;
            let merged = match inner.entities.remove(&id) {
                Some(mut existing) => {
                    existing
                        .source_documents
                        .extend(entity.source_documents.iter().cloned());
                    existing.text = entity.text;
                    existing.relevance = entity.relevance;
                    existing.contexts = entity.contexts;
                    existing.metadata = entity.metadata;
                    if entity.embedding.is_some() {
                        existing.embedding = entity.embedding;
                    }
                    existing
                }
                None => entity,
            };

            if let Some(vector) = &merged.embedding {
                vectors.push((id, vector.clone()));
            }

            let key = entity_key(&merged);
            self.store.put(&key, &serde_json::to_vec(&merged)?)?;
            inner.entities.insert(id, merged);
            ids.push(id);
        }

        if !vectors.is_empty() {
            inner.index.apply(&vectors)?;
            self.store.put(INDEX_KEY, &inner.index.to_bytes()?)?;
        }

        debug!("Stored {} entities", ids.len());
        Ok(ids)
    }

    /// Add a batch of relationships, deduplicating by semantic triple
    ///
    /// A relationship matching an existing `(source, target, type)` triple
    /// keeps the existing id and takes the higher confidence. Returns the
    /// effective id for each input, in order.
    pub fn add_relationships(
        &self,
        incoming: Vec<Relationship>,
    ) -> Result<Vec<RelationshipId>> {
        let mut inner = self.inner.write();
        let mut ids = Vec::with_capacity(incoming.len());

        for relationship in incoming {
            let triple = relationship.triple();
            let id = match inner.triples.get(&triple).copied() {
                Some(existing_id) => {
                    let existing = inner
                        .relationships
                        .get_mut(&existing_id)
                        .ok_or_else(|| {
                            KnowledgeError::Storage(format!(
                                "triple table references missing relationship {existing_id}"
                            ))
                        })?;
                    if relationship.confidence > existing.confidence {
                        existing.confidence = relationship.confidence;
                        let record = existing.clone();
                        self.store
                            .put(&relationship_key(&record), &serde_json::to_vec(&record)?)?;
                    }
                    existing_id
                }
                None => {
                    let id = relationship.relationship_id;
                    self.store.put(
                        &relationship_key(&relationship),
                        &serde_json::to_vec(&relationship)?,
                    )?;
                    inner.triples.insert(triple, id);
                    inner.relationships.insert(id, relationship);
                    id
                }
            };
            ids.push(id);
        }

        debug!("Stored {} relationships", ids.len());
        Ok(ids)
    }

    /// Nearest entities to a query vector
    ///
    /// Similarity is `1 / (1 + distance)`. The index is oversampled so a
    /// type filter still fills `top_k` when possible.
    pub fn search_by_vector(
        &self,
        query: &[f32],
        top_k: usize,
        entity_type: Option<&EntityType>,
    ) -> Result<Vec<ScoredEntity>> {
        let inner = self.inner.read();
        let hits = inner.index.search(query, top_k * VECTOR_OVERSAMPLE)?;

        let mut results = Vec::new();
        for (id, distance) in hits {
            let Some(entity) = inner.entities.get(&id) else {
                // Indexed before hydration or record lost; skip
                continue;
            };
            if let Some(wanted) = entity_type {
                if &entity.entity_type != wanted {
                    continue;
                }
            }
            results.push(ScoredEntity {
                entity: entity.clone(),
                score: 1.0 / (1.0 + distance),
            });
            if results.len() >= top_k {
                break;
            }
        }
        Ok(results)
    }

    /// Lexical entity search
    ///
    /// Exact match scores 1.0, containment either way 0.8, otherwise the
    /// Jaccard overlap of whitespace tokens. Hits at or below the match
    /// threshold are dropped.
    pub fn search_by_text(
        &self,
        query: &str,
        top_k: usize,
        entity_type: Option<&EntityType>,
    ) -> Result<Vec<ScoredEntity>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(KnowledgeError::InvalidQuery(
                "text query must not be empty".to_string(),
            ));
        }

        let inner = self.inner.read();
        let mut results: Vec<ScoredEntity> = inner
            .entities
            .values()
            .filter(|entity| match entity_type {
                Some(wanted) => &entity.entity_type == wanted,
                None => true,
            })
            .filter_map(|entity| {
                let score = text_match_score(&needle, &entity.text.to_lowercase());
                (score > TEXT_MATCH_THRESHOLD).then(|| ScoredEntity {
                    entity: entity.clone(),
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    pub fn get_entity(&self, id: &EntityId) -> Option<Entity> {
        self.inner.read().entities.get(id).cloned()
    }

    /// All relationships where the entity appears as source or target
    pub fn get_entity_relationships(&self, id: &EntityId) -> Vec<Relationship> {
        self.inner
            .read()
            .relationships
            .values()
            .filter(|r| &r.source_entity_id == id || &r.target_entity_id == id)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read();
        let mut entity_types: HashMap<String, usize> = HashMap::new();
        for entity in inner.entities.values() {
            *entity_types
                .entry(entity.entity_type.as_str().to_string())
                .or_default() += 1;
        }
        let mut relationship_types: HashMap<String, usize> = HashMap::new();
        for relationship in inner.relationships.values() {
            *relationship_types
                .entry(relationship.relationship_type.as_str().to_string())
                .or_default() += 1;
        }
        StoreStats {
            entity_count: inner.entities.len(),
            relationship_count: inner.relationships.len(),
            indexed_count: inner.index.len(),
            entity_types,
            relationship_types,
        }
    }
}

fn entity_key(entity: &Entity) -> String {
    format!(
        "{}/{}/{}.json",
        ENTITIES_PREFIX,
        entity.entity_type.as_str(),
        entity.entity_id
    )
}

fn relationship_key(relationship: &Relationship) -> String {
    format!(
        "{}/{}/{}.json",
        RELATIONSHIPS_PREFIX,
        relationship.relationship_type.as_str(),
        relationship.relationship_id
    )
}

/// Lexical similarity in [0, 1]; both inputs are lowercased already
fn text_match_score(query: &str, candidate: &str) -> f32 {
    if query == candidate {
        return 1.0;
    }
    if candidate.contains(query) || query.contains(candidate) {
        return 0.8;
    }
    let query_tokens: std::collections::HashSet<&str> = query.split_whitespace().collect();
    let candidate_tokens: std::collections::HashSet<&str> =
        candidate.split_whitespace().collect();
    let intersection = query_tokens.intersection(&candidate_tokens).count();
    let union = query_tokens.union(&candidate_tokens).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}
