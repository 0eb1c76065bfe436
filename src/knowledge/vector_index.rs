//! In-memory vector index with a persistent snapshot form
//!
//! A flat Euclidean index over entity embeddings. The slot table mapping
//! index positions to entity ids is serialized inside the same snapshot as
//! the vectors, so the two can never diverge on disk. Slots are append-only;
//! re-adding an entity overwrites its vector in place.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{KnowledgeError, Result};
use crate::knowledge::types::EntityId;

#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    slots: Vec<EntityId>,
}

pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    slots: Vec<EntityId>,
    slot_of: HashMap<EntityId, usize>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            slots: Vec::new(),
            slot_of: HashMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Apply a batch of vectors
    ///
    /// Known ids have their vector overwritten in place, new ids are
    /// appended. The whole batch is validated before any slot changes, so a
    /// dimension mismatch leaves the index untouched.
    pub fn apply(&mut self, batch: &[(EntityId, Vec<f32>)]) -> Result<()> {
        for (_, vector) in batch {
            if vector.len() != self.dimension {
                return Err(KnowledgeError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        for (entity_id, vector) in batch {
            match self.slot_of.get(entity_id) {
                Some(&slot) => self.vectors[slot] = vector.clone(),
                None => {
                    self.slot_of.insert(*entity_id, self.slots.len());
                    self.slots.push(*entity_id);
                    self.vectors.push(vector.clone());
                }
            }
        }
        Ok(())
    }

    /// Nearest neighbors by Euclidean distance, closest first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(EntityId, f32)>> {
        if query.len() != self.dimension {
            return Err(KnowledgeError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        let mut scored: Vec<(EntityId, f32)> = self
            .slots
            .iter()
            .zip(&self.vectors)
            .map(|(&id, vector)| (id, euclidean(query, vector)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let snapshot = IndexSnapshot {
            dimension: self.dimension,
            vectors: self.vectors.clone(),
            slots: self.slots.clone(),
        };
        bincode::serde::encode_to_vec(&snapshot, bincode::config::standard())
            .map_err(|e| KnowledgeError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (snapshot, _): (IndexSnapshot, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| KnowledgeError::Serialization(e.to_string()))?;
        let slot_of = snapshot
            .slots
            .iter()
            .enumerate()
            .map(|(slot, &id)| (id, slot))
            .collect();
        Ok(Self {
            dimension: snapshot.dimension,
            vectors: snapshot.vectors,
            slots: snapshot.slots,
            slot_of,
        })
    }
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::types::EntityType;

    fn id(text: &str) -> EntityId {
        EntityId::derive(text, &EntityType::Term)
    }

    #[test]
    fn test_search_orders_by_distance() {
        let mut index = VectorIndex::new(2);
        index
            .apply(&[
                (id("far"), vec![10.0, 0.0]),
                (id("near"), vec![1.0, 0.0]),
                (id("mid"), vec![4.0, 0.0]),
            ])
            .unwrap();

        let hits = index.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, id("near"));
        assert_eq!(hits[1].0, id("mid"));
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reapply_overwrites_in_place() {
        let mut index = VectorIndex::new(2);
        index.apply(&[(id("a"), vec![0.0, 0.0])]).unwrap();
        index.apply(&[(id("a"), vec![5.0, 0.0])]).unwrap();

        assert_eq!(index.len(), 1);
        let hits = index.search(&[5.0, 0.0], 1).unwrap();
        assert!(hits[0].1 < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch_rejects_whole_batch() {
        let mut index = VectorIndex::new(2);
        let err = index
            .apply(&[(id("ok"), vec![1.0, 2.0]), (id("bad"), vec![1.0])])
            .unwrap_err();
        assert!(matches!(
            err,
            KnowledgeError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_query_dimension_checked() {
        let index = VectorIndex::new(3);
        assert!(index.search(&[1.0], 5).is_err());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut index = VectorIndex::new(2);
        index
            .apply(&[(id("a"), vec![1.0, 2.0]), (id("b"), vec![3.0, 4.0])])
            .unwrap();

        let restored = VectorIndex::from_bytes(&index.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.dimension(), 2);
        assert_eq!(restored.len(), 2);

        // Slot table survives, so in-place overwrite still works
        let mut restored = restored;
        restored.apply(&[(id("a"), vec![9.0, 9.0])]).unwrap();
        assert_eq!(restored.len(), 2);
    }
}
