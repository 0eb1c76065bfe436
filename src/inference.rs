//! Relationship inference
//!
//! Relationships between entities are inferred from co-occurrence: two
//! entities of different types mentioned close together in the same
//! document are assumed to be related, with confidence falling off
//! linearly with character distance.

use std::cmp::Ordering;
use tracing::debug;

use crate::constants::PROXIMITY_WINDOW_CHARS;
use crate::extraction::chunking::occurrences;
use crate::knowledge::types::{Entity, Relationship, RelationshipId, RelationshipType};

/// Proximity-based relationship inferrer
pub struct RelationshipInferrer {
    proximity_window: usize,
}

impl Default for RelationshipInferrer {
    fn default() -> Self {
        Self::new(PROXIMITY_WINDOW_CHARS)
    }
}

impl RelationshipInferrer {
    pub fn new(proximity_window: usize) -> Self {
        Self { proximity_window }
    }

    /// Infer relationships among the given entities within one document
    ///
    /// Same-type pairs are skipped, as are pairs where either entity has no
    /// located mention or where the closest mentions are at least one
    /// proximity window apart.
    pub fn infer(&self, entities: &[Entity], text: &str) -> Vec<Relationship> {
        let spans: Vec<Vec<(usize, usize)>> = entities
            .iter()
            .map(|entity| {
                let mut found = Vec::new();
                for form in entity.surface_forms() {
                    found.extend(occurrences(text, form));
                }
                found
            })
            .collect();

        let mut relationships = Vec::new();

        for i in 0..entities.len() {
            for j in (i + 1)..entities.len() {
                let (a, b) = (&entities[i], &entities[j]);
                if a.entity_type == b.entity_type {
                    continue;
                }
                let Some(distance) = min_gap(&spans[i], &spans[j]) else {
                    continue;
                };
                let score = proximity_score(distance, self.proximity_window);
                if score <= 0.0 {
                    continue;
                }

                // Lower type priority is the relationship source; equal
                // priorities (two open-ended types) fall back to the type
                // string so direction never depends on discovery order
                let a_is_source = match a.entity_type.priority().cmp(&b.entity_type.priority()) {
                    Ordering::Less => true,
                    Ordering::Greater => false,
                    Ordering::Equal => a.entity_type.as_str() <= b.entity_type.as_str(),
                };
                let (source, target) = if a_is_source { (a, b) } else { (b, a) };

                relationships.push(Relationship {
                    relationship_id: RelationshipId::generate(),
                    source_entity_id: source.entity_id,
                    target_entity_id: target.entity_id,
                    source_type: source.entity_type.clone(),
                    target_type: target.entity_type.clone(),
                    relationship_type: RelationshipType::for_pair(
                        &source.entity_type,
                        &target.entity_type,
                    ),
                    confidence: score,
                });
            }
        }

        debug!(
            "Inferred {} relationships among {} entities",
            relationships.len(),
            entities.len()
        );
        relationships
    }
}

/// Smallest character gap between any mention of one entity and any of
/// another; zero when mentions overlap, None when either list is empty
fn min_gap(a: &[(usize, usize)], b: &[(usize, usize)]) -> Option<usize> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let mut best: Option<usize> = None;
    for &(a_start, a_end) in a {
        for &(b_start, b_end) in b {
            let gap = if a_end <= b_start {
                b_start - a_end
            } else if b_end <= a_start {
                a_start - b_end
            } else {
                0
            };
            best = Some(best.map_or(gap, |g| g.min(gap)));
        }
    }
    best
}

fn proximity_score(distance: usize, window: usize) -> f32 {
    if window == 0 {
        return 0.0;
    }
    (1.0 - distance as f32 / window as f32).max(0.0)
}
