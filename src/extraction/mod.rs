//! Entity extraction
//!
//! Two independent strategies run over each document: a generative model
//! prompted for structured output, and deterministic pattern rules. Their
//! candidates are merged by `(lowercase(text), type)` keeping the higher
//! relevance, then enriched with a deterministic id, an embedding, context
//! snippets, and provenance metadata.
//!
//! Extraction never raises to its caller: a failing collaborator degrades
//! that strategy's contribution to empty.

pub mod chunking;
pub mod generative;
pub mod patterns;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::constants::{CONTEXT_WINDOW_CHARS, MAX_CONTEXTS, MODEL_WINDOW_CHARS};
use crate::extraction::chunking::{ceil_char_boundary, floor_char_boundary, occurrences};
use crate::knowledge::types::{Entity, EntityId, EntityType};
use crate::models::{Embedder, GenerativeModel};

/// An entity proposal from a single extraction strategy, before enrichment
#[derive(Debug, Clone)]
pub struct Candidate {
    pub text: String,
    pub entity_type: EntityType,
    pub relevance: f32,
    pub metadata: HashMap<String, String>,
}

impl Candidate {
    /// Deduplication key: extraction strategies proposing the same
    /// normalized text and type refer to the same entity
    fn key(&self) -> (String, EntityType) {
        (self.text.to_lowercase(), self.entity_type.clone())
    }
}

/// Tunables for the extraction pipeline
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Maximum characters per generative-model window
    pub model_window_chars: usize,
    /// Characters captured on each side of an entity mention
    pub context_window_chars: usize,
    /// Maximum context snippets stored per entity
    pub max_contexts: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            model_window_chars: MODEL_WINDOW_CHARS,
            context_window_chars: CONTEXT_WINDOW_CHARS,
            max_contexts: MAX_CONTEXTS,
        }
    }
}

/// Dual-strategy entity extractor
pub struct EntityExtractor {
    model: Arc<dyn GenerativeModel>,
    embedder: Arc<dyn Embedder>,
    config: ExtractorConfig,
}

impl EntityExtractor {
    pub fn new(model: Arc<dyn GenerativeModel>, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_config(model, embedder, ExtractorConfig::default())
    }

    pub fn with_config(
        model: Arc<dyn GenerativeModel>,
        embedder: Arc<dyn Embedder>,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            model,
            embedder,
            config,
        }
    }

    /// Extract entities from a document
    ///
    /// Returns the merged, enriched entity list sorted by relevance
    /// descending. Infallible by design; strategy failures are logged and
    /// reduce coverage, not availability.
    pub fn extract(&self, text: &str, document_id: &str) -> Vec<Entity> {
        debug!("Extracting entities from document: {document_id}");

        let model_candidates = generative::extract_with_model(
            self.model.as_ref(),
            text,
            self.config.model_window_chars,
        );
        let pattern_candidates = patterns::extract_with_patterns(text);

        let merged = merge_candidates(model_candidates, pattern_candidates);

        merged
            .into_iter()
            .map(|candidate| self.enrich(candidate, text, document_id))
            .collect()
    }

    /// Turn a merged candidate into a full entity record
    fn enrich(&self, candidate: Candidate, text: &str, document_id: &str) -> Entity {
        let entity_id = EntityId::derive(&candidate.text, &candidate.entity_type);

        let embedding = match self.embedder.embed(&candidate.text) {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!("Embedding failed for '{}': {e}", candidate.text);
                None
            }
        };

        let mut entity = Entity {
            entity_id,
            text: candidate.text,
            entity_type: candidate.entity_type,
            relevance: candidate.relevance,
            embedding,
            source_documents: [document_id.to_string()].into(),
            contexts: Vec::new(),
            metadata: candidate.metadata,
        };

        entity.contexts = self.find_contexts(&entity, text);
        entity
    }

    /// Locate up to `max_contexts` snippets of surrounding text for an entity
    fn find_contexts(&self, entity: &Entity, text: &str) -> Vec<String> {
        let window = self.config.context_window_chars;
        let mut contexts = Vec::new();

        'forms: for form in entity.surface_forms() {
            for (start, end) in occurrences(text, form) {
                let from = floor_char_boundary(text, start.saturating_sub(window));
                let to = ceil_char_boundary(text, (end + window).min(text.len()));

                let mut context = text[from..to].trim().to_string();
                if from > 0 {
                    context = format!("...{context}");
                }
                if to < text.len() {
                    context = format!("{context}...");
                }
                contexts.push(context);

                if contexts.len() >= self.config.max_contexts {
                    break 'forms;
                }
            }
        }

        contexts
    }
}

/// Merge strategy outputs, keyed by `(lowercase(text), type)`
///
/// When both strategies propose the same key the higher-relevance record
/// wins. The result is sorted by relevance descending.
fn merge_candidates(
    model_candidates: Vec<Candidate>,
    pattern_candidates: Vec<Candidate>,
) -> Vec<Candidate> {
    let mut by_key: HashMap<(String, EntityType), Candidate> = HashMap::new();

    for candidate in model_candidates.into_iter().chain(pattern_candidates) {
        match by_key.entry(candidate.key()) {
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                if candidate.relevance > slot.get().relevance {
                    slot.insert(candidate);
                }
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
        }
    }

    let mut merged: Vec<Candidate> = by_key.into_values().collect();
    merged.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HashEmbedder;
    use anyhow::anyhow;

    struct ScriptedModel(String);

    impl GenerativeModel for ScriptedModel {
        fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingModel;

    impl GenerativeModel for FailingModel {
        fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Err(anyhow!("unreachable"))
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            Err(anyhow!("embedding service down"))
        }
        fn dimension(&self) -> usize {
            8
        }
    }

    fn candidate(text: &str, entity_type: EntityType, relevance: f32) -> Candidate {
        Candidate {
            text: text.to_string(),
            entity_type,
            relevance,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_merge_prefers_higher_relevance() {
        let merged = merge_candidates(
            vec![candidate("Kubernetes", EntityType::Term, 0.9)],
            vec![candidate("kubernetes", EntityType::Term, 0.6)],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Kubernetes");
        assert!((merged[0].relevance - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_merge_keeps_distinct_types() {
        let merged = merge_candidates(
            vec![candidate("Alpha", EntityType::Project, 0.8)],
            vec![candidate("Alpha", EntityType::Term, 0.6)],
        );
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_sorted_by_relevance_descending() {
        let merged = merge_candidates(
            vec![
                candidate("low", EntityType::Term, 0.2),
                candidate("high", EntityType::Term, 0.9),
            ],
            vec![candidate("mid", EntityType::Term, 0.5)],
        );
        let texts: Vec<&str> = merged.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_extract_combines_both_strategies() {
        let model = ScriptedModel(
            r#"[{"text": "Cloud Migration", "type": "PROJECT", "relevance": 0.95}]"#
                .to_string(),
        );
        let extractor =
            EntityExtractor::new(Arc::new(model), Arc::new(HashEmbedder::new(32)));

        let text = "jane.doe@corp.example and the Cloud Migration kickoff.";
        let entities = extractor.extract(text, "doc-1");

        assert!(entities
            .iter()
            .any(|e| e.text == "Cloud Migration" && e.entity_type == EntityType::Project));
        assert!(entities
            .iter()
            .any(|e| e.text == "Jane Doe" && e.entity_type == EntityType::Person));
        // Everything carries the document id and an embedding
        for entity in &entities {
            assert!(entity.source_documents.contains("doc-1"));
            assert!(entity.embedding.is_some());
        }
    }

    #[test]
    fn test_model_failure_degrades_to_patterns_only() {
        let extractor =
            EntityExtractor::new(Arc::new(FailingModel), Arc::new(HashEmbedder::new(32)));
        let entities = extractor.extract("Ping sam.lee@corp.example about PRJ-42A.", "doc-2");

        assert!(entities.iter().any(|e| e.text == "Sam Lee"));
        assert!(entities.iter().any(|e| e.text == "PRJ-42A"));
    }

    #[test]
    fn test_embedder_failure_leaves_entity_without_embedding() {
        let extractor =
            EntityExtractor::new(Arc::new(FailingModel), Arc::new(FailingEmbedder));
        let entities = extractor.extract("Ask kim.park@corp.example today.", "doc-3");

        let person = entities.iter().find(|e| e.text == "Kim Park").unwrap();
        assert!(person.embedding.is_none());
    }

    #[test]
    fn test_contexts_bounded_and_ellipsized() {
        let mention = "Gateway ".repeat(10);
        let text = format!("{}{}", "padding around mention. ".repeat(30), mention);
        let extractor = EntityExtractor::new(
            Arc::new(ScriptedModel(
                r#"[{"text": "Gateway", "type": "PROJECT", "relevance": 0.9}]"#.to_string(),
            )),
            Arc::new(HashEmbedder::new(16)),
        );

        let entities = extractor.extract(&text, "doc-4");
        let gateway = entities.iter().find(|e| e.text == "Gateway").unwrap();

        assert!(gateway.contexts.len() <= 5);
        assert!(!gateway.contexts.is_empty());
        assert!(gateway.contexts[0].starts_with("..."));
    }

    #[test]
    fn test_entity_id_stable_across_strategies() {
        let extractor_a = EntityExtractor::new(
            Arc::new(ScriptedModel(
                r#"[{"text": "terraform", "type": "TERM", "relevance": 0.8}]"#.to_string(),
            )),
            Arc::new(HashEmbedder::new(16)),
        );
        let extractor_b = EntityExtractor::new(
            Arc::new(ScriptedModel(
                r#"[{"text": "TERRAFORM", "type": "TERM", "relevance": 0.8}]"#.to_string(),
            )),
            Arc::new(HashEmbedder::new(16)),
        );

        let a = extractor_a.extract("terraform everywhere", "d1");
        let b = extractor_b.extract("TERRAFORM everywhere", "d2");

        let ea = a
            .iter()
            .find(|e| e.text.eq_ignore_ascii_case("terraform"))
            .unwrap();
        let eb = b
            .iter()
            .find(|e| e.text.eq_ignore_ascii_case("terraform"))
            .unwrap();
        assert_eq!(ea.entity_id, eb.entity_id);
    }
}
