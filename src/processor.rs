//! Document processing pipeline
//!
//! Ties the pieces together: read a document, extract entities, infer
//! relationships, commit both to the store, and persist a summary record.
//! Batch runs isolate per-document failures so one bad document never
//! aborts the rest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::KnowledgeConfig;
use crate::constants::{RESULTS_PREFIX, SUMMARIES_PREFIX};
use crate::errors::{KnowledgeError, Result};
use crate::extraction::{EntityExtractor, ExtractorConfig};
use crate::inference::RelationshipInferrer;
use crate::knowledge::KnowledgeStore;
use crate::models::{Embedder, GenerativeModel};
use crate::sources::{load_document_text, DocumentSource};
use crate::storage::ObjectStore;

/// Outcome of processing a single document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_path: String,
    pub processed_at: DateTime<Utc>,
    pub entity_count: usize,
    pub relationship_count: usize,
    pub entity_types: HashMap<String, usize>,
    pub relationship_types: HashMap<String, usize>,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub processed_at: DateTime<Utc>,
    pub documents_processed: usize,
    pub entity_count: usize,
    pub relationship_count: usize,
    pub errors: Vec<String>,
}

pub struct KnowledgeProcessor {
    config: KnowledgeConfig,
    source: Arc<dyn DocumentSource>,
    extractor: EntityExtractor,
    inferrer: RelationshipInferrer,
    store: KnowledgeStore,
    objects: Arc<dyn ObjectStore>,
}

impl KnowledgeProcessor {
    /// Build the pipeline from its collaborators
    ///
    /// Configuration problems are fatal here; nothing is processed over an
    /// invalid config.
    pub fn new(
        config: KnowledgeConfig,
        source: Arc<dyn DocumentSource>,
        model: Arc<dyn GenerativeModel>,
        embedder: Arc<dyn Embedder>,
        objects: Arc<dyn ObjectStore>,
    ) -> Result<Self> {
        config.validate()?;
        config.log();

        let extractor = EntityExtractor::with_config(
            model,
            embedder,
            ExtractorConfig {
                model_window_chars: config.model_window_chars,
                context_window_chars: config.context_window_chars,
                max_contexts: config.max_contexts,
            },
        );
        let inferrer = RelationshipInferrer::new(config.proximity_window_chars);
        let store = KnowledgeStore::new(Arc::clone(&objects), config.embedding_dimension)?;
        // Records must be in memory before the first write, or restart
        // processing would re-persist already-stored triples
        store.hydrate()?;

        Ok(Self {
            config,
            source,
            extractor,
            inferrer,
            store,
            objects,
        })
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// Process one document end to end
    pub fn process_document(&self, path: &str) -> Result<DocumentSummary> {
        info!("Processing document: {path}");

        let text = load_document_text(self.source.as_ref(), path).map_err(|e| {
            KnowledgeError::DocumentLoad {
                path: path.to_string(),
                reason: format!("{e:#}"),
            }
        })?;
        let entities = self.extractor.extract(&text, path);
        let relationships = self.inferrer.infer(&entities, &text);

        let mut entity_types: HashMap<String, usize> = HashMap::new();
        for entity in &entities {
            *entity_types
                .entry(entity.entity_type.as_str().to_string())
                .or_default() += 1;
        }
        let mut relationship_types: HashMap<String, usize> = HashMap::new();
        for relationship in &relationships {
            *relationship_types
                .entry(relationship.relationship_type.as_str().to_string())
                .or_default() += 1;
        }

        let summary = DocumentSummary {
            document_path: path.to_string(),
            processed_at: Utc::now(),
            entity_count: entities.len(),
            relationship_count: relationships.len(),
            entity_types,
            relationship_types,
        };

        self.store.add_entities(entities)?;
        self.store.add_relationships(relationships)?;

        let key = format!("{}/{}_result.json", RESULTS_PREFIX, path.replace('/', "_"));
        self.objects.put(&key, &serde_json::to_vec(&summary)?)?;

        info!(
            "Processed {path}: {} entities, {} relationships",
            summary.entity_count, summary.relationship_count
        );
        Ok(summary)
    }

    /// Process every document under a prefix
    ///
    /// Each document fails independently; failures are collected into the
    /// batch summary rather than aborting the run.
    pub fn process_all_documents(&self, prefix: Option<&str>) -> Result<BatchSummary> {
        let prefix = prefix.unwrap_or(&self.config.document_prefix);
        let documents = self.source.enumerate(prefix)?;
        info!("Processing {} documents under '{prefix}'", documents.len());

        let mut summary = BatchSummary {
            processed_at: Utc::now(),
            documents_processed: 0,
            entity_count: 0,
            relationship_count: 0,
            errors: Vec::new(),
        };

        for descriptor in &documents {
            match self.process_document(&descriptor.path) {
                Ok(doc) => {
                    summary.documents_processed += 1;
                    summary.entity_count += doc.entity_count;
                    summary.relationship_count += doc.relationship_count;
                }
                Err(e) => {
                    error!("Failed to process {}: {e}", descriptor.path);
                    summary.errors.push(format!("{}: {e}", descriptor.path));
                }
            }
        }

        let key = format!(
            "{}_{}.json",
            SUMMARIES_PREFIX,
            summary.processed_at.format("%Y%m%d%H%M%S")
        );
        self.objects.put(&key, &serde_json::to_vec(&summary)?)?;

        info!(
            "Batch complete: {} processed, {} failed",
            summary.documents_processed,
            summary.errors.len()
        );
        Ok(summary)
    }
}
