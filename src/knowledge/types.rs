//! Core records of the knowledge graph
//!
//! Entities and relationships are strongly typed. Entity identity is
//! deterministic: the same `(lowercase(text), type)` pair always derives
//! the same id, which makes re-ingestion merge instead of duplicate.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use uuid::Uuid;

/// Entity categories tracked across documents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityType {
    /// Individual names
    Person,
    /// Project names, initiatives, products
    Project,
    /// Important technical or business terms
    Term,
    /// Extension point for categories beyond the built-in three
    Other(String),
}

impl EntityType {
    /// Get string representation of the entity type
    pub fn as_str(&self) -> &str {
        match self {
            Self::Person => "PERSON",
            Self::Project => "PROJECT",
            Self::Term => "TERM",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Parse a type string as emitted by the generative model
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PERSON" => Self::Person,
            "PROJECT" => Self::Project,
            "TERM" => Self::Term,
            other => Self::Other(other.to_string()),
        }
    }

    /// Ordering priority used to canonicalize relationship direction
    ///
    /// Lower values are preferred as the relationship source, so a
    /// person/project pair always stores as person -> project no matter
    /// which side was discovered first.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Person => 0,
            Self::Project => 1,
            Self::Term => 2,
            Self::Other(_) => 99,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deterministic entity identifier
///
/// A pure function of `(lowercase(text), type)` via UUIDv5, stable across
/// re-extraction, extraction strategy, and call order.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Derive the id for an entity's normalized text and type
    pub fn derive(text: &str, entity_type: &EntityType) -> Self {
        let name = format!("{}-{}", text.to_lowercase(), entity_type.as_str());
        Self(Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes()))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque relationship identifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RelationshipId(pub Uuid);

impl RelationshipId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named thing extracted from text and tracked across documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Deterministic identifier, see [`EntityId::derive`]
    pub entity_id: EntityId,

    /// Surface text as extracted (original casing preserved)
    pub text: String,

    /// Entity category
    pub entity_type: EntityType,

    /// Extraction-time confidence that this mention is correct and important
    pub relevance: f32,

    /// Fixed-dimension embedding of the entity text, when available
    pub embedding: Option<Vec<f32>>,

    /// Documents this entity was observed in
    pub source_documents: BTreeSet<String>,

    /// Surrounding text snippets for the first few mentions
    pub contexts: Vec<String>,

    /// Open key-value bag for provenance and extension data
    pub metadata: HashMap<String, String>,
}

impl Entity {
    /// Build an entity with its id derived from text and type
    pub fn new(text: impl Into<String>, entity_type: EntityType, relevance: f32) -> Self {
        let text = text.into();
        let entity_id = EntityId::derive(&text, &entity_type);
        Self {
            entity_id,
            text,
            entity_type,
            relevance,
            embedding: None,
            source_documents: BTreeSet::new(),
            contexts: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Surface forms to scan for when locating this entity in text
    ///
    /// The entity text itself, plus the originating email address for
    /// persons derived from one ("John Smith" never appears verbatim in
    /// a document that only mentions `john.smith@example.com`).
    pub fn surface_forms(&self) -> Vec<&str> {
        let mut forms = vec![self.text.as_str()];
        if let Some(email) = self.metadata.get("email") {
            forms.push(email.as_str());
        }
        forms
    }
}

/// Typed association categories between entities
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RelationshipType {
    /// Person -> project
    WorksOn,
    /// Person -> term
    ExpertiseIn,
    /// Project -> term
    Uses,
    /// Fallback for any other co-occurring pair
    RelatedTo,
}

impl RelationshipType {
    /// Get string representation of the relationship type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorksOn => "WORKS_ON",
            Self::ExpertiseIn => "EXPERTISE_IN",
            Self::Uses => "USES",
            Self::RelatedTo => "RELATED_TO",
        }
    }

    /// Relationship type for a canonically ordered pair of entity types
    pub fn for_pair(source: &EntityType, target: &EntityType) -> Self {
        match (source, target) {
            (EntityType::Person, EntityType::Project) => Self::WorksOn,
            (EntityType::Person, EntityType::Term) => Self::ExpertiseIn,
            (EntityType::Project, EntityType::Term) => Self::Uses,
            _ => Self::RelatedTo,
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed, typed association between two entities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Opaque unique id
    pub relationship_id: RelationshipId,

    /// Canonical source entity (lower type priority)
    pub source_entity_id: EntityId,

    /// Canonical target entity
    pub target_entity_id: EntityId,

    /// Type of the source entity
    pub source_type: EntityType,

    /// Type of the target entity
    pub target_type: EntityType,

    /// Association category
    pub relationship_type: RelationshipType,

    /// Proximity-derived confidence in [0, 1]
    pub confidence: f32,
}

impl Relationship {
    /// The identity triple used for deduplication
    pub fn triple(&self) -> (EntityId, EntityId, RelationshipType) {
        (
            self.source_entity_id,
            self.target_entity_id,
            self.relationship_type.clone(),
        )
    }
}
