//! Documented constants for the knowledge pipeline
//!
//! All tunable parameters in one place with justification for their values.
//! Centralizing constants prevents magic numbers and makes tuning easier.

// =============================================================================
// EXTRACTION CONSTANTS
// =============================================================================

/// Maximum characters per generative-model window
///
/// Long documents are split into windows of at most this size before being
/// sent to the generative extraction model. The value leaves comfortable
/// headroom under the context limits of current instruction-tuned models
/// while keeping per-request latency bounded.
pub const MODEL_WINDOW_CHARS: usize = 16_000;

/// Characters of surrounding text captured on each side of an entity mention
pub const CONTEXT_WINDOW_CHARS: usize = 100;

/// Maximum context snippets stored per entity
///
/// Contexts exist to give downstream consumers a feel for how an entity is
/// used, not to archive every mention. Five snippets is enough for that
/// while keeping entity records small.
pub const MAX_CONTEXTS: usize = 5;

/// Relevance assigned to person entities derived from email addresses
pub const EMAIL_PERSON_RELEVANCE: f32 = 0.7;

/// Relevance assigned to project-code matches (e.g. PRJ-123)
pub const PROJECT_CODE_RELEVANCE: f32 = 0.8;

/// Relevance assigned to heuristic term matches (CamelCase, acronyms, ...)
pub const PATTERN_TERM_RELEVANCE: f32 = 0.6;

/// Relevance used when the generative model omits the field
pub const DEFAULT_RELEVANCE: f32 = 0.5;

/// Minimum length for heuristic term matches; shorter strings are noise
pub const MIN_TERM_CHARS: usize = 4;

// =============================================================================
// RELATIONSHIP INFERENCE CONSTANTS
// =============================================================================

/// Character window for proximity-based relationship inference
///
/// Two entities whose nearest mentions are this many characters apart (or
/// more) are not considered related. Confidence decreases linearly from 1.0
/// at distance 0 to 0.0 at this distance.
pub const PROXIMITY_WINDOW_CHARS: usize = 200;

// =============================================================================
// STORE CONSTANTS
// =============================================================================

/// Default dimension of entity embeddings
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;

/// Oversampling factor for vector search
///
/// The index is asked for `top_k * VECTOR_OVERSAMPLE` candidates so that
/// post-filtering by entity type still yields `top_k` accepted matches.
pub const VECTOR_OVERSAMPLE: usize = 3;

/// Minimum text-match score for inclusion in text search results
pub const TEXT_MATCH_THRESHOLD: f32 = 0.1;

// =============================================================================
// STORAGE NAMESPACE
// =============================================================================

/// Key prefix for persisted entity records (`knowledge/entities/<TYPE>/<id>.json`)
pub const ENTITIES_PREFIX: &str = "knowledge/entities";

/// Key prefix for persisted relationship records (`knowledge/relationships/<TYPE>/<id>.json`)
pub const RELATIONSHIPS_PREFIX: &str = "knowledge/relationships";

/// Key of the vector index snapshot blob
pub const INDEX_KEY: &str = "knowledge/index.bin";

/// Key prefix for per-document processing results
pub const RESULTS_PREFIX: &str = "knowledge/processing_results";

/// Key prefix for batch processing summaries
pub const SUMMARIES_PREFIX: &str = "knowledge/processing_summary";
