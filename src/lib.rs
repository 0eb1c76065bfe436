//! Sangraha Library
//!
//! Builds and queries a knowledge graph of entities (people, projects,
//! terms) and their relationships, extracted from ingested documents and
//! email threads.
//!
//! # Pipeline
//! - Dual-strategy entity extraction (generative model + deterministic patterns)
//! - Proximity-based relationship inference
//! - Deduplicating knowledge store with a vector similarity index
//! - Durable persistence over an embedded object store (RocksDB)
//!
//! # Design
//! - Entity identity is a pure function of `(lowercase(text), type)`;
//!   re-ingesting a document merges instead of duplicating
//! - Extraction never aborts: a failing collaborator degrades its
//!   strategy to an empty contribution
//! - Store state is an explicit object owned by the orchestrator,
//!   hydrated from durable storage at startup

pub mod config;
pub mod constants;
pub mod errors;
pub mod extraction;
pub mod inference;
pub mod knowledge;
pub mod models;
pub mod processor;
pub mod sources;
pub mod storage;
pub mod tracing_setup;

// Re-export dependencies to ensure tests use the same version
pub use chrono;
pub use parking_lot;
pub use uuid;
