//! Structured error types for the knowledge pipeline
//!
//! Internal plumbing uses `anyhow::Result`; the orchestrator boundary maps
//! everything into `KnowledgeError` so callers get machine-readable codes.

use std::fmt;

/// Error type surfaced by the orchestrator and store entry points
#[derive(Debug)]
pub enum KnowledgeError {
    // Configuration errors - fatal, no partial processing is attempted
    InvalidConfig { field: String, reason: String },

    // A document could not be loaded or unwrapped
    DocumentLoad { path: String, reason: String },

    // Durable storage failures
    Storage(String),

    // Record or index snapshot could not be (de)serialized
    Serialization(String),

    // Query shape errors (e.g. neither text nor embedding supplied)
    InvalidQuery(String),

    // Embedding dimension does not match the index
    DimensionMismatch { expected: usize, actual: usize },

    // Generic wrapper for external errors
    Internal(anyhow::Error),
}

impl KnowledgeError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::DocumentLoad { .. } => "DOCUMENT_LOAD",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::InvalidQuery(_) => "INVALID_QUERY",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Human-readable error message
    pub fn message(&self) -> String {
        match self {
            Self::InvalidConfig { field, reason } => {
                format!("Invalid configuration for '{field}': {reason}")
            }
            Self::DocumentLoad { path, reason } => {
                format!("Failed to load document '{path}': {reason}")
            }
            Self::Storage(msg) => format!("Storage error: {msg}"),
            Self::Serialization(msg) => format!("Serialization error: {msg}"),
            Self::InvalidQuery(msg) => format!("Invalid query: {msg}"),
            Self::DimensionMismatch { expected, actual } => {
                format!("Embedding dimension mismatch: expected {expected}, got {actual}")
            }
            Self::Internal(err) => format!("Internal error: {err}"),
        }
    }
}

impl fmt::Display for KnowledgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for KnowledgeError {}

impl From<anyhow::Error> for KnowledgeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<serde_json::Error> for KnowledgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Type alias for Results using KnowledgeError
pub type Result<T> = std::result::Result<T, KnowledgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            KnowledgeError::Storage("disk full".to_string()).code(),
            "STORAGE_ERROR"
        );
        assert_eq!(
            KnowledgeError::InvalidConfig {
                field: "store_path".to_string(),
                reason: "empty".to_string()
            }
            .code(),
            "INVALID_CONFIG"
        );
    }

    #[test]
    fn test_messages_carry_context() {
        let err = KnowledgeError::DocumentLoad {
            path: "processed/a.json".to_string(),
            reason: "not found".to_string(),
        };
        assert!(err.message().contains("processed/a.json"));
        assert!(err.message().contains("not found"));
    }

    #[test]
    fn test_from_anyhow() {
        let err: KnowledgeError = anyhow::anyhow!("boom").into();
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
