//! Configuration management for Sangraha
//!
//! All configurable parameters in one place with environment variable
//! overrides. Follows the principle: sensible defaults, configurable in
//! production.

use std::env;
use std::path::PathBuf;
use tracing::info;

use crate::constants::{
    CONTEXT_WINDOW_CHARS, DEFAULT_EMBEDDING_DIMENSION, MAX_CONTEXTS, MODEL_WINDOW_CHARS,
    PROXIMITY_WINDOW_CHARS,
};
use crate::errors::{KnowledgeError, Result};

/// Knowledge pipeline configuration loaded from environment with defaults
#[derive(Debug, Clone)]
pub struct KnowledgeConfig {
    /// Storage path for the embedded object store (default: ./sangraha_data)
    pub store_path: PathBuf,

    /// Root directory of processed documents to ingest (default: ./documents)
    pub documents_path: PathBuf,

    /// Default key prefix for batch document enumeration (default: processed/)
    pub document_prefix: String,

    /// Dimension of entity embeddings (default: 768)
    pub embedding_dimension: usize,

    /// Maximum characters per generative-model extraction window
    pub model_window_chars: usize,

    /// Characters of surrounding text captured per entity mention
    pub context_window_chars: usize,

    /// Maximum context snippets stored per entity
    pub max_contexts: usize,

    /// Character window for proximity-based relationship inference
    pub proximity_window_chars: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("./sangraha_data"),
            documents_path: PathBuf::from("./documents"),
            document_prefix: "processed/".to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            model_window_chars: MODEL_WINDOW_CHARS,
            context_window_chars: CONTEXT_WINDOW_CHARS,
            max_contexts: MAX_CONTEXTS,
            proximity_window_chars: PROXIMITY_WINDOW_CHARS,
        }
    }
}

impl KnowledgeConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("SANGRAHA_STORE_PATH") {
            config.store_path = PathBuf::from(val);
        }

        if let Ok(val) = env::var("SANGRAHA_DOCUMENTS_PATH") {
            config.documents_path = PathBuf::from(val);
        }

        if let Ok(val) = env::var("SANGRAHA_DOCUMENT_PREFIX") {
            config.document_prefix = val;
        }

        if let Ok(val) = env::var("SANGRAHA_EMBEDDING_DIM") {
            if let Ok(n) = val.parse() {
                config.embedding_dimension = n;
            }
        }

        if let Ok(val) = env::var("SANGRAHA_MODEL_WINDOW") {
            if let Ok(n) = val.parse::<usize>() {
                config.model_window_chars = n.max(1);
            }
        }

        if let Ok(val) = env::var("SANGRAHA_PROXIMITY_WINDOW") {
            if let Ok(n) = val.parse::<usize>() {
                config.proximity_window_chars = n.max(1);
            }
        }

        config
    }

    /// Validate required fields; called before any processing is attempted
    pub fn validate(&self) -> Result<()> {
        if self.store_path.as_os_str().is_empty() {
            return Err(KnowledgeError::InvalidConfig {
                field: "store_path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.documents_path.as_os_str().is_empty() {
            return Err(KnowledgeError::InvalidConfig {
                field: "documents_path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.embedding_dimension == 0 {
            return Err(KnowledgeError::InvalidConfig {
                field: "embedding_dimension".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Log the current configuration
    pub fn log(&self) {
        info!("Configuration:");
        info!("   Store: {:?}", self.store_path);
        info!("   Documents: {:?}", self.documents_path);
        info!("   Document prefix: {}", self.document_prefix);
        info!("   Embedding dimension: {}", self.embedding_dimension);
        info!("   Model window: {} chars", self.model_window_chars);
        info!(
            "   Proximity window: {} chars",
            self.proximity_window_chars
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KnowledgeConfig::default();
        assert_eq!(config.embedding_dimension, 768);
        assert_eq!(config.model_window_chars, 16_000);
        assert_eq!(config.document_prefix, "processed/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_override() {
        env::set_var("SANGRAHA_EMBEDDING_DIM", "384");
        env::set_var("SANGRAHA_DOCUMENT_PREFIX", "mail/");

        let config = KnowledgeConfig::from_env();
        assert_eq!(config.embedding_dimension, 384);
        assert_eq!(config.document_prefix, "mail/");

        env::remove_var("SANGRAHA_EMBEDDING_DIM");
        env::remove_var("SANGRAHA_DOCUMENT_PREFIX");
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let config = KnowledgeConfig {
            embedding_dimension: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIG");
    }
}
