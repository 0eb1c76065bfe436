//! Document sources
//!
//! Upstream document processing (OCR, spreadsheet parsing) happens outside
//! this crate and delivers its output as files under a hierarchical
//! namespace. This module enumerates and reads those files and unwraps the
//! processor's JSON envelope into plain text for extraction.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Descriptor for an enumerable document
#[derive(Debug, Clone)]
pub struct DocumentDescriptor {
    /// Path relative to the source root, using `/` separators
    pub path: String,
    /// Size in bytes
    pub size: u64,
}

/// A source of processed documents
pub trait DocumentSource: Send + Sync {
    /// List documents whose path starts with `prefix`
    fn enumerate(&self, prefix: &str) -> Result<Vec<DocumentDescriptor>>;

    /// Read a document's raw content as text
    fn read(&self, path: &str) -> Result<String>;
}

/// Filesystem-backed document source rooted at a directory
pub struct FsDocumentSource {
    root: PathBuf,
}

impl FsDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn walk(&self, dir: &Path, out: &mut Vec<DocumentDescriptor>) -> Result<()> {
        for entry in fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory {:?}", dir))?
        {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.walk(&path, out)?;
            } else {
                let relative = path
                    .strip_prefix(&self.root)
                    .unwrap_or(&path)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                out.push(DocumentDescriptor {
                    path: relative,
                    size,
                });
            }
        }
        Ok(())
    }
}

impl DocumentSource for FsDocumentSource {
    fn enumerate(&self, prefix: &str) -> Result<Vec<DocumentDescriptor>> {
        let mut documents = Vec::new();
        if self.root.is_dir() {
            self.walk(&self.root.clone(), &mut documents)?;
        }
        documents.retain(|d| d.path.starts_with(prefix));
        documents.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(documents)
    }

    fn read(&self, path: &str) -> Result<String> {
        fs::read_to_string(self.root.join(path))
            .with_context(|| format!("Failed to read document '{path}'"))
    }
}

/// Unwrap a document-processor JSON envelope into plain text
///
/// Handles the three shapes the upstream processor emits:
/// - `text_content` as a string or array of strings
/// - `sheets[]` with tabular `data` rows, flattened to line-oriented text
/// - anything else is re-serialized as text
pub fn unwrap_json_document(raw: &str) -> Result<String> {
    let value: Value =
        serde_json::from_str(raw).context("Document is not valid JSON")?;

    if let Some(text_content) = value.get("text_content") {
        return Ok(match text_content {
            Value::Array(parts) => parts
                .iter()
                .map(|p| match p {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
    }

    if let Some(Value::Array(sheets)) = value.get("sheets") {
        let mut lines = Vec::new();
        for sheet in sheets {
            let name = sheet
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Unknown Sheet");
            lines.push(format!("Sheet: {name}"));

            if let Some(Value::Array(rows)) = sheet.get("data") {
                for row in rows {
                    lines.push(row.to_string());
                }
            }
        }
        return Ok(lines.join("\n"));
    }

    Ok(serde_json::to_string_pretty(&value)?)
}

/// Load a document's text content, unwrapping JSON envelopes
pub fn load_document_text(source: &dyn DocumentSource, path: &str) -> Result<String> {
    let raw = source.read(path)?;
    if path.ends_with(".json") {
        unwrap_json_document(&raw)
    } else {
        Ok(raw)
    }
}
