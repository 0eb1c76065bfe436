//! Model-based entity extraction
//!
//! Sends bounded windows of text to the generative model with a structured
//! extraction prompt and parses the JSON it returns. Parsing is lenient:
//! markdown fences are stripped, unknown fields ignored, and a window whose
//! response cannot be parsed simply contributes nothing.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::constants::DEFAULT_RELEVANCE;
use crate::extraction::chunking::split_windows;
use crate::extraction::Candidate;
use crate::knowledge::types::EntityType;
use crate::models::GenerativeModel;

static MARKDOWN_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?").unwrap());

/// Extract entity candidates using the generative model
///
/// Text is split into windows of at most `window_chars` characters; each
/// window is one model call. A failed call or unparseable response drops
/// that window's contribution, never the whole extraction.
pub fn extract_with_model(
    model: &dyn GenerativeModel,
    text: &str,
    window_chars: usize,
) -> Vec<Candidate> {
    let windows = split_windows(text, window_chars);
    let total = windows.len();
    let mut candidates = Vec::new();

    for (window_idx, window) in windows.into_iter().enumerate() {
        debug!("Running entity extraction on window {}/{}", window_idx + 1, total);

        let response = match model.complete(&extraction_prompt(window)) {
            Ok(response) => response,
            Err(e) => {
                warn!("Generative extraction failed for window {}: {e}", window_idx + 1);
                continue;
            }
        };

        match parse_model_response(&response) {
            Some(parsed) => {
                for mut candidate in parsed {
                    candidate
                        .metadata
                        .insert("window".to_string(), window_idx.to_string());
                    candidates.push(candidate);
                }
            }
            None => {
                warn!(
                    "Unparseable extraction response for window {} ({} bytes), dropping",
                    window_idx + 1,
                    response.len()
                );
            }
        }
    }

    candidates
}

/// Build the structured-extraction prompt for one window of text
fn extraction_prompt(window: &str) -> String {
    format!(
        r#"Extract the entities from the following text. Only extract PERSON (individual names), PROJECT (project names, initiatives, products), and TERM (important technical or business terms).

Format your response as a JSON array, where each item is an object with "text", "type", and "relevance" (a score from 0.0 to 1.0 indicating confidence and importance).

Example:
[
    {{"text": "John Smith", "type": "PERSON", "relevance": 0.85}},
    {{"text": "Cloud Migration", "type": "PROJECT", "relevance": 0.95}},
    {{"text": "Kubernetes", "type": "TERM", "relevance": 0.78}}
]

Text:
{window}

JSON Result:
"#
    )
}

/// Best-effort parse of the model's JSON response
///
/// Returns `None` when the response holds no JSON array at all; individual
/// malformed items are skipped.
fn parse_model_response(response: &str) -> Option<Vec<Candidate>> {
    let cleaned = MARKDOWN_FENCE.replace_all(response.trim(), "");
    let value: Value = serde_json::from_str(cleaned.trim()).ok()?;
    let items = value.as_array()?;

    let mut candidates = Vec::new();
    for item in items {
        let Some(text) = item.get("text").and_then(Value::as_str) else {
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        let Some(type_str) = item.get("type").and_then(Value::as_str) else {
            continue;
        };
        // The prompt asks for three categories, but a model that volunteers
        // another one still names a real thing; keep it as an open-ended type
        let entity_type = EntityType::parse(type_str);

        let relevance = item
            .get("relevance")
            .and_then(Value::as_f64)
            .map(|r| r as f32)
            .unwrap_or(DEFAULT_RELEVANCE)
            .clamp(0.0, 1.0);

        candidates.push(Candidate {
            text: text.trim().to_string(),
            entity_type,
            relevance,
            metadata: HashMap::new(),
        });
    }

    Some(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
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
            Err(anyhow!("model unreachable"))
        }
    }

    #[test]
    fn test_parse_clean_json() {
        let response = r#"[{"text": "John Smith", "type": "PERSON", "relevance": 0.85}]"#;
        let parsed = parse_model_response(response).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "John Smith");
        assert_eq!(parsed[0].entity_type, EntityType::Person);
        assert!((parsed[0].relevance - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_parse_strips_markdown_fences() {
        let response = "```json\n[{\"text\": \"Kubernetes\", \"type\": \"TERM\"}]\n```";
        let parsed = parse_model_response(response).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].entity_type, EntityType::Term);
        // Missing relevance falls back to the default
        assert!((parsed[0].relevance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_parse_skips_malformed_items() {
        let response = r#"[
            {"text": "Cloud Migration", "type": "PROJECT", "relevance": 0.9},
            {"type": "PERSON"},
            {"text": "", "type": "TERM"}
        ]"#;
        let parsed = parse_model_response(response).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "Cloud Migration");
    }

    #[test]
    fn test_parse_keeps_model_supplied_types() {
        let response = r#"[{"text": "Berlin", "type": "location", "relevance": 0.7}]"#;
        let parsed = parse_model_response(response).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(
            parsed[0].entity_type,
            EntityType::Other("LOCATION".to_string())
        );
    }

    #[test]
    fn test_parse_clamps_relevance() {
        let response = r#"[{"text": "X9000", "type": "TERM", "relevance": 3.5}]"#;
        let parsed = parse_model_response(response).unwrap();
        assert!((parsed[0].relevance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(parse_model_response("I could not find any entities.").is_none());
        assert!(parse_model_response(r#"{"text": "x"}"#).is_none());
    }

    #[test]
    fn test_failing_model_contributes_nothing() {
        let candidates = extract_with_model(&FailingModel, "some document text", 16_000);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_window_index_recorded() {
        let model = ScriptedModel(
            r#"[{"text": "Gateway", "type": "PROJECT", "relevance": 0.6}]"#.to_string(),
        );
        let text = "x".repeat(150);
        let candidates = extract_with_model(&model, &text, 100);
        // Two windows, one candidate each
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].metadata.get("window").unwrap(), "0");
        assert_eq!(candidates[1].metadata.get("window").unwrap(), "1");
    }
}
