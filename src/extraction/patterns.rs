//! Pattern-based entity extraction
//!
//! Deterministic rules that complement the generative strategy: person
//! names recovered from email addresses, project-code tokens, and term
//! heuristics (CamelCase, acronyms, "<word> API/service/platform"
//! phrases). Runs entirely offline and never fails.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::constants::{
    EMAIL_PERSON_RELEVANCE, MIN_TERM_CHARS, PATTERN_TERM_RELEVANCE, PROJECT_CODE_RELEVANCE,
};
use crate::extraction::Candidate;
use crate::knowledge::types::EntityType;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

static PROJECT_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:PRJ|PROJECT|PROJ)-[A-Z0-9]{2,6}\b").unwrap());

/// Term heuristics: CamelCase, acronyms, and API/service/platform phrases
static TERM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b[A-Z][a-z]*[A-Z][a-zA-Z]*\b",
        r"\b[A-Z]{2,}\b",
        r"\b\w+\s+API\b",
        r"\b\w+\s+service\b",
        r"\b\w+\s+platform\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Extract entity candidates using regex patterns and heuristics
pub fn extract_with_patterns(text: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for m in EMAIL_PATTERN.find_iter(text) {
        let email = m.as_str();
        if let Some(name) = person_name_from_email(email) {
            let mut metadata = HashMap::new();
            metadata.insert("email".to_string(), email.to_string());
            candidates.push(Candidate {
                text: name,
                entity_type: EntityType::Person,
                relevance: EMAIL_PERSON_RELEVANCE,
                metadata,
            });
        }
    }

    for m in PROJECT_CODE_PATTERN.find_iter(text) {
        let mut metadata = HashMap::new();
        metadata.insert("is_code".to_string(), "true".to_string());
        candidates.push(Candidate {
            text: m.as_str().to_uppercase(),
            entity_type: EntityType::Project,
            relevance: PROJECT_CODE_RELEVANCE,
            metadata,
        });
    }

    for pattern in TERM_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            let term = m.as_str();
            if term.len() < MIN_TERM_CHARS {
                continue;
            }
            let mut metadata = HashMap::new();
            metadata.insert("pattern".to_string(), pattern.as_str().to_string());
            candidates.push(Candidate {
                text: term.to_string(),
                entity_type: EntityType::Term,
                relevance: PATTERN_TERM_RELEVANCE,
                metadata,
            });
        }
    }

    candidates
}

/// Derive a person name from an email's local part
///
/// `john.smith@example.com` becomes `John Smith`. Accepted only when the
/// local part yields at least two alphabetic tokens; bare handles like
/// `admin@` or `jsmith@` are too ambiguous to name a person.
fn person_name_from_email(email: &str) -> Option<String> {
    let local = email.split('@').next()?;
    let tokens: Vec<&str> = local
        .split(['.', '_', '-'])
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.len() < 2 {
        return None;
    }
    if !tokens
        .iter()
        .all(|t| t.chars().next().is_some_and(|c| c.is_ascii_alphabetic()))
    {
        return None;
    }

    let name = tokens
        .iter()
        .map(|t| title_case(t))
        .collect::<Vec<_>>()
        .join(" ");
    Some(name)
}

fn title_case(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => {
            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_from_dotted_email() {
        let candidates =
            extract_with_patterns("Contact john.smith@example.com for details.");
        let person = candidates
            .iter()
            .find(|c| c.entity_type == EntityType::Person)
            .expect("person candidate");
        assert_eq!(person.text, "John Smith");
        assert_eq!(
            person.metadata.get("email").map(String::as_str),
            Some("john.smith@example.com")
        );
        assert!((person.relevance - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_single_token_email_rejected() {
        let candidates = extract_with_patterns("Mail admin@example.com please.");
        assert!(!candidates
            .iter()
            .any(|c| c.entity_type == EntityType::Person));
    }

    #[test]
    fn test_numeric_local_part_rejected() {
        let candidates = extract_with_patterns("Ticket from 42.7@example.com today.");
        assert!(!candidates
            .iter()
            .any(|c| c.entity_type == EntityType::Person));
    }

    #[test]
    fn test_project_code_uppercased() {
        let candidates = extract_with_patterns("See prj-x17 and PROJECT-AB2 status.");
        let codes: Vec<&str> = candidates
            .iter()
            .filter(|c| c.entity_type == EntityType::Project)
            .map(|c| c.text.as_str())
            .collect();
        assert!(codes.contains(&"PRJ-X17"));
        assert!(codes.contains(&"PROJECT-AB2"));
    }

    #[test]
    fn test_camelcase_and_acronym_terms() {
        let candidates = extract_with_patterns("Deploying PostgreSQL behind the HTTP2 gateway.");
        let terms: Vec<&str> = candidates
            .iter()
            .filter(|c| c.entity_type == EntityType::Term)
            .map(|c| c.text.as_str())
            .collect();
        assert!(terms.contains(&"PostgreSQL"));
    }

    #[test]
    fn test_api_phrase_term() {
        let candidates = extract_with_patterns("The payments API is rate limited.");
        assert!(candidates
            .iter()
            .any(|c| c.entity_type == EntityType::Term && c.text == "payments API"));
    }

    #[test]
    fn test_short_terms_skipped() {
        // "DB" matches the acronym pattern but is below the length floor
        let candidates = extract_with_patterns("Check the DB now.");
        assert!(!candidates.iter().any(|c| c.text == "DB"));
    }

    #[test]
    fn test_no_entities_in_plain_prose() {
        let candidates = extract_with_patterns("the quick brown fox jumps over lazy dogs");
        assert!(candidates.is_empty());
    }
}
