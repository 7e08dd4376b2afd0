/*!
 * Content Services
 * Locale-aware CRUD over the site's content tables
 */
pub mod case_studies;
pub mod slug;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

pub use case_studies::{CaseStudyInput, CaseStudyService, DeleteOutcome};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Missing required fields: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Could not allocate a unique slug for `{0}`")]
    SlugExhausted(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Sanitize HTML content using ammonia
pub fn sanitize_html(html: &str) -> String {
    ammonia::clean(html)
}

/// Identifiers that stale dashboard state sends instead of a real id.
pub fn is_placeholder_identifier(identifier: &str) -> bool {
    let identifier = identifier.trim();
    identifier.is_empty()
        || identifier.eq_ignore_ascii_case("undefined")
        || identifier.eq_ignore_ascii_case("null")
}

/// Trimmed non-empty string, or `None`.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Names from `required` whose value is missing or blank.
pub fn missing_fields(required: &[(&str, &Option<String>)]) -> Vec<String> {
    required
        .iter()
        .filter(|(_, value)| non_empty(value).is_none())
        .map(|(name, _)| (*name).to_string())
        .collect()
}

/// Accepts `"2024"` or `2024` for text columns the dashboard sometimes
/// sends as numbers.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_identifiers() {
        assert!(is_placeholder_identifier(""));
        assert!(is_placeholder_identifier("  "));
        assert!(is_placeholder_identifier("undefined"));
        assert!(is_placeholder_identifier("NULL"));
        assert!(!is_placeholder_identifier("lumina-fashion"));
    }

    #[test]
    fn test_sanitize_html_strips_scripts() {
        let cleaned = sanitize_html("<p>Hi</p><script>alert(1)</script>");
        assert_eq!(cleaned, "<p>Hi</p>");
    }
}
