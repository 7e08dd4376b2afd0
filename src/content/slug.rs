//! URL slugs for content records.

use regex::Regex;

lazy_static::lazy_static! {
    /// Valid slug pattern: lowercase letters, numbers, and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();

    /// Runs of anything that may not appear in a slug
    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Slug used when a title has no ASCII letters or digits (e.g. Arabic-only).
pub const FALLBACK_SLUG: &str = "case-study";

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

/// Lowercases, turns every run of non-alphanumerics into one hyphen and trims
/// hyphens from both ends. May return an empty string.
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    NON_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// [`slugify`], or [`FALLBACK_SLUG`] when nothing survives.
pub fn slug_or_fallback(input: &str) -> String {
    let slug = slugify(input);
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// `base`, then `base-1`, `base-2`, ...
pub fn candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic_title() {
        assert_eq!(slugify("Lumina Fashion"), "lumina-fashion");
        assert_eq!(slugify("  Hello,   World!! "), "hello-world");
        assert_eq!(slugify("--Brand & Co.--2024"), "brand-co-2024");
    }

    #[test]
    fn test_slugify_is_idempotent_and_valid() {
        for title in ["Lumina Fashion", "A/B -- test", "Ünïcode Café 9", "x"] {
            let once = slugify(title);
            assert_eq!(slugify(&once), once);
            assert!(is_valid_slug(&once), "{:?} -> {:?}", title, once);
        }
    }

    #[test]
    fn test_non_ascii_title_falls_back() {
        assert_eq!(slugify("لومينا"), "");
        assert_eq!(slug_or_fallback("لومينا"), FALLBACK_SLUG);
    }

    #[test]
    fn test_candidates() {
        assert_eq!(candidate("lumina-fashion", 0), "lumina-fashion");
        assert_eq!(candidate("lumina-fashion", 2), "lumina-fashion-2");
    }

    #[test]
    fn test_invalid_slugs() {
        assert!(!is_valid_slug("Has Caps"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("double--hyphen"));
        assert!(!is_valid_slug(""));
    }
}
