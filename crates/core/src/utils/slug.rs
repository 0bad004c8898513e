//! URL slug generation.

use deunicode::deunicode_with_tofu;

use crate::errors::Result;

/// Turns a display string into a URL-safe slug.
pub trait SlugGenerator: Send + Sync {
    fn slugify(&self, source: &str) -> String;
}

/// Transliterates to ASCII, lowercases, collapses every run of other characters
/// into a single `-` and trims separators from both ends. Falls back to
/// `"term"` when nothing usable is left.
#[derive(Debug, Clone, Default)]
pub struct DefaultSlugGenerator;

const EMPTY_SLUG: &str = "term";

impl SlugGenerator for DefaultSlugGenerator {
    fn slugify(&self, source: &str) -> String {
        // characters without a transliteration are dropped
        let ascii = deunicode_with_tofu(source, "");
        let mut slug = String::with_capacity(ascii.len());
        let mut pending_dash = false;

        for c in ascii.chars().map(|c| c.to_ascii_lowercase()) {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c);
            } else {
                pending_dash = true;
            }
        }

        if slug.is_empty() {
            EMPTY_SLUG.to_string()
        } else {
            slug
        }
    }
}

/// Returns `base` if it is free, otherwise the first free `base-N` (N from 1).
///
/// `taken` is asked about each candidate in turn.
pub fn unique_slug<F>(base: &str, mut taken: F) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    if !taken(base)? {
        return Ok(base.to_string());
    }

    let mut suffix: u32 = 1;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !taken(&candidate)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_slugify_basic() {
        let slugger = DefaultSlugGenerator;
        assert_eq!(slugger.slugify("Science Fiction"), "science-fiction");
        assert_eq!(slugger.slugify("  Rock & Roll!  "), "rock-roll");
        assert_eq!(slugger.slugify("C++ / Rust"), "c-rust");
    }

    #[test]
    fn test_slugify_transliterates_to_ascii() {
        let slugger = DefaultSlugGenerator;
        assert_eq!(slugger.slugify("Straße"), "strasse");
        assert_eq!(slugger.slugify("Crème Brûlée"), "creme-brulee");
        assert_eq!(slugger.slugify("Über Größe"), "uber-grosse");
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        let slugger = DefaultSlugGenerator;
        assert_eq!(slugger.slugify(""), "term");
        assert_eq!(slugger.slugify("!!!"), "term");
    }

    #[test]
    fn test_unique_slug_appends_suffix() {
        let taken: HashSet<&str> = ["drama", "drama-1"].into_iter().collect();
        let slug = unique_slug("drama", |s| Ok(taken.contains(s))).unwrap();
        assert_eq!(slug, "drama-2");

        let slug = unique_slug("comedy", |s| Ok(taken.contains(s))).unwrap();
        assert_eq!(slug, "comedy");
    }
}
