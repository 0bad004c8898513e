//! Locale maps and the active-locale provider.

use std::collections::BTreeMap;

use crate::config::TaxonomyConfig;
use crate::errors::Result;

/// Mapping from locale code to a translated string.
///
/// A `BTreeMap` keeps keys sorted, so its JSON form is canonical and can be
/// compared byte-for-byte in the store.
pub type LocaleMap = BTreeMap<String, String>;

/// Serializes a locale map to its canonical JSON text.
pub fn canonical_json(map: &LocaleMap) -> Result<String> {
    Ok(serde_json::to_string(map)?)
}

/// Supplies the locale of the current request or context.
pub trait LocaleProvider: Send + Sync {
    fn current_locale(&self) -> String;

    fn fallback_locale(&self) -> Option<String> {
        None
    }

    /// Returns `locale` when given, otherwise the current locale.
    fn resolve(&self, locale: Option<&str>) -> String {
        match locale {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => self.current_locale(),
        }
    }
}

/// Locale provider with fixed values, usually built from [`TaxonomyConfig`].
#[derive(Debug, Clone)]
pub struct StaticLocaleProvider {
    current: String,
    fallback: Option<String>,
}

impl StaticLocaleProvider {
    pub fn new(current: impl Into<String>, fallback: Option<String>) -> Self {
        Self {
            current: current.into(),
            fallback,
        }
    }

    pub fn from_config(config: &TaxonomyConfig) -> Self {
        Self::new(config.default_locale.clone(), config.fallback_locale.clone())
    }
}

impl LocaleProvider for StaticLocaleProvider {
    fn current_locale(&self) -> String {
        self.current.clone()
    }

    fn fallback_locale(&self) -> Option<String> {
        self.fallback.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_json_ignores_insertion_order() {
        let mut a = LocaleMap::new();
        a.insert("en".to_string(), "Drama".to_string());
        a.insert("de".to_string(), "Drama".to_string());

        let mut b = LocaleMap::new();
        b.insert("de".to_string(), "Drama".to_string());
        b.insert("en".to_string(), "Drama".to_string());

        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
        assert_eq!(
            canonical_json(&a).unwrap(),
            r#"{"de":"Drama","en":"Drama"}"#
        );
    }

    #[test]
    fn test_resolve_prefers_explicit_locale() {
        let provider = StaticLocaleProvider::new("en", Some("de".to_string()));
        assert_eq!(provider.resolve(Some("fr")), "fr");
        assert_eq!(provider.resolve(Some("")), "en");
        assert_eq!(provider.resolve(None), "en");
        assert_eq!(provider.fallback_locale().as_deref(), Some("de"));
    }
}
