//! Runtime configuration for the taxonomy services.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub const DEFAULT_LOCALE: &str = "en";

/// Upper bound on parent links followed when walking a taxonomy tree.
pub const DEFAULT_MAX_ANCESTOR_DEPTH: usize = 64;

pub const ENV_DEFAULT_LOCALE: &str = "TAXONOMIES_DEFAULT_LOCALE";
pub const ENV_FALLBACK_LOCALE: &str = "TAXONOMIES_FALLBACK_LOCALE";
pub const ENV_MAX_ANCESTOR_DEPTH: &str = "TAXONOMIES_MAX_ANCESTOR_DEPTH";
pub const ENV_ALLOWED_TYPES: &str = "TAXONOMIES_ALLOWED_TYPES";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxonomyConfig {
    /// Locale used when a caller does not pass one explicitly.
    pub default_locale: String,
    /// Locale consulted when a term has no translation for the requested one.
    pub fallback_locale: Option<String>,
    pub max_ancestor_depth: usize,
    /// Known taxable type tags. Empty accepts any type.
    pub allowed_taxable_types: Vec<String>,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            default_locale: DEFAULT_LOCALE.to_string(),
            fallback_locale: None,
            max_ancestor_depth: DEFAULT_MAX_ANCESTOR_DEPTH,
            allowed_taxable_types: Vec::new(),
        }
    }
}

impl TaxonomyConfig {
    /// Builds a configuration from `TAXONOMIES_*` environment variables,
    /// keeping defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`TaxonomyConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(locale) = non_empty(lookup(ENV_DEFAULT_LOCALE)) {
            config.default_locale = locale;
        }

        config.fallback_locale = non_empty(lookup(ENV_FALLBACK_LOCALE));

        if let Some(depth) = non_empty(lookup(ENV_MAX_ANCESTOR_DEPTH)) {
            config.max_ancestor_depth = depth.parse::<usize>().map_err(|e| {
                Error::InvalidConfigValue(format!("{}='{}': {}", ENV_MAX_ANCESTOR_DEPTH, depth, e))
            })?;
        }

        if let Some(types) = non_empty(lookup(ENV_ALLOWED_TYPES)) {
            config.allowed_taxable_types = types
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_locale.trim().is_empty() {
            return Err(Error::InvalidConfigValue(
                "default locale must not be empty".to_string(),
            ));
        }
        if self.max_ancestor_depth == 0 {
            return Err(Error::InvalidConfigValue(
                "max ancestor depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
