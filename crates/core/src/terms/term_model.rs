//! Domain models for terms.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};
use crate::utils::LocaleMap;

/// A multilingual label, e.g. `{"en": "Drama", "de": "Drama"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub id: i64,
    pub name: LocaleMap,
    pub slug: LocaleMap,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Term {
    pub fn name_in(&self, locale: &str) -> Option<&str> {
        self.name.get(locale).map(String::as_str)
    }

    pub fn slug_in(&self, locale: &str) -> Option<&str> {
        self.slug.get(locale).map(String::as_str)
    }

    /// Name in `locale`, else in `fallback`.
    pub fn translate(&self, locale: &str, fallback: Option<&str>) -> Option<&str> {
        self.name_in(locale)
            .or_else(|| fallback.and_then(|f| self.name_in(f)))
    }

    /// Slug in `locale`, else in `fallback`, else the first slug the term has.
    pub fn slug_for(&self, locale: &str, fallback: Option<&str>) -> Option<&str> {
        self.slug_in(locale)
            .or_else(|| fallback.and_then(|f| self.slug_in(f)))
            .or_else(|| self.slug.values().next().map(String::as_str))
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Data for creating a new term. Slugs are derived by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTerm {
    pub name: LocaleMap,
}

impl NewTerm {
    pub fn new(name: LocaleMap) -> Self {
        Self { name }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }
        for (locale, name) in &self.name {
            if locale.trim().is_empty() || name.trim().is_empty() {
                return Err(ValidationError::InvalidInput(format!(
                    "term name for locale '{}' must not be empty",
                    locale
                ))
                .into());
            }
        }
        Ok(())
    }
}
