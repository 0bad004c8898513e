//! Registry of the entity type tags allowed to carry taxonomies.

use std::collections::BTreeSet;

use crate::errors::{Result, ValidationError};

/// An empty registry accepts every type tag.
#[derive(Debug, Clone, Default)]
pub struct TaxableTypeRegistry {
    types: BTreeSet<String>,
}

impl TaxableTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn register(&mut self, taxable_type: impl Into<String>) {
        self.types.insert(taxable_type.into());
    }

    pub fn is_open(&self) -> bool {
        self.types.is_empty()
    }

    pub fn contains(&self, taxable_type: &str) -> bool {
        self.is_open() || self.types.contains(taxable_type)
    }

    pub fn ensure_known(&self, taxable_type: &str) -> Result<()> {
        if taxable_type.trim().is_empty() {
            return Err(ValidationError::MissingField("taxable_type".to_string()).into());
        }
        if !self.contains(taxable_type) {
            return Err(ValidationError::UnknownTaxableType(taxable_type.to_string()).into());
        }
        Ok(())
    }
}
