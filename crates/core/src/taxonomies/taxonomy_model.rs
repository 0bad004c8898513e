//! Domain models for taxonomies.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Error, ValidationError};
use crate::terms::Term;

/// `parent` value of a taxonomy at the top of a tree.
pub const ROOT_PARENT: i64 = 0;

/// A term placed under a named classification (e.g. "category"), optionally
/// nested under a parent taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxonomy {
    pub id: i64,
    pub term_id: i64,
    pub taxonomy: String,
    pub description: Option<String>,
    pub parent: i64,
    /// Number of associations created so far. Never decremented implicitly.
    pub count: u32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Taxonomy {
    pub fn is_root(&self) -> bool {
        self.parent == ROOT_PARENT
    }

    /// Projects a single field, as used by `get_taxonomies_by`.
    pub fn field(&self, field: TaxonomyField) -> Value {
        match field {
            TaxonomyField::Id => Value::from(self.id),
            TaxonomyField::TermId => Value::from(self.term_id),
            TaxonomyField::Taxonomy => Value::from(self.taxonomy.clone()),
            TaxonomyField::Description => self
                .description
                .clone()
                .map(Value::from)
                .unwrap_or(Value::Null),
            TaxonomyField::Parent => Value::from(self.parent),
            TaxonomyField::Count => Value::from(self.count),
            TaxonomyField::CreatedAt => Value::from(self.created_at.to_string()),
            TaxonomyField::UpdatedAt => Value::from(self.updated_at.to_string()),
        }
    }
}

/// Data for creating a new taxonomy. `count` always starts at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaxonomy {
    pub term_id: i64,
    pub taxonomy: String,
    pub description: Option<String>,
    pub parent: i64,
}

impl NewTaxonomy {
    pub fn new(term_id: i64, taxonomy: impl Into<String>) -> Self {
        Self {
            term_id,
            taxonomy: taxonomy.into(),
            description: None,
            parent: ROOT_PARENT,
        }
    }

    pub fn with_parent(mut self, parent: i64) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.taxonomy.trim().is_empty() {
            return Err(ValidationError::MissingField("taxonomy".to_string()).into());
        }
        if self.parent < ROOT_PARENT {
            return Err(ValidationError::InvalidInput(format!(
                "parent must be {} or a taxonomy id, got {}",
                ROOT_PARENT, self.parent
            ))
            .into());
        }
        Ok(())
    }
}

/// A taxonomy together with its owning term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyWithTerm {
    pub taxonomy: Taxonomy,
    pub term: Term,
}

/// Columns that can be projected from a taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyField {
    #[default]
    Id,
    TermId,
    Taxonomy,
    Description,
    Parent,
    Count,
    CreatedAt,
    UpdatedAt,
}

impl TaxonomyField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyField::Id => "id",
            TaxonomyField::TermId => "term_id",
            TaxonomyField::Taxonomy => "taxonomy",
            TaxonomyField::Description => "description",
            TaxonomyField::Parent => "parent",
            TaxonomyField::Count => "count",
            TaxonomyField::CreatedAt => "created_at",
            TaxonomyField::UpdatedAt => "updated_at",
        }
    }
}

impl fmt::Display for TaxonomyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxonomyField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(TaxonomyField::Id),
            "term_id" => Ok(TaxonomyField::TermId),
            "taxonomy" => Ok(TaxonomyField::Taxonomy),
            "description" => Ok(TaxonomyField::Description),
            "parent" => Ok(TaxonomyField::Parent),
            "count" => Ok(TaxonomyField::Count),
            "created_at" => Ok(TaxonomyField::CreatedAt),
            "updated_at" => Ok(TaxonomyField::UpdatedAt),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown taxonomy field '{}'",
                other
            ))
            .into()),
        }
    }
}
