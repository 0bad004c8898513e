//! Domain models for taxable links and entity scopes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::taxonomies::Taxonomy;
use crate::terms::Term;
use crate::errors::ValidationError;
use crate::Result;

use super::{EntityTaxonomies, TaxableServiceTrait};

/// Polymorphic reference to a tagged entity: a stable type tag plus its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxableRef {
    pub taxable_type: String,
    pub taxable_id: i64,
}

impl TaxableRef {
    pub fn new(taxable_type: impl Into<String>, taxable_id: i64) -> Self {
        Self {
            taxable_type: taxable_type.into(),
            taxable_id,
        }
    }
}

impl fmt::Display for TaxableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.taxable_type, self.taxable_id)
    }
}

/// Implemented by host entity types that can be tagged.
pub trait Taxable {
    fn taxable_ref(&self) -> TaxableRef;

    /// The entity's tagging capability.
    fn taxonomies(&self, service: &dyn TaxableServiceTrait) -> Result<EntityTaxonomies> {
        service.for_entity(self.taxable_ref())
    }
}

impl Taxable for TaxableRef {
    fn taxable_ref(&self) -> TaxableRef {
        self.clone()
    }
}

/// One association row. `id` only records attachment order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxableLink {
    pub id: i64,
    pub taxonomy_id: i64,
    pub taxable_type: String,
    pub taxable_id: Option<i64>,
    pub order: i32,
}

impl TaxableLink {
    pub fn taxable_ref(&self) -> Option<TaxableRef> {
        self.taxable_id
            .map(|id| TaxableRef::new(self.taxable_type.clone(), id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaxableLink {
    pub taxonomy_id: i64,
    pub taxable: TaxableRef,
    pub order: i32,
}

impl NewTaxableLink {
    pub fn new(taxonomy_id: i64, taxable: TaxableRef) -> Self {
        Self {
            taxonomy_id,
            taxable,
            order: 0,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.taxable.taxable_type.trim().is_empty() {
            return Err(ValidationError::MissingField("taxable_type".to_string()).into());
        }
        if self.order < 0 {
            return Err(ValidationError::InvalidInput(format!(
                "order must not be negative, got {}",
                self.order
            ))
            .into());
        }
        Ok(())
    }
}

/// Result of `link`: the row, and whether this call inserted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub link: TaxableLink,
    pub created: bool,
}

/// Result of adding one term to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermAttachment {
    pub term: Term,
    pub taxonomy: Taxonomy,
    /// False when the entity already carried this term in this taxonomy.
    pub attached: bool,
}

/// One filter applied to a set of entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ScopeClause {
    /// Entities carrying the named term under any taxonomy.
    Term {
        name: String,
        taxonomy: String,
        locale: Option<String>,
    },
    /// Entities linked to the taxonomy of the named term.
    Tax {
        name: String,
        taxonomy: String,
        locale: Option<String>,
    },
    Category { taxonomy_id: i64 },
    /// Entities linked to at least one of the ids.
    Categories { taxonomy_ids: Vec<i64> },
}

/// Composable filter over entities of one type. Clauses are AND-ed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxableQuery {
    pub taxable_type: String,
    pub clauses: Vec<ScopeClause>,
}

impl TaxableQuery {
    pub fn new(taxable_type: impl Into<String>) -> Self {
        Self {
            taxable_type: taxable_type.into(),
            clauses: Vec::new(),
        }
    }

    pub fn with_term(self, name: impl Into<String>, taxonomy: impl Into<String>) -> Self {
        self.with_term_in(name, taxonomy, None)
    }

    pub fn with_term_in(
        mut self,
        name: impl Into<String>,
        taxonomy: impl Into<String>,
        locale: Option<&str>,
    ) -> Self {
        self.clauses.push(ScopeClause::Term {
            name: name.into(),
            taxonomy: taxonomy.into(),
            locale: locale.map(str::to_string),
        });
        self
    }

    /// Each term narrows the result further.
    pub fn with_terms<I, S>(self, names: I, taxonomy: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .fold(self, |query, name| query.with_term(name, taxonomy))
    }

    pub fn with_tax(
        mut self,
        name: impl Into<String>,
        taxonomy: impl Into<String>,
        locale: Option<&str>,
    ) -> Self {
        self.clauses.push(ScopeClause::Tax {
            name: name.into(),
            taxonomy: taxonomy.into(),
            locale: locale.map(str::to_string),
        });
        self
    }

    pub fn has_category(mut self, taxonomy_id: i64) -> Self {
        self.clauses.push(ScopeClause::Category { taxonomy_id });
        self
    }

    pub fn has_categories(mut self, taxonomy_ids: impl Into<Vec<i64>>) -> Self {
        self.clauses.push(ScopeClause::Categories {
            taxonomy_ids: taxonomy_ids.into(),
        });
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.clauses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_terms_adds_one_clause_per_term() {
        let query = TaxableQuery::new("post").with_terms(["Fiction", "Drama"], "category");
        assert_eq!(query.clauses.len(), 2);
        assert!(matches!(
            &query.clauses[1],
            ScopeClause::Term { name, taxonomy, locale: None } if name == "Drama" && taxonomy == "category"
        ));
    }

    #[test]
    fn test_new_link_validation() {
        let post = TaxableRef::new("post", 1);
        assert!(NewTaxableLink::new(1, post.clone()).with_order(2).validate().is_ok());
        assert!(NewTaxableLink::new(1, post).with_order(-1).validate().is_err());
        assert!(NewTaxableLink::new(1, TaxableRef::new(" ", 1)).validate().is_err());
    }

    #[test]
    fn test_link_reference() {
        let link = TaxableLink {
            id: 1,
            taxonomy_id: 2,
            taxable_type: "post".to_string(),
            taxable_id: Some(5),
            order: 0,
        };
        assert_eq!(link.taxable_ref(), Some(TaxableRef::new("post", 5)));
        assert_eq!(TaxableRef::new("post", 5).to_string(), "post#5");
    }
}
