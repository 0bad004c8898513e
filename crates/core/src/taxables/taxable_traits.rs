//! Traits for the association store, the tagging capability and the service
//! that hands it out.

use async_trait::async_trait;
use serde_json::Value;

use crate::taxonomies::{Taxonomy, TaxonomyField};
use crate::terms::Term;
use crate::utils::TermInput;
use crate::Result;

use super::{
    EntityTaxonomies, LinkOutcome, NewTaxableLink, TaxableLink, TaxableQuery,
    TaxableRef, TermAttachment,
};

/// Association store between taxonomies and tagged entities.
#[async_trait]
pub trait TaxableRepositoryTrait: Send + Sync {
    fn get_link(&self, taxonomy_id: i64, taxable: &TaxableRef) -> Result<Option<TaxableLink>>;

    /// The entity's links in attachment order.
    fn get_links(&self, taxable: &TaxableRef) -> Result<Vec<TaxableLink>>;

    /// Ids of the taxonomies linked to the entity, in attachment order.
    fn get_taxonomy_ids(&self, taxable: &TaxableRef) -> Result<Vec<i64>>;

    /// Entities linked to a taxonomy, optionally of one type only.
    fn get_taxables(&self, taxonomy_id: i64, taxable_type: Option<&str>)
        -> Result<Vec<TaxableRef>>;

    /// Ids of entities of `taxable_type` that, for every clause, are linked to
    /// at least one of the clause's taxonomy ids. Sorted ascending.
    fn find_taxable_ids(&self, taxable_type: &str, clauses: &[Vec<i64>]) -> Result<Vec<i64>>;

    fn count_links(&self, taxonomy_id: i64) -> Result<i64>;

    /// Returns the existing row when the pair is already linked; otherwise
    /// inserts it and increments the taxonomy's count in the same unit.
    async fn link(&self, new_link: NewTaxableLink) -> Result<LinkOutcome>;

    /// Returns the number of rows removed. Counts are left untouched.
    async fn unlink(&self, taxonomy_id: i64, taxable: &TaxableRef) -> Result<usize>;

    /// Removes every link of the entity. Counts are left untouched.
    async fn unlink_all(&self, taxable: &TaxableRef) -> Result<usize>;
}

/// Tagging operations of one entity.
#[async_trait]
pub trait HasTaxonomies: Send + Sync {
    fn taxable(&self) -> &TaxableRef;

    /// Adds one term, or each term of a sequence in order. Items already
    /// processed stay committed when a later one fails.
    async fn add_term(
        &self,
        term: TermInput,
        taxonomy: &str,
        parent: i64,
        order: i32,
    ) -> Result<Vec<TermAttachment>>;

    /// Attaches the entity to an existing taxonomy. Returns false when the
    /// taxonomy does not exist or is already attached.
    async fn set_category(&self, taxonomy_id: i64, order: i32) -> Result<bool>;

    /// Attached taxonomies in attachment order.
    fn get_taxonomies(&self) -> Result<Vec<Taxonomy>>;

    fn get_taxonomies_by(&self, field: TaxonomyField) -> Result<Vec<Value>>;

    fn get_links(&self) -> Result<Vec<TaxableLink>>;

    /// Distinct terms of the attached taxonomies, ordered by id.
    fn get_terms(&self, taxonomy: Option<&str>) -> Result<Vec<Term>>;

    /// One entry per term, `None` where the term has no name in the locale or
    /// its fallback. `None` overall when the entity has no terms.
    fn get_term_names(
        &self,
        taxonomy: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Option<Vec<Option<String>>>>;

    fn get_term(
        &self,
        term_name: &str,
        taxonomy: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Option<Term>>;

    fn has_term(&self, term_name: &str, taxonomy: Option<&str>, locale: Option<&str>)
        -> Result<bool>;

    /// `Ok(None)` when the entity does not carry the term.
    async fn remove_term(
        &self,
        term_name: &str,
        taxonomy: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Option<usize>>;

    async fn remove_all_terms(&self) -> Result<usize>;
}

#[async_trait]
pub trait TaxableServiceTrait: Send + Sync {
    fn for_entity(&self, taxable: TaxableRef) -> Result<EntityTaxonomies>;

    /// Entities linked to a taxonomy, optionally of one type only.
    fn get_taxables(&self, taxonomy_id: i64, taxable_type: Option<&str>)
        -> Result<Vec<TaxableRef>>;

    /// Resolves every clause into the set of taxonomy ids it accepts.
    fn resolve_scopes(&self, query: &TaxableQuery) -> Result<Vec<Vec<i64>>>;

    /// Ids of the entities matching the query. An unfiltered query matches
    /// every tagged entity of the type.
    fn find_taxable_ids(&self, query: &TaxableQuery) -> Result<Vec<i64>>;

    /// Deletes every link of an entity being removed by the host.
    async fn forget(&self, taxable: &TaxableRef) -> Result<usize>;
}
