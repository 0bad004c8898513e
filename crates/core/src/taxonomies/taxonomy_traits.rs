//! Traits for taxonomy repository and service.

use async_trait::async_trait;

use crate::terms::Term;
use crate::utils::TermInput;
use crate::Result;

use super::{NewTaxonomy, Taxonomy, TaxonomyWithTerm};

/// Repository trait for taxonomy persistence operations.
///
/// Every lookup ignores soft-deleted rows.
#[async_trait]
pub trait TaxonomyRepositoryTrait: Send + Sync {
    fn get_taxonomy(&self, id: i64) -> Result<Option<Taxonomy>>;

    /// Taxonomies with the given ids, ordered by id.
    fn get_taxonomies(&self, ids: &[i64]) -> Result<Vec<Taxonomy>>;

    fn find_taxonomy(&self, term_id: i64, taxonomy: &str, parent: i64)
        -> Result<Option<Taxonomy>>;

    /// All taxonomies owned by a term, ordered by id.
    fn get_taxonomies_by_term(&self, term_id: i64) -> Result<Vec<Taxonomy>>;

    /// All taxonomies with the given classification name, ordered by id.
    fn get_taxonomies_by_name(&self, taxonomy: &str) -> Result<Vec<Taxonomy>>;

    fn get_children(&self, parent_id: i64) -> Result<Vec<Taxonomy>>;

    /// Taxonomies whose term is named exactly `term_name` in `locale`.
    fn find_by_term_name(
        &self,
        locale: &str,
        term_name: &str,
        taxonomy: Option<&str>,
    ) -> Result<Vec<TaxonomyWithTerm>>;

    /// Taxonomies whose term name in `locale` contains `fragment`.
    fn search(
        &self,
        locale: &str,
        fragment: &str,
        taxonomy: Option<&str>,
    ) -> Result<Vec<TaxonomyWithTerm>>;

    /// Inserts a taxonomy with `count = 0`. Fails with a constraint violation
    /// when the (term, taxonomy) pair is already taken.
    async fn create_taxonomy(&self, new_taxonomy: NewTaxonomy) -> Result<Taxonomy>;

    /// Lookup by (term, taxonomy, parent) and create when absent, as one
    /// atomic unit. If the pair exists under another parent, that row is
    /// returned.
    async fn find_or_create_taxonomy(&self, new_taxonomy: NewTaxonomy) -> Result<Taxonomy>;

    async fn update_description(&self, id: i64, description: Option<String>) -> Result<Taxonomy>;

    async fn increment_count(&self, id: i64) -> Result<Taxonomy>;

    /// Saturates at zero.
    async fn decrement_count(&self, id: i64) -> Result<Taxonomy>;

    /// Resets `count` to the number of association rows.
    async fn recompute_count(&self, id: i64) -> Result<Taxonomy>;

    /// Recomputes every taxonomy. Returns how many counts changed.
    async fn recompute_all_counts(&self) -> Result<usize>;

    /// Soft delete; the taxonomy's associations are removed with it.
    async fn delete_taxonomy(&self, id: i64) -> Result<usize>;
}

/// Service trait for term and taxonomy operations that are not bound to a
/// tagged entity.
#[async_trait]
pub trait TaxonomyServiceTrait: Send + Sync {
    // Terms
    fn get_term(&self, id: i64) -> Result<Option<Term>>;
    fn find_term_by_slug(&self, slug: &str, locale: Option<&str>) -> Result<Option<Term>>;
    async fn find_or_create_term(&self, term: TermInput, locale: Option<&str>) -> Result<Term>;
    async fn delete_term(&self, id: i64) -> Result<usize>;
    async fn restore_term(&self, id: i64) -> Result<usize>;

    // Taxonomies
    fn get_taxonomy(&self, id: i64) -> Result<Option<Taxonomy>>;
    fn get_taxonomy_term(&self, taxonomy_id: i64) -> Result<Option<Term>>;
    fn get_term_taxonomies(&self, term_id: i64) -> Result<Vec<Taxonomy>>;
    fn get_taxonomies_by_name(&self, taxonomy: &str) -> Result<Vec<Taxonomy>>;
    fn get_children(&self, taxonomy_id: i64) -> Result<Vec<Taxonomy>>;
    fn get_parent(&self, taxonomy_id: i64) -> Result<Option<Taxonomy>>;
    fn find_by_term(
        &self,
        term_name: &str,
        taxonomy: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Vec<TaxonomyWithTerm>>;
    fn search(
        &self,
        fragment: &str,
        taxonomy: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Vec<TaxonomyWithTerm>>;
    async fn find_or_create_taxonomy(
        &self,
        term: &Term,
        taxonomy: &str,
        parent: i64,
    ) -> Result<Taxonomy>;
    async fn update_description(&self, id: i64, description: Option<String>) -> Result<Taxonomy>;
    async fn delete_taxonomy(&self, id: i64) -> Result<usize>;

    // Paths
    fn ancestor_slug_path(&self, taxonomy_id: i64, locale: Option<&str>) -> Result<Vec<String>>;
    fn route_parameters(
        &self,
        term_id: i64,
        taxonomy: &str,
        locale: Option<&str>,
    ) -> Result<Option<Vec<String>>>;

    // Counts
    async fn increment_count(&self, id: i64) -> Result<Taxonomy>;
    async fn decrement_count(&self, id: i64) -> Result<Taxonomy>;
    async fn recompute_count(&self, id: i64) -> Result<Taxonomy>;
    async fn recompute_all_counts(&self) -> Result<usize>;
}
