//! Repository trait for term persistence.

use async_trait::async_trait;

use crate::utils::LocaleMap;
use crate::Result;

use super::{NewTerm, Term};

/// Term store. Lookups only see terms that are not soft-deleted.
#[async_trait]
pub trait TermRepositoryTrait: Send + Sync {
    fn get_term(&self, id: i64) -> Result<Option<Term>>;

    /// Terms with the given ids, ordered by id.
    fn get_terms(&self, ids: &[i64]) -> Result<Vec<Term>>;

    /// Exact match on the canonical JSON form of the name map.
    fn find_by_name(&self, name: &LocaleMap) -> Result<Option<Term>>;

    fn find_by_slug(&self, locale: &str, slug: &str) -> Result<Option<Term>>;

    /// First term (lowest id) whose name in `locale` equals `name`,
    /// optionally restricted to `ids`.
    fn find_by_localized_name(
        &self,
        locale: &str,
        name: &str,
        ids: Option<&[i64]>,
    ) -> Result<Option<Term>>;

    /// Inserts a term, deriving a collision-free slug per locale.
    async fn create_term(&self, new_term: NewTerm) -> Result<Term>;

    /// Lookup by name and create when absent, as one atomic unit.
    async fn find_or_create_term(&self, name: LocaleMap) -> Result<Term>;

    /// Soft delete. Returns the number of rows affected.
    async fn delete_term(&self, id: i64) -> Result<usize>;

    /// Undo a soft delete. Returns the number of rows affected.
    async fn restore_term(&self, id: i64) -> Result<usize>;
}
