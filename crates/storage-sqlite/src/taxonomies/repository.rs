//! Repository implementation for taxonomies.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

use taxonomies_core::errors::{DatabaseError, Error};
use taxonomies_core::taxonomies::{
    NewTaxonomy, Taxonomy, TaxonomyRepositoryTrait, TaxonomyWithTerm,
};
use taxonomies_core::terms::Term;
use taxonomies_core::Result;

use super::model::{NewTaxonomyDB, TaxonomyDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::{taxables, taxonomies, terms};
use crate::terms::{load_terms_named, search_terms};
use crate::utils::{chunk_for_sqlite, now_text};

fn load_active(conn: &mut SqliteConnection, id: i64) -> Result<Option<Taxonomy>> {
    let row = taxonomies::table
        .find(id)
        .filter(taxonomies::deleted_at.is_null())
        .first::<TaxonomyDB>(conn)
        .optional()
        .into_core()?;
    Ok(row.map(Taxonomy::from))
}

fn require_active(conn: &mut SqliteConnection, id: i64) -> Result<Taxonomy> {
    load_active(conn, id)?
        .ok_or_else(|| DatabaseError::NotFound(format!("Taxonomy {} not found", id)).into())
}

/// Active taxonomies owned by `term_id` under the given name, ordered by id.
fn load_by_term_and_name(
    conn: &mut SqliteConnection,
    term_id: i64,
    taxonomy: &str,
) -> Result<Vec<Taxonomy>> {
    let rows = taxonomies::table
        .filter(taxonomies::term_id.eq(term_id))
        .filter(taxonomies::taxonomy.eq(taxonomy))
        .filter(taxonomies::deleted_at.is_null())
        .order(taxonomies::id.asc())
        .load::<TaxonomyDB>(conn)
        .into_core()?;
    Ok(rows.into_iter().map(Taxonomy::from).collect())
}

fn insert_taxonomy(conn: &mut SqliteConnection, new_taxonomy: NewTaxonomy) -> Result<Taxonomy> {
    new_taxonomy.validate()?;

    let term_exists = terms::table
        .find(new_taxonomy.term_id)
        .filter(terms::deleted_at.is_null())
        .select(terms::id)
        .first::<i64>(conn)
        .optional()
        .into_core()?
        .is_some();
    if !term_exists {
        return Err(
            DatabaseError::NotFound(format!("Term {} not found", new_taxonomy.term_id)).into(),
        );
    }

    if !load_by_term_and_name(conn, new_taxonomy.term_id, &new_taxonomy.taxonomy)?.is_empty() {
        return Err(Error::ConstraintViolation(format!(
            "term {} already has a '{}' taxonomy",
            new_taxonomy.term_id, new_taxonomy.taxonomy
        )));
    }

    let row: NewTaxonomyDB = new_taxonomy.into();
    let created = diesel::insert_into(taxonomies::table)
        .values(&row)
        .returning(TaxonomyDB::as_returning())
        .get_result(conn)
        .into_core()?;
    Ok(Taxonomy::from(created))
}

/// Adds one to a taxonomy's count. Used by the association store when a
/// link is created in the same transaction.
pub(crate) fn increment_count_in(conn: &mut SqliteConnection, id: i64) -> Result<Taxonomy> {
    let updated = diesel::update(
        taxonomies::table
            .find(id)
            .filter(taxonomies::deleted_at.is_null()),
    )
    .set(taxonomies::count.eq(taxonomies::count + 1))
    .execute(conn)
    .into_core()?;
    if updated == 0 {
        return Err(DatabaseError::NotFound(format!("Taxonomy {} not found", id)).into());
    }
    require_active(conn, id)
}

fn with_terms(
    conn: &mut SqliteConnection,
    matched: Vec<Term>,
    taxonomy: Option<&str>,
) -> Result<Vec<TaxonomyWithTerm>> {
    if matched.is_empty() {
        return Ok(Vec::new());
    }
    let term_ids: Vec<i64> = matched.iter().map(|t| t.id).collect();
    let terms_by_id: HashMap<i64, Term> = matched.into_iter().map(|t| (t.id, t)).collect();

    let mut rows = Vec::new();
    for chunk in chunk_for_sqlite(&term_ids) {
        let mut query = taxonomies::table
            .filter(taxonomies::term_id.eq_any(chunk))
            .filter(taxonomies::deleted_at.is_null())
            .into_boxed();
        if let Some(name) = taxonomy {
            query = query.filter(taxonomies::taxonomy.eq(name));
        }
        rows.extend(
            query
                .load::<TaxonomyDB>(conn)
                .into_core()?,
        );
    }
    rows.sort_by_key(|row| row.id);

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let term = terms_by_id.get(&row.term_id)?.clone();
            Some(TaxonomyWithTerm {
                taxonomy: Taxonomy::from(row),
                term,
            })
        })
        .collect())
}

pub struct TaxonomyRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl TaxonomyRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl TaxonomyRepositoryTrait for TaxonomyRepository {
    fn get_taxonomy(&self, id: i64) -> Result<Option<Taxonomy>> {
        let mut conn = get_connection(&self.pool)?;
        load_active(&mut conn, id)
    }

    fn get_taxonomies(&self, ids: &[i64]) -> Result<Vec<Taxonomy>> {
        let mut conn = get_connection(&self.pool)?;
        let mut rows = Vec::with_capacity(ids.len());
        for chunk in chunk_for_sqlite(ids) {
            rows.extend(
                taxonomies::table
                    .filter(taxonomies::id.eq_any(chunk))
                    .filter(taxonomies::deleted_at.is_null())
                    .load::<TaxonomyDB>(&mut conn)
                    .into_core()?,
            );
        }
        rows.sort_by_key(|row| row.id);
        rows.dedup_by_key(|row| row.id);
        Ok(rows.into_iter().map(Taxonomy::from).collect())
    }

    fn find_taxonomy(&self, term_id: i64, taxonomy: &str, parent: i64) -> Result<Option<Taxonomy>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(load_by_term_and_name(&mut conn, term_id, taxonomy)?
            .into_iter()
            .find(|t| t.parent == parent))
    }

    fn get_taxonomies_by_term(&self, term_id: i64) -> Result<Vec<Taxonomy>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = taxonomies::table
            .filter(taxonomies::term_id.eq(term_id))
            .filter(taxonomies::deleted_at.is_null())
            .order(taxonomies::id.asc())
            .load::<TaxonomyDB>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(Taxonomy::from).collect())
    }

    fn get_taxonomies_by_name(&self, taxonomy: &str) -> Result<Vec<Taxonomy>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = taxonomies::table
            .filter(taxonomies::taxonomy.eq(taxonomy))
            .filter(taxonomies::deleted_at.is_null())
            .order(taxonomies::id.asc())
            .load::<TaxonomyDB>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(Taxonomy::from).collect())
    }

    fn get_children(&self, parent_id: i64) -> Result<Vec<Taxonomy>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = taxonomies::table
            .filter(taxonomies::parent.eq(parent_id))
            .filter(taxonomies::deleted_at.is_null())
            .order(taxonomies::id.asc())
            .load::<TaxonomyDB>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(Taxonomy::from).collect())
    }

    fn find_by_term_name(
        &self,
        locale: &str,
        term_name: &str,
        taxonomy: Option<&str>,
    ) -> Result<Vec<TaxonomyWithTerm>> {
        let mut conn = get_connection(&self.pool)?;
        let matched = load_terms_named(&mut conn, locale, term_name)?;
        with_terms(&mut conn, matched, taxonomy)
    }

    fn search(
        &self,
        locale: &str,
        fragment: &str,
        taxonomy: Option<&str>,
    ) -> Result<Vec<TaxonomyWithTerm>> {
        let mut conn = get_connection(&self.pool)?;
        let matched = search_terms(&mut conn, locale, fragment)?;
        with_terms(&mut conn, matched, taxonomy)
    }

    async fn create_taxonomy(&self, new_taxonomy: NewTaxonomy) -> Result<Taxonomy> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Taxonomy> {
                insert_taxonomy(conn, new_taxonomy)
            })
            .await
    }

    async fn find_or_create_taxonomy(&self, new_taxonomy: NewTaxonomy) -> Result<Taxonomy> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Taxonomy> {
                new_taxonomy.validate()?;
                let existing =
                    load_by_term_and_name(conn, new_taxonomy.term_id, &new_taxonomy.taxonomy)?;

                if let Some(found) = existing.iter().find(|t| t.parent == new_taxonomy.parent) {
                    return Ok(found.clone());
                }
                if let Some(other) = existing.into_iter().next() {
                    warn!(
                        "Term {} already has '{}' taxonomy {} under parent {}, not {}",
                        other.term_id, other.taxonomy, other.id, other.parent, new_taxonomy.parent
                    );
                    return Ok(other);
                }

                debug!(
                    "Creating '{}' taxonomy for term {}",
                    new_taxonomy.taxonomy, new_taxonomy.term_id
                );
                insert_taxonomy(conn, new_taxonomy)
            })
            .await
    }

    async fn update_description(&self, id: i64, description: Option<String>) -> Result<Taxonomy> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Taxonomy> {
                let updated = diesel::update(
                    taxonomies::table
                        .find(id)
                        .filter(taxonomies::deleted_at.is_null()),
                )
                .set((
                    taxonomies::description.eq(description),
                    taxonomies::updated_at.eq(now_text()),
                ))
                .execute(conn)
                .into_core()?;
                if updated == 0 {
                    return Err(
                        DatabaseError::NotFound(format!("Taxonomy {} not found", id)).into(),
                    );
                }
                require_active(conn, id)
            })
            .await
    }

    async fn increment_count(&self, id: i64) -> Result<Taxonomy> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Taxonomy> {
                increment_count_in(conn, id)
            })
            .await
    }

    async fn decrement_count(&self, id: i64) -> Result<Taxonomy> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Taxonomy> {
                diesel::update(
                    taxonomies::table
                        .find(id)
                        .filter(taxonomies::deleted_at.is_null())
                        .filter(taxonomies::count.gt(0)),
                )
                .set(taxonomies::count.eq(taxonomies::count - 1))
                .execute(conn)
                .into_core()?;
                require_active(conn, id)
            })
            .await
    }

    async fn recompute_count(&self, id: i64) -> Result<Taxonomy> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Taxonomy> {
                let links: i64 = taxables::table
                    .filter(taxables::taxonomy_id.eq(id))
                    .count()
                    .get_result(conn)
                    .into_core()?;
                let count = i32::try_from(links).map_err(|_| {
                    Error::ConstraintViolation(format!("taxonomy {} has too many links", id))
                })?;

                let updated = diesel::update(
                    taxonomies::table
                        .find(id)
                        .filter(taxonomies::deleted_at.is_null()),
                )
                .set(taxonomies::count.eq(count))
                .execute(conn)
                .into_core()?;
                if updated == 0 {
                    return Err(
                        DatabaseError::NotFound(format!("Taxonomy {} not found", id)).into(),
                    );
                }
                require_active(conn, id)
            })
            .await
    }

    async fn recompute_all_counts(&self) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let changed = diesel::sql_query(
                    "UPDATE taxonomies \
                     SET count = (SELECT COUNT(*) FROM taxables WHERE taxables.taxonomy_id = taxonomies.id) \
                     WHERE deleted_at IS NULL \
                       AND count <> (SELECT COUNT(*) FROM taxables WHERE taxables.taxonomy_id = taxonomies.id)",
                )
                .execute(conn)
                .into_core()?;
                if changed > 0 {
                    debug!("Recomputed {} taxonomy counts", changed);
                }
                Ok(changed)
            })
            .await
    }

    async fn delete_taxonomy(&self, id: i64) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let now = now_text();
                let deleted = diesel::update(
                    taxonomies::table
                        .find(id)
                        .filter(taxonomies::deleted_at.is_null()),
                )
                .set((
                    taxonomies::deleted_at.eq(Some(now.clone())),
                    taxonomies::updated_at.eq(now),
                ))
                .execute(conn)
                .into_core()?;

                if deleted > 0 {
                    let links = diesel::delete(taxables::table.filter(taxables::taxonomy_id.eq(id)))
                        .execute(conn)
                        .into_core()?;
                    debug!("Deleted taxonomy {} and {} links", id, links);
                }
                Ok(deleted)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, write_actor::spawn_writer};
    use crate::terms::TermRepository;
    use taxonomies_core::taxonomies::ROOT_PARENT;
    use taxonomies_core::terms::TermRepositoryTrait;
    use taxonomies_core::utils::LocaleMap;
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        terms: TermRepository,
        taxonomies: TaxonomyRepository,
    }

    fn setup() -> Fixture {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("taxonomies.db");
        let pool = create_pool(db_path.to_str().unwrap()).unwrap();
        run_migrations(&pool).unwrap();
        let writer = spawn_writer((*pool).clone());
        Fixture {
            _dir: dir,
            terms: TermRepository::new(pool.clone(), writer.clone()),
            taxonomies: TaxonomyRepository::new(pool, writer),
        }
    }

    async fn term(fixture: &Fixture, pairs: &[(&str, &str)]) -> Term {
        let name: LocaleMap = pairs
            .iter()
            .map(|(l, n)| (l.to_string(), n.to_string()))
            .collect();
        fixture.terms.find_or_create_term(name).await.unwrap()
    }

    #[tokio::test]
    async fn test_find_or_create_same_pair_same_row() {
        let fixture = setup();
        let drama = term(&fixture, &[("en", "Drama")]).await;

        let a = fixture
            .taxonomies
            .find_or_create_taxonomy(NewTaxonomy::new(drama.id, "category"))
            .await
            .unwrap();
        let b = fixture
            .taxonomies
            .find_or_create_taxonomy(NewTaxonomy::new(drama.id, "category"))
            .await
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.count, 0);

        // same pair under another parent resolves to the existing row
        let c = fixture
            .taxonomies
            .find_or_create_taxonomy(NewTaxonomy::new(drama.id, "category").with_parent(a.id))
            .await
            .unwrap();
        assert_eq!(c.id, a.id);
        assert_eq!(c.parent, ROOT_PARENT);

        let err = fixture
            .taxonomies
            .create_taxonomy(NewTaxonomy::new(drama.id, "category"))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_create_for_missing_term_is_not_found() {
        let fixture = setup();
        let err = fixture
            .taxonomies
            .create_taxonomy(NewTaxonomy::new(42, "category"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_find_by_term_name_and_search() {
        let fixture = setup();
        let drama = term(&fixture, &[("en", "Drama"), ("de", "Schauspiel")]).await;
        let comedy = term(&fixture, &[("en", "Comedy")]).await;
        let category = fixture
            .taxonomies
            .create_taxonomy(NewTaxonomy::new(drama.id, "category"))
            .await
            .unwrap();
        fixture
            .taxonomies
            .create_taxonomy(NewTaxonomy::new(drama.id, "genre"))
            .await
            .unwrap();
        fixture
            .taxonomies
            .create_taxonomy(NewTaxonomy::new(comedy.id, "category"))
            .await
            .unwrap();

        let found = fixture
            .taxonomies
            .find_by_term_name("de", "Schauspiel", Some("category"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].taxonomy.id, category.id);
        assert_eq!(found[0].term.id, drama.id);

        let any_name = fixture
            .taxonomies
            .find_by_term_name("en", "Drama", None)
            .unwrap();
        assert_eq!(any_name.len(), 2);

        let searched = fixture.taxonomies.search("en", "dy", None).unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].term.id, comedy.id);

        assert!(fixture
            .taxonomies
            .search("en", "%", None)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_children_and_description() {
        let fixture = setup();
        let books = term(&fixture, &[("en", "Books")]).await;
        let fiction = term(&fixture, &[("en", "Fiction")]).await;
        let root = fixture
            .taxonomies
            .create_taxonomy(NewTaxonomy::new(books.id, "category"))
            .await
            .unwrap();
        let child = fixture
            .taxonomies
            .create_taxonomy(
                NewTaxonomy::new(fiction.id, "category")
                    .with_parent(root.id)
                    .with_description("Made up"),
            )
            .await
            .unwrap();

        let children = fixture.taxonomies.get_children(root.id).unwrap();
        assert_eq!(children, vec![child.clone()]);
        assert_eq!(child.description.as_deref(), Some("Made up"));

        let updated = fixture
            .taxonomies
            .update_description(child.id, None)
            .await
            .unwrap();
        assert!(updated.description.is_none());

        let err = fixture
            .taxonomies
            .update_description(999, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_count_adjustments() {
        let fixture = setup();
        let drama = term(&fixture, &[("en", "Drama")]).await;
        let taxonomy = fixture
            .taxonomies
            .create_taxonomy(NewTaxonomy::new(drama.id, "category"))
            .await
            .unwrap();

        assert_eq!(
            fixture.taxonomies.increment_count(taxonomy.id).await.unwrap().count,
            1
        );
        assert_eq!(
            fixture.taxonomies.decrement_count(taxonomy.id).await.unwrap().count,
            0
        );
        assert_eq!(
            fixture.taxonomies.decrement_count(taxonomy.id).await.unwrap().count,
            0
        );

        fixture.taxonomies.increment_count(taxonomy.id).await.unwrap();
        assert_eq!(
            fixture.taxonomies.recompute_count(taxonomy.id).await.unwrap().count,
            0
        );
        fixture.taxonomies.increment_count(taxonomy.id).await.unwrap();
        assert_eq!(fixture.taxonomies.recompute_all_counts().await.unwrap(), 1);
        assert_eq!(fixture.taxonomies.recompute_all_counts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_taxonomy() {
        let fixture = setup();
        let drama = term(&fixture, &[("en", "Drama")]).await;
        let taxonomy = fixture
            .taxonomies
            .create_taxonomy(NewTaxonomy::new(drama.id, "category"))
            .await
            .unwrap();

        assert_eq!(fixture.taxonomies.delete_taxonomy(taxonomy.id).await.unwrap(), 1);
        assert!(fixture.taxonomies.get_taxonomy(taxonomy.id).unwrap().is_none());
        assert_eq!(fixture.taxonomies.delete_taxonomy(taxonomy.id).await.unwrap(), 0);

        // the pair is free again
        let again = fixture
            .taxonomies
            .create_taxonomy(NewTaxonomy::new(drama.id, "category"))
            .await
            .unwrap();
        assert_ne!(again.id, taxonomy.id);
    }
}
