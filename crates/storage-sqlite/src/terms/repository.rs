//! Repository implementation for terms.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel::SqliteConnection;
use log::{debug, warn};
use std::sync::Arc;

use taxonomies_core::errors::Error;
use taxonomies_core::terms::{NewTerm, Term, TermRepositoryTrait};
use taxonomies_core::utils::{
    canonical_json, unique_slug, DefaultSlugGenerator, LocaleMap, SlugGenerator,
};
use taxonomies_core::Result;

use super::model::{NewTermDB, TermDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::terms;
use crate::utils::{chunk_for_sqlite, contains_pattern, locale_path, now_text};

#[derive(QueryableByName)]
struct IdRow {
    #[diesel(sql_type = BigInt)]
    #[allow(dead_code)]
    id: i64,
}

fn to_terms(rows: Vec<TermDB>) -> Result<Vec<Term>> {
    rows.into_iter()
        .map(|row| Term::try_from(row).map_err(Error::from))
        .collect()
}

/// Active terms whose name in `locale` is exactly `name`, ordered by id.
pub(crate) fn load_terms_named(
    conn: &mut SqliteConnection,
    locale: &str,
    name: &str,
) -> Result<Vec<Term>> {
    let rows = diesel::sql_query(
        "SELECT * FROM terms \
         WHERE deleted_at IS NULL AND json_extract(name, ?) = ? \
         ORDER BY id",
    )
    .bind::<Text, _>(locale_path(locale))
    .bind::<Text, _>(name)
    .load::<TermDB>(conn)
    .into_core()?;
    to_terms(rows)
}

/// Active terms whose name in `locale` contains `fragment`, ordered by id.
/// ASCII letters match case-insensitively.
pub(crate) fn search_terms(
    conn: &mut SqliteConnection,
    locale: &str,
    fragment: &str,
) -> Result<Vec<Term>> {
    let rows = diesel::sql_query(
        "SELECT * FROM terms \
         WHERE deleted_at IS NULL AND json_extract(name, ?) LIKE ? ESCAPE '\\' \
         ORDER BY id",
    )
    .bind::<Text, _>(locale_path(locale))
    .bind::<Text, _>(contains_pattern(fragment))
    .load::<TermDB>(conn)
    .into_core()?;
    to_terms(rows)
}

fn slug_taken(
    conn: &mut SqliteConnection,
    locale: &str,
    slug: &str,
    except: Option<i64>,
) -> Result<bool> {
    let found = diesel::sql_query(
        "SELECT id FROM terms \
         WHERE deleted_at IS NULL AND id <> ? AND json_extract(slug, ?) = ? \
         LIMIT 1",
    )
    .bind::<BigInt, _>(except.unwrap_or(0))
    .bind::<Text, _>(locale_path(locale))
    .bind::<Text, _>(slug)
    .get_result::<IdRow>(conn)
    .optional()
    .into_core()?;
    Ok(found.is_some())
}

/// Derives one collision-free slug per locale of `name`.
fn derive_slugs(
    conn: &mut SqliteConnection,
    name: &LocaleMap,
    except: Option<i64>,
) -> Result<LocaleMap> {
    let generator = DefaultSlugGenerator;
    let mut slugs = LocaleMap::new();
    for (locale, value) in name {
        let base = generator.slugify(value);
        let slug = unique_slug(&base, |candidate| slug_taken(conn, locale, candidate, except))?;
        if slug != base {
            debug!("Slug '{}' taken in '{}', using '{}'", base, locale, slug);
        }
        slugs.insert(locale.clone(), slug);
    }
    Ok(slugs)
}

fn find_active_by_name(conn: &mut SqliteConnection, name_json: &str) -> Result<Option<Term>> {
    let row = terms::table
        .filter(terms::deleted_at.is_null())
        .filter(terms::name.eq(name_json))
        .first::<TermDB>(conn)
        .optional()
        .into_core()?;
    Ok(row.map(Term::try_from).transpose()?)
}

fn insert_term(conn: &mut SqliteConnection, new_term: NewTerm) -> Result<Term> {
    new_term.validate()?;
    let name_json = canonical_json(&new_term.name)?;

    if find_active_by_name(conn, &name_json)?.is_some() {
        return Err(Error::ConstraintViolation(format!(
            "a term named {} already exists",
            name_json
        )));
    }

    let slugs = derive_slugs(conn, &new_term.name, None)?;
    let now = now_text();
    let row = NewTermDB {
        name: name_json,
        slug: canonical_json(&slugs)?,
        created_at: now.clone(),
        updated_at: now,
    };

    let created = diesel::insert_into(terms::table)
        .values(&row)
        .returning(TermDB::as_returning())
        .get_result(conn)
        .into_core()?;
    Ok(Term::try_from(created)?)
}

pub struct TermRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl TermRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl TermRepositoryTrait for TermRepository {
    fn get_term(&self, id: i64) -> Result<Option<Term>> {
        let mut conn = get_connection(&self.pool)?;
        let row = terms::table
            .find(id)
            .filter(terms::deleted_at.is_null())
            .first::<TermDB>(&mut conn)
            .optional()
            .into_core()?;
        Ok(row.map(Term::try_from).transpose()?)
    }

    fn get_terms(&self, ids: &[i64]) -> Result<Vec<Term>> {
        let mut conn = get_connection(&self.pool)?;
        let mut rows = Vec::with_capacity(ids.len());
        for chunk in chunk_for_sqlite(ids) {
            rows.extend(
                terms::table
                    .filter(terms::id.eq_any(chunk))
                    .filter(terms::deleted_at.is_null())
                    .load::<TermDB>(&mut conn)
                    .into_core()?,
            );
        }
        rows.sort_by_key(|row| row.id);
        rows.dedup_by_key(|row| row.id);
        to_terms(rows)
    }

    fn find_by_name(&self, name: &LocaleMap) -> Result<Option<Term>> {
        let name_json = canonical_json(name)?;
        let mut conn = get_connection(&self.pool)?;
        find_active_by_name(&mut conn, &name_json)
    }

    fn find_by_slug(&self, locale: &str, slug: &str) -> Result<Option<Term>> {
        let mut conn = get_connection(&self.pool)?;
        let row = diesel::sql_query(
            "SELECT * FROM terms \
             WHERE deleted_at IS NULL AND json_extract(slug, ?) = ? \
             ORDER BY id LIMIT 1",
        )
        .bind::<Text, _>(locale_path(locale))
        .bind::<Text, _>(slug)
        .get_result::<TermDB>(&mut conn)
        .optional()
        .into_core()?;
        Ok(row.map(Term::try_from).transpose()?)
    }

    fn find_by_localized_name(
        &self,
        locale: &str,
        name: &str,
        ids: Option<&[i64]>,
    ) -> Result<Option<Term>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(load_terms_named(&mut conn, locale, name)?
            .into_iter()
            .find(|term| ids.map_or(true, |ids| ids.contains(&term.id))))
    }

    async fn create_term(&self, new_term: NewTerm) -> Result<Term> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Term> {
                insert_term(conn, new_term)
            })
            .await
    }

    async fn find_or_create_term(&self, name: LocaleMap) -> Result<Term> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Term> {
                let new_term = NewTerm::new(name);
                new_term.validate()?;
                let name_json = canonical_json(&new_term.name)?;
                match find_active_by_name(conn, &name_json)? {
                    Some(term) => Ok(term),
                    None => insert_term(conn, new_term),
                }
            })
            .await
    }

    async fn delete_term(&self, id: i64) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let now = now_text();
                Ok(diesel::update(
                    terms::table
                        .find(id)
                        .filter(terms::deleted_at.is_null()),
                )
                .set((terms::deleted_at.eq(Some(now.clone())), terms::updated_at.eq(now)))
                .execute(conn)
                .into_core()?)
            })
            .await
    }

    async fn restore_term(&self, id: i64) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let Some(row) = terms::table
                    .find(id)
                    .filter(terms::deleted_at.is_not_null())
                    .first::<TermDB>(conn)
                    .optional()
                    .into_core()?
                else {
                    return Ok(0);
                };

                if find_active_by_name(conn, &row.name)?.is_some() {
                    return Err(Error::ConstraintViolation(format!(
                        "cannot restore term {}: an active term named {} exists",
                        id, row.name
                    )));
                }

                let term = Term::try_from(row)?;
                let slugs = derive_slugs(conn, &term.name, Some(id))?;
                if slugs != term.slug {
                    warn!("Restored term {} got new slugs {:?}", id, slugs);
                }

                Ok(diesel::update(terms::table.find(id))
                    .set((
                        terms::slug.eq(canonical_json(&slugs)?),
                        terms::deleted_at.eq(None::<String>),
                        terms::updated_at.eq(now_text()),
                    ))
                    .execute(conn)
                    .into_core()?)
            })
            .await
    }
}
