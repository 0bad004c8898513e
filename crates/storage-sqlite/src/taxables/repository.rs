//! Repository implementation for taxable links.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

use taxonomies_core::taxables::{
    LinkOutcome, NewTaxableLink, TaxableLink, TaxableRef, TaxableRepositoryTrait,
};
use taxonomies_core::Result;

use super::model::{NewTaxableDB, TaxableDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::taxables;
use crate::taxonomies::increment_count_in;
use crate::utils::chunk_for_sqlite;

fn find_link(
    conn: &mut SqliteConnection,
    taxonomy_id: i64,
    taxable: &TaxableRef,
) -> Result<Option<TaxableLink>> {
    let row = taxables::table
        .filter(taxables::taxonomy_id.eq(taxonomy_id))
        .filter(taxables::taxable_type.eq(&taxable.taxable_type))
        .filter(taxables::taxable_id.eq(taxable.taxable_id))
        .first::<TaxableDB>(conn)
        .optional()
        .into_core()?;
    Ok(row.map(TaxableLink::from))
}

/// Ids of entities of `taxable_type` linked to any of `taxonomy_ids`.
fn linked_ids(
    conn: &mut SqliteConnection,
    taxable_type: &str,
    taxonomy_ids: &[i64],
) -> Result<BTreeSet<i64>> {
    let mut ids = BTreeSet::new();
    for chunk in chunk_for_sqlite(taxonomy_ids) {
        let found: Vec<Option<i64>> = taxables::table
            .filter(taxables::taxable_type.eq(taxable_type))
            .filter(taxables::taxonomy_id.eq_any(chunk))
            .select(taxables::taxable_id)
            .distinct()
            .load(conn)
            .into_core()?;
        ids.extend(found.into_iter().flatten());
    }
    Ok(ids)
}

pub struct TaxableRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl TaxableRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl TaxableRepositoryTrait for TaxableRepository {
    fn get_link(&self, taxonomy_id: i64, taxable: &TaxableRef) -> Result<Option<TaxableLink>> {
        let mut conn = get_connection(&self.pool)?;
        find_link(&mut conn, taxonomy_id, taxable)
    }

    fn get_links(&self, taxable: &TaxableRef) -> Result<Vec<TaxableLink>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = taxables::table
            .filter(taxables::taxable_type.eq(&taxable.taxable_type))
            .filter(taxables::taxable_id.eq(taxable.taxable_id))
            .order(taxables::id.asc())
            .load::<TaxableDB>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(TaxableLink::from).collect())
    }

    fn get_taxonomy_ids(&self, taxable: &TaxableRef) -> Result<Vec<i64>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(taxables::table
            .filter(taxables::taxable_type.eq(&taxable.taxable_type))
            .filter(taxables::taxable_id.eq(taxable.taxable_id))
            .order(taxables::id.asc())
            .select(taxables::taxonomy_id)
            .load::<i64>(&mut conn)
            .into_core()?)
    }

    fn get_taxables(&self, taxonomy_id: i64, taxable_type: Option<&str>) -> Result<Vec<TaxableRef>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = taxables::table
            .filter(taxables::taxonomy_id.eq(taxonomy_id))
            .order(taxables::id.asc())
            .into_boxed();
        if let Some(taxable_type) = taxable_type {
            query = query.filter(taxables::taxable_type.eq(taxable_type));
        }
        let rows = query
            .load::<TaxableDB>(&mut conn)
            .into_core()?;
        Ok(rows
            .into_iter()
            .map(TaxableLink::from)
            .filter_map(|link| link.taxable_ref())
            .collect())
    }

    fn find_taxable_ids(&self, taxable_type: &str, clauses: &[Vec<i64>]) -> Result<Vec<i64>> {
        let mut conn = get_connection(&self.pool)?;

        let Some((first, rest)) = clauses.split_first() else {
            let all: Vec<Option<i64>> = taxables::table
                .filter(taxables::taxable_type.eq(taxable_type))
                .select(taxables::taxable_id)
                .distinct()
                .load(&mut conn)
                .into_core()?;
            let ids: BTreeSet<i64> = all.into_iter().flatten().collect();
            return Ok(ids.into_iter().collect());
        };

        let mut ids = linked_ids(&mut conn, taxable_type, first)?;
        for clause in rest {
            if ids.is_empty() {
                break;
            }
            let matching = linked_ids(&mut conn, taxable_type, clause)?;
            ids.retain(|id| matching.contains(id));
        }
        Ok(ids.into_iter().collect())
    }

    fn count_links(&self, taxonomy_id: i64) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        Ok(taxables::table
            .filter(taxables::taxonomy_id.eq(taxonomy_id))
            .count()
            .get_result(&mut conn)
            .into_core()?)
    }

    async fn link(&self, new_link: NewTaxableLink) -> Result<LinkOutcome> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<LinkOutcome> {
                new_link.validate()?;
                if let Some(link) = find_link(conn, new_link.taxonomy_id, &new_link.taxable)? {
                    return Ok(LinkOutcome {
                        link,
                        created: false,
                    });
                }

                let taxonomy_id = new_link.taxonomy_id;
                let row: NewTaxableDB = new_link.into();
                let created = diesel::insert_into(taxables::table)
                    .values(&row)
                    .returning(TaxableDB::as_returning())
                    .get_result(conn)
                    .into_core()?;

                let taxonomy = increment_count_in(conn, taxonomy_id)?;
                debug!(
                    "Linked taxonomy {} to {}#{}, count now {}",
                    taxonomy_id, row.taxable_type, created.taxable_id.unwrap_or_default(), taxonomy.count
                );

                Ok(LinkOutcome {
                    link: TaxableLink::from(created),
                    created: true,
                })
            })
            .await
    }

    async fn unlink(&self, taxonomy_id: i64, taxable: &TaxableRef) -> Result<usize> {
        let taxable = taxable.clone();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(
                    taxables::table
                        .filter(taxables::taxonomy_id.eq(taxonomy_id))
                        .filter(taxables::taxable_type.eq(&taxable.taxable_type))
                        .filter(taxables::taxable_id.eq(taxable.taxable_id)),
                )
                .execute(conn)
                .into_core()?)
            })
            .await
    }

    async fn unlink_all(&self, taxable: &TaxableRef) -> Result<usize> {
        let taxable = taxable.clone();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let removed = diesel::delete(
                    taxables::table
                        .filter(taxables::taxable_type.eq(&taxable.taxable_type))
                        .filter(taxables::taxable_id.eq(taxable.taxable_id)),
                )
                .execute(conn)
                .into_core()?;
                debug!("Removed {} links of {}", removed, taxable);
                Ok(removed)
            })
            .await
    }
}
