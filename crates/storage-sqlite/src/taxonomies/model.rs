//! Database models for taxonomies.

use diesel::prelude::*;
use log::warn;
use serde::{Deserialize, Serialize};

use taxonomies_core::taxonomies::{NewTaxonomy, Taxonomy};

use crate::utils::{now_text, text_to_datetime};

/// Database model for taxonomies
#[derive(
    Queryable,
    Identifiable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::taxonomies)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyDB {
    pub id: i64,
    pub term_id: i64,
    pub taxonomy: String,
    pub description: Option<String>,
    pub parent: i64,
    pub count: i32,
    pub created_at: String, // Schema uses Text
    pub updated_at: String, // Schema uses Text
    pub deleted_at: Option<String>,
}

/// Database model for creating a new taxonomy
#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::taxonomies)]
#[serde(rename_all = "camelCase")]
pub struct NewTaxonomyDB {
    pub term_id: i64,
    pub taxonomy: String,
    pub description: Option<String>,
    pub parent: i64,
    pub count: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TaxonomyDB> for Taxonomy {
    fn from(db: TaxonomyDB) -> Self {
        let count = u32::try_from(db.count).unwrap_or_else(|_| {
            warn!("Taxonomy {} has a negative count {}", db.id, db.count);
            0
        });
        Self {
            id: db.id,
            term_id: db.term_id,
            taxonomy: db.taxonomy,
            description: db.description,
            parent: db.parent,
            count,
            created_at: text_to_datetime(&db.created_at),
            updated_at: text_to_datetime(&db.updated_at),
            deleted_at: db.deleted_at.as_deref().map(text_to_datetime),
        }
    }
}

impl From<NewTaxonomy> for NewTaxonomyDB {
    fn from(domain: NewTaxonomy) -> Self {
        let now = now_text();
        Self {
            term_id: domain.term_id,
            taxonomy: domain.taxonomy,
            description: domain.description,
            parent: domain.parent,
            count: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
