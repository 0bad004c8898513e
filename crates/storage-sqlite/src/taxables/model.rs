//! Database models for taxable links.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use taxonomies_core::taxables::{NewTaxableLink, TaxableLink};

/// Database model for taxable links
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
#[diesel(table_name = crate::schema::taxables)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct TaxableDB {
    pub id: i64,
    pub taxonomy_id: i64,
    pub taxable_type: String,
    pub taxable_id: Option<i64>,
    pub sort_order: i32, // `order` column
}

/// Database model for creating a new link
#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::taxables)]
#[serde(rename_all = "camelCase")]
pub struct NewTaxableDB {
    pub taxonomy_id: i64,
    pub taxable_type: String,
    pub taxable_id: Option<i64>,
    pub sort_order: i32,
}

impl From<TaxableDB> for TaxableLink {
    fn from(db: TaxableDB) -> Self {
        Self {
            id: db.id,
            taxonomy_id: db.taxonomy_id,
            taxable_type: db.taxable_type,
            taxable_id: db.taxable_id,
            order: db.sort_order,
        }
    }
}

impl From<NewTaxableLink> for NewTaxableDB {
    fn from(domain: NewTaxableLink) -> Self {
        Self {
            taxonomy_id: domain.taxonomy_id,
            taxable_type: domain.taxable.taxable_type,
            taxable_id: Some(domain.taxable.taxable_id),
            sort_order: domain.order,
        }
    }
}
