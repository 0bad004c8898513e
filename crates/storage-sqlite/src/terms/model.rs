//! Database models for terms.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use taxonomies_core::terms::Term;
use taxonomies_core::utils::LocaleMap;

use crate::errors::StorageError;
use crate::utils::text_to_datetime;

/// Database model for terms. `name` and `slug` hold canonical JSON objects.
#[derive(
    Queryable,
    QueryableByName,
    Identifiable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::terms)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct TermDB {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

/// Database model for creating a new term
#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::terms)]
#[serde(rename_all = "camelCase")]
pub struct NewTermDB {
    pub name: String,
    pub slug: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<TermDB> for Term {
    type Error = StorageError;

    fn try_from(db: TermDB) -> Result<Self, Self::Error> {
        Ok(Self {
            id: db.id,
            name: serde_json::from_str::<LocaleMap>(&db.name)?,
            slug: serde_json::from_str::<LocaleMap>(&db.slug)?,
            created_at: text_to_datetime(&db.created_at),
            updated_at: text_to_datetime(&db.updated_at),
            deleted_at: db.deleted_at.as_deref().map(text_to_datetime),
        })
    }
}
