//! SQLite storage implementation for taxonomies.

mod model;
mod repository;

pub use model::{NewTaxonomyDB, TaxonomyDB};
pub use repository::TaxonomyRepository;

pub(crate) use repository::increment_count_in;
