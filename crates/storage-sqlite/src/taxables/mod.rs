//! SQLite storage implementation for the taxonomy/entity association store.

mod model;
mod repository;

pub use model::{NewTaxableDB, TaxableDB};
pub use repository::TaxableRepository;
