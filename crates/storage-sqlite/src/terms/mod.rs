//! SQLite storage implementation for terms.

mod model;
mod repository;

pub use model::{NewTermDB, TermDB};
pub use repository::TermRepository;

pub(crate) use repository::{load_terms_named, search_terms};
