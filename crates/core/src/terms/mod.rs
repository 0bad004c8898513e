//! Terms module - multilingual labels shared by every taxonomy.

mod term_model;
mod term_traits;

pub use term_model::{NewTerm, Term};
pub use term_traits::TermRepositoryTrait;
