//! Taxonomies Core - Domain entities, services, and traits.
//!
//! Multilingual terms, hierarchical taxonomies and the polymorphic links that
//! tag host entities with them. This crate is database-agnostic and defines
//! traits that are implemented by the `storage-sqlite` crate.

pub mod config;
pub mod errors;
pub mod taxables;
pub mod taxonomies;
pub mod terms;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::TaxonomyConfig;
pub use taxables::{HasTaxonomies, Taxable, TaxableRef, TaxableService, TaxableServiceTrait};
pub use taxonomies::{TaxonomyService, TaxonomyServiceTrait};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
