//! Taxonomies module - terms placed under named, optionally nested classifications.

mod taxonomy_model;
mod taxonomy_service;
mod taxonomy_traits;

pub use taxonomy_model::{
    NewTaxonomy, Taxonomy, TaxonomyField, TaxonomyWithTerm, ROOT_PARENT,
};
pub use taxonomy_service::TaxonomyService;
pub use taxonomy_traits::{TaxonomyRepositoryTrait, TaxonomyServiceTrait};
