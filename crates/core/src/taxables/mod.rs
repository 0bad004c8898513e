//! Taxables module - polymorphic links between taxonomies and tagged entities,
//! and the per-entity tagging capability built on top of them.

mod taxable_model;
mod taxable_service;
mod taxable_traits;


pub use taxable_model::{
    LinkOutcome, NewTaxableLink, ScopeClause, Taxable, TaxableLink, TaxableQuery, TaxableRef,
    TermAttachment,
};
pub use taxable_service::{EntityTaxonomies, TaxableService};
pub use taxable_traits::{HasTaxonomies, TaxableRepositoryTrait, TaxableServiceTrait};
