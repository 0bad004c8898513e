//! Small helpers shared by the stores and services: locale maps, term input
//! normalization, slug generation and the taxable type registry.

pub mod locale;
pub mod registry;
pub mod slug;
pub mod term_input;

pub use locale::{canonical_json, LocaleMap, LocaleProvider, StaticLocaleProvider};
pub use registry::TaxableTypeRegistry;
pub use slug::{unique_slug, DefaultSlugGenerator, SlugGenerator};
pub use term_input::{is_sequential_object, TermInput};
