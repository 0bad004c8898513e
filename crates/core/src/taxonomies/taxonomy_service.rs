//! Taxonomy service implementation.

use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{TaxonomyConfig, DEFAULT_MAX_ANCESTOR_DEPTH};
use crate::errors::{DatabaseError, ValidationError};
use crate::terms::{Term, TermRepositoryTrait};
use crate::utils::{LocaleProvider, StaticLocaleProvider, TermInput};
use crate::Result;

use super::{
    NewTaxonomy, Taxonomy, TaxonomyRepositoryTrait, TaxonomyServiceTrait, TaxonomyWithTerm,
    ROOT_PARENT,
};

pub struct TaxonomyService {
    terms: Arc<dyn TermRepositoryTrait>,
    taxonomies: Arc<dyn TaxonomyRepositoryTrait>,
    locale: Arc<dyn LocaleProvider>,
    max_ancestor_depth: usize,
}

impl TaxonomyService {
    pub fn new(
        terms: Arc<dyn TermRepositoryTrait>,
        taxonomies: Arc<dyn TaxonomyRepositoryTrait>,
        locale: Arc<dyn LocaleProvider>,
    ) -> Self {
        Self {
            terms,
            taxonomies,
            locale,
            max_ancestor_depth: DEFAULT_MAX_ANCESTOR_DEPTH,
        }
    }

    pub fn from_config(
        terms: Arc<dyn TermRepositoryTrait>,
        taxonomies: Arc<dyn TaxonomyRepositoryTrait>,
        config: &TaxonomyConfig,
    ) -> Self {
        Self::new(
            terms,
            taxonomies,
            Arc::new(StaticLocaleProvider::from_config(config)),
        )
        .with_max_ancestor_depth(config.max_ancestor_depth)
    }

    pub fn with_max_ancestor_depth(mut self, depth: usize) -> Self {
        self.max_ancestor_depth = depth.max(1);
        self
    }

    /// Slugs of the terms above `start`, nearest parent first.
    ///
    /// Stops at the root, at the first parent that cannot be resolved, at a
    /// repeated id, or after `max_ancestor_depth` steps.
    fn ancestor_slugs(&self, start: &Taxonomy, locale: &str) -> Result<Vec<String>> {
        let fallback = self.locale.fallback_locale();
        let mut slugs = Vec::new();
        let mut visited = HashSet::from([start.id]);
        let mut parent = start.parent;

        while parent != ROOT_PARENT {
            if slugs.len() >= self.max_ancestor_depth {
                warn!(
                    "Taxonomy {} exceeds the maximum ancestor depth of {}, path truncated",
                    start.id, self.max_ancestor_depth
                );
                break;
            }
            if !visited.insert(parent) {
                warn!(
                    "Parent cycle detected at taxonomy {} while walking from {}",
                    parent, start.id
                );
                break;
            }
            let Some(ancestor) = self.taxonomies.get_taxonomy(parent)? else {
                warn!(
                    "Taxonomy {} points to missing parent {}, path truncated",
                    start.id, parent
                );
                break;
            };
            let Some(term) = self.terms.get_term(ancestor.term_id)? else {
                warn!(
                    "Taxonomy {} has no active term {}, path truncated",
                    ancestor.id, ancestor.term_id
                );
                break;
            };
            if let Some(slug) = term.slug_for(locale, fallback.as_deref()) {
                slugs.push(slug.to_string());
            }
            parent = ancestor.parent;
        }

        Ok(slugs)
    }
}

#[async_trait]
impl TaxonomyServiceTrait for TaxonomyService {
    fn get_term(&self, id: i64) -> Result<Option<Term>> {
        self.terms.get_term(id)
    }

    fn find_term_by_slug(&self, slug: &str, locale: Option<&str>) -> Result<Option<Term>> {
        let locale = self.locale.resolve(locale);
        self.terms.find_by_slug(&locale, slug)
    }

    async fn find_or_create_term(&self, term: TermInput, locale: Option<&str>) -> Result<Term> {
        let locale = self.locale.resolve(locale);
        let name = term.to_multilingual(&locale)?;
        self.terms.find_or_create_term(name).await
    }

    async fn delete_term(&self, id: i64) -> Result<usize> {
        self.terms.delete_term(id).await
    }

    async fn restore_term(&self, id: i64) -> Result<usize> {
        self.terms.restore_term(id).await
    }

    fn get_taxonomy(&self, id: i64) -> Result<Option<Taxonomy>> {
        self.taxonomies.get_taxonomy(id)
    }

    fn get_taxonomy_term(&self, taxonomy_id: i64) -> Result<Option<Term>> {
        match self.taxonomies.get_taxonomy(taxonomy_id)? {
            Some(taxonomy) => self.terms.get_term(taxonomy.term_id),
            None => Ok(None),
        }
    }

    fn get_term_taxonomies(&self, term_id: i64) -> Result<Vec<Taxonomy>> {
        self.taxonomies.get_taxonomies_by_term(term_id)
    }

    fn get_taxonomies_by_name(&self, taxonomy: &str) -> Result<Vec<Taxonomy>> {
        self.taxonomies.get_taxonomies_by_name(taxonomy)
    }

    fn get_children(&self, taxonomy_id: i64) -> Result<Vec<Taxonomy>> {
        if taxonomy_id == ROOT_PARENT {
            return Ok(Vec::new());
        }
        self.taxonomies.get_children(taxonomy_id)
    }

    fn get_parent(&self, taxonomy_id: i64) -> Result<Option<Taxonomy>> {
        match self.taxonomies.get_taxonomy(taxonomy_id)? {
            Some(taxonomy) if !taxonomy.is_root() => self.taxonomies.get_taxonomy(taxonomy.parent),
            _ => Ok(None),
        }
    }

    fn find_by_term(
        &self,
        term_name: &str,
        taxonomy: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Vec<TaxonomyWithTerm>> {
        let locale = self.locale.resolve(locale);
        self.taxonomies
            .find_by_term_name(&locale, term_name, taxonomy.filter(|t| !t.is_empty()))
    }

    fn search(
        &self,
        fragment: &str,
        taxonomy: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Vec<TaxonomyWithTerm>> {
        let locale = self.locale.resolve(locale);
        self.taxonomies
            .search(&locale, fragment, taxonomy.filter(|t| !t.is_empty()))
    }

    async fn find_or_create_taxonomy(
        &self,
        term: &Term,
        taxonomy: &str,
        parent: i64,
    ) -> Result<Taxonomy> {
        let new_taxonomy = NewTaxonomy::new(term.id, taxonomy).with_parent(parent);
        new_taxonomy.validate()?;
        self.taxonomies.find_or_create_taxonomy(new_taxonomy).await
    }

    async fn update_description(&self, id: i64, description: Option<String>) -> Result<Taxonomy> {
        self.taxonomies.update_description(id, description).await
    }

    async fn delete_taxonomy(&self, id: i64) -> Result<usize> {
        self.taxonomies.delete_taxonomy(id).await
    }

    fn ancestor_slug_path(&self, taxonomy_id: i64, locale: Option<&str>) -> Result<Vec<String>> {
        let locale = self.locale.resolve(locale);
        let Some(taxonomy) = self.taxonomies.get_taxonomy(taxonomy_id)? else {
            debug!("No taxonomy {} to build a slug path for", taxonomy_id);
            return Ok(Vec::new());
        };

        let mut path = self.ancestor_slugs(&taxonomy, &locale)?;
        path.reverse();
        path.push(taxonomy.taxonomy);
        Ok(path)
    }

    fn route_parameters(
        &self,
        term_id: i64,
        taxonomy: &str,
        locale: Option<&str>,
    ) -> Result<Option<Vec<String>>> {
        let locale = self.locale.resolve(locale);
        let fallback = self.locale.fallback_locale();

        let Some(term) = self.terms.get_term(term_id)? else {
            return Ok(None);
        };
        let Some(taxonomy) = self
            .taxonomies
            .get_taxonomies_by_term(term_id)?
            .into_iter()
            .find(|t| t.taxonomy == taxonomy)
        else {
            return Ok(None);
        };

        let own_slug = term
            .slug_for(&locale, fallback.as_deref())
            .ok_or_else(|| {
                ValidationError::InvalidInput(format!("term {} has no slug", term.id))
            })?
            .to_string();

        let mut parameters = vec![taxonomy.taxonomy.clone()];
        let mut ancestors = self.ancestor_slugs(&taxonomy, &locale)?;
        ancestors.reverse();
        parameters.extend(ancestors);
        parameters.push(own_slug);
        Ok(Some(parameters))
    }

    async fn increment_count(&self, id: i64) -> Result<Taxonomy> {
        self.taxonomies.increment_count(id).await
    }

    async fn decrement_count(&self, id: i64) -> Result<Taxonomy> {
        self.taxonomies.decrement_count(id).await
    }

    async fn recompute_count(&self, id: i64) -> Result<Taxonomy> {
        if self.taxonomies.get_taxonomy(id)?.is_none() {
            return Err(DatabaseError::NotFound(format!("Taxonomy {} not found", id)).into());
        }
        self.taxonomies.recompute_count(id).await
    }

    async fn recompute_all_counts(&self) -> Result<usize> {
        self.taxonomies.recompute_all_counts().await
    }
}
