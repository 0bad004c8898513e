//! Taxable service: hands out the per-entity tagging capability and resolves
//! entity scopes.

use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::TaxonomyConfig;
use crate::taxonomies::{NewTaxonomy, Taxonomy, TaxonomyField, TaxonomyRepositoryTrait};
use crate::terms::{Term, TermRepositoryTrait};
use crate::utils::{LocaleProvider, StaticLocaleProvider, TaxableTypeRegistry, TermInput};
use crate::Result;

use super::{
    HasTaxonomies, NewTaxableLink, ScopeClause, Taxable, TaxableLink, TaxableQuery,
    TaxableRepositoryTrait, TaxableRef, TaxableServiceTrait, TermAttachment,
};

#[derive(Clone)]
struct Stores {
    terms: Arc<dyn TermRepositoryTrait>,
    taxonomies: Arc<dyn TaxonomyRepositoryTrait>,
    taxables: Arc<dyn TaxableRepositoryTrait>,
    locale: Arc<dyn LocaleProvider>,
}

pub struct TaxableService {
    stores: Stores,
    registry: TaxableTypeRegistry,
}

impl TaxableService {
    pub fn new(
        terms: Arc<dyn TermRepositoryTrait>,
        taxonomies: Arc<dyn TaxonomyRepositoryTrait>,
        taxables: Arc<dyn TaxableRepositoryTrait>,
        locale: Arc<dyn LocaleProvider>,
    ) -> Self {
        Self {
            stores: Stores {
                terms,
                taxonomies,
                taxables,
                locale,
            },
            registry: TaxableTypeRegistry::new(),
        }
    }

    pub fn from_config(
        terms: Arc<dyn TermRepositoryTrait>,
        taxonomies: Arc<dyn TaxonomyRepositoryTrait>,
        taxables: Arc<dyn TaxableRepositoryTrait>,
        config: &TaxonomyConfig,
    ) -> Self {
        Self::new(
            terms,
            taxonomies,
            taxables,
            Arc::new(StaticLocaleProvider::from_config(config)),
        )
        .with_registry(TaxableTypeRegistry::with_types(
            config.allowed_taxable_types.iter().cloned(),
        ))
    }

    pub fn with_registry(mut self, registry: TaxableTypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Keeps the entities of the query's type that match every clause,
    /// preserving input order.
    pub fn filter<T: Taxable>(&self, query: &TaxableQuery, entities: Vec<T>) -> Result<Vec<T>> {
        let ids: Option<HashSet<i64>> = if query.is_unfiltered() {
            None
        } else {
            Some(self.find_taxable_ids(query)?.into_iter().collect())
        };
        Ok(entities
            .into_iter()
            .filter(|entity| {
                let r = entity.taxable_ref();
                r.taxable_type == query.taxable_type
                    && ids.as_ref().map_or(true, |ids| ids.contains(&r.taxable_id))
            })
            .collect())
    }

    /// Lowest term id named `name` in `locale` among the terms used by
    /// `taxonomy`, with the matching taxonomies.
    fn resolve_term(
        &self,
        name: &str,
        taxonomy: &str,
        locale: Option<&str>,
    ) -> Result<Option<(i64, Vec<Taxonomy>)>> {
        let locale = self.stores.locale.resolve(locale);
        let filter = Some(taxonomy).filter(|t| !t.is_empty());
        let matches = self
            .stores
            .taxonomies
            .find_by_term_name(&locale, name, filter)?;

        let Some(term_id) = matches.iter().map(|m| m.term.id).min() else {
            debug!("Scope term '{}' ({}) not found in '{}'", name, locale, taxonomy);
            return Ok(None);
        };
        let taxonomies = matches
            .into_iter()
            .filter(|m| m.term.id == term_id)
            .map(|m| m.taxonomy)
            .collect();
        Ok(Some((term_id, taxonomies)))
    }

    fn resolve_clause(&self, clause: &ScopeClause) -> Result<Vec<i64>> {
        match clause {
            ScopeClause::Term {
                name,
                taxonomy,
                locale,
            } => match self.resolve_term(name, taxonomy, locale.as_deref())? {
                Some((term_id, _)) => Ok(self
                    .stores
                    .taxonomies
                    .get_taxonomies_by_term(term_id)?
                    .into_iter()
                    .map(|t| t.id)
                    .collect()),
                None => Ok(Vec::new()),
            },
            ScopeClause::Tax {
                name,
                taxonomy,
                locale,
            } => Ok(self
                .resolve_term(name, taxonomy, locale.as_deref())?
                .and_then(|(_, taxonomies)| taxonomies.into_iter().map(|t| t.id).min())
                .into_iter()
                .collect()),
            ScopeClause::Category { taxonomy_id } => Ok(vec![*taxonomy_id]),
            ScopeClause::Categories { taxonomy_ids } => Ok(taxonomy_ids.clone()),
        }
    }
}

#[async_trait]
impl TaxableServiceTrait for TaxableService {
    fn for_entity(&self, taxable: TaxableRef) -> Result<EntityTaxonomies> {
        self.registry.ensure_known(&taxable.taxable_type)?;
        Ok(EntityTaxonomies {
            stores: self.stores.clone(),
            taxable,
        })
    }

    fn get_taxables(
        &self,
        taxonomy_id: i64,
        taxable_type: Option<&str>,
    ) -> Result<Vec<TaxableRef>> {
        self.stores.taxables.get_taxables(taxonomy_id, taxable_type)
    }

    fn resolve_scopes(&self, query: &TaxableQuery) -> Result<Vec<Vec<i64>>> {
        query
            .clauses
            .iter()
            .map(|clause| self.resolve_clause(clause))
            .collect()
    }

    fn find_taxable_ids(&self, query: &TaxableQuery) -> Result<Vec<i64>> {
        let clauses = self.resolve_scopes(query)?;
        if clauses.iter().any(Vec::is_empty) {
            return Ok(Vec::new());
        }
        self.stores
            .taxables
            .find_taxable_ids(&query.taxable_type, &clauses)
    }

    async fn forget(&self, taxable: &TaxableRef) -> Result<usize> {
        self.stores.taxables.unlink_all(taxable).await
    }
}

/// The tagging capability of one entity.
///
/// Host types hold one of these (or build it on demand through
/// [`TaxableServiceTrait::for_entity`]) instead of inheriting behavior.
#[derive(Clone)]
pub struct EntityTaxonomies {
    stores: Stores,
    taxable: TaxableRef,
}

impl EntityTaxonomies {
    async fn add_single_term(
        &self,
        term: &TermInput,
        taxonomy: &str,
        parent: i64,
        order: i32,
    ) -> Result<TermAttachment> {
        let locale = self.stores.locale.current_locale();
        let name = term.to_multilingual(&locale)?;

        let term = self.stores.terms.find_or_create_term(name).await?;

        let new_taxonomy = NewTaxonomy::new(term.id, taxonomy).with_parent(parent);
        new_taxonomy.validate()?;
        let taxonomy_model = self
            .stores
            .taxonomies
            .find_or_create_taxonomy(new_taxonomy)
            .await?;

        let already_attached = self
            .get_taxonomies()?
            .iter()
            .any(|t| t.taxonomy == taxonomy && t.term_id == term.id);
        if already_attached {
            debug!(
                "{} already carries term {} in '{}'",
                self.taxable, term.id, taxonomy
            );
            return Ok(TermAttachment {
                term,
                taxonomy: taxonomy_model,
                attached: false,
            });
        }

        let outcome = self
            .stores
            .taxables
            .link(NewTaxableLink::new(taxonomy_model.id, self.taxable.clone()).with_order(order))
            .await?;

        let taxonomy_model = if outcome.created {
            self.stores
                .taxonomies
                .get_taxonomy(taxonomy_model.id)?
                .unwrap_or(taxonomy_model)
        } else {
            taxonomy_model
        };

        Ok(TermAttachment {
            term,
            taxonomy: taxonomy_model,
            attached: outcome.created,
        })
    }

    /// Term ids of the attached taxonomies, optionally of one name only.
    fn attached_term_ids(&self, taxonomy: Option<&str>) -> Result<Vec<i64>> {
        let taxonomy = taxonomy.filter(|t| !t.is_empty());
        let mut seen = HashSet::new();
        Ok(self
            .get_taxonomies()?
            .into_iter()
            .filter(|t| taxonomy.map_or(true, |name| t.taxonomy == name))
            .map(|t| t.term_id)
            .filter(|id| seen.insert(*id))
            .collect())
    }
}

#[async_trait]
impl HasTaxonomies for EntityTaxonomies {
    fn taxable(&self) -> &TaxableRef {
        &self.taxable
    }

    async fn add_term(
        &self,
        term: TermInput,
        taxonomy: &str,
        parent: i64,
        order: i32,
    ) -> Result<Vec<TermAttachment>> {
        let mut attachments = Vec::new();
        for item in term.into_items() {
            attachments.push(self.add_single_term(&item, taxonomy, parent, order).await?);
        }
        Ok(attachments)
    }

    async fn set_category(&self, taxonomy_id: i64, order: i32) -> Result<bool> {
        if self.stores.taxonomies.get_taxonomy(taxonomy_id)?.is_none() {
            debug!("Taxonomy {} does not exist, {} left as is", taxonomy_id, self.taxable);
            return Ok(false);
        }
        if self
            .stores
            .taxables
            .get_link(taxonomy_id, &self.taxable)?
            .is_some()
        {
            return Ok(false);
        }

        let outcome = self
            .stores
            .taxables
            .link(NewTaxableLink::new(taxonomy_id, self.taxable.clone()).with_order(order))
            .await?;
        Ok(outcome.created)
    }

    fn get_taxonomies(&self) -> Result<Vec<Taxonomy>> {
        let ids = self.stores.taxables.get_taxonomy_ids(&self.taxable)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<i64, Taxonomy> = self
            .stores
            .taxonomies
            .get_taxonomies(&ids)?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    fn get_taxonomies_by(&self, field: TaxonomyField) -> Result<Vec<Value>> {
        Ok(self
            .get_taxonomies()?
            .iter()
            .map(|t| t.field(field))
            .collect())
    }

    fn get_links(&self) -> Result<Vec<TaxableLink>> {
        self.stores.taxables.get_links(&self.taxable)
    }

    fn get_terms(&self, taxonomy: Option<&str>) -> Result<Vec<Term>> {
        let term_ids = self.attached_term_ids(taxonomy)?;
        if term_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.stores.terms.get_terms(&term_ids)
    }

    fn get_term_names(
        &self,
        taxonomy: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Option<Vec<Option<String>>>> {
        let terms = self.get_terms(taxonomy)?;
        if terms.is_empty() {
            return Ok(None);
        }

        let locale = self.stores.locale.resolve(locale);
        let fallback = self.stores.locale.fallback_locale();
        Ok(Some(
            terms
                .iter()
                .map(|t| t.translate(&locale, fallback.as_deref()).map(str::to_string))
                .collect(),
        ))
    }

    fn get_term(
        &self,
        term_name: &str,
        taxonomy: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Option<Term>> {
        let term_ids = self.attached_term_ids(taxonomy)?;
        if term_ids.is_empty() {
            return Ok(None);
        }
        let locale = self.stores.locale.resolve(locale);
        self.stores
            .terms
            .find_by_localized_name(&locale, term_name, Some(&term_ids))
    }

    fn has_term(
        &self,
        term_name: &str,
        taxonomy: Option<&str>,
        locale: Option<&str>,
    ) -> Result<bool> {
        Ok(self.get_term(term_name, taxonomy, locale)?.is_some())
    }

    async fn remove_term(
        &self,
        term_name: &str,
        taxonomy: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Option<usize>> {
        let Some(term) = self.get_term(term_name, taxonomy, locale)? else {
            debug!("{} has no term '{}' to remove", self.taxable, term_name);
            return Ok(None);
        };

        let taxonomy = taxonomy.filter(|t| !t.is_empty());
        let Some(attached) = self
            .get_taxonomies()?
            .into_iter()
            .find(|t| t.term_id == term.id && taxonomy.map_or(true, |name| t.taxonomy == name))
        else {
            return Ok(None);
        };

        let removed = self
            .stores
            .taxables
            .unlink(attached.id, &self.taxable)
            .await?;
        Ok(Some(removed))
    }

    async fn remove_all_terms(&self) -> Result<usize> {
        self.stores.taxables.unlink_all(&self.taxable).await
    }
}

impl Taxable for EntityTaxonomies {
    fn taxable_ref(&self) -> TaxableRef {
        self.taxable.clone()
    }
}
