//! In-memory repositories shared by the service tests.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::collections::HashSet;
use std::sync::RwLock;

use crate::errors::{DatabaseError, Error};
use crate::taxables::{LinkOutcome, NewTaxableLink, TaxableLink, TaxableRef, TaxableRepositoryTrait};
use crate::taxonomies::{NewTaxonomy, Taxonomy, TaxonomyRepositoryTrait, TaxonomyWithTerm};
use crate::terms::{NewTerm, Term, TermRepositoryTrait};
use crate::utils::{unique_slug, DefaultSlugGenerator, LocaleMap, SlugGenerator};
use crate::Result;

#[derive(Default)]
struct State {
    terms: Vec<Term>,
    taxonomies: Vec<Taxonomy>,
    links: Vec<TaxableLink>,
    next_link_id: i64,
}

impl State {
    fn term(&self, id: i64) -> Option<&Term> {
        self.terms.iter().find(|t| t.id == id && !t.is_deleted())
    }

    fn taxonomy(&self, id: i64) -> Option<&Taxonomy> {
        self.taxonomies
            .iter()
            .find(|t| t.id == id && t.deleted_at.is_none())
    }

    fn taxonomy_mut(&mut self, id: i64) -> Result<&mut Taxonomy> {
        self.taxonomies
            .iter_mut()
            .find(|t| t.id == id && t.deleted_at.is_none())
            .ok_or_else(|| DatabaseError::NotFound(format!("Taxonomy {} not found", id)).into())
    }

    fn active_taxonomies(&self) -> impl Iterator<Item = &Taxonomy> {
        self.taxonomies.iter().filter(|t| t.deleted_at.is_none())
    }

    fn slug_taken(&self, locale: &str, slug: &str, except: Option<i64>) -> bool {
        self.terms.iter().any(|t| {
            !t.is_deleted() && Some(t.id) != except && t.slug_in(locale) == Some(slug)
        })
    }

    fn slugs_for(&self, name: &LocaleMap, except: Option<i64>) -> Result<LocaleMap> {
        let generator = DefaultSlugGenerator;
        name.iter()
            .map(|(locale, value)| {
                let base = generator.slugify(value);
                let slug = unique_slug(&base, |candidate| {
                    Ok(self.slug_taken(locale, candidate, except))
                })?;
                Ok((locale.clone(), slug))
            })
            .collect()
    }

    fn insert_term(&mut self, new_term: NewTerm) -> Result<Term> {
        new_term.validate()?;
        let now = now();
        let term = Term {
            id: self.terms.len() as i64 + 1,
            slug: self.slugs_for(&new_term.name, None)?,
            name: new_term.name,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.terms.push(term.clone());
        Ok(term)
    }

    fn insert_taxonomy(&mut self, new_taxonomy: NewTaxonomy) -> Result<Taxonomy> {
        new_taxonomy.validate()?;
        if self
            .active_taxonomies()
            .any(|t| t.term_id == new_taxonomy.term_id && t.taxonomy == new_taxonomy.taxonomy)
        {
            return Err(Error::ConstraintViolation(format!(
                "term {} already has a '{}' taxonomy",
                new_taxonomy.term_id, new_taxonomy.taxonomy
            )));
        }
        let now = now();
        let taxonomy = Taxonomy {
            id: self.taxonomies.len() as i64 + 1,
            term_id: new_taxonomy.term_id,
            taxonomy: new_taxonomy.taxonomy,
            description: new_taxonomy.description,
            parent: new_taxonomy.parent,
            count: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.taxonomies.push(taxonomy.clone());
        Ok(taxonomy)
    }

    fn links_of<'a>(&'a self, taxable: &'a TaxableRef) -> impl Iterator<Item = &'a TaxableLink> {
        self.links.iter().filter(move |l| {
            l.taxable_type == taxable.taxable_type && l.taxable_id == Some(taxable.taxable_id)
        })
    }

    fn with_terms(&self, matches: impl Fn(&Term) -> bool, taxonomy: Option<&str>) -> Vec<TaxonomyWithTerm> {
        self.active_taxonomies()
            .filter(|t| taxonomy.map_or(true, |name| t.taxonomy == name))
            .filter_map(|t| {
                self.term(t.term_id)
                    .filter(|term| matches(term))
                    .map(|term| TaxonomyWithTerm {
                        taxonomy: t.clone(),
                        term: term.clone(),
                    })
            })
            .collect()
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Behaves like the SQLite store, minus persistence.
#[derive(Default)]
pub(crate) struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Rewires a parent pointer, bypassing every check.
    pub(crate) fn set_parent(&self, taxonomy_id: i64, parent: i64) {
        let mut state = self.state.write().unwrap();
        if let Some(t) = state.taxonomies.iter_mut().find(|t| t.id == taxonomy_id) {
            t.parent = parent;
        }
    }
}

#[async_trait]
impl TermRepositoryTrait for InMemoryStore {
    fn get_term(&self, id: i64) -> Result<Option<Term>> {
        Ok(self.state.read().unwrap().term(id).cloned())
    }

    fn get_terms(&self, ids: &[i64]) -> Result<Vec<Term>> {
        let state = self.state.read().unwrap();
        let mut terms: Vec<Term> = ids.iter().filter_map(|id| state.term(*id).cloned()).collect();
        terms.sort_by_key(|t| t.id);
        terms.dedup_by_key(|t| t.id);
        Ok(terms)
    }

    fn find_by_name(&self, name: &LocaleMap) -> Result<Option<Term>> {
        let state = self.state.read().unwrap();
        Ok(state
            .terms
            .iter()
            .find(|t| !t.is_deleted() && &t.name == name)
            .cloned())
    }

    fn find_by_slug(&self, locale: &str, slug: &str) -> Result<Option<Term>> {
        let state = self.state.read().unwrap();
        Ok(state
            .terms
            .iter()
            .find(|t| !t.is_deleted() && t.slug_in(locale) == Some(slug))
            .cloned())
    }

    fn find_by_localized_name(
        &self,
        locale: &str,
        name: &str,
        ids: Option<&[i64]>,
    ) -> Result<Option<Term>> {
        let state = self.state.read().unwrap();
        Ok(state
            .terms
            .iter()
            .filter(|t| !t.is_deleted() && t.name_in(locale) == Some(name))
            .find(|t| ids.map_or(true, |ids| ids.contains(&t.id)))
            .cloned())
    }

    async fn create_term(&self, new_term: NewTerm) -> Result<Term> {
        self.state.write().unwrap().insert_term(new_term)
    }

    async fn find_or_create_term(&self, name: LocaleMap) -> Result<Term> {
        let mut state = self.state.write().unwrap();
        if let Some(term) = state.terms.iter().find(|t| !t.is_deleted() && t.name == name) {
            return Ok(term.clone());
        }
        state.insert_term(NewTerm::new(name))
    }

    async fn delete_term(&self, id: i64) -> Result<usize> {
        let mut state = self.state.write().unwrap();
        match state.terms.iter_mut().find(|t| t.id == id && !t.is_deleted()) {
            Some(term) => {
                term.deleted_at = Some(now());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn restore_term(&self, id: i64) -> Result<usize> {
        let mut state = self.state.write().unwrap();
        let Some(name) = state
            .terms
            .iter()
            .find(|t| t.id == id && t.is_deleted())
            .map(|t| t.name.clone())
        else {
            return Ok(0);
        };
        let slug = state.slugs_for(&name, Some(id))?;
        if let Some(term) = state.terms.iter_mut().find(|t| t.id == id) {
            term.slug = slug;
            term.deleted_at = None;
            term.updated_at = now();
        }
        Ok(1)
    }
}

#[async_trait]
impl TaxonomyRepositoryTrait for InMemoryStore {
    fn get_taxonomy(&self, id: i64) -> Result<Option<Taxonomy>> {
        Ok(self.state.read().unwrap().taxonomy(id).cloned())
    }

    fn get_taxonomies(&self, ids: &[i64]) -> Result<Vec<Taxonomy>> {
        let state = self.state.read().unwrap();
        Ok(state
            .active_taxonomies()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    fn find_taxonomy(&self, term_id: i64, taxonomy: &str, parent: i64) -> Result<Option<Taxonomy>> {
        let state = self.state.read().unwrap();
        let found = state
            .active_taxonomies()
            .find(|t| t.term_id == term_id && t.taxonomy == taxonomy && t.parent == parent)
            .cloned();
        Ok(found)
    }

    fn get_taxonomies_by_term(&self, term_id: i64) -> Result<Vec<Taxonomy>> {
        let state = self.state.read().unwrap();
        Ok(state
            .active_taxonomies()
            .filter(|t| t.term_id == term_id)
            .cloned()
            .collect())
    }

    fn get_taxonomies_by_name(&self, taxonomy: &str) -> Result<Vec<Taxonomy>> {
        let state = self.state.read().unwrap();
        Ok(state
            .active_taxonomies()
            .filter(|t| t.taxonomy == taxonomy)
            .cloned()
            .collect())
    }

    fn get_children(&self, parent_id: i64) -> Result<Vec<Taxonomy>> {
        let state = self.state.read().unwrap();
        Ok(state
            .active_taxonomies()
            .filter(|t| t.parent == parent_id)
            .cloned()
            .collect())
    }

    fn find_by_term_name(
        &self,
        locale: &str,
        term_name: &str,
        taxonomy: Option<&str>,
    ) -> Result<Vec<TaxonomyWithTerm>> {
        let state = self.state.read().unwrap();
        Ok(state.with_terms(|term| term.name_in(locale) == Some(term_name), taxonomy))
    }

    fn search(
        &self,
        locale: &str,
        fragment: &str,
        taxonomy: Option<&str>,
    ) -> Result<Vec<TaxonomyWithTerm>> {
        let needle = fragment.to_lowercase();
        let state = self.state.read().unwrap();
        Ok(state.with_terms(
            |term| {
                term.name_in(locale)
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
            },
            taxonomy,
        ))
    }

    async fn create_taxonomy(&self, new_taxonomy: NewTaxonomy) -> Result<Taxonomy> {
        self.state.write().unwrap().insert_taxonomy(new_taxonomy)
    }

    async fn find_or_create_taxonomy(&self, new_taxonomy: NewTaxonomy) -> Result<Taxonomy> {
        let mut state = self.state.write().unwrap();
        if let Some(existing) = state
            .active_taxonomies()
            .filter(|t| t.term_id == new_taxonomy.term_id && t.taxonomy == new_taxonomy.taxonomy)
            .min_by_key(|t| (t.parent != new_taxonomy.parent, t.id))
        {
            return Ok(existing.clone());
        }
        state.insert_taxonomy(new_taxonomy)
    }

    async fn update_description(&self, id: i64, description: Option<String>) -> Result<Taxonomy> {
        let mut state = self.state.write().unwrap();
        let taxonomy = state.taxonomy_mut(id)?;
        taxonomy.description = description;
        taxonomy.updated_at = now();
        Ok(taxonomy.clone())
    }

    async fn increment_count(&self, id: i64) -> Result<Taxonomy> {
        let mut state = self.state.write().unwrap();
        let taxonomy = state.taxonomy_mut(id)?;
        taxonomy.count += 1;
        Ok(taxonomy.clone())
    }

    async fn decrement_count(&self, id: i64) -> Result<Taxonomy> {
        let mut state = self.state.write().unwrap();
        let taxonomy = state.taxonomy_mut(id)?;
        taxonomy.count = taxonomy.count.saturating_sub(1);
        Ok(taxonomy.clone())
    }

    async fn recompute_count(&self, id: i64) -> Result<Taxonomy> {
        let mut state = self.state.write().unwrap();
        let links = state.links.iter().filter(|l| l.taxonomy_id == id).count() as u32;
        let taxonomy = state.taxonomy_mut(id)?;
        taxonomy.count = links;
        Ok(taxonomy.clone())
    }

    async fn recompute_all_counts(&self) -> Result<usize> {
        let mut state = self.state.write().unwrap();
        let State {
            taxonomies, links, ..
        } = &mut *state;
        let mut changed = 0;
        for taxonomy in taxonomies.iter_mut().filter(|t| t.deleted_at.is_none()) {
            let actual = links.iter().filter(|l| l.taxonomy_id == taxonomy.id).count() as u32;
            if taxonomy.count != actual {
                taxonomy.count = actual;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_taxonomy(&self, id: i64) -> Result<usize> {
        let mut state = self.state.write().unwrap();
        let Ok(taxonomy) = state.taxonomy_mut(id) else {
            return Ok(0);
        };
        taxonomy.deleted_at = Some(now());
        state.links.retain(|l| l.taxonomy_id != id);
        Ok(1)
    }
}

#[async_trait]
impl TaxableRepositoryTrait for InMemoryStore {
    fn get_link(&self, taxonomy_id: i64, taxable: &TaxableRef) -> Result<Option<TaxableLink>> {
        let state = self.state.read().unwrap();
        let found = state
            .links_of(taxable)
            .find(|l| l.taxonomy_id == taxonomy_id)
            .cloned();
        Ok(found)
    }

    fn get_links(&self, taxable: &TaxableRef) -> Result<Vec<TaxableLink>> {
        let state = self.state.read().unwrap();
        let links = state.links_of(taxable).cloned().collect();
        Ok(links)
    }

    fn get_taxonomy_ids(&self, taxable: &TaxableRef) -> Result<Vec<i64>> {
        let state = self.state.read().unwrap();
        let ids = state.links_of(taxable).map(|l| l.taxonomy_id).collect();
        Ok(ids)
    }

    fn get_taxables(&self, taxonomy_id: i64, taxable_type: Option<&str>) -> Result<Vec<TaxableRef>> {
        let state = self.state.read().unwrap();
        Ok(state
            .links
            .iter()
            .filter(|l| l.taxonomy_id == taxonomy_id)
            .filter(|l| taxable_type.map_or(true, |t| l.taxable_type == t))
            .filter_map(TaxableLink::taxable_ref)
            .collect())
    }

    fn find_taxable_ids(&self, taxable_type: &str, clauses: &[Vec<i64>]) -> Result<Vec<i64>> {
        let state = self.state.read().unwrap();
        let candidates: HashSet<i64> = state
            .links
            .iter()
            .filter(|l| l.taxable_type == taxable_type)
            .filter_map(|l| l.taxable_id)
            .collect();

        let mut ids: Vec<i64> = candidates
            .into_iter()
            .filter(|id| {
                clauses.iter().all(|clause| {
                    state.links.iter().any(|l| {
                        l.taxable_type == taxable_type
                            && l.taxable_id == Some(*id)
                            && clause.contains(&l.taxonomy_id)
                    })
                })
            })
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn count_links(&self, taxonomy_id: i64) -> Result<i64> {
        let state = self.state.read().unwrap();
        Ok(state.links.iter().filter(|l| l.taxonomy_id == taxonomy_id).count() as i64)
    }

    async fn link(&self, new_link: NewTaxableLink) -> Result<LinkOutcome> {
        new_link.validate()?;
        let mut state = self.state.write().unwrap();
        if let Some(link) = state
            .links_of(&new_link.taxable)
            .find(|l| l.taxonomy_id == new_link.taxonomy_id)
        {
            return Ok(LinkOutcome {
                link: link.clone(),
                created: false,
            });
        }

        state.taxonomy_mut(new_link.taxonomy_id)?.count += 1;
        state.next_link_id += 1;
        let link = TaxableLink {
            id: state.next_link_id,
            taxonomy_id: new_link.taxonomy_id,
            taxable_type: new_link.taxable.taxable_type,
            taxable_id: Some(new_link.taxable.taxable_id),
            order: new_link.order,
        };
        state.links.push(link.clone());
        Ok(LinkOutcome {
            link,
            created: true,
        })
    }

    async fn unlink(&self, taxonomy_id: i64, taxable: &TaxableRef) -> Result<usize> {
        let mut state = self.state.write().unwrap();
        let before = state.links.len();
        state.links.retain(|l| {
            !(l.taxonomy_id == taxonomy_id
                && l.taxable_type == taxable.taxable_type
                && l.taxable_id == Some(taxable.taxable_id))
        });
        Ok(before - state.links.len())
    }

    async fn unlink_all(&self, taxable: &TaxableRef) -> Result<usize> {
        let mut state = self.state.write().unwrap();
        let before = state.links.len();
        state.links.retain(|l| {
            !(l.taxable_type == taxable.taxable_type && l.taxable_id == Some(taxable.taxable_id))
        });
        Ok(before - state.links.len())
    }
}
