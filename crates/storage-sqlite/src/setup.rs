//! Wires the SQLite repositories into the core services.

use log::info;
use std::sync::Arc;

use taxonomies_core::config::TaxonomyConfig;
use taxonomies_core::taxables::TaxableService;
use taxonomies_core::taxonomies::TaxonomyService;
use taxonomies_core::Result;

use crate::db::{self, spawn_writer, DbPool, WriteHandle};
use crate::taxables::TaxableRepository;
use crate::taxonomies::TaxonomyRepository;
use crate::terms::TermRepository;

/// Repositories and services sharing one pool and one writer.
pub struct Repositories {
    pub pool: Arc<DbPool>,
    pub writer: WriteHandle,
    pub terms: Arc<TermRepository>,
    pub taxonomies: Arc<TaxonomyRepository>,
    pub taxables: Arc<TaxableRepository>,
    pub taxonomy_service: Arc<TaxonomyService>,
    pub taxable_service: Arc<TaxableService>,
}

impl Repositories {
    /// Builds everything on top of an already migrated pool. Must be called
    /// inside a Tokio runtime.
    pub fn from_pool(pool: Arc<DbPool>, config: &TaxonomyConfig) -> Result<Self> {
        config.validate()?;
        let writer = spawn_writer((*pool).clone());

        let terms = Arc::new(TermRepository::new(pool.clone(), writer.clone()));
        let taxonomies = Arc::new(TaxonomyRepository::new(pool.clone(), writer.clone()));
        let taxables = Arc::new(TaxableRepository::new(pool.clone(), writer.clone()));

        let taxonomy_service = Arc::new(TaxonomyService::from_config(
            terms.clone(),
            taxonomies.clone(),
            config,
        ));
        let taxable_service = Arc::new(TaxableService::from_config(
            terms.clone(),
            taxonomies.clone(),
            taxables.clone(),
            config,
        ));

        Ok(Self {
            pool,
            writer,
            terms,
            taxonomies,
            taxables,
            taxonomy_service,
            taxable_service,
        })
    }
}

/// Opens (or creates) the database under `data_dir`, applies pending
/// migrations and returns the wired repositories.
pub fn open(data_dir: &str, config: &TaxonomyConfig) -> Result<Repositories> {
    let db_path = db::init(data_dir)?;
    info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    Repositories::from_pool(pool, config)
}
