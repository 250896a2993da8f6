//! Composition root.
//!
//! Builds every service from injected collaborators. Hosts own the returned
//! [`VanityRuntime`] and hand its services to their adapters; there is no
//! global state.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vanity_core::clock::{Clock, SystemClock};
use vanity_core::config::ConfigSource;
use vanity_core::profile::ProfileRepository;
use vanity_core::rank::RankProvider;
use vanity_core::tag_request::TagRequestRepository;
use vanity_core::Result;
use vanity_infrastructure::{
    InMemoryProfileRepository, InMemoryTagRequestRepository, TomlConfigSource,
    TomlProfileRepository, TomlTagRequestRepository,
};

use crate::access_resolver::AccessResolver;
use crate::catalog_service::{CatalogService, ReloadReport};
use crate::cosmetics_service::CosmeticsService;
use crate::maintenance::MaintenanceScheduler;
use crate::profile_cache::{FlushReport, ProfileCache};
use crate::retry::RetryPolicy;
use crate::tag_request_service::TagRequestService;

/// External collaborators the runtime is built from.
#[derive(Clone)]
pub struct RuntimeDependencies {
    pub profiles: Arc<dyn ProfileRepository>,
    pub tag_requests: Arc<dyn TagRequestRepository>,
    pub ranks: Arc<dyn RankProvider>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<dyn ConfigSource>,
}

impl RuntimeDependencies {
    /// File-backed stores under `data_dir`, config from `config_dir`.
    pub fn toml(
        config_dir: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        ranks: Arc<dyn RankProvider>,
    ) -> Result<Self> {
        let data_dir = data_dir.into();
        Ok(Self {
            profiles: Arc::new(TomlProfileRepository::new(&data_dir)?),
            tag_requests: Arc::new(TomlTagRequestRepository::new(&data_dir)?),
            ranks,
            clock: Arc::new(SystemClock),
            config: Arc::new(TomlConfigSource::new(config_dir)),
        })
    }

    /// In-memory stores; nothing survives the process.
    pub fn in_memory(config_dir: impl Into<PathBuf>, ranks: Arc<dyn RankProvider>) -> Self {
        Self {
            profiles: Arc::new(InMemoryProfileRepository::new()),
            tag_requests: Arc::new(InMemoryTagRequestRepository::new()),
            ranks,
            clock: Arc::new(SystemClock),
            config: Arc::new(TomlConfigSource::new(config_dir)),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Startup switches that are not part of the declarative config.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Run the eviction and expiry sweeps in the background.
    pub maintenance: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self { maintenance: true }
    }
}

pub struct VanityRuntime {
    catalog: Arc<CatalogService>,
    cache: ProfileCache,
    resolver: Arc<AccessResolver>,
    cosmetics: Arc<CosmeticsService>,
    tags: Arc<TagRequestService>,
    maintenance: Mutex<Option<MaintenanceScheduler>>,
    load_report: ReloadReport,
}

impl VanityRuntime {
    /// Loads the catalog and wires up every service.
    ///
    /// Must be called inside a Tokio runtime. Fails only when the first
    /// config load cannot produce a catalog.
    pub fn start(deps: RuntimeDependencies, options: RuntimeOptions) -> Result<Self> {
        let (catalog, load_report) =
            CatalogService::load(Arc::clone(&deps.config), Arc::clone(&deps.clock))?;
        let catalog = Arc::new(catalog);
        let settings = catalog.settings();
        let retry = RetryPolicy::from_settings(&settings.persist);

        let cache = ProfileCache::new(
            Arc::clone(&deps.profiles),
            Arc::clone(&deps.ranks),
            Arc::clone(&deps.clock),
            &settings.cache,
            retry.clone(),
        )?;
        let resolver = Arc::new(AccessResolver::new(
            Arc::clone(&catalog),
            Arc::clone(&deps.ranks),
        ));
        let cosmetics = Arc::new(CosmeticsService::new(
            cache.clone(),
            Arc::clone(&resolver),
            Arc::clone(&catalog),
            Arc::clone(&deps.clock),
        ));
        let tags = Arc::new(TagRequestService::new(
            Arc::clone(&deps.tag_requests),
            cache.clone(),
            Arc::clone(&resolver),
            Arc::clone(&catalog),
            Arc::clone(&deps.clock),
            retry,
        ));

        let maintenance = options.maintenance.then(|| {
            MaintenanceScheduler::start(
                cache.clone(),
                Arc::clone(&tags),
                Arc::clone(&catalog),
                Duration::from_secs(settings.cache.sweep_interval_secs.max(1)),
                Duration::from_secs(settings.tags.sweep_interval_secs.max(1)),
            )
        });

        tracing::info!(
            "Vanity runtime started ({} catalog options, maintenance {})",
            load_report.options,
            if maintenance.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            catalog,
            cache,
            resolver,
            cosmetics,
            tags,
            maintenance: Mutex::new(maintenance),
            load_report,
        })
    }

    pub fn catalog(&self) -> &Arc<CatalogService> {
        &self.catalog
    }

    pub fn cache(&self) -> &ProfileCache {
        &self.cache
    }

    pub fn resolver(&self) -> &Arc<AccessResolver> {
        &self.resolver
    }

    pub fn cosmetics(&self) -> &Arc<CosmeticsService> {
        &self.cosmetics
    }

    pub fn tags(&self) -> &Arc<TagRequestService> {
        &self.tags
    }

    /// Report from the startup config load.
    pub fn load_report(&self) -> &ReloadReport {
        &self.load_report
    }

    /// Stops maintenance and persists every cached profile.
    pub async fn shutdown(&self) -> FlushReport {
        let maintenance = self
            .maintenance
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(maintenance) = maintenance {
            maintenance.stop().await;
        }
        let report = self.cache.flush_all().await;
        tracing::info!("Vanity runtime stopped");
        report
    }
}
