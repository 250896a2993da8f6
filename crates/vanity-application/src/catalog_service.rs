//! Active catalog snapshot and its reload.
//!
//! Readers take an `Arc` to the current [`CatalogSnapshot`] and keep it for the
//! whole call; a reload builds a complete new snapshot off the async threads
//! and swaps the pointer, so nobody ever sees a half-built catalog.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use vanity_core::clock::Clock;
use vanity_core::condition::ConditionContext;
use vanity_core::config::{ConfigBundle, ConfigSource, LoadReport, Settings};
use vanity_core::snapshot::CatalogSnapshot;
use vanity_core::{Result, VanityError};

/// Outcome of a successful load or reload.
#[derive(Debug, Clone)]
pub struct ReloadReport {
    pub load: LoadReport,
    /// Compiled options in the new snapshot.
    pub options: usize,
    /// Dangling references and duplicates found while compiling.
    pub warnings: Vec<String>,
}

struct Active {
    snapshot: Arc<CatalogSnapshot>,
    bundle: ConfigBundle,
}

pub struct CatalogService {
    source: Arc<dyn ConfigSource>,
    clock: Arc<dyn Clock>,
    active: RwLock<Active>,
    events: RwLock<HashSet<String>>,
}

impl CatalogService {
    /// Performs the first load.
    ///
    /// Fails with `VanityError::Config` when an essential file is unreadable,
    /// since there is no earlier snapshot to fall back on.
    pub fn load(source: Arc<dyn ConfigSource>, clock: Arc<dyn Clock>) -> Result<(Self, ReloadReport)> {
        let loaded = source.load(None);
        if let Some(failure) = loaded.report.essential_failure() {
            return Err(VanityError::config(
                failure.file.file_name(),
                format!("no prior catalog to fall back on: {}", failure.error),
            ));
        }

        let snapshot = CatalogSnapshot::build(&loaded.bundle)?;
        let report = report_for(&snapshot, loaded.report);
        tracing::info!(
            "Catalog loaded from {} ({} options)",
            source.describe(),
            report.options
        );

        let service = Self {
            source,
            clock,
            active: RwLock::new(Active {
                snapshot: Arc::new(snapshot),
                bundle: loaded.bundle,
            }),
            events: RwLock::new(HashSet::new()),
        };
        Ok((service, report))
    }

    /// The snapshot readers should use right now.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        let active = self.active.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&active.snapshot)
    }

    /// Settings from the most recent load. Cache and persist settings are only
    /// read at startup; the rest also travel with the snapshot.
    pub fn settings(&self) -> Settings {
        let active = self.active.read().unwrap_or_else(|e| e.into_inner());
        active.bundle.settings.clone()
    }

    /// Reloads every config file and swaps in a fresh snapshot.
    ///
    /// Files that fail keep their previous contents. If the new snapshot
    /// cannot be built at all the current one stays active and the error is
    /// returned.
    pub async fn reload(&self) -> Result<ReloadReport> {
        let previous = {
            let active = self.active.read().unwrap_or_else(|e| e.into_inner());
            active.bundle.clone()
        };
        let source = Arc::clone(&self.source);

        let (bundle, load, snapshot) = tokio::task::spawn_blocking(move || {
            let loaded = source.load(Some(&previous));
            let snapshot = CatalogSnapshot::build(&loaded.bundle);
            (loaded.bundle, loaded.report, snapshot)
        })
        .await
        .map_err(|e| VanityError::internal(format!("Catalog reload task failed: {}", e)))?;

        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Catalog reload failed, keeping current snapshot: {}", e);
                return Err(e);
            }
        };
        let report = report_for(&snapshot, load);

        {
            let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
            *active = Active {
                snapshot: Arc::new(snapshot),
                bundle,
            };
        }

        tracing::info!(
            "Catalog reloaded from {}: {} options, {} failed file(s), {} quarantined entr(ies)",
            self.source.describe(),
            report.options,
            report.load.failed.len(),
            report.load.quarantined.len()
        );
        Ok(report)
    }

    /// Turns a named runtime event on or off for condition checks.
    pub fn set_event_active(&self, name: &str, active: bool) {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());
        let changed = if active {
            events.insert(name.to_string())
        } else {
            events.remove(name)
        };
        if changed {
            tracing::info!("Event '{}' is now {}", name, if active { "active" } else { "inactive" });
        }
    }

    pub fn active_events(&self) -> HashSet<String> {
        self.events.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Runs `f` with the condition context for the current instant.
    pub fn with_conditions<R>(
        &self,
        snapshot: &CatalogSnapshot,
        f: impl FnOnce(&ConditionContext<'_>) -> R,
    ) -> R {
        let events = self.events.read().unwrap_or_else(|e| e.into_inner());
        let ctx = ConditionContext {
            now: self.clock.now(),
            seasons: snapshot.seasons(),
            active_events: &events,
        };
        f(&ctx)
    }
}

fn report_for(snapshot: &CatalogSnapshot, load: LoadReport) -> ReloadReport {
    for warning in snapshot.warnings() {
        tracing::warn!("Catalog: {}", warning);
    }
    ReloadReport {
        load,
        options: snapshot.catalog().len(),
        warnings: snapshot.warnings().to_vec(),
    }
}
