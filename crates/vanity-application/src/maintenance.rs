//! Background sweeps: idle profile eviction and stale tag request expiry.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;

use crate::catalog_service::CatalogService;
use crate::profile_cache::ProfileCache;
use crate::tag_request_service::TagRequestService;

const TARGET: &str = "vanity::maintenance";

/// Runs the periodic sweeps until cancelled.
pub struct MaintenanceScheduler {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl MaintenanceScheduler {
    /// Starts both sweeps on the current runtime. The first run of each
    /// happens one interval after start.
    pub fn start(
        cache: ProfileCache,
        tags: Arc<TagRequestService>,
        catalog: Arc<CatalogService>,
        eviction_interval: Duration,
        expiry_interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();

        let eviction = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + eviction_interval, eviction_interval);
                tracing::info!(target: TARGET, "Profile eviction started ({:?} interval)", eviction_interval);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            let report = cache.evict_idle().await;
                            tracing::debug!(
                                target: TARGET,
                                "Eviction pass: {} evicted, {} retained, {} cached",
                                report.evicted,
                                report.retained,
                                cache.len()
                            );
                        }
                    }
                }
                tracing::info!(target: TARGET, "Profile eviction stopped");
            })
        };

        let expiry = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + expiry_interval, expiry_interval);
                tracing::info!(target: TARGET, "Tag request expiry started ({:?} interval)", expiry_interval);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            // Read per pass so a reload can change it.
                            let max_age_days = catalog.snapshot().tag_settings().expire_after_days;
                            if let Err(e) = tags.expire_stale(max_age_days).await {
                                tracing::error!(target: TARGET, "Tag request expiry failed: {}", e);
                            }
                        }
                    }
                }
                tracing::info!(target: TARGET, "Tag request expiry stopped");
            })
        };

        Self {
            cancel,
            tasks: vec![eviction, expiry],
        }
    }

    /// Signals both sweeps to stop and waits for any pass in progress.
    pub async fn stop(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(target: TARGET, "Maintenance task ended abnormally: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_resolver::AccessResolver;
    use crate::retry::RetryPolicy;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;
    use vanity_core::clock::ManualClock;
    use vanity_core::config::CacheSettings;
    use vanity_core::profile::PlayerProfile;
    use vanity_core::tag_request::{TagRequest, TagRequestRepository, TagRequestStatus};
    use vanity_infrastructure::{
        InMemoryProfileRepository, InMemoryTagRequestRepository, StaticRankProvider,
        TomlConfigSource,
    };

    #[tokio::test(start_paused = true)]
    async fn test_sweeps_run_until_stopped() {
        let dir = tempfile::TempDir::new().unwrap();
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let ranks = Arc::new(StaticRankProvider::new("member"));
        let (catalog, _) =
            CatalogService::load(Arc::new(TomlConfigSource::new(dir.path())), clock.clone())
                .unwrap();
        let catalog = Arc::new(catalog);
        let cache = ProfileCache::new(
            Arc::new(InMemoryProfileRepository::new()),
            ranks.clone(),
            clock.clone(),
            &CacheSettings::default(),
            RetryPolicy::default(),
        )
        .unwrap();
        let requests = Arc::new(InMemoryTagRequestRepository::new());
        let tags = Arc::new(TagRequestService::new(
            requests.clone(),
            cache.clone(),
            Arc::new(AccessResolver::new(catalog.clone(), ranks)),
            catalog.clone(),
            clock.clone(),
            RetryPolicy::default(),
        ));

        let player = Uuid::new_v4();
        cache.put(PlayerProfile::new(player, "Steve", "member", start));
        // A player with no profile, so expiry leaves the cache alone.
        let request = TagRequest::new(Uuid::new_v4(), "Alex", "OLDTAG", start);
        requests.save(&request).await.unwrap();
        clock.advance(chrono::Duration::days(45));

        let scheduler = MaintenanceScheduler::start(
            cache.clone(),
            tags,
            catalog,
            Duration::from_secs(10),
            Duration::from_secs(10),
        );
        tokio::time::sleep(Duration::from_secs(25)).await;
        scheduler.stop().await;

        assert!(cache.is_empty());
        let stored = requests.find_by_id(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TagRequestStatus::Expired);
    }
}
