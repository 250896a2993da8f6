//! Write-through profile cache.
//!
//! Reads are served from memory while an entry is fresh; misses and stale
//! entries reload from the [`ProfileRepository`], with concurrent misses for
//! one player sharing a single load. Writes land in memory immediately and are
//! persisted by a per-player worker that applies them in submission order.
//!
//! # Entry states
//!
//! - fresh: last access within the TTL, served from memory
//! - dirty: persist jobs queued or the last persist failed; never reloaded or
//!   evicted until the store has the latest value
//! - stale: clean and idle past the TTL; the next read reloads it and the
//!   sweeper may drop it

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;
use vanity_core::clock::Clock;
use vanity_core::config::CacheSettings;
use vanity_core::profile::{PlayerProfile, ProfileRepository};
use vanity_core::rank::RankProvider;
use vanity_core::{Result, VanityError};

use crate::retry::RetryPolicy;

type SharedLoad = Shared<BoxFuture<'static, Result<Option<PlayerProfile>>>>;

/// Outcome of [`ProfileCache::evict_idle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub evicted: usize,
    /// Idle entries kept because their latest value is not yet persisted.
    pub retained: usize,
}

/// Outcome of [`ProfileCache::flush_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub persisted: usize,
    pub failed: usize,
}

struct CacheEntry {
    profile: PlayerProfile,
    last_access: DateTime<Utc>,
}

enum PersistJob {
    Save(PlayerProfile),
    /// Answered once every earlier job for the key has finished, with
    /// whether the latest save reached the store.
    Barrier(oneshot::Sender<bool>),
}

struct PersistQueue {
    tx: mpsc::UnboundedSender<PersistJob>,
    pending: Arc<AtomicUsize>,
    failed: Arc<AtomicBool>,
}

impl PersistQueue {
    fn is_dirty(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0 || self.failed.load(Ordering::SeqCst)
    }

    fn barrier(&self) -> Option<oneshot::Receiver<bool>> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(PersistJob::Barrier(tx)).ok().map(|_| rx)
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<Uuid, CacheEntry>,
    loads: HashMap<Uuid, SharedLoad>,
    queues: HashMap<Uuid, PersistQueue>,
}

impl CacheState {
    fn is_dirty(&self, player_id: &Uuid) -> bool {
        self.queues.get(player_id).is_some_and(PersistQueue::is_dirty)
    }
}

struct CacheInner {
    store: Arc<dyn ProfileRepository>,
    ranks: Arc<dyn RankProvider>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    max_entries: usize,
    retry: RetryPolicy,
    runtime: Handle,
    state: Mutex<CacheState>,
}

/// Concurrent, TTL-bounded, write-through cache of player profiles.
///
/// Cheap to clone; clones share one cache.
#[derive(Clone)]
pub struct ProfileCache {
    inner: Arc<CacheInner>,
}

impl ProfileCache {
    /// Creates a cache bound to the current Tokio runtime, which runs the
    /// persist workers.
    pub fn new(
        store: Arc<dyn ProfileRepository>,
        ranks: Arc<dyn RankProvider>,
        clock: Arc<dyn Clock>,
        settings: &CacheSettings,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            VanityError::internal(format!("ProfileCache requires a Tokio runtime: {}", e))
        })?;
        Ok(Self {
            inner: Arc::new(CacheInner {
                store,
                ranks,
                clock,
                ttl: settings.ttl(),
                max_entries: settings.max_entries.max(1),
                retry,
                runtime,
                state: Mutex::new(CacheState::default()),
            }),
        })
    }

    /// Returns the player's profile.
    ///
    /// # Returns
    ///
    /// - `Ok(PlayerProfile)`: Cached or freshly loaded profile
    /// - `Err(VanityError::NotFound)`: The store has no profile for this player
    /// - `Err(_)`: The store failed after retries
    pub async fn get(&self, player_id: Uuid) -> Result<PlayerProfile> {
        self.fetch(player_id)
            .await?
            .ok_or_else(|| VanityError::not_found("profile", player_id))
    }

    /// Like [`get`](Self::get), but creates a default profile when the store
    /// has none. The new profile takes its rank from the rank provider and is
    /// persisted like any other write.
    pub async fn get_or_create(&self, player_id: Uuid, username: &str) -> Result<PlayerProfile> {
        if let Some(profile) = self.fetch(player_id).await? {
            return Ok(profile);
        }

        let now = self.inner.clock.now();
        let rank = self.inner.ranks.primary_rank(player_id);
        let created = PlayerProfile::new(player_id, username, rank, now);

        let mut state = self.lock();
        if let Some(entry) = state.entries.get_mut(&player_id) {
            // A concurrent put or create got there first.
            entry.last_access = now;
            return Ok(entry.profile.clone());
        }
        tracing::debug!("Creating profile for {} ({})", username, player_id);
        self.store_entry(&mut state, created.clone(), now);
        Ok(created)
    }

    /// Returns a cached profile that is fresh (or has unsaved writes) without
    /// touching the store or the entry's access time.
    pub fn peek(&self, player_id: Uuid) -> Option<PlayerProfile> {
        let now = self.inner.clock.now();
        let state = self.lock();
        let entry = state.entries.get(&player_id)?;
        (self.is_fresh(entry, now) || state.is_dirty(&player_id)).then(|| entry.profile.clone())
    }

    /// Replaces the cached profile and queues it for persistence.
    ///
    /// The new value is visible to every subsequent read in this process
    /// before the store write completes.
    pub fn put(&self, profile: PlayerProfile) {
        let now = self.inner.clock.now();
        let mut state = self.lock();
        self.store_entry(&mut state, profile, now);
    }

    /// Applies `mutate` to the current profile and writes the result.
    ///
    /// The read-modify-write happens under the cache lock, so two concurrent
    /// modifications of one player both take effect.
    pub async fn modify<F>(&self, player_id: Uuid, mutate: F) -> Result<PlayerProfile>
    where
        F: FnOnce(&mut PlayerProfile) -> Result<()>,
    {
        let loaded = self.get(player_id).await?;

        let now = self.inner.clock.now();
        let mut state = self.lock();
        let mut profile = state
            .entries
            .get(&player_id)
            .map(|e| e.profile.clone())
            .unwrap_or(loaded);
        mutate(&mut profile)?;
        self.store_entry(&mut state, profile.clone(), now);
        Ok(profile)
    }

    /// Drops the cached entry so the next read reloads it. Queued writes are
    /// not cancelled; the reload waits for them.
    pub fn invalidate(&self, player_id: Uuid) {
        let mut state = self.lock();
        state.entries.remove(&player_id);
        state.loads.remove(&player_id);
        tracing::debug!("Invalidated cached profile {}", player_id);
    }

    /// Waits until every write queued so far for this player has finished.
    ///
    /// Returns `false` if the latest write could not be persisted.
    pub async fn flush(&self, player_id: Uuid) -> bool {
        let barrier = self.lock().queues.get(&player_id).and_then(PersistQueue::barrier);
        match barrier {
            Some(rx) => rx.await.unwrap_or(false),
            None => true,
        }
    }

    /// Persists every cached entry and waits for the writes to finish.
    pub async fn flush_all(&self) -> FlushReport {
        let barriers: Vec<(Uuid, Option<oneshot::Receiver<bool>>)> = {
            let mut state = self.lock();
            let profiles: Vec<PlayerProfile> =
                state.entries.values().map(|e| e.profile.clone()).collect();
            profiles
                .into_iter()
                .map(|profile| {
                    let player_id = profile.player_id;
                    let queue = self.enqueue(&mut state, profile);
                    (player_id, queue.barrier())
                })
                .collect()
        };

        let mut report = FlushReport::default();
        for (player_id, barrier) in barriers {
            let ok = match barrier {
                Some(rx) => rx.await.unwrap_or(false),
                None => false,
            };
            if ok {
                report.persisted += 1;
            } else {
                tracing::error!("Profile {} could not be persisted during flush", player_id);
                report.failed += 1;
            }
        }
        tracing::info!(
            "Flushed profile cache: {} persisted, {} failed",
            report.persisted,
            report.failed
        );
        report
    }

    /// Drops entries idle for longer than the TTL.
    ///
    /// Each candidate's queued writes are awaited first. An entry whose latest
    /// value failed to persist gets another persist attempt and is kept until
    /// one succeeds.
    pub async fn evict_idle(&self) -> EvictionReport {
        let now = self.inner.clock.now();
        let candidates: Vec<(Uuid, DateTime<Utc>, Option<oneshot::Receiver<bool>>)> = {
            let mut state = self.lock();
            let stale: Vec<(Uuid, DateTime<Utc>)> = state
                .entries
                .iter()
                .filter(|(_, entry)| !self.is_fresh(entry, now))
                .map(|(id, entry)| (*id, entry.last_access))
                .collect();

            stale
                .into_iter()
                .map(|(player_id, last_access)| {
                    let failed = state
                        .queues
                        .get(&player_id)
                        .is_some_and(|q| q.failed.load(Ordering::SeqCst));
                    if failed {
                        if let Some(entry) = state.entries.get(&player_id) {
                            let profile = entry.profile.clone();
                            self.enqueue(&mut state, profile);
                        }
                    }
                    let barrier = state.queues.get(&player_id).and_then(PersistQueue::barrier);
                    (player_id, last_access, barrier)
                })
                .collect()
        };

        let mut settled = Vec::with_capacity(candidates.len());
        for (player_id, last_access, barrier) in candidates {
            if let Some(rx) = barrier {
                let _ = rx.await;
            }
            settled.push((player_id, last_access));
        }

        let mut report = EvictionReport::default();
        let mut state = self.lock();
        for (player_id, last_access) in settled {
            let untouched = state
                .entries
                .get(&player_id)
                .is_some_and(|e| e.last_access == last_access);
            if !untouched {
                continue;
            }
            if state.is_dirty(&player_id) {
                report.retained += 1;
                continue;
            }
            state.entries.remove(&player_id);
            state.queues.remove(&player_id);
            report.evicted += 1;
        }
        if report.evicted > 0 || report.retained > 0 {
            tracing::debug!(
                "Evicted {} idle profile(s), retained {} with unsaved changes",
                report.evicted,
                report.retained
            );
        }
        report
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// True while the player has queued writes or an unpersisted value.
    pub fn has_unsaved_changes(&self, player_id: Uuid) -> bool {
        self.lock().is_dirty(&player_id)
    }

    // ------------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.last_access <= self.inner.ttl
    }

    /// Serves a fresh entry or joins (or starts) the shared load.
    async fn fetch(&self, player_id: Uuid) -> Result<Option<PlayerProfile>> {
        let load = {
            let now = self.inner.clock.now();
            let mut state = self.lock();
            let dirty = state.is_dirty(&player_id);
            if let Some(entry) = state.entries.get_mut(&player_id) {
                if now - entry.last_access <= self.inner.ttl || dirty {
                    entry.last_access = now;
                    tracing::debug!("Profile cache hit for {}", player_id);
                    return Ok(Some(entry.profile.clone()));
                }
                tracing::debug!("Cached profile for {} is stale", player_id);
                state.entries.remove(&player_id);
            }

            match state.loads.get(&player_id) {
                Some(load) => load.clone(),
                None => {
                    tracing::debug!("Profile cache miss for {}, loading", player_id);
                    let load = self.start_load(&state, player_id);
                    state.loads.insert(player_id, load.clone());
                    load
                }
            }
        };

        let loaded = load.clone().await;

        let now = self.inner.clock.now();
        let mut state = self.lock();
        let current = state
            .loads
            .get(&player_id)
            .is_some_and(|l| l.ptr_eq(&load));
        if current {
            state.loads.remove(&player_id);
        }

        // A put that landed while the load was in flight is newer than
        // anything the store returned.
        if let Some(entry) = state.entries.get_mut(&player_id) {
            entry.last_access = now;
            return Ok(Some(entry.profile.clone()));
        }

        let loaded = loaded?;
        if let (true, Some(profile)) = (current, &loaded) {
            state.entries.insert(
                player_id,
                CacheEntry {
                    profile: profile.clone(),
                    last_access: now,
                },
            );
            self.enforce_capacity(&mut state, player_id);
        }
        Ok(loaded)
    }

    fn start_load(&self, state: &CacheState, player_id: Uuid) -> SharedLoad {
        let store = Arc::clone(&self.inner.store);
        let ranks = Arc::clone(&self.inner.ranks);
        let retry = self.inner.retry.clone();
        let writes = state
            .queues
            .get(&player_id)
            .filter(|q| q.pending.load(Ordering::SeqCst) > 0)
            .and_then(PersistQueue::barrier);

        async move {
            if let Some(writes) = writes {
                let _ = writes.await;
            }
            let loaded = retry
                .run("load profile", || store.find_by_id(player_id))
                .await?;
            Ok(loaded.map(|mut profile| {
                profile.rank = ranks.primary_rank(player_id);
                profile
            }))
        }
        .boxed()
        .shared()
    }

    fn store_entry(&self, state: &mut CacheState, profile: PlayerProfile, now: DateTime<Utc>) {
        let player_id = profile.player_id;
        state.entries.insert(
            player_id,
            CacheEntry {
                profile: profile.clone(),
                last_access: now,
            },
        );
        self.enqueue(state, profile);
        self.enforce_capacity(state, player_id);
    }

    /// Queues a save behind every earlier one for the same player, starting
    /// the player's worker if needed.
    fn enqueue<'a>(&self, state: &'a mut CacheState, profile: PlayerProfile) -> &'a PersistQueue {
        let player_id = profile.player_id;
        let queue = state
            .queues
            .entry(player_id)
            .or_insert_with(|| self.spawn_worker(player_id));
        queue.pending.fetch_add(1, Ordering::SeqCst);
        if queue.tx.send(PersistJob::Save(profile)).is_err() {
            queue.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::error!("Persist worker for {} is gone; write dropped", player_id);
        }
        queue
    }

    fn spawn_worker(&self, player_id: Uuid) -> PersistQueue {
        let (tx, mut rx) = mpsc::unbounded_channel::<PersistJob>();
        let pending = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicBool::new(false));
        let store = Arc::clone(&self.inner.store);
        let retry = self.inner.retry.clone();
        let worker_pending = Arc::clone(&pending);
        let worker_failed = Arc::clone(&failed);

        self.inner.runtime.spawn(async move {
            while let Some(job) = rx.recv().await {
                let mut profile = match job {
                    PersistJob::Save(profile) => profile,
                    PersistJob::Barrier(reply) => {
                        let _ = reply.send(!worker_failed.load(Ordering::SeqCst));
                        continue;
                    }
                };

                // Saves already queued behind this one supersede it.
                let mut saves = 1;
                let mut replies = Vec::new();
                while let Ok(next) = rx.try_recv() {
                    match next {
                        PersistJob::Save(newer) => {
                            profile = newer;
                            saves += 1;
                        }
                        PersistJob::Barrier(reply) => replies.push(reply),
                    }
                }

                let what = format!("persist profile {}", player_id);
                let saved = match retry.run(&what, || store.save(&profile)).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!(
                            "Giving up on persisting profile {}; keeping cached value: {}",
                            player_id,
                            e
                        );
                        false
                    }
                };
                worker_failed.store(!saved, Ordering::SeqCst);
                worker_pending.fetch_sub(saves, Ordering::SeqCst);
                for reply in replies {
                    let _ = reply.send(saved);
                }
            }
        });

        PersistQueue {
            tx,
            pending,
            failed,
        }
    }

    /// Evicts least recently used clean entries while over capacity. Dirty
    /// entries and `keep` are never chosen, so the bound is soft.
    fn enforce_capacity(&self, state: &mut CacheState, keep: Uuid) {
        while state.entries.len() > self.inner.max_entries {
            let victim = state
                .entries
                .iter()
                .filter(|(id, _)| **id != keep && !state.is_dirty(id))
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(id, _)| *id);
            let Some(victim) = victim else {
                break;
            };
            state.entries.remove(&victim);
            state.queues.remove(&victim);
            tracing::debug!("Evicted profile {} to stay within capacity", victim);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;
    use vanity_core::clock::ManualClock;

    // Mock ProfileRepository for testing
    #[derive(Default)]
    struct MockProfileRepository {
        profiles: Mutex<HashMap<Uuid, PlayerProfile>>,
        loads: AtomicU32,
        saves: AtomicU32,
        failing_saves: AtomicU32,
        load_delay: Option<Duration>,
    }

    #[async_trait::async_trait]
    impl ProfileRepository for MockProfileRepository {
        async fn find_by_id(&self, player_id: Uuid) -> Result<Option<PlayerProfile>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.load_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.profiles.lock().unwrap().get(&player_id).cloned())
        }

        async fn save(&self, profile: &PlayerProfile) -> Result<()> {
            if self.failing_saves.load(Ordering::SeqCst) > 0 {
                self.failing_saves.fetch_sub(1, Ordering::SeqCst);
                return Err(VanityError::store("connection reset"));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.profiles
                .lock()
                .unwrap()
                .insert(profile.player_id, profile.clone());
            Ok(())
        }
    }

    struct FixedRank(&'static str);

    impl RankProvider for FixedRank {
        fn primary_rank(&self, _player_id: Uuid) -> String {
            self.0.to_string()
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            attempt_timeout: Duration::from_secs(5),
        }
    }

    fn cache_with(
        store: Arc<MockProfileRepository>,
        clock: Arc<ManualClock>,
        max_entries: usize,
        max_attempts: u32,
    ) -> ProfileCache {
        let settings = CacheSettings {
            ttl_secs: 60,
            max_entries,
            sweep_interval_secs: 60,
        };
        ProfileCache::new(
            store,
            Arc::new(FixedRank("member")),
            clock,
            &settings,
            fast_retry(max_attempts),
        )
        .unwrap()
    }

    fn setup() -> (ProfileCache, Arc<MockProfileRepository>, Arc<ManualClock>) {
        let store = Arc::new(MockProfileRepository::default());
        let clock = Arc::new(ManualClock::new(start()));
        let cache = cache_with(store.clone(), clock.clone(), 100, 3);
        (cache, store, clock)
    }

    fn stored(store: &MockProfileRepository, profile: PlayerProfile) {
        store
            .profiles
            .lock()
            .unwrap()
            .insert(profile.player_id, profile);
    }

    #[tokio::test]
    async fn test_read_your_writes_before_persist() {
        let (cache, store, _clock) = setup();
        let id = Uuid::new_v4();
        let mut profile = cache.get_or_create(id, "Steve").await.unwrap();

        profile.set_name_color("ruby_tone", start());
        cache.put(profile.clone());

        assert_eq!(cache.get(id).await.unwrap().name_color(), Some("ruby_tone"));
        assert!(cache.flush(id).await);
        assert_eq!(
            store.profiles.lock().unwrap()[&id].name_color(),
            Some("ruby_tone")
        );
    }

    #[tokio::test]
    async fn test_get_missing_profile_is_not_found() {
        let (cache, _store, _clock) = setup();
        let err = cache.get(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_or_create_uses_rank_provider() {
        let (cache, _store, _clock) = setup();
        let profile = cache.get_or_create(Uuid::new_v4(), "Alex").await.unwrap();
        assert_eq!(profile.rank, "member");
        assert_eq!(profile.username, "Alex");
    }

    #[tokio::test]
    async fn test_ttl_expiry_reloads_from_store() {
        let (cache, store, clock) = setup();
        let id = Uuid::new_v4();
        stored(&store, PlayerProfile::new(id, "Steve", "old", start()));

        cache.get(id).await.unwrap();
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);

        clock.advance(chrono::Duration::seconds(30));
        cache.get(id).await.unwrap();
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);

        // Another process changed the record.
        let mut changed = PlayerProfile::new(id, "Steve", "old", start());
        changed.set_suffix(Some("star".to_string()), start());
        stored(&store, changed);

        clock.advance(chrono::Duration::seconds(61));
        let reloaded = cache.get(id).await.unwrap();
        assert_eq!(store.loads.load(Ordering::SeqCst), 2);
        assert_eq!(reloaded.suffix_id.as_deref(), Some("star"));
        assert_eq!(reloaded.rank, "member");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_share_one_load() {
        let store = Arc::new(MockProfileRepository {
            load_delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let id = Uuid::new_v4();
        stored(&store, PlayerProfile::new(id, "Steve", "member", start()));
        let cache = cache_with(store.clone(), Arc::new(ManualClock::new(start())), 100, 3);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get(id).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().username, "Steve");
        }

        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let (cache, store, _clock) = setup();
        let id = Uuid::new_v4();
        stored(&store, PlayerProfile::new(id, "Steve", "member", start()));

        cache.get(id).await.unwrap();
        cache.invalidate(id);
        assert!(cache.peek(id).is_none());
        cache.get(id).await.unwrap();

        assert_eq!(store.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_waits_for_queued_writes() {
        let (cache, _store, _clock) = setup();
        let id = Uuid::new_v4();
        let mut profile = cache.get_or_create(id, "Steve").await.unwrap();
        profile.set_prefix(Some("vip".to_string()), start());
        cache.put(profile);

        cache.invalidate(id);
        let reloaded = cache.get(id).await.unwrap();
        assert_eq!(reloaded.prefix_id.as_deref(), Some("vip"));
    }

    #[tokio::test]
    async fn test_persist_order_is_submission_order() {
        let (cache, store, _clock) = setup();
        let id = Uuid::new_v4();
        let mut profile = cache.get_or_create(id, "Steve").await.unwrap();

        for n in 0..20 {
            profile.set_nickname(Some(format!("nick{}", n)), start());
            cache.put(profile.clone());
        }
        assert!(cache.flush(id).await);

        assert_eq!(
            store.profiles.lock().unwrap()[&id].nickname.as_deref(),
            Some("nick19")
        );
    }

    #[tokio::test]
    async fn test_persist_retries_then_succeeds() {
        let (cache, store, _clock) = setup();
        store.failing_saves.store(2, Ordering::SeqCst);
        let id = Uuid::new_v4();
        cache.put(PlayerProfile::new(id, "Steve", "member", start()));

        assert!(cache.flush(id).await);
        assert!(!cache.has_unsaved_changes(id));
        assert!(store.profiles.lock().unwrap().contains_key(&id));
    }

    #[tokio::test]
    async fn test_exhausted_retries_keep_cached_value() {
        let (cache, store, clock) = setup();
        store.failing_saves.store(3, Ordering::SeqCst);
        let id = Uuid::new_v4();
        cache.put(PlayerProfile::new(id, "Steve", "member", start()));

        assert!(!cache.flush(id).await);
        assert!(cache.has_unsaved_changes(id));

        // Idle past the TTL: the sweep retries the save instead of dropping it.
        clock.advance(chrono::Duration::seconds(120));
        let report = cache.evict_idle().await;
        assert_eq!(report, EvictionReport { evicted: 1, retained: 0 });
        assert!(store.profiles.lock().unwrap().contains_key(&id));
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_unpersistable_entries() {
        let (cache, store, clock) = setup();
        store.failing_saves.store(100, Ordering::SeqCst);
        let id = Uuid::new_v4();
        cache.put(PlayerProfile::new(id, "Steve", "member", start()));

        clock.advance(chrono::Duration::seconds(120));
        let report = cache.evict_idle().await;
        assert_eq!(report, EvictionReport { evicted: 0, retained: 1 });
        assert!(cache.peek(id).is_some());
    }

    #[tokio::test]
    async fn test_evict_idle_drops_only_stale_entries() {
        let (cache, _store, clock) = setup();
        let old = Uuid::new_v4();
        let recent = Uuid::new_v4();
        cache.get_or_create(old, "Old").await.unwrap();
        clock.advance(chrono::Duration::seconds(45));
        cache.get_or_create(recent, "Recent").await.unwrap();

        clock.advance(chrono::Duration::seconds(30));
        let report = cache.evict_idle().await;

        assert_eq!(report.evicted, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.peek(recent).is_some());
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used_clean_entry() {
        let store = Arc::new(MockProfileRepository::default());
        let clock = Arc::new(ManualClock::new(start()));
        let cache = cache_with(store, clock.clone(), 2, 3);

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        for id in [a, b] {
            cache.get_or_create(id, "player").await.unwrap();
            assert!(cache.flush(id).await);
            clock.advance(chrono::Duration::seconds(1));
        }
        cache.get(a).await.unwrap();
        clock.advance(chrono::Duration::seconds(1));

        cache.get_or_create(c, "player").await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.peek(b).is_none());
        assert!(cache.peek(a).is_some());
    }

    #[tokio::test]
    async fn test_flush_all_persists_everything() {
        let (cache, store, _clock) = setup();
        for name in ["a", "b", "c"] {
            cache.put(PlayerProfile::new(Uuid::new_v4(), name, "member", start()));
        }

        let report = cache.flush_all().await;

        assert_eq!(report, FlushReport { persisted: 3, failed: 0 });
        assert_eq!(store.profiles.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_modify_applies_on_latest_value() {
        let (cache, _store, _clock) = setup();
        let id = Uuid::new_v4();
        cache.get_or_create(id, "Steve").await.unwrap();

        cache
            .modify(id, |p| {
                p.set_prefix(Some("vip".to_string()), start());
                Ok(())
            })
            .await
            .unwrap();
        let updated = cache
            .modify(id, |p| {
                p.set_suffix(Some("star".to_string()), start());
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(updated.prefix_id.as_deref(), Some("vip"));
        assert_eq!(updated.suffix_id.as_deref(), Some("star"));
    }
}
