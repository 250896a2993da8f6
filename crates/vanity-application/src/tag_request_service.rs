//! Custom tag request lifecycle.
//!
//! ```text
//! PENDING ──approve──▶ APPROVED
//!    │ ───deny─────▶ DENIED
//!    └────expire───▶ EXPIRED
//! ```
//!
//! Every transition is a conditional store write against the `PENDING` status,
//! so whichever of two racing transitions lands first wins everywhere and the
//! other is reported as a conflict.

use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use vanity_core::access::Capability;
use vanity_core::clock::Clock;
use vanity_core::tag_request::{TagRequest, TagRequestRepository, TagRequestStatus};
use vanity_core::validation::check_rank_collision;
use vanity_core::{ConflictReason, Result, VanityError};

use crate::access_resolver::AccessResolver;
use crate::catalog_service::CatalogService;
use crate::profile_cache::ProfileCache;
use crate::retry::RetryPolicy;

/// Outcome of [`TagRequestService::expire_stale`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiryReport {
    pub scanned: usize,
    pub expired: usize,
    /// Requests reviewed by staff while the sweep was running.
    pub collisions: usize,
}

pub struct TagRequestService {
    requests: Arc<dyn TagRequestRepository>,
    cache: ProfileCache,
    resolver: Arc<AccessResolver>,
    catalog: Arc<CatalogService>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    submissions: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl TagRequestService {
    pub fn new(
        requests: Arc<dyn TagRequestRepository>,
        cache: ProfileCache,
        resolver: Arc<AccessResolver>,
        catalog: Arc<CatalogService>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            requests,
            cache,
            resolver,
            catalog,
            clock,
            retry,
            submissions: Mutex::new(HashMap::new()),
        }
    }

    /// Submits a custom tag for review.
    ///
    /// # Returns
    ///
    /// - `Ok(TagRequest)`: The new pending request
    /// - `Err(VanityError::Conflict)`: A request is already pending, or the
    ///   last denial is still inside the cooldown
    /// - `Err(VanityError::Validation)`: Missing capability, or the text fails
    ///   length, character, forbidden word or rank name checks
    /// - `Err(VanityError::NotFound)`: The player has no profile
    pub async fn submit(&self, player_id: Uuid, text: &str) -> Result<TagRequest> {
        let gate = self.submission_lock(player_id);
        let _guard = gate.lock().await;

        let profile = self.cache.get(player_id).await?;
        let history = self
            .retry
            .run("list tag requests", || self.requests.list_by_player(player_id))
            .await?;

        if let Some(pending) = history.iter().find(|r| r.is_pending()) {
            return Err(VanityError::conflict(
                ConflictReason::PendingRequestExists,
                format!("request {} is still pending", pending.id),
            ));
        }

        let now = self.clock.now();
        let snapshot = self.catalog.snapshot();
        let cooldown = Duration::days(snapshot.tag_settings().cooldown_days);
        let last_denied = history
            .iter()
            .filter(|r| r.status == TagRequestStatus::Denied)
            .max_by_key(|r| r.reviewed_at);
        if let Some(remaining) = last_denied.and_then(|r| r.cooldown_remaining(cooldown, now)) {
            return Err(VanityError::conflict(
                ConflictReason::CooldownActive,
                format!(
                    "a denied request blocks resubmission for another {}h",
                    remaining.num_hours().max(1)
                ),
            ));
        }

        let rank = self.resolver.require(player_id, Capability::CustomTags)?;
        snapshot.tag_policy_for(&rank).check(text)?;
        check_rank_collision(text, snapshot.rank_names())?;

        let request = TagRequest::new(player_id, &profile.username, text, now);
        self.retry
            .run("save tag request", || self.requests.save(&request))
            .await?;

        let request_id = request.id;
        self.cache
            .modify(player_id, |p| {
                p.pending_tag_request_id = Some(request_id);
                Ok(())
            })
            .await?;

        tracing::info!(
            "Tag request {} submitted by {}: '{}'",
            request.id,
            request.player_name,
            request.requested_text
        );
        Ok(request)
    }

    /// Approves a pending request and applies the tag to the player.
    ///
    /// The status change is committed first; a failure to update the profile
    /// afterwards is logged and does not undo the approval.
    pub async fn approve(
        &self,
        request_id: Uuid,
        reviewer_id: Uuid,
        reviewer_name: &str,
    ) -> Result<TagRequest> {
        let mut request = self.load(request_id).await?;
        request.approve(reviewer_id, reviewer_name, self.clock.now())?;
        self.commit(&request).await?;

        let text = request.requested_text.clone();
        let now = self.clock.now();
        let updated = self
            .cache
            .modify(request.player_id, |p| {
                p.apply_custom_tag(text, now);
                if p.pending_tag_request_id == Some(request_id) {
                    p.pending_tag_request_id = None;
                }
                Ok(())
            })
            .await;
        if let Err(e) = updated {
            tracing::error!(
                "Tag request {} approved but profile {} was not updated: {}",
                request_id,
                request.player_id,
                e
            );
        }

        tracing::info!("Tag request {} approved by {}", request_id, reviewer_name);
        Ok(request)
    }

    pub async fn deny(
        &self,
        request_id: Uuid,
        reviewer_id: Uuid,
        reviewer_name: &str,
        reason: Option<String>,
    ) -> Result<TagRequest> {
        let mut request = self.load(request_id).await?;
        request.deny(reviewer_id, reviewer_name, reason, self.clock.now())?;
        self.commit(&request).await?;
        self.clear_pointer(&request).await;

        tracing::info!("Tag request {} denied by {}", request_id, reviewer_name);
        Ok(request)
    }

    /// Expires pending requests older than `max_age_days`.
    ///
    /// Running it again right away expires nothing more.
    pub async fn expire_stale(&self, max_age_days: i64) -> Result<ExpiryReport> {
        let now = self.clock.now();
        let max_age = Duration::days(max_age_days);
        let pending = self
            .retry
            .run("list pending tag requests", || self.requests.list_pending())
            .await?;

        let mut report = ExpiryReport {
            scanned: pending.len(),
            ..Default::default()
        };
        for mut request in pending {
            if request.age(now) <= max_age {
                continue;
            }
            if request.expire(now).is_err() {
                continue;
            }
            match self.requests.transition(&request, TagRequestStatus::Pending).await {
                Ok(true) => {
                    report.expired += 1;
                    self.clear_pointer(&request).await;
                }
                Ok(false) => {
                    report.collisions += 1;
                    tracing::warn!(
                        "Tag request {} was reviewed while expiring; keeping the review",
                        request.id
                    );
                }
                Err(e) => {
                    tracing::error!("Failed to expire tag request {}: {}", request.id, e);
                }
            }
        }

        if report.expired > 0 || report.collisions > 0 {
            tracing::info!(
                "Expired {} stale tag request(s) of {} pending ({} collision(s))",
                report.expired,
                report.scanned,
                report.collisions
            );
        }
        Ok(report)
    }

    /// Pending requests, oldest first.
    pub async fn pending(&self) -> Result<Vec<TagRequest>> {
        self.retry
            .run("list pending tag requests", || self.requests.list_pending())
            .await
    }

    /// Every request a player has made, newest first.
    pub async fn history(&self, player_id: Uuid) -> Result<Vec<TagRequest>> {
        self.retry
            .run("list tag requests", || self.requests.list_by_player(player_id))
            .await
    }

    pub async fn get(&self, request_id: Uuid) -> Result<TagRequest> {
        self.load(request_id).await
    }

    // ------------------------------------------------------------------------

    fn submission_lock(&self, player_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.submissions.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(player_id).or_default())
    }

    async fn load(&self, request_id: Uuid) -> Result<TagRequest> {
        self.retry
            .run("load tag request", || self.requests.find_by_id(request_id))
            .await?
            .ok_or_else(|| VanityError::not_found("tag request", request_id))
    }

    /// Writes a reviewed request if it is still pending in the store.
    async fn commit(&self, request: &TagRequest) -> Result<()> {
        if self
            .requests
            .transition(request, TagRequestStatus::Pending)
            .await?
        {
            return Ok(());
        }

        let stored = self
            .requests
            .find_by_id(request.id)
            .await
            .ok()
            .flatten()
            .map(|r| r.status.to_string())
            .unwrap_or_else(|| "missing".to_string());
        tracing::warn!(
            "Tag request {} could not become {}: already {}",
            request.id,
            request.status,
            stored
        );
        Err(VanityError::conflict(
            ConflictReason::InvalidState,
            format!("tag request {} is already {}", request.id, stored),
        ))
    }

    async fn clear_pointer(&self, request: &TagRequest) {
        let request_id = request.id;
        let cleared = self
            .cache
            .modify(request.player_id, |p| {
                if p.pending_tag_request_id == Some(request_id) {
                    p.pending_tag_request_id = None;
                }
                Ok(())
            })
            .await;
        match cleared {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => tracing::warn!(
                "Could not clear pending request on profile {}: {}",
                request.player_id,
                e
            ),
        }
    }
}
