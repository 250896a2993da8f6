//! TagRequest domain model.

use crate::error::{ConflictReason, Result, VanityError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TagRequestStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

impl TagRequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TagRequestStatus::Pending)
    }
}

/// A staff-reviewed request for a bespoke prefix.
///
/// Created `Pending`; moves exactly once to `Approved`, `Denied` or `Expired`
/// and is read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRequest {
    pub id: Uuid,
    pub player_id: Uuid,
    pub player_name: String,
    pub requested_text: String,
    pub status: TagRequestStatus,
    #[serde(default)]
    pub reviewer_id: Option<Uuid>,
    #[serde(default)]
    pub reviewer_name: Option<String>,
    #[serde(default)]
    pub deny_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl TagRequest {
    pub fn new(
        player_id: Uuid,
        player_name: impl Into<String>,
        requested_text: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            player_name: player_name.into(),
            requested_text: requested_text.into(),
            status: TagRequestStatus::Pending,
            reviewer_id: None,
            reviewer_name: None,
            deny_reason: None,
            requested_at: now,
            reviewed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TagRequestStatus::Pending
    }

    /// Time since submission.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.requested_at
    }

    /// Remaining wait before the player may resubmit after this request, if
    /// it was denied less than `cooldown` ago.
    pub fn cooldown_remaining(
        &self,
        cooldown: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Option<chrono::Duration> {
        if self.status != TagRequestStatus::Denied {
            return None;
        }
        let reviewed_at = self.reviewed_at?;
        let elapsed = now - reviewed_at;
        (elapsed < cooldown).then(|| cooldown - elapsed)
    }

    pub fn approve(
        &mut self,
        reviewer_id: Uuid,
        reviewer_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.review(TagRequestStatus::Approved, now)?;
        self.reviewer_id = Some(reviewer_id);
        self.reviewer_name = Some(reviewer_name.into());
        Ok(())
    }

    pub fn deny(
        &mut self,
        reviewer_id: Uuid,
        reviewer_name: impl Into<String>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.review(TagRequestStatus::Denied, now)?;
        self.reviewer_id = Some(reviewer_id);
        self.reviewer_name = Some(reviewer_name.into());
        self.deny_reason = reason;
        Ok(())
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.review(TagRequestStatus::Expired, now)
    }

    fn review(&mut self, to: TagRequestStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.is_pending() {
            return Err(VanityError::conflict(
                ConflictReason::InvalidState,
                format!("tag request {} is already {}", self.id, self.status),
            ));
        }
        self.status = to;
        self.reviewed_at = Some(now);
        Ok(())
    }
}
