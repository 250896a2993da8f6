//! Tag request repository trait.

use super::model::{TagRequest, TagRequestStatus};
use crate::error::Result;
use uuid::Uuid;

/// Durable storage for tag requests, kept apart from profiles.
///
/// # Implementation Notes
///
/// `transition` is a conditional write: it must only replace the stored record
/// when its status still equals `expected`. That check is what makes the first
/// of two racing reviews (or a review racing the expiry sweep) win.
#[async_trait::async_trait]
pub trait TagRequestRepository: Send + Sync {
    /// Finds a request by id.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(TagRequest))`: Request found
    /// - `Ok(None)`: No such request
    /// - `Err(_)`: Store failure
    async fn find_by_id(&self, request_id: Uuid) -> Result<Option<TagRequest>>;

    /// Inserts or replaces a request unconditionally.
    async fn save(&self, request: &TagRequest) -> Result<()>;

    /// Stores `request` only if the stored status is still `expected`.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: Request replaced
    /// - `Ok(false)`: Stored status differed (or the request is absent)
    /// - `Err(_)`: Store failure
    async fn transition(&self, request: &TagRequest, expected: TagRequestStatus) -> Result<bool>;

    /// All pending requests, oldest first.
    async fn list_pending(&self) -> Result<Vec<TagRequest>>;

    /// Every request a player has made, newest first.
    async fn list_by_player(&self, player_id: Uuid) -> Result<Vec<TagRequest>>;
}
