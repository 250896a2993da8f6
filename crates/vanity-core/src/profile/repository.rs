//! Profile repository trait.
//!
//! Defines the interface for profile persistence operations.

use super::model::PlayerProfile;
use crate::error::Result;
use uuid::Uuid;

/// An abstract durable store for player profiles.
///
/// This trait decouples the profile cache from the specific storage mechanism
/// (e.g., TOML files, a relational database, a remote service).
///
/// # Implementation Notes
///
/// - `save` is an idempotent upsert keyed by `player_id`.
/// - Concurrent saves of the same key must be tolerated; the cache already
///   serializes its own writes per key.
#[async_trait::async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Finds a profile by player id.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(PlayerProfile))`: Profile found
    /// - `Ok(None)`: No profile stored for this player
    /// - `Err(_)`: Store failure
    async fn find_by_id(&self, player_id: Uuid) -> Result<Option<PlayerProfile>>;

    /// Saves (inserts or replaces) a profile.
    async fn save(&self, profile: &PlayerProfile) -> Result<()>;
}
