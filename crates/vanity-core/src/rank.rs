//! Rank lookup interface.

use uuid::Uuid;

/// Resolves a player's primary rank.
///
/// Implementations front an external permission system and are treated as
/// eventually consistent. Lookups must be cheap and non-blocking; they are
/// called on every access resolution. When the external system reports a rank
/// change, hosts invalidate the player's cached profile.
pub trait RankProvider: Send + Sync {
    fn primary_rank(&self, player_id: Uuid) -> String;
}
