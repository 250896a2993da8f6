//! TOML-based ProfileRepository implementation.

use crate::storage::AtomicTomlFile;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use vanity_core::profile::{PlayerProfile, ProfileRepository};
use vanity_core::{Result, VanityError};

/// Stores each profile as its own TOML file.
///
/// ```text
/// base_dir/
/// └── profiles/
///     ├── <player-id>.toml
///     └── <player-id>.toml
/// ```
///
/// File work runs on Tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct TomlProfileRepository {
    profiles_dir: PathBuf,
}

impl TomlProfileRepository {
    /// Creates the repository, creating `base_dir/profiles` if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let profiles_dir = base_dir.as_ref().join("profiles");
        std::fs::create_dir_all(&profiles_dir)?;
        Ok(Self { profiles_dir })
    }

    fn file(&self, player_id: Uuid) -> AtomicTomlFile<PlayerProfile> {
        AtomicTomlFile::new(self.profiles_dir.join(format!("{}.toml", player_id)))
    }
}

#[async_trait::async_trait]
impl ProfileRepository for TomlProfileRepository {
    async fn find_by_id(&self, player_id: Uuid) -> Result<Option<PlayerProfile>> {
        let file = self.file(player_id);
        tokio::task::spawn_blocking(move || file.load().map_err(VanityError::from))
            .await
            .map_err(|e| VanityError::internal(format!("profile load task failed: {}", e)))?
    }

    async fn save(&self, profile: &PlayerProfile) -> Result<()> {
        let file = self.file(profile.player_id);
        let profile = profile.clone();
        tokio::task::spawn_blocking(move || file.save(&profile).map_err(VanityError::from))
            .await
            .map_err(|e| VanityError::internal(format!("profile save task failed: {}", e)))?
    }
}
