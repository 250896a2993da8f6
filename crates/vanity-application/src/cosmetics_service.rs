//! Player-facing selection operations.
//!
//! Every mutation is authorized against the live rank and catalog, then
//! applied through [`ProfileCache::modify`] so it is visible immediately and
//! persisted in order.

use std::sync::Arc;
use uuid::Uuid;
use vanity_core::access::Capability;
use vanity_core::clock::Clock;
use vanity_core::profile::PlayerProfile;
use vanity_core::style::{StyleKind, StyleOption};
use vanity_core::{ConflictReason, Result, VanityError};

use crate::access_resolver::AccessResolver;
use crate::catalog_service::CatalogService;
use crate::profile_cache::ProfileCache;

const COLOR_KINDS: [StyleKind; 2] = [StyleKind::SolidColor, StyleKind::SpecialColor];

pub struct CosmeticsService {
    cache: ProfileCache,
    resolver: Arc<AccessResolver>,
    catalog: Arc<CatalogService>,
    clock: Arc<dyn Clock>,
}

impl CosmeticsService {
    pub fn new(
        cache: ProfileCache,
        resolver: Arc<AccessResolver>,
        catalog: Arc<CatalogService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            resolver,
            catalog,
            clock,
        }
    }

    /// Loads or creates the player's profile on first contact.
    pub async fn player_joined(&self, player_id: Uuid, username: &str) -> Result<PlayerProfile> {
        self.cache.get_or_create(player_id, username).await
    }

    pub async fn profile(&self, player_id: Uuid) -> Result<PlayerProfile> {
        self.cache.get(player_id).await
    }

    pub async fn available_options(
        &self,
        player_id: Uuid,
        kind: StyleKind,
    ) -> Result<Vec<StyleOption>> {
        let profile = self.cache.get(player_id).await?;
        Ok(self
            .resolver
            .available_options(player_id, &profile.username, kind))
    }

    /// Selects a solid or special color, replacing any gradient.
    pub async fn select_color(&self, player_id: Uuid, option_id: &str) -> Result<PlayerProfile> {
        let option = self.authorize(player_id, &COLOR_KINDS, option_id).await?;
        let now = self.clock.now();
        self.cache
            .modify(player_id, |p| {
                p.set_name_color(option.id, now);
                Ok(())
            })
            .await
    }

    /// Selects a gradient, replacing any color.
    pub async fn select_gradient(&self, player_id: Uuid, option_id: &str) -> Result<PlayerProfile> {
        let option = self
            .authorize(player_id, &[StyleKind::GradientColor], option_id)
            .await?;
        let now = self.clock.now();
        self.cache
            .modify(player_id, |p| {
                p.set_name_gradient(option.id, now);
                Ok(())
            })
            .await
    }

    /// Sets a raw `#RRGGBB` name color.
    pub async fn set_custom_color(&self, player_id: Uuid, hex: &str) -> Result<PlayerProfile> {
        self.resolver.accept_custom_color(player_id, hex)?;
        let now = self.clock.now();
        self.cache
            .modify(player_id, |p| {
                p.set_custom_color(hex, now);
                Ok(())
            })
            .await
    }

    pub async fn clear_color(&self, player_id: Uuid) -> Result<PlayerProfile> {
        let now = self.clock.now();
        self.cache
            .modify(player_id, |p| {
                p.clear_name_style(now);
                Ok(())
            })
            .await
    }

    /// Selects a catalog prefix, replacing an approved custom tag.
    pub async fn select_prefix(&self, player_id: Uuid, option_id: &str) -> Result<PlayerProfile> {
        let option = self
            .authorize(player_id, &[StyleKind::Prefix], option_id)
            .await?;
        let now = self.clock.now();
        self.cache
            .modify(player_id, |p| {
                p.set_prefix(Some(option.id), now);
                Ok(())
            })
            .await
    }

    pub async fn clear_prefix(&self, player_id: Uuid) -> Result<PlayerProfile> {
        let now = self.clock.now();
        self.cache
            .modify(player_id, |p| {
                p.set_prefix(None, now);
                p.custom_tag = None;
                Ok(())
            })
            .await
    }

    pub async fn select_suffix(&self, player_id: Uuid, option_id: &str) -> Result<PlayerProfile> {
        let option = self
            .authorize(player_id, &[StyleKind::Suffix], option_id)
            .await?;
        let now = self.clock.now();
        self.cache
            .modify(player_id, |p| {
                p.set_suffix(Some(option.id), now);
                Ok(())
            })
            .await
    }

    pub async fn clear_suffix(&self, player_id: Uuid) -> Result<PlayerProfile> {
        let now = self.clock.now();
        self.cache
            .modify(player_id, |p| {
                p.set_suffix(None, now);
                Ok(())
            })
            .await
    }

    /// Sets a nickname.
    ///
    /// # Returns
    ///
    /// - `Err(VanityError::Validation)`: Missing capability or the text breaks
    ///   the rank's nickname policy
    /// - `Err(VanityError::Conflict)`: The rank's nickname cooldown has not
    ///   elapsed since the last change
    pub async fn set_nickname(&self, player_id: Uuid, nickname: &str) -> Result<PlayerProfile> {
        let rank = self.resolver.require(player_id, Capability::Nickname)?;
        let snapshot = self.catalog.snapshot();
        snapshot.nickname_policy_for(&rank).check(nickname)?;
        let cooldown = snapshot.nickname_cooldown_for(&rank);

        let now = self.clock.now();
        self.cache
            .modify(player_id, |p| {
                if let Some(last) = p.last_nickname_change_at {
                    let elapsed = now - last;
                    if elapsed < cooldown {
                        return Err(VanityError::conflict(
                            ConflictReason::NicknameCooldown,
                            format!(
                                "nickname can change again in {}s",
                                (cooldown - elapsed).num_seconds()
                            ),
                        ));
                    }
                }
                p.set_nickname(Some(nickname.to_string()), now);
                Ok(())
            })
            .await
    }

    /// Removes the nickname. Always allowed and leaves the cooldown alone.
    pub async fn clear_nickname(&self, player_id: Uuid) -> Result<PlayerProfile> {
        let now = self.clock.now();
        self.cache
            .modify(player_id, |p| {
                p.clear_nickname(now);
                Ok(())
            })
            .await
    }

    /// Clears every cosmetic selection.
    pub async fn reset(&self, player_id: Uuid) -> Result<PlayerProfile> {
        let now = self.clock.now();
        let profile = self
            .cache
            .modify(player_id, |p| {
                p.reset(now);
                Ok(())
            })
            .await?;
        tracing::info!("Reset cosmetics for {} ({})", profile.username, player_id);
        Ok(profile)
    }

    /// Drops the cached profile after an external rank change so the next
    /// read picks up the new rank.
    pub fn rank_changed(&self, player_id: Uuid) {
        tracing::debug!("Rank changed for {}, invalidating profile", player_id);
        self.cache.invalidate(player_id);
    }

    async fn authorize(
        &self,
        player_id: Uuid,
        kinds: &[StyleKind],
        option_id: &str,
    ) -> Result<StyleOption> {
        let profile = self.cache.get(player_id).await?;
        self.resolver
            .authorize_selection(player_id, &profile.username, kinds, option_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use chrono::{Duration, TimeZone, Utc};
    use vanity_core::ValidationReason;
    use vanity_core::clock::ManualClock;
    use vanity_core::config::CacheSettings;
    use vanity_infrastructure::{InMemoryProfileRepository, StaticRankProvider, TomlConfigSource};

    const STYLES: &str = r##"
        [[group]]
        name = "gems"
        words = ["Ruby"]

        [[category]]
        name = "solid"
        kind = "solid_color"

        [[category.template]]
        name = "Tone"
        format = "{word}"

        [[category]]
        name = "gradient"
        kind = "gradient_color"

        [[category.template]]
        name = "Shimmer"
        format = "{word}>{word}"

        [[option]]
        id = "star"
        display_name = "Star"
        kind = "suffix"
        value = "*"
        ranks = ["member"]
    "##;

    const RANKS: &str = r#"
        [[rank]]
        name = "member"
        groups = ["gems"]
        categories = ["*"]
        [rank.allow]
        color = true
        gradient = true
        suffix = true
        nickname = true
        [rank.limits]
        nickname_max_length = 8
        nickname_cooldown_secs = 3600
    "#;

    const USERS: &str = r#"
        [[user]]
        username = "Steve"

        [[user.custom]]
        id = "steve_tag"
        display_name = "Steve's Tag"
        kind = "prefix"
        value = "[STEVE]"
    "#;

    struct Fixture {
        service: CosmeticsService,
        ranks: Arc<StaticRankProvider>,
        clock: Arc<ManualClock>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("styles.toml"), STYLES).unwrap();
        std::fs::write(dir.path().join("ranks.toml"), RANKS).unwrap();
        std::fs::write(dir.path().join("users.toml"), USERS).unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap(),
        ));
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
        let resolver = Arc::new(AccessResolver::new(catalog.clone(), ranks.clone()));
        Fixture {
            service: CosmeticsService::new(cache, resolver, catalog, clock.clone()),
            ranks,
            clock,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_color_and_gradient_replace_each_other() {
        let f = fixture();
        let player = Uuid::new_v4();
        f.service.player_joined(player, "Steve").await.unwrap();

        let p = f.service.select_color(player, "ruby_tone").await.unwrap();
        assert_eq!(p.name_color(), Some("ruby_tone"));

        let p = f
            .service
            .select_gradient(player, "ruby_shimmer")
            .await
            .unwrap();
        assert_eq!(p.name_color(), None);
        assert_eq!(p.name_gradient(), Some("ruby_shimmer"));
    }

    #[tokio::test]
    async fn test_selection_requires_capability() {
        let f = fixture();
        let player = Uuid::new_v4();
        f.service.player_joined(player, "Steve").await.unwrap();
        f.ranks.set_rank(player, "guest");

        let err = f.service.select_suffix(player, "star").await.unwrap_err();
        assert_eq!(
            err.validation_reason(),
            Some(ValidationReason::CapabilityMissing)
        );
        assert_eq!(f.service.profile(player).await.unwrap().suffix_id, None);
    }

    #[tokio::test]
    async fn test_unknown_player_is_not_found() {
        let f = fixture();
        let err = f
            .service
            .select_color(Uuid::new_v4(), "ruby_tone")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_nickname_policy_and_cooldown() {
        let f = fixture();
        let player = Uuid::new_v4();
        f.service.player_joined(player, "Steve").await.unwrap();

        let err = f
            .service
            .set_nickname(player, "FarTooLongName")
            .await
            .unwrap_err();
        assert_eq!(err.validation_reason(), Some(ValidationReason::TooLong));

        f.service.set_nickname(player, "Stevie").await.unwrap();
        let err = f.service.set_nickname(player, "Steve2").await.unwrap_err();
        assert_eq!(err.conflict_reason(), Some(ConflictReason::NicknameCooldown));

        f.service.clear_nickname(player).await.unwrap();
        f.clock.advance(Duration::seconds(3600));
        let p = f.service.set_nickname(player, "Steve2").await.unwrap();
        assert_eq!(p.display_name(), "Steve2");
    }

    #[tokio::test]
    async fn test_reset_and_rank_change() {
        let f = fixture();
        let player = Uuid::new_v4();
        f.service.player_joined(player, "Steve").await.unwrap();
        f.service.select_suffix(player, "star").await.unwrap();
        f.service.set_custom_color(player, "#12AB9f").await.unwrap_err();

        let p = f.service.reset(player).await.unwrap();
        assert_eq!(p.suffix_id, None);

        f.ranks.set_rank(player, "admin");
        f.service.rank_changed(player);
        assert_eq!(f.service.profile(player).await.unwrap().rank, "admin");
    }

    #[tokio::test]
    async fn test_bespoke_option_selectable_without_rank_capability() {
        let f = fixture();
        let steve = Uuid::new_v4();
        let alex = Uuid::new_v4();
        f.service.player_joined(steve, "Steve").await.unwrap();
        f.service.player_joined(alex, "Alex").await.unwrap();

        let listed: Vec<String> = f
            .service
            .available_options(steve, StyleKind::Prefix)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(listed, vec!["steve_tag".to_string()]);

        let p = f.service.select_prefix(steve, "steve_tag").await.unwrap();
        assert_eq!(p.prefix_id.as_deref(), Some("steve_tag"));

        let err = f.service.select_prefix(alex, "steve_tag").await.unwrap_err();
        assert_eq!(err.validation_reason(), Some(ValidationReason::UnknownOption));
    }
}
