//! Live answers to "what may this player use right now".

use std::sync::Arc;
use uuid::Uuid;
use vanity_core::access::Capability;
use vanity_core::rank::RankProvider;
use vanity_core::style::{StyleKind, StyleOption};
use vanity_core::validation::validate_hex_color;
use vanity_core::{Result, ValidationReason, VanityError};

use crate::catalog_service::CatalogService;

/// Resolves options and feature gates against the active snapshot and the
/// player's current rank.
///
/// The rank is read from the [`RankProvider`] on every call, so rank changes
/// take effect without recompiling anything.
pub struct AccessResolver {
    catalog: Arc<CatalogService>,
    ranks: Arc<dyn RankProvider>,
}

impl AccessResolver {
    pub fn new(catalog: Arc<CatalogService>, ranks: Arc<dyn RankProvider>) -> Self {
        Self { catalog, ranks }
    }

    pub fn rank_of(&self, player_id: Uuid) -> String {
        self.ranks.primary_rank(player_id)
    }

    /// Options of `kind` the player may select, in stable catalog order,
    /// followed by their bespoke options.
    pub fn available_options(
        &self,
        player_id: Uuid,
        username: &str,
        kind: StyleKind,
    ) -> Vec<StyleOption> {
        let rank = self.rank_of(player_id);
        let snapshot = self.catalog.snapshot();
        self.catalog.with_conditions(&snapshot, |ctx| {
            snapshot.resolve(&rank, username, kind, ctx)
        })
    }

    /// Checks that the player may select `option_id` as one of `kinds`.
    ///
    /// Checks run in order: the id must name an option of an accepted kind,
    /// the rank must hold that kind's capability, and the option must be
    /// available to the player right now. The player's own bespoke options
    /// skip the last two checks, matching [`Self::available_options`].
    pub fn authorize_selection(
        &self,
        player_id: Uuid,
        username: &str,
        kinds: &[StyleKind],
        option_id: &str,
    ) -> Result<StyleOption> {
        let rank = self.rank_of(player_id);
        let snapshot = self.catalog.snapshot();

        let custom = snapshot.custom_options(username);
        let kind = kinds.iter().copied().find(|&kind| {
            snapshot.catalog().get(kind, option_id).is_some()
                || custom.iter().any(|o| o.kind == kind && o.id == option_id)
        });
        let Some(kind) = kind else {
            let exists = snapshot.catalog().find(option_id).is_some()
                || custom.iter().any(|o| o.id == option_id);
            return Err(if exists {
                VanityError::validation(
                    ValidationReason::WrongKind,
                    format!("'{}' is not a {}", option_id, describe_kinds(kinds)),
                )
            } else {
                VanityError::validation(
                    ValidationReason::UnknownOption,
                    format!("no option named '{}'", option_id),
                )
            });
        };

        // Bespoke options are granted per user, not through the rank.
        if let Some(option) = custom.iter().find(|o| o.kind == kind && o.id == option_id) {
            return Ok(option.clone());
        }

        let capability = Capability::for_kind(kind);
        if !snapshot.has_capability(&rank, capability) {
            return Err(capability_missing(&rank, capability));
        }

        self.catalog
            .with_conditions(&snapshot, |ctx| {
                snapshot.resolve_one(&rank, username, kind, option_id, ctx)
            })
            .ok_or_else(|| {
                VanityError::validation(
                    ValidationReason::OptionUnavailable,
                    format!("'{}' is not available to rank '{}'", option_id, rank),
                )
            })
    }

    pub fn can_use(&self, player_id: Uuid, capability: Capability) -> bool {
        let rank = self.rank_of(player_id);
        self.catalog.snapshot().has_capability(&rank, capability)
    }

    pub fn can_use_color(&self, player_id: Uuid) -> bool {
        self.can_use(player_id, Capability::Color)
    }

    pub fn can_use_gradient(&self, player_id: Uuid) -> bool {
        self.can_use(player_id, Capability::Gradient)
    }

    pub fn can_use_prefix(&self, player_id: Uuid) -> bool {
        self.can_use(player_id, Capability::Prefix)
    }

    pub fn can_use_suffix(&self, player_id: Uuid) -> bool {
        self.can_use(player_id, Capability::Suffix)
    }

    pub fn can_use_nickname(&self, player_id: Uuid) -> bool {
        self.can_use(player_id, Capability::Nickname)
    }

    pub fn can_use_custom_tag(&self, player_id: Uuid) -> bool {
        self.can_use(player_id, Capability::CustomTags)
    }

    pub fn can_use_custom_color(&self, player_id: Uuid) -> bool {
        self.can_use(player_id, Capability::CustomColor)
    }

    /// Accepts a raw `#RRGGBB` color for ranks with the custom color gate.
    /// The value never has to exist in the catalog.
    pub fn accept_custom_color(&self, player_id: Uuid, hex: &str) -> Result<()> {
        let rank = self.rank_of(player_id);
        if !self
            .catalog
            .snapshot()
            .has_capability(&rank, Capability::CustomColor)
        {
            return Err(capability_missing(&rank, Capability::CustomColor));
        }
        validate_hex_color(hex)
    }

    /// Fails unless the player's rank holds `capability`.
    pub fn require(&self, player_id: Uuid, capability: Capability) -> Result<String> {
        let rank = self.rank_of(player_id);
        if self.catalog.snapshot().has_capability(&rank, capability) {
            Ok(rank)
        } else {
            Err(capability_missing(&rank, capability))
        }
    }
}

fn capability_missing(rank: &str, capability: Capability) -> VanityError {
    VanityError::validation(
        ValidationReason::CapabilityMissing,
        format!("rank '{}' may not use {}", rank, capability),
    )
}

fn describe_kinds(kinds: &[StyleKind]) -> String {
    kinds
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(" or ")
}
