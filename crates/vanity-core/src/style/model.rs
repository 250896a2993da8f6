//! StyleOption domain model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use strum::{Display, EnumIter, EnumString};

/// What part of a player's presentation an option customizes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StyleKind {
    SolidColor,
    GradientColor,
    SpecialColor,
    Prefix,
    Suffix,
}


/// Frame data for animated options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animation {
    pub frames: Vec<String>,
    #[serde(default = "default_interval_ticks")]
    pub interval_ticks: u32,
}

fn default_interval_ticks() -> u32 {
    10
}

/// Where a compiled option came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum OptionOrigin {
    /// Synthesized from a base word and a category template.
    Generated,
    /// Declared verbatim in the styles file.
    Specific,
    /// Bespoke option from a per-user override.
    UserCustom,
}

/// One selectable customization value.
///
/// Equality and hashing use `id` only.
#[derive(Debug, Clone)]
pub struct StyleOption {
    pub id: String,
    pub display_name: String,
    pub kind: StyleKind,
    /// Opaque formatting payload handed to the renderer.
    pub value: String,
    /// Ranks that may use this option, accumulated across generation paths.
    pub allowed_ranks: BTreeSet<String>,
    /// Word groups the option was generated from. Empty for ungrouped
    /// specific options, which are gated by rank alone.
    pub groups: BTreeSet<String>,
    pub category: Option<String>,
    pub material: Option<String>,
    pub glow: bool,
    /// Season or event name gating availability.
    pub condition: Option<String>,
    pub animation: Option<Animation>,
    pub required_capability: Option<String>,
    pub origin: OptionOrigin,
}

impl StyleOption {
    pub fn is_allowed_for(&self, rank: &str) -> bool {
        self.allowed_ranks.contains(rank)
    }
}

impl PartialEq for StyleOption {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StyleOption {}

impl Hash for StyleOption {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Turns a display name into an option id: lowercase ASCII alphanumerics
/// joined by single underscores.
pub fn slugify(display_name: &str) -> String {
    let mut slug = String::with_capacity(display_name.len());
    let mut pending_sep = false;
    for ch in display_name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("option");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Ruby Shimmer"), "ruby_shimmer");
        assert_eq!(slugify("  Gold -- Star!! "), "gold_star");
        assert_eq!(slugify("★★"), "option");
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        assert_eq!(StyleKind::from_str("gradient_color").unwrap(), StyleKind::GradientColor);
        assert_eq!(StyleKind::SpecialColor.to_string(), "special_color");
    }
}
