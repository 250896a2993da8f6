//! Rank access rules and per-user overrides.

use crate::style::StyleKind;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Group/category entry meaning "every currently known name".
pub const WILDCARD: &str = "*";

/// A yes/no feature gate derived from a rank's rule flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    Color,
    Gradient,
    SpecialColor,
    Prefix,
    Suffix,
    Nickname,
    CustomTags,
    CustomColor,
}

impl Capability {
    /// The gate guarding selection of options of `kind`.
    pub fn for_kind(kind: StyleKind) -> Self {
        match kind {
            StyleKind::SolidColor => Capability::Color,
            StyleKind::GradientColor => Capability::Gradient,
            StyleKind::SpecialColor => Capability::SpecialColor,
            StyleKind::Prefix => Capability::Prefix,
            StyleKind::Suffix => Capability::Suffix,
        }
    }
}

/// Feature flags granted to a rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankPermissions {
    pub color: bool,
    pub gradient: bool,
    pub special_color: bool,
    pub prefix: bool,
    pub suffix: bool,
    pub nickname: bool,
    pub custom_tags: bool,
    pub custom_color: bool,
}

impl RankPermissions {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Color => self.color,
            Capability::Gradient => self.gradient,
            Capability::SpecialColor => self.special_color,
            Capability::Prefix => self.prefix,
            Capability::Suffix => self.suffix,
            Capability::Nickname => self.nickname,
            Capability::CustomTags => self.custom_tags,
            Capability::CustomColor => self.custom_color,
        }
    }
}

/// Per-rank overrides of the global text limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankLimits {
    pub nickname_max_length: Option<usize>,
    pub nickname_cooldown_secs: Option<u64>,
    pub tag_min_length: Option<usize>,
    pub tag_max_length: Option<usize>,
}

/// What a rank may access.
///
/// Rules are kept in declaration order; that order drives catalog generation
/// and therefore the presentation order of resolved options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankAccessRule {
    pub name: String,
    /// Word groups whose base words this rank may use. `"*"` means all.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Style categories this rank may use. `"*"` means all.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Explicit option ids granted outright.
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub allow: RankPermissions,
    /// Named capabilities matched against an option's `required_capability`.
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub limits: RankLimits,
}

impl RankAccessRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
            categories: Vec::new(),
            options: Vec::new(),
            allow: RankPermissions::default(),
            capabilities: Vec::new(),
            limits: RankLimits::default(),
        }
    }

    pub fn has_capability_named(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c == name)
    }

    /// Structural checks beyond what deserialization enforces.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("rank name must not be empty".to_string());
        }
        if let (Some(min), Some(max)) = (self.limits.tag_min_length, self.limits.tag_max_length) {
            if min > max {
                return Err(format!(
                    "rank '{}': tag_min_length {} exceeds tag_max_length {}",
                    self.name, min, max
                ));
            }
        }
        Ok(())
    }
}

/// A bespoke, user-scoped option declared in an override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomOptionConfig {
    pub id: String,
    pub display_name: String,
    pub kind: StyleKind,
    pub value: String,
}

/// Per-username access adjustments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOverride {
    pub username: String,
    /// Groups added on top of the rank's groups.
    #[serde(default)]
    pub additional_groups: Vec<String>,
    /// When present, replaces the rank's groups (and `additional_groups`).
    #[serde(default)]
    pub override_groups: Option<Vec<String>>,
    #[serde(default, rename = "custom")]
    pub custom_options: Vec<CustomOptionConfig>,
}

impl UserOverride {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("override username must not be empty".to_string());
        }
        for custom in &self.custom_options {
            if custom.id.trim().is_empty() {
                return Err(format!(
                    "user '{}': custom option id must not be empty",
                    self.username
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_from_toml() {
        let rule: RankAccessRule = toml::from_str(
            r#"
            name = "devoted"
            groups = ["gems", "*"]
            categories = ["shimmer"]
            allow = { color = true, custom_tags = true }
            limits = { tag_min_length = 2, tag_max_length = 12 }
            "#,
        )
        .unwrap();

        assert!(rule.groups.iter().any(|g| g == WILDCARD));
        assert!(rule.allow.allows(Capability::Color));
        assert!(rule.allow.allows(Capability::CustomTags));
        assert!(!rule.allow.allows(Capability::Gradient));
        assert_eq!(rule.limits.tag_max_length, Some(12));
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_rule_rejects_inverted_tag_limits() {
        let mut rule = RankAccessRule::new("vip");
        rule.limits.tag_min_length = Some(8);
        rule.limits.tag_max_length = Some(4);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_capability_for_kind() {
        assert_eq!(Capability::for_kind(StyleKind::Suffix), Capability::Suffix);
        assert_eq!(
            Capability::for_kind(StyleKind::GradientColor),
            Capability::Gradient
        );
    }
}
