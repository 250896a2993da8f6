//! PlayerProfile domain model.
//!
//! One customization record per player, keyed by player id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The color treatment of a player's display name.
///
/// A single enum keeps solid colors and gradients mutually exclusive: choosing
/// one replaces the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameStyle {
    /// A catalog color option id (solid or special).
    Color(String),
    /// A catalog gradient option id.
    Gradient(String),
    /// A raw `#RRGGBB` value accepted through the custom color path.
    CustomColor(String),
}

/// A player's customization record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player_id: Uuid,
    pub username: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub name_style: Option<NameStyle>,
    /// Catalog prefix option id. Mutually exclusive with `custom_tag`.
    #[serde(default)]
    pub prefix_id: Option<String>,
    /// Staff-approved bespoke prefix text.
    #[serde(default)]
    pub custom_tag: Option<String>,
    #[serde(default)]
    pub suffix_id: Option<String>,
    pub rank: String,
    #[serde(default)]
    pub pending_tag_request_id: Option<Uuid>,
    #[serde(default)]
    pub last_nickname_change_at: Option<DateTime<Utc>>,
    pub last_updated_at: DateTime<Utc>,
}

impl PlayerProfile {
    /// Creates a profile with every optional field absent.
    pub fn new(
        player_id: Uuid,
        username: impl Into<String>,
        rank: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            player_id,
            username: username.into(),
            nickname: None,
            name_style: None,
            prefix_id: None,
            custom_tag: None,
            suffix_id: None,
            rank: rank.into(),
            pending_tag_request_id: None,
            last_nickname_change_at: None,
            last_updated_at: now,
        }
    }

    pub fn name_color(&self) -> Option<&str> {
        match &self.name_style {
            Some(NameStyle::Color(id)) | Some(NameStyle::CustomColor(id)) => Some(id),
            _ => None,
        }
    }

    pub fn name_gradient(&self) -> Option<&str> {
        match &self.name_style {
            Some(NameStyle::Gradient(id)) => Some(id),
            _ => None,
        }
    }

    /// Sets a catalog color and clears any gradient.
    pub fn set_name_color(&mut self, option_id: impl Into<String>, now: DateTime<Utc>) {
        self.name_style = Some(NameStyle::Color(option_id.into()));
        self.touch(now);
    }

    /// Sets a catalog gradient and clears any color.
    pub fn set_name_gradient(&mut self, option_id: impl Into<String>, now: DateTime<Utc>) {
        self.name_style = Some(NameStyle::Gradient(option_id.into()));
        self.touch(now);
    }

    pub fn set_custom_color(&mut self, hex: impl Into<String>, now: DateTime<Utc>) {
        self.name_style = Some(NameStyle::CustomColor(hex.into()));
        self.touch(now);
    }

    pub fn clear_name_style(&mut self, now: DateTime<Utc>) {
        self.name_style = None;
        self.touch(now);
    }

    /// Selects a catalog prefix, replacing an approved custom tag.
    pub fn set_prefix(&mut self, option_id: Option<String>, now: DateTime<Utc>) {
        if option_id.is_some() {
            self.custom_tag = None;
        }
        self.prefix_id = option_id;
        self.touch(now);
    }

    /// Applies approved custom tag text, replacing a catalog prefix.
    pub fn apply_custom_tag(&mut self, text: impl Into<String>, now: DateTime<Utc>) {
        self.custom_tag = Some(text.into());
        self.prefix_id = None;
        self.touch(now);
    }

    pub fn set_suffix(&mut self, option_id: Option<String>, now: DateTime<Utc>) {
        self.suffix_id = option_id;
        self.touch(now);
    }

    /// Sets or clears the nickname and stamps the nickname cooldown.
    pub fn set_nickname(&mut self, nickname: Option<String>, now: DateTime<Utc>) {
        self.nickname = nickname;
        self.last_nickname_change_at = Some(now);
        self.touch(now);
    }

    /// Removes the nickname without stamping the cooldown.
    pub fn clear_nickname(&mut self, now: DateTime<Utc>) {
        self.nickname = None;
        self.touch(now);
    }

    /// Clears every cosmetic selection.
    ///
    /// The pending request pointer and the nickname cooldown stamp survive a
    /// reset; neither is a cosmetic.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.nickname = None;
        self.name_style = None;
        self.prefix_id = None;
        self.custom_tag = None;
        self.suffix_id = None;
        self.touch(now);
    }

    /// The name shown in chat: nickname when set, otherwise username.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn profile() -> PlayerProfile {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        PlayerProfile::new(Uuid::new_v4(), "Steve", "member", now)
    }

    #[test]
    fn test_color_and_gradient_are_exclusive() {
        let mut p = profile();
        let now = p.last_updated_at;

        p.set_name_color("ruby", now);
        assert_eq!(p.name_color(), Some("ruby"));
        assert_eq!(p.name_gradient(), None);

        p.set_name_gradient("ruby_shimmer", now);
        assert_eq!(p.name_color(), None);
        assert_eq!(p.name_gradient(), Some("ruby_shimmer"));
    }

    #[test]
    fn test_custom_tag_replaces_prefix() {
        let mut p = profile();
        let now = p.last_updated_at;

        p.set_prefix(Some("vip".to_string()), now);
        p.apply_custom_tag("CHAMPION", now);
        assert_eq!(p.prefix_id, None);
        assert_eq!(p.custom_tag.as_deref(), Some("CHAMPION"));

        p.set_prefix(Some("vip".to_string()), now);
        assert_eq!(p.custom_tag, None);
    }

    #[test]
    fn test_reset_keeps_bookkeeping() {
        let mut p = profile();
        let now = p.last_updated_at;
        let request = Uuid::new_v4();

        p.set_nickname(Some("Stevie".to_string()), now);
        p.set_name_color("ruby", now);
        p.set_suffix(Some("star".to_string()), now);
        p.pending_tag_request_id = Some(request);

        p.reset(now);

        assert_eq!(p.nickname, None);
        assert_eq!(p.name_style, None);
        assert_eq!(p.suffix_id, None);
        assert_eq!(p.pending_tag_request_id, Some(request));
        assert_eq!(p.last_nickname_change_at, Some(now));
        assert_eq!(p.display_name(), "Steve");
    }
}
