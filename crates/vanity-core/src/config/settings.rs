//! Contents of `settings.toml`.
//!
//! Cache and persist settings are read once at startup. Tag, nickname and
//! season settings travel with each catalog snapshot and change on reload.

use crate::condition::Season;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum idle age of a cached profile.
    pub ttl_secs: u64,
    /// Soft bound on cached profiles.
    pub max_entries: usize,
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 30 * 60,
            max_entries: 500,
            sweep_interval_secs: 60,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistSettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Store calls running longer than this count as failures.
    pub store_timeout_ms: u64,
}

impl Default for PersistSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
            store_timeout_ms: 5_000,
        }
    }
}

impl PersistSettings {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagSettings {
    /// Minimum wait after a denial before the player may submit again.
    pub cooldown_days: i64,
    /// Pending requests older than this are expired by the sweeper.
    pub expire_after_days: i64,
    pub sweep_interval_secs: u64,
    pub min_length: usize,
    pub max_length: usize,
    /// Regex every submitted tag must match in full.
    pub allowed_pattern: String,
    /// Case-insensitive substrings that may not appear in a tag.
    pub forbidden_words: Vec<String>,
}

impl Default for TagSettings {
    fn default() -> Self {
        Self {
            cooldown_days: 7,
            expire_after_days: 30,
            sweep_interval_secs: 60 * 60,
            min_length: 2,
            max_length: 16,
            allowed_pattern: r"^[A-Za-z0-9 _&!.\-]+$".to_string(),
            forbidden_words: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NicknameSettings {
    pub max_length: usize,
    pub cooldown_secs: u64,
    pub allowed_pattern: String,
}

impl Default for NicknameSettings {
    fn default() -> Self {
        Self {
            max_length: 16,
            cooldown_secs: 60 * 60,
            allowed_pattern: r"^[A-Za-z0-9_]+$".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub persist: PersistSettings,
    pub tags: TagSettings,
    pub nickname: NicknameSettings,
    #[serde(rename = "season")]
    pub seasons: Vec<Season>,
}

impl Settings {
    /// Checks the settings a snapshot cannot be built without.
    pub fn validate(&self) -> Result<(), String> {
        Regex::new(&self.tags.allowed_pattern)
            .map_err(|e| format!("tags.allowed_pattern: {}", e))?;
        Regex::new(&self.nickname.allowed_pattern)
            .map_err(|e| format!("nickname.allowed_pattern: {}", e))?;
        if self.tags.min_length > self.tags.max_length {
            return Err("tags.min_length exceeds tags.max_length".to_string());
        }
        if self.persist.max_attempts == 0 {
            return Err("persist.max_attempts must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [tags]
            cooldown_days = 3
            forbidden_words = ["admin"]

            [[season]]
            name = "winter"
            start = "12-01"
            end = "02-28"
            "#,
        )
        .unwrap();

        assert_eq!(settings.tags.cooldown_days, 3);
        assert_eq!(settings.tags.expire_after_days, 30);
        assert_eq!(settings.cache, CacheSettings::default());
        assert_eq!(settings.seasons.len(), 1);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_pattern_fails_validation() {
        let mut settings = Settings::default();
        settings.nickname.allowed_pattern = "([".to_string();
        assert!(settings.validate().is_err());
    }
}
