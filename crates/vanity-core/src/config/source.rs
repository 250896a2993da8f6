//! Config source interface and load reporting.

use super::schema::{RanksConfig, StylesConfig, UsersConfig};
use super::settings::Settings;
use crate::error::VanityError;
use strum::{Display, EnumIter};

/// The independent files that make up a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ConfigFile {
    Styles,
    Ranks,
    Users,
    Settings,
}

impl ConfigFile {
    pub fn file_name(self) -> &'static str {
        match self {
            ConfigFile::Styles => "styles.toml",
            ConfigFile::Ranks => "ranks.toml",
            ConfigFile::Users => "users.toml",
            ConfigFile::Settings => "settings.toml",
        }
    }

    /// Files without which no catalog can be built.
    pub fn is_essential(self) -> bool {
        matches!(self, ConfigFile::Styles | ConfigFile::Ranks)
    }
}

/// Everything loaded from the declarative config files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigBundle {
    pub styles: StylesConfig,
    pub ranks: RanksConfig,
    pub users: UsersConfig,
    pub settings: Settings,
}

/// A whole file that failed to load.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub file: ConfigFile,
    pub error: VanityError,
}

/// A single entry skipped inside an otherwise valid file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantinedEntry {
    pub file: ConfigFile,
    pub section: String,
    pub index: usize,
    pub message: String,
}

/// Outcome of one load pass.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub loaded: Vec<ConfigFile>,
    pub failed: Vec<FileFailure>,
    pub quarantined: Vec<QuarantinedEntry>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.quarantined.is_empty()
    }

    /// True when an essential file failed; without a prior snapshot there is
    /// nothing to fall back to.
    pub fn essential_failure(&self) -> Option<&FileFailure> {
        self.failed.iter().find(|f| f.file.is_essential())
    }
}

/// Result of a load: the bundle to use plus what happened along the way.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub bundle: ConfigBundle,
    pub report: LoadReport,
}

/// Loads declarative configuration.
///
/// Implementations load each file independently. A file that fails keeps the
/// matching section of `previous` (or its default when there is none) and is
/// listed in [`LoadReport::failed`]. Malformed entries inside a readable file
/// are skipped and listed in [`LoadReport::quarantined`].
///
/// Loading may block on I/O; callers run it off latency-sensitive threads.
pub trait ConfigSource: Send + Sync {
    fn load(&self, previous: Option<&ConfigBundle>) -> ConfigLoad;

    /// Human-readable location for log messages.
    fn describe(&self) -> String;
}
