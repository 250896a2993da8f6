//! Declarative config loaded from a directory of TOML files.
//!
//! Each file is read and parsed on its own. A file that cannot be read or
//! parsed keeps the previously loaded section. Inside a parsed file every array
//! entry is deserialized and validated individually, so one malformed entry is
//! quarantined instead of taking the whole file down.

use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use vanity_core::access::{RankAccessRule, UserOverride};
use vanity_core::condition::Season;
use vanity_core::config::{
    ConfigBundle, ConfigFile, ConfigLoad, ConfigSource, FileFailure, LoadReport,
    QuarantinedEntry, RanksConfig, Settings, SpecificOption, StyleCategory, StylesConfig,
    UsersConfig, WordGroup,
};
use vanity_core::VanityError;

/// Loads `styles.toml`, `ranks.toml`, `users.toml` and `settings.toml` from
/// one directory. Missing files count as empty.
#[derive(Debug, Clone)]
pub struct TomlConfigSource {
    dir: PathBuf,
}

impl TomlConfigSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_table(&self, file: ConfigFile) -> Result<toml::Table, VanityError> {
        let path = self.dir.join(file.file_name());
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} not found, using defaults", path.display());
                return Ok(toml::Table::new());
            }
            Err(e) => return Err(VanityError::config(file.file_name(), e.to_string())),
        };
        toml::from_str(&content).map_err(|e| VanityError::config(file.file_name(), e.to_string()))
    }

    /// Loads one file. On failure the file is recorded in the report and
    /// `None` is returned so the caller keeps its fallback.
    fn load_file<T>(
        &self,
        file: ConfigFile,
        report: &mut LoadReport,
        parse: impl FnOnce(toml::Table, &mut Quarantine) -> Result<T, String>,
    ) -> Option<T> {
        let mut quarantine = Quarantine::new(file);
        let parsed = self
            .read_table(file)
            .and_then(|table| {
                parse(table, &mut quarantine)
                    .map_err(|message| VanityError::config(file.file_name(), message))
            });

        match parsed {
            Ok(value) => {
                report.loaded.push(file);
                report.quarantined.extend(quarantine.entries);
                Some(value)
            }
            Err(error) => {
                tracing::warn!("Keeping previous {}: {}", file.file_name(), error);
                report.failed.push(FileFailure { file, error });
                None
            }
        }
    }
}

impl ConfigSource for TomlConfigSource {
    fn load(&self, previous: Option<&ConfigBundle>) -> ConfigLoad {
        let fallback = previous.cloned().unwrap_or_default();
        let mut report = LoadReport::default();

        let styles = self
            .load_file(ConfigFile::Styles, &mut report, parse_styles)
            .unwrap_or(fallback.styles);
        let ranks = self
            .load_file(ConfigFile::Ranks, &mut report, parse_ranks)
            .unwrap_or(fallback.ranks);
        let users = self
            .load_file(ConfigFile::Users, &mut report, parse_users)
            .unwrap_or(fallback.users);
        let settings = self
            .load_file(ConfigFile::Settings, &mut report, parse_settings)
            .unwrap_or(fallback.settings);

        tracing::info!(
            "Loaded config from {}: {} ok, {} failed, {} quarantined",
            self.dir.display(),
            report.loaded.len(),
            report.failed.len(),
            report.quarantined.len()
        );

        ConfigLoad {
            bundle: ConfigBundle {
                styles,
                ranks,
                users,
                settings,
            },
            report,
        }
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Collects skipped entries for one file.
struct Quarantine {
    file: ConfigFile,
    entries: Vec<QuarantinedEntry>,
}

impl Quarantine {
    fn new(file: ConfigFile) -> Self {
        Self {
            file,
            entries: Vec::new(),
        }
    }

    fn skip(&mut self, section: &str, index: usize, message: String) {
        tracing::warn!(
            "Quarantined {} [[{}]] #{}: {}",
            self.file.file_name(),
            section,
            index,
            message
        );
        self.entries.push(QuarantinedEntry {
            file: self.file,
            section: section.to_string(),
            index,
            message,
        });
    }

    /// Deserializes `table[section]` entry by entry, skipping entries that
    /// fail to parse or validate.
    fn entries<T: DeserializeOwned>(
        &mut self,
        table: &mut toml::Table,
        section: &str,
        validate: impl Fn(&T) -> Result<(), String>,
    ) -> Result<Vec<T>, String> {
        let items = match table.remove(section) {
            None => return Ok(Vec::new()),
            Some(toml::Value::Array(items)) => items,
            Some(other) => {
                return Err(format!(
                    "'{}' must be an array of tables, found {}",
                    section,
                    other.type_str()
                ));
            }
        };

        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item.try_into::<T>() {
                Ok(value) => match validate(&value) {
                    Ok(()) => out.push(value),
                    Err(message) => self.skip(section, index, message),
                },
                Err(e) => self.skip(section, index, e.to_string()),
            }
        }
        Ok(out)
    }

    /// Drops entries whose name was already seen.
    fn dedup_by_name<T>(
        &mut self,
        section: &str,
        items: Vec<T>,
        name: impl Fn(&T) -> &str,
    ) -> Vec<T> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            if seen.insert(name(&item).to_string()) {
                out.push(item);
            } else {
                let message = format!("duplicate name '{}'", name(&item));
                self.skip(section, index, message);
            }
        }
        out
    }
}

fn parse_styles(mut table: toml::Table, q: &mut Quarantine) -> Result<StylesConfig, String> {
    let groups = q.entries(&mut table, "group", WordGroup::validate)?;
    let categories = q.entries(&mut table, "category", StyleCategory::validate)?;
    let options = q.entries(&mut table, "option", SpecificOption::validate)?;
    Ok(StylesConfig {
        groups: q.dedup_by_name("group", groups, |g| g.name.as_str()),
        categories: q.dedup_by_name("category", categories, |c| c.name.as_str()),
        options,
    })
}

fn parse_ranks(mut table: toml::Table, q: &mut Quarantine) -> Result<RanksConfig, String> {
    let ranks = q.entries(&mut table, "rank", RankAccessRule::validate)?;
    Ok(RanksConfig {
        ranks: q.dedup_by_name("rank", ranks, |r| r.name.as_str()),
    })
}

fn parse_users(mut table: toml::Table, q: &mut Quarantine) -> Result<UsersConfig, String> {
    let users = q.entries(&mut table, "user", UserOverride::validate)?;
    Ok(UsersConfig { users })
}

fn parse_settings(mut table: toml::Table, q: &mut Quarantine) -> Result<Settings, String> {
    let seasons: Vec<Season> = q.entries(&mut table, "season", |_| Ok(()))?;
    let mut settings: Settings = toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| e.to_string())?;
    settings.seasons = seasons;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STYLES: &str = r##"
        [[group]]
        name = "gems"
        words = ["Ruby"]

        [[group]]
        words = ["Nameless"]

        [[category]]
        name = "solid"
        kind = "solid_color"

        [[category.template]]
        name = "Tone"
        format = "{word}"

        [[category]]
        name = "broken"
        kind = "sparkle_color"
    "##;

    const RANKS: &str = r#"
        [[rank]]
        name = "member"
        groups = ["gems"]
        categories = ["solid"]

        [[rank]]
        name = "member"
    "#;

    fn write(dir: &Path, file: ConfigFile, content: &str) {
        std::fs::write(dir.join(file.file_name()), content).unwrap();
    }

    #[test]
    fn test_quarantines_bad_entries() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), ConfigFile::Styles, STYLES);
        write(temp_dir.path(), ConfigFile::Ranks, RANKS);

        let load = TomlConfigSource::new(temp_dir.path()).load(None);

        assert!(load.report.failed.is_empty());
        assert_eq!(load.report.loaded.len(), 4);
        assert_eq!(load.bundle.styles.groups.len(), 1);
        assert_eq!(load.bundle.styles.categories.len(), 1);
        assert_eq!(load.bundle.ranks.ranks.len(), 1);

        let sections: Vec<(&str, usize)> = load
            .report
            .quarantined
            .iter()
            .map(|q| (q.section.as_str(), q.index))
            .collect();
        assert_eq!(sections, vec![("group", 1), ("category", 1), ("rank", 1)]);
    }

    #[test]
    fn test_broken_file_keeps_previous_section() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), ConfigFile::Styles, STYLES);
        write(temp_dir.path(), ConfigFile::Ranks, RANKS);
        let source = TomlConfigSource::new(temp_dir.path());
        let first = source.load(None);

        write(temp_dir.path(), ConfigFile::Ranks, "[[rank]\nname = ");
        write(
            temp_dir.path(),
            ConfigFile::Settings,
            "[tags]\ncooldown_days = 3\n",
        );
        let second = source.load(Some(&first.bundle));

        assert_eq!(second.report.failed.len(), 1);
        assert_eq!(second.report.failed[0].file, ConfigFile::Ranks);
        assert!(second.report.essential_failure().is_some());
        assert_eq!(second.bundle.ranks, first.bundle.ranks);
        assert_eq!(second.bundle.settings.tags.cooldown_days, 3);
    }

    #[test]
    fn test_invalid_settings_fail_whole_file() {
        let temp_dir = TempDir::new().unwrap();
        write(
            temp_dir.path(),
            ConfigFile::Settings,
            r#"
            [nickname]
            allowed_pattern = "(["

            [[season]]
            name = "winter"
            start = "12-01"
            end = "02-28"
            "#,
        );

        let load = TomlConfigSource::new(temp_dir.path()).load(None);
        assert_eq!(load.report.failed.len(), 1);
        assert_eq!(load.report.failed[0].file, ConfigFile::Settings);
        assert!(load.report.essential_failure().is_none());
        assert_eq!(load.bundle.settings, Settings::default());
    }

    #[test]
    fn test_bad_season_is_quarantined() {
        let temp_dir = TempDir::new().unwrap();
        write(
            temp_dir.path(),
            ConfigFile::Settings,
            r#"
            [[season]]
            name = "winter"
            start = "12-01"
            end = "02-28"

            [[season]]
            name = "never"
            start = "13-40"
            end = "01-01"
            "#,
        );

        let load = TomlConfigSource::new(temp_dir.path()).load(None);
        assert!(load.report.failed.is_empty());
        assert_eq!(load.bundle.settings.seasons.len(), 1);
        assert_eq!(load.report.quarantined.len(), 1);
    }
}
