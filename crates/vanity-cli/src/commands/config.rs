use anyhow::{Context, Result, bail};
use chrono::Utc;
use std::collections::HashSet;
use std::path::PathBuf;
use vanity_core::condition::ConditionContext;
use vanity_core::config::ConfigSource;
use vanity_core::snapshot::CatalogSnapshot;
use vanity_core::style::{StyleKind, StyleOption};
use vanity_infrastructure::TomlConfigSource;

use super::utils::config_dir_or_default;

const ALL_KINDS: [StyleKind; 5] = [
    StyleKind::SolidColor,
    StyleKind::GradientColor,
    StyleKind::SpecialColor,
    StyleKind::Prefix,
    StyleKind::Suffix,
];

pub fn check(dir: Option<PathBuf>) -> Result<()> {
    let dir = config_dir_or_default(dir)?;
    let loaded = TomlConfigSource::new(&dir).load(None);
    let report = &loaded.report;

    println!("Config: {}", dir.display());
    for file in &report.loaded {
        println!("  ok       {}", file.file_name());
    }
    for failure in &report.failed {
        println!("  FAILED   {}: {}", failure.file.file_name(), failure.error);
    }
    for entry in &report.quarantined {
        println!(
            "  skipped  {} [[{}]] #{}: {}",
            entry.file.file_name(),
            entry.section,
            entry.index,
            entry.message
        );
    }

    let snapshot = CatalogSnapshot::build(&loaded.bundle).context("Failed to compile catalog")?;
    for warning in snapshot.warnings() {
        println!("  warning  {}", warning);
    }
    println!(
        "{} ranks, {} options",
        snapshot.rules().len(),
        snapshot.catalog().len()
    );

    if report.is_clean() {
        println!("No problems found.");
    }
    if let Some(failure) = report.essential_failure() {
        bail!("{} could not be loaded", failure.file.file_name());
    }
    if !report.failed.is_empty() {
        bail!("{} file(s) failed to load", report.failed.len());
    }
    Ok(())
}

pub fn catalog(dir: Option<PathBuf>, kind: Option<&str>, rank: Option<&str>) -> Result<()> {
    let dir = config_dir_or_default(dir)?;
    let loaded = TomlConfigSource::new(&dir).load(None);
    if let Some(failure) = loaded.report.essential_failure() {
        bail!("{}: {}", failure.file.file_name(), failure.error);
    }
    let snapshot = CatalogSnapshot::build(&loaded.bundle).context("Failed to compile catalog")?;

    let kinds: Vec<StyleKind> = match kind {
        Some(kind) => vec![
            kind.parse()
                .with_context(|| format!("Unknown style kind '{}'", kind))?,
        ],
        None => ALL_KINDS.to_vec(),
    };

    let no_events = HashSet::new();
    let ctx = ConditionContext {
        now: Utc::now(),
        seasons: snapshot.seasons(),
        active_events: &no_events,
    };

    for kind in kinds {
        let options: Vec<StyleOption> = match rank {
            Some(rank) => snapshot.resolve(rank, "", kind, &ctx),
            None => snapshot.catalog().options_of_kind(kind).cloned().collect(),
        };
        if options.is_empty() {
            continue;
        }
        println!("{} ({})", kind, options.len());
        for option in options {
            let ranks: Vec<&str> = option.allowed_ranks.iter().map(String::as_str).collect();
            println!(
                "  {:<24} {:<28} {:<16} [{}]{}",
                option.id,
                option.display_name,
                option.value,
                ranks.join(", "),
                option
                    .condition
                    .as_deref()
                    .map(|c| format!(" when {}", c))
                    .unwrap_or_default()
            );
        }
    }
    Ok(())
}
