use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use vanity_application::{RuntimeDependencies, RuntimeOptions, VanityRuntime};
use vanity_core::tag_request::TagRequestRepository;
use vanity_infrastructure::{StaticRankProvider, TomlTagRequestRepository};

use super::utils::{config_dir_or_default, data_dir_or_default};

pub async fn pending(data_dir: Option<PathBuf>) -> Result<()> {
    let data_dir = data_dir_or_default(data_dir)?;
    let repo = TomlTagRequestRepository::new(&data_dir)?;
    let pending = repo.list_pending().await?;

    if pending.is_empty() {
        println!("No pending tag requests.");
        return Ok(());
    }

    let now = Utc::now();
    for request in pending {
        println!(
            "{}  {:<16} {:<16} {}d",
            request.id,
            request.player_name,
            request.requested_text,
            request.age(now).num_days()
        );
    }
    Ok(())
}

pub async fn expire(
    config_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    max_age_days: Option<i64>,
) -> Result<()> {
    let config_dir = config_dir_or_default(config_dir)?;
    let data_dir = data_dir_or_default(data_dir)?;

    // Ranks do not matter for expiry.
    let ranks = Arc::new(StaticRankProvider::new("default"));
    let deps = RuntimeDependencies::toml(&config_dir, &data_dir, ranks)?;
    let runtime = VanityRuntime::start(deps, RuntimeOptions { maintenance: false })
        .context("Failed to start runtime")?;

    let max_age_days = max_age_days
        .unwrap_or_else(|| runtime.catalog().snapshot().tag_settings().expire_after_days);
    let report = runtime.tags().expire_stale(max_age_days).await?;
    let flushed = runtime.shutdown().await;

    println!(
        "Expired {} of {} pending request(s) older than {} days",
        report.expired, report.scanned, max_age_days
    );
    if report.collisions > 0 {
        println!("{} request(s) were reviewed concurrently", report.collisions);
    }
    if flushed.failed > 0 {
        anyhow::bail!("{} profile(s) could not be saved", flushed.failed);
    }
    Ok(())
}
