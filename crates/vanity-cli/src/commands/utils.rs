use anyhow::{Context, Result};
use std::path::PathBuf;
use vanity_infrastructure::VanityPaths;

pub fn config_dir_or_default(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => VanityPaths::config_dir().context("Failed to resolve config directory"),
    }
}

pub fn data_dir_or_default(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => VanityPaths::data_dir().context("Failed to resolve data directory"),
    }
}
