//! Default locations for Vanity configuration and data.
//!
//! ```text
//! ~/.config/vanity/            # Declarative config (config_dir)
//! ├── styles.toml
//! ├── ranks.toml
//! ├── users.toml
//! └── settings.toml
//!
//! ~/.local/share/vanity/       # Data directory (data_dir)
//! ├── profiles/                # One TOML file per player
//! └── tag_requests/            # One TOML file per request
//! ```

use std::path::PathBuf;
use thiserror::Error;

const APP_NAME: &str = "vanity";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot find home directory")]
    HomeDirNotFound,
}

pub struct VanityPaths;

impl VanityPaths {
    /// Returns the directory holding the declarative config files.
    ///
    /// Honors `VANITY_CONFIG_DIR` when set.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        if let Some(dir) = std::env::var_os("VANITY_CONFIG_DIR") {
            return Ok(PathBuf::from(dir));
        }
        dirs::config_dir()
            .map(|d| d.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the directory holding profiles and tag requests.
    ///
    /// Honors `VANITY_DATA_DIR` when set.
    pub fn data_dir() -> Result<PathBuf, PathError> {
        if let Some(dir) = std::env::var_os("VANITY_DATA_DIR") {
            return Ok(PathBuf::from(dir));
        }
        dirs::data_dir()
            .map(|d| d.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }
}
