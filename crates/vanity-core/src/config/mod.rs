//! Declarative configuration module.
//!
//! # Module Structure
//!
//! - `schema`: styles, ranks and users file schema
//! - `settings`: runtime and policy settings
//! - `source`: `ConfigSource` trait, `ConfigBundle` and load reporting

mod schema;
mod settings;
mod source;

pub use schema::{
    BaseWord, RanksConfig, SpecificOption, StyleCategory, StyleTemplate, StylesConfig,
    UsersConfig, WordGroup,
};
pub use settings::{CacheSettings, NicknameSettings, PersistSettings, Settings, TagSettings};
pub use source::{
    ConfigBundle, ConfigFile, ConfigLoad, ConfigSource, FileFailure, LoadReport,
    QuarantinedEntry,
};
