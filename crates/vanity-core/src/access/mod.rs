//! Rank access rules and user overrides.

mod rule;

pub use rule::{
    Capability, CustomOptionConfig, RankAccessRule, RankLimits, RankPermissions, UserOverride,
    WILDCARD,
};
