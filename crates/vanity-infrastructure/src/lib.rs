pub mod memory_repository;
pub mod paths;
pub mod rank_provider;
pub mod storage;
pub mod toml_config_source;
pub mod toml_profile_repository;
pub mod toml_tag_request_repository;

pub use crate::memory_repository::{InMemoryProfileRepository, InMemoryTagRequestRepository};
pub use crate::paths::VanityPaths;
pub use crate::rank_provider::StaticRankProvider;
pub use crate::toml_config_source::TomlConfigSource;
pub use crate::toml_profile_repository::TomlProfileRepository;
pub use crate::toml_tag_request_repository::TomlTagRequestRepository;
