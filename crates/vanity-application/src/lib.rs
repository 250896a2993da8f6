//! Application layer for Vanity.
//!
//! This crate wires the domain and infrastructure layers into the services a
//! host calls: the profile cache, catalog reload, access resolution, cosmetic
//! selection and the custom tag review flow.

pub mod access_resolver;
pub mod catalog_service;
pub mod cosmetics_service;
pub mod maintenance;
pub mod profile_cache;
pub mod retry;
pub mod runtime;
pub mod tag_request_service;

pub use access_resolver::AccessResolver;
pub use catalog_service::{CatalogService, ReloadReport};
pub use cosmetics_service::CosmeticsService;
pub use maintenance::MaintenanceScheduler;
pub use profile_cache::{EvictionReport, FlushReport, ProfileCache};
pub use retry::RetryPolicy;
pub use runtime::{RuntimeDependencies, RuntimeOptions, VanityRuntime};
pub use tag_request_service::{ExpiryReport, TagRequestService};
