//! Custom tag request domain module.
//!
//! # Module Structure
//!
//! - `model`: `TagRequest` and its status state machine
//! - `repository`: `TagRequestRepository` trait for durable storage

mod model;
mod repository;

pub use model::{TagRequest, TagRequestStatus};
pub use repository::TagRequestRepository;
