//! Player profile domain module.
//!
//! # Module Structure
//!
//! - `model`: `PlayerProfile` and the `NameStyle` color selection
//! - `repository`: `ProfileRepository` trait for durable storage

mod model;
mod repository;

pub use model::{NameStyle, PlayerProfile};
pub use repository::ProfileRepository;
