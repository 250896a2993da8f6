pub mod access;
pub mod clock;
pub mod condition;
pub mod config;
pub mod error;
pub mod profile;
pub mod rank;
pub mod snapshot;
pub mod style;
pub mod tag_request;
pub mod validation;

// Re-export common error type
pub use error::{ConflictReason, Result, ValidationReason, VanityError};
