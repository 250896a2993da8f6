//! Style options and the compiled catalog.

mod catalog;
mod model;

pub use catalog::{StyleCatalog, expand};
pub use model::{Animation, OptionOrigin, StyleKind, StyleOption, slugify};
