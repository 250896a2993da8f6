pub mod config;
pub mod tags;
pub mod utils;
