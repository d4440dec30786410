//! Configuration management for Alternative Stocks

pub mod loader;
mod schema;

pub use loader::{load_config_or_default, save_config};
pub use schema::*;
