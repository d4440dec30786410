//! Alternative Stocks - REST backend for stock queries and recommendations
//!
//! This is the library interface, exposing the router, session handling and
//! document store so the service can be embedded or tested in-process.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod store;

pub use config::Config;
pub use error::Error;
