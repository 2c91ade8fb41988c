//! Cartpilot command line and HTTP adapter
//!
//! Wires the order engine to a YAML configuration, a product catalog, an axum router and
//! the `cartpilot` binary.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod server;

pub use catalog::{Catalog, CatalogError};
pub use config::Config;
pub use server::{build_router, OrderDefaults, ServeState};
