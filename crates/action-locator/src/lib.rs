//! Locator strategy set and resilient action executor
//!
//! This crate turns page-independent intents ("is this item in stock?", "click
//! add-to-basket") into UI operations against markup that is not contractually stable:
//! - Ordered, data-only strategy lists per semantic action
//! - Tri-state outcomes with fail-safe resolution for detections
//! - At most one state-mutating interaction per executed action
//! - Configurable address label matching policy

pub mod catalog;
pub mod errors;
pub mod executor;
pub mod strategies;
pub mod types;

pub use catalog::*;
pub use errors::*;
pub use executor::*;
pub use strategies::*;
pub use types::*;
