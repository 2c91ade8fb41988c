//! Order orchestration
//!
//! [`OrderEngine`] runs one transaction at a time: login, cart reconciliation, the
//! per-item add phase, checkout and payment, suspending at the OTP and stock-decision
//! checkpoints until the matching external input arrives.

pub mod config;
pub mod engine;
pub mod reconcile;

mod cart;
mod checkout;
mod checkpoint;
mod context;
mod errors;
mod login;

pub use checkout::PaymentPath;
pub use config::{EngineConfig, ReconcileLimits};
pub use engine::OrderEngine;
pub use reconcile::{CartReconciler, ReconcileReport};
