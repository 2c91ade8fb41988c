//! Error types for the action executor

use cdp_adapter::AdapterError;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Every strategy of an interaction found nothing to act on
    #[error("All strategies exhausted for '{action}' ({tried} tried)")]
    StrategiesExhausted { action: &'static str, tried: usize },

    /// The located element rejected the interaction
    #[error("Strategy '{strategy}' failed to perform '{action}': {reason}")]
    InteractionFailed {
        action: &'static str,
        strategy: &'static str,
        reason: String,
        retriable: bool,
    },

    /// The action needs a parameter or scope it was not given
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Page adapter error
    #[error("Page error: {0}")]
    Page(AdapterError),
}

impl From<AdapterError> for LocatorError {
    fn from(err: AdapterError) -> Self {
        LocatorError::Page(err)
    }
}

impl LocatorError {
    /// Transient page faults, such as a handle detached by a re-render, are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            LocatorError::Page(err) => err.retriable,
            LocatorError::InteractionFailed { retriable, .. } => *retriable,
            _ => false,
        }
    }
}
