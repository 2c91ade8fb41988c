use action_locator::LocatorError;
use cartpilot_core_types::OrderError;
use cdp_adapter::AdapterError;

/// Strategy exhaustion on a required action is a UI failure; page faults are not.
pub(crate) fn ui_failure(err: LocatorError) -> OrderError {
    match err {
        LocatorError::Page(reason) => OrderError::unknown(format!("Page error: {reason}")),
        other => OrderError::UiActionFailure(other.to_string()),
    }
}

pub(crate) fn page_failure(err: AdapterError) -> OrderError {
    OrderError::unknown(format!("Page error: {err}"))
}
