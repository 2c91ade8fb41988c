//! Cooperative waits at the human-input checkpoints.
//!
//! The running transaction polls the state center at a short fixed interval; external
//! entry points fill the OTP or decision slot in between. A stop detaches the
//! transaction, which the next poll observes as `Cancelled`.

use std::time::Duration;

use cartpilot_core_types::{OrderError, OtpKind, StockDecision};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::context::FlowContext;

/// Wait for the OTP of `kind`, bounded by `timeout`.
pub(crate) async fn wait_for_otp(
    ctx: &FlowContext<'_>,
    kind: OtpKind,
    timeout: Duration,
) -> Result<String, OrderError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(code) = ctx.state.take_otp(ctx.txn, kind)? {
            info!(kind = kind.label(), "otp received");
            return Ok(code);
        }
        if Instant::now() >= deadline {
            warn!(kind = kind.label(), ?timeout, "otp checkpoint timed out");
            return Err(OrderError::Timeout(format!(
                "OTP not received in time ({} not submitted within {}s)",
                kind.label(),
                timeout.as_secs()
            )));
        }
        sleep(ctx.config.poll_interval()).await;
    }
}

/// Wait for the stock decision. No timeout: this is a decision, not a code entry.
pub(crate) async fn wait_for_decision(ctx: &FlowContext<'_>) -> Result<StockDecision, OrderError> {
    loop {
        if let Some(decision) = ctx.state.take_decision(ctx.txn)? {
            info!(decision = decision.as_str(), "stock decision received");
            return Ok(decision);
        }
        sleep(ctx.config.poll_interval()).await;
    }
}
