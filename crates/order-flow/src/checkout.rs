use action_locator::{Outcome, SemanticAction};
use cartpilot_core_types::{OrderError, OrderStatus, OtpKind};
use tracing::info;

use crate::checkpoint::wait_for_otp;
use crate::context::FlowContext;

/// Payment route checkout ended up taking
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentPath {
    /// Pre-paid balance; needs no further input
    StoredBalance,
    PayOnDelivery,
}

impl PaymentPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPath::StoredBalance => "stored_balance",
            PaymentPath::PayOnDelivery => "pay_on_delivery",
        }
    }
}

/// Select the delivery address, open the cart and pay.
pub(crate) async fn place_order(ctx: &FlowContext<'_>, address: &str) -> Result<PaymentPath, OrderError> {
    ctx.state
        .transition(ctx.txn, OrderStatus::Checkout, "Proceeding to checkout")?;
    ctx.goto(&ctx.config.landing_url).await?;
    ctx.try_perform(SemanticAction::DismissOverlay).await;

    ctx.state
        .set_message(ctx.txn, format!("Selecting delivery address '{address}'"))?;
    ctx.perform_when_ready(SemanticAction::OpenAddressPicker).await?;
    ctx.perform_when_ready(SemanticAction::SelectAddress(address.to_string()))
        .await
        .map_err(|err| match err {
            OrderError::UiActionFailure(reason) => OrderError::UiActionFailure(format!(
                "Delivery address '{address}' not found among saved addresses ({reason})"
            )),
            other => other,
        })?;

    ctx.state.set_message(ctx.txn, "Opening cart")?;
    ctx.perform_when_ready(SemanticAction::ClickCheckoutEntry).await?;

    if ctx
        .wait_for_outcome(SemanticAction::DetectStoredBalance, Outcome::Matched)
        .await?
    {
        ctx.perform_when_ready(SemanticAction::ClickPlaceOrder).await?;
        info!(path = "stored_balance", "order placed");
        return Ok(PaymentPath::StoredBalance);
    }

    ctx.state
        .set_message(ctx.txn, "Stored balance unavailable, paying on delivery")?;
    ctx.perform_when_ready(SemanticAction::ClickProceedToPayment).await?;
    ctx.perform_when_ready(SemanticAction::SelectPayOnDelivery).await?;
    ctx.perform_when_ready(SemanticAction::ClickFinalizePayment).await?;

    if ctx
        .wait_for_outcome(SemanticAction::DetectPaymentOtpChallenge, Outcome::Matched)
        .await?
    {
        ctx.state
            .await_otp(ctx.txn, OtpKind::Payment, "Waiting for payment OTP")?;
        let code = wait_for_otp(ctx, OtpKind::Payment, ctx.config.payment_timeout).await?;
        ctx.perform_when_ready(SemanticAction::SubmitOtpDigits {
            kind: OtpKind::Payment,
            code,
        })
        .await?;
        ctx.perform_when_ready(SemanticAction::ClickConfirmPayment).await?;
    }
    info!(path = "pay_on_delivery", "order placed");
    Ok(PaymentPath::PayOnDelivery)
}
