use action_locator::{Outcome, SemanticAction};
use cartpilot_core_types::{OrderError, OrderStatus, OtpKind};
use tracing::info;

use crate::checkpoint::wait_for_otp;
use crate::context::FlowContext;

/// Make sure the durable profile is logged in, suspending for the login OTP if not.
pub(crate) async fn ensure_logged_in(ctx: &FlowContext<'_>, phone: &str) -> Result<(), OrderError> {
    ctx.state
        .transition(ctx.txn, OrderStatus::CheckingLogin, "Checking login status")?;
    ctx.goto(&ctx.config.landing_url).await?;

    if ctx.detect(SemanticAction::DetectLoginRequired).await? == Outcome::NotMatched {
        info!("profile already logged in");
        return Ok(());
    }

    ctx.state.await_otp(
        ctx.txn,
        OtpKind::Login,
        format!("Waiting for login OTP sent to {}", mask_phone(phone)),
    )?;
    ctx.perform_when_ready(SemanticAction::ClickLoginTrigger).await?;
    ctx.perform_when_ready(SemanticAction::FillPhoneNumber(phone.to_string()))
        .await?;
    ctx.perform_when_ready(SemanticAction::ClickContinue).await?;

    let code = wait_for_otp(ctx, OtpKind::Login, ctx.config.login_timeout).await?;
    ctx.perform_when_ready(SemanticAction::SubmitOtpDigits {
        kind: OtpKind::Login,
        code,
    })
    .await?;

    // the login trigger disappears once the session is established
    let confirmed = ctx
        .wait_for_outcome(SemanticAction::DetectLoginRequired, Outcome::NotMatched)
        .await?;
    if !confirmed {
        return Err(OrderError::UiActionFailure(
            "Login prompt still visible after entering the OTP".to_string(),
        ));
    }
    info!("login completed");
    Ok(())
}

fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().collect();
    if digits.len() <= 4 {
        return phone.to_string();
    }
    let visible: String = digits[digits.len() - 4..].iter().collect();
    format!("{}{visible}", "*".repeat(digits.len() - 4))
}
