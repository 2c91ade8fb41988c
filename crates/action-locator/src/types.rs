//! Core types for the action vocabulary

use cartpilot_core_types::OtpKind;
use serde::{Deserialize, Serialize};

/// Tri-state result of a semantic action
///
/// For detections, `Matched` means the condition holds (e.g. "login is required",
/// "item is in stock"). For interactions, `Matched` means the single interaction was
/// issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Condition holds / interaction issued
    Matched,

    /// Condition definitively does not hold
    NotMatched,

    /// The strategy could not decide
    Indeterminate,
}

impl Outcome {
    /// Check whether the outcome ends the strategy chain
    pub fn is_definitive(&self) -> bool {
        !matches!(self, Outcome::Indeterminate)
    }
}

/// Policy for matching a saved delivery address by its user-assigned label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMatchPolicy {
    /// Exact label first, then substring match against the saved labels
    #[default]
    ExactThenSubstring,

    /// Only an exact (case-insensitive) label match is accepted
    ExactOnly,
}

/// Named, page-independent intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticAction {
    /// Is an interactive login needed? (`Matched` = yes)
    DetectLoginRequired,

    /// Is the current product purchasable? (`Matched` = in stock)
    DetectInStock,

    /// Is the stored-balance "Place Order" path offered?
    DetectStoredBalance,

    /// Is a payment one-time-code form showing?
    DetectPaymentOtpChallenge,

    ClickLoginTrigger,
    FillPhoneNumber(String),
    ClickContinue,

    /// Enter a one-time code into the login or payment form
    SubmitOtpDigits { kind: OtpKind, code: String },

    ClickAddToBasket,
    ClickIncreaseQuantity,

    /// Open the cart / checkout view
    ClickCheckoutEntry,
    OpenAddressPicker,

    /// Choose the saved address carrying this label
    SelectAddress(String),

    /// Pay from the stored balance
    ClickPlaceOrder,
    ClickProceedToPayment,
    SelectPayOnDelivery,
    ClickFinalizePayment,
    ClickConfirmPayment,

    /// Decrement one cart line entry; requires a scope element
    DecrementCartEntry,

    /// Close the cart view
    ClickCloseCart,

    /// Dismiss a blocking popup, if one is showing
    DismissOverlay,
}

/// Parameter-free key used to look up an action's strategy list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKey {
    DetectLoginRequired,
    DetectInStock,
    DetectStoredBalance,
    DetectPaymentOtpChallenge,
    ClickLoginTrigger,
    FillPhoneNumber,
    ClickContinue,
    SubmitLoginOtp,
    SubmitPaymentOtp,
    ClickAddToBasket,
    ClickIncreaseQuantity,
    ClickCheckoutEntry,
    OpenAddressPicker,
    SelectAddress,
    ClickPlaceOrder,
    ClickProceedToPayment,
    SelectPayOnDelivery,
    ClickFinalizePayment,
    ClickConfirmPayment,
    DecrementCartEntry,
    ClickCloseCart,
    DismissOverlay,
}

impl SemanticAction {
    /// Strategy table key
    pub fn key(&self) -> ActionKey {
        match self {
            SemanticAction::DetectLoginRequired => ActionKey::DetectLoginRequired,
            SemanticAction::DetectInStock => ActionKey::DetectInStock,
            SemanticAction::DetectStoredBalance => ActionKey::DetectStoredBalance,
            SemanticAction::DetectPaymentOtpChallenge => ActionKey::DetectPaymentOtpChallenge,
            SemanticAction::ClickLoginTrigger => ActionKey::ClickLoginTrigger,
            SemanticAction::FillPhoneNumber(_) => ActionKey::FillPhoneNumber,
            SemanticAction::ClickContinue => ActionKey::ClickContinue,
            SemanticAction::SubmitOtpDigits {
                kind: OtpKind::Login,
                ..
            } => ActionKey::SubmitLoginOtp,
            SemanticAction::SubmitOtpDigits {
                kind: OtpKind::Payment,
                ..
            } => ActionKey::SubmitPaymentOtp,
            SemanticAction::ClickAddToBasket => ActionKey::ClickAddToBasket,
            SemanticAction::ClickIncreaseQuantity => ActionKey::ClickIncreaseQuantity,
            SemanticAction::ClickCheckoutEntry => ActionKey::ClickCheckoutEntry,
            SemanticAction::OpenAddressPicker => ActionKey::OpenAddressPicker,
            SemanticAction::SelectAddress(_) => ActionKey::SelectAddress,
            SemanticAction::ClickPlaceOrder => ActionKey::ClickPlaceOrder,
            SemanticAction::ClickProceedToPayment => ActionKey::ClickProceedToPayment,
            SemanticAction::SelectPayOnDelivery => ActionKey::SelectPayOnDelivery,
            SemanticAction::ClickFinalizePayment => ActionKey::ClickFinalizePayment,
            SemanticAction::ClickConfirmPayment => ActionKey::ClickConfirmPayment,
            SemanticAction::DecrementCartEntry => ActionKey::DecrementCartEntry,
            SemanticAction::ClickCloseCart => ActionKey::ClickCloseCart,
            SemanticAction::DismissOverlay => ActionKey::DismissOverlay,
        }
    }

    /// Action name for logs and errors
    pub fn name(&self) -> &'static str {
        match self.key() {
            ActionKey::DetectLoginRequired => "detect-login-required",
            ActionKey::DetectInStock => "detect-in-stock",
            ActionKey::DetectStoredBalance => "detect-stored-balance",
            ActionKey::DetectPaymentOtpChallenge => "detect-payment-otp",
            ActionKey::ClickLoginTrigger => "click-login-trigger",
            ActionKey::FillPhoneNumber => "fill-phone-number",
            ActionKey::ClickContinue => "click-continue",
            ActionKey::SubmitLoginOtp => "submit-login-otp",
            ActionKey::SubmitPaymentOtp => "submit-payment-otp",
            ActionKey::ClickAddToBasket => "click-add-to-basket",
            ActionKey::ClickIncreaseQuantity => "click-increase-quantity",
            ActionKey::ClickCheckoutEntry => "click-checkout-entry",
            ActionKey::OpenAddressPicker => "open-address-picker",
            ActionKey::SelectAddress => "select-address",
            ActionKey::ClickPlaceOrder => "click-place-order",
            ActionKey::ClickProceedToPayment => "click-proceed-to-payment",
            ActionKey::SelectPayOnDelivery => "select-pay-on-delivery",
            ActionKey::ClickFinalizePayment => "click-finalize-payment",
            ActionKey::ClickConfirmPayment => "click-confirm-payment",
            ActionKey::DecrementCartEntry => "decrement-cart-entry",
            ActionKey::ClickCloseCart => "click-close-cart",
            ActionKey::DismissOverlay => "dismiss-overlay",
        }
    }

    /// Runtime parameter injected into the strategies (phone number, code, label)
    pub fn param(&self) -> Option<&str> {
        match self {
            SemanticAction::FillPhoneNumber(value)
            | SemanticAction::SelectAddress(value)
            | SemanticAction::SubmitOtpDigits { code: value, .. } => Some(value.as_str()),
            _ => None,
        }
    }

    /// Check if the action only reads the page
    pub fn is_detection(&self) -> bool {
        matches!(
            self,
            SemanticAction::DetectLoginRequired
                | SemanticAction::DetectInStock
                | SemanticAction::DetectStoredBalance
                | SemanticAction::DetectPaymentOtpChallenge
        )
    }

    /// Outcome assumed when every strategy of a detection is indeterminate
    ///
    /// Never assume purchasability, and never assume an authenticated session.
    pub fn fail_safe(&self) -> Outcome {
        match self {
            SemanticAction::DetectInStock => Outcome::NotMatched,
            SemanticAction::DetectLoginRequired => Outcome::Matched,
            SemanticAction::DetectStoredBalance | SemanticAction::DetectPaymentOtpChallenge => {
                Outcome::NotMatched
            }
            _ => Outcome::Indeterminate,
        }
    }
}

/// Read-only value extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Probe {
    /// Product title on a product page
    ProductTitle,

    /// Number shown on the cart badge
    CartBadgeCount,

    /// Quantity shown inside one cart line entry (scoped)
    EntryQuantity,
}

/// Element enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    /// Line entries of the open cart view
    CartEntries,
}
