use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Failure taxonomy shared by every layer of the engine.
///
/// Out-of-stock is intentionally absent: an unavailable product is a branch of the
/// order flow, not a failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Malformed or missing request fields, rejected before any session work.
    #[error("{0}")]
    Input(String),

    /// A transaction is already in flight.
    #[error("Order already in progress. Status: {0}")]
    Concurrency(OrderStatus),

    /// The durable profile could not be launched, even after one recovery attempt.
    #[error("Session acquisition failed: {0}")]
    SessionAcquisition(String),

    /// A human-input checkpoint exceeded its bound.
    #[error("{0}")]
    Timeout(String),

    /// Every strategy for a required UI action failed.
    #[error("UI action failed: {0}")]
    UiActionFailure(String),

    /// External input arrived outside the matching waiting state.
    #[error("Not waiting for {expected}. Current status: {current}")]
    NotWaiting {
        expected: &'static str,
        current: OrderStatus,
    },

    /// The transaction was stopped while this operation was running.
    #[error("Order cancelled")]
    Cancelled,

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("{0}")]
    Unknown(String),
}

impl OrderError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    /// Errors produced by a rejected external call rather than by a running transaction.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            OrderError::Input(_) | OrderError::Concurrency(_) | OrderError::NotWaiting { .. }
        )
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of the single in-flight order.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default)]
pub enum OrderStatus {
    #[default]
    Idle,
    Starting,
    CheckingLogin,
    WaitingLoginOtp,
    AddingToCart,
    WaitingStockDecision,
    Checkout,
    WaitingPaymentOtp,
    Completed,
    Cancelled,
    Error,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Idle => "idle",
            OrderStatus::Starting => "starting",
            OrderStatus::CheckingLogin => "checking_login",
            OrderStatus::WaitingLoginOtp => "waiting_login_otp",
            OrderStatus::AddingToCart => "adding_to_cart",
            OrderStatus::WaitingStockDecision => "waiting_stock_decision",
            OrderStatus::Checkout => "checkout",
            OrderStatus::WaitingPaymentOtp => "waiting_payment_otp",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Error => "error",
        }
    }

    /// States from which a new order may be started.
    pub fn accepts_new_order(&self) -> bool {
        matches!(
            self,
            OrderStatus::Idle | OrderStatus::Completed | OrderStatus::Error | OrderStatus::Cancelled
        )
    }

    pub fn is_in_flight(&self) -> bool {
        !self.accepts_new_order()
    }

    /// Human-input checkpoint the status represents, if any.
    pub fn waiting_for(&self) -> Option<&'static str> {
        match self {
            OrderStatus::WaitingLoginOtp => Some("login_otp"),
            OrderStatus::WaitingPaymentOtp => Some("payment_otp"),
            OrderStatus::WaitingStockDecision => Some("stock_decision"),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OtpKind {
    Login,
    Payment,
}

impl OtpKind {
    pub fn waiting_status(&self) -> OrderStatus {
        match self {
            OtpKind::Login => OrderStatus::WaitingLoginOtp,
            OtpKind::Payment => OrderStatus::WaitingPaymentOtp,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OtpKind::Login => "login OTP",
            OtpKind::Payment => "payment OTP",
        }
    }
}

/// Accepts 4 to 6 ASCII digits, surrounding whitespace ignored.
pub fn normalize_otp(code: &str) -> Result<String, OrderError> {
    let trimmed = code.trim();
    if !(4..=6).contains(&trimmed.len()) {
        return Err(OrderError::input("OTP must be 4 to 6 characters"));
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(OrderError::input("OTP must contain only digits"));
    }
    Ok(trimmed.to_string())
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineItem {
    pub product_url: String,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(product_url: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_url: product_url.into(),
            quantity,
        }
    }

    /// Last non-empty path segment of the product URL, used when no title is readable.
    pub fn fallback_name(&self) -> String {
        self.product_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(self.product_url.as_str())
            .to_string()
    }
}

/// Validates and merges line items; duplicate URLs have their quantities summed.
pub fn normalize_line_items(items: Vec<LineItem>) -> Result<Vec<LineItem>, OrderError> {
    if items.is_empty() {
        return Err(OrderError::input("No items provided"));
    }
    let mut merged: Vec<LineItem> = Vec::with_capacity(items.len());
    for item in items {
        let url = item.product_url.trim();
        if url.is_empty() {
            return Err(OrderError::input("Line item is missing a product URL"));
        }
        if item.quantity == 0 {
            return Err(OrderError::input(format!(
                "Quantity must be at least 1 for {url}"
            )));
        }
        match merged.iter_mut().find(|existing| existing.product_url == url) {
            Some(existing) => existing.quantity += item.quantity,
            None => merged.push(LineItem::new(url, item.quantity)),
        }
    }
    Ok(merged)
}

/// An accepted order. Immutable once constructed.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderRequest {
    items: Vec<LineItem>,
    phone_number: String,
    delivery_address_label: String,
}

impl OrderRequest {
    pub fn new(
        items: Vec<LineItem>,
        phone_number: impl Into<String>,
        delivery_address_label: impl Into<String>,
    ) -> Result<Self, OrderError> {
        let phone_number = phone_number.into().trim().to_string();
        let delivery_address_label = delivery_address_label.into().trim().to_string();
        if phone_number.is_empty() {
            return Err(OrderError::input("Phone number is required"));
        }
        if delivery_address_label.is_empty() {
            return Err(OrderError::input("Address is required"));
        }
        Ok(Self {
            items: normalize_line_items(items)?,
            phone_number,
            delivery_address_label,
        })
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn delivery_address_label(&self) -> &str {
        &self.delivery_address_label
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutOfStockItem {
    pub name: String,
    pub url: String,
    pub quantity: u32,
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AddedItem {
    pub name: String,
    pub quantity: u32,
}

/// Resolution of the out-of-stock checkpoint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StockDecision {
    Cancel,
    ProceedWithRemaining,
    ReplaceItems(Vec<LineItem>),
}

impl StockDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockDecision::Cancel => "cancel",
            StockDecision::ProceedWithRemaining => "proceed_with_remaining",
            StockDecision::ReplaceItems(_) => "replace_items",
        }
    }

    pub fn parse(decision: &str, replacements: Vec<LineItem>) -> Result<Self, OrderError> {
        match decision.trim() {
            "cancel" => Ok(StockDecision::Cancel),
            "proceed_with_remaining" => Ok(StockDecision::ProceedWithRemaining),
            "replace_items" => {
                let items = normalize_line_items(replacements).map_err(|err| {
                    OrderError::input(format!("replace_items requires replacement items: {err}"))
                })?;
                Ok(StockDecision::ReplaceItems(items))
            }
            other => Err(OrderError::input(format!(
                "Unknown stock decision '{other}' (expected cancel, proceed_with_remaining or replace_items)"
            ))),
        }
    }
}

/// Read-only view of the order record, as reported by the status boundary.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OrderSnapshot {
    pub status: OrderStatus,
    pub waiting_for: Option<&'static str>,
    pub pending_otp: Option<OtpKind>,
    pub line_items: Vec<LineItem>,
    pub out_of_stock_items: Vec<OutOfStockItem>,
    pub successfully_added: Vec<AddedItem>,
    pub last_message: Option<String>,
}
