//! The single process-wide order record.
//!
//! Every mutation goes through a guarded method that checks the current status and the
//! transaction that owns the record. External entry points (OTP, stock decision, stop)
//! may only write their narrow slot while the record sits in the matching waiting state.

use std::collections::{HashMap, HashSet, VecDeque};

use cartpilot_core_types::{
    normalize_otp, AddedItem, OrderError, OrderRequest, OrderSnapshot, OrderStatus, OtpKind,
    OutOfStockItem, StockDecision, TransactionId,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

pub const DEFAULT_HISTORY_CAPACITY: usize = 64;

/// One recorded status change.
#[derive(Clone, Debug, Serialize)]
pub struct TransitionRecord {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub message: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug)]
struct BoundedRing<T> {
    capacity: usize,
    data: VecDeque<T>,
}

impl<T> BoundedRing<T> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            data: VecDeque::new(),
        }
    }
}

impl<T: Clone> BoundedRing<T> {
    fn push(&mut self, item: T) {
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(item);
    }

    fn snapshot(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }
}

#[derive(Debug, Default)]
struct OrderRecord {
    txn: Option<TransactionId>,
    request: Option<OrderRequest>,
    snapshot: OrderSnapshot,
    otp: Option<(OtpKind, String)>,
    decision: Option<StockDecision>,
}

impl OrderRecord {
    fn owned_by(&self, txn: &TransactionId) -> Result<(), OrderError> {
        match &self.txn {
            Some(current) if current == txn => Ok(()),
            _ => Err(OrderError::Cancelled),
        }
    }
}

/// Guarded owner of the order record
pub struct OrderStateCenter {
    record: Mutex<OrderRecord>,
    history: Mutex<BoundedRing<TransitionRecord>>,
}

impl Default for OrderStateCenter {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl OrderStateCenter {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            record: Mutex::new(OrderRecord::default()),
            history: Mutex::new(BoundedRing::new(history_capacity)),
        }
    }

    /// Start a transaction; rejected while another one is in flight.
    pub fn try_begin(&self, request: OrderRequest) -> Result<TransactionId, OrderError> {
        let mut record = self.record.lock();
        let current = record.snapshot.status;
        if current.is_in_flight() {
            debug!(status = %current, "order rejected, transaction in flight");
            return Err(OrderError::Concurrency(current));
        }

        let txn = TransactionId::new();
        let message = format!("Starting order with {} item(s)", request.items().len());
        record.snapshot = OrderSnapshot {
            status: OrderStatus::Starting,
            line_items: request.items().to_vec(),
            last_message: Some(message.clone()),
            ..OrderSnapshot::default()
        };
        record.request = Some(request);
        record.txn = Some(txn.clone());
        record.otp = None;
        record.decision = None;
        drop(record);

        self.record_transition(current, OrderStatus::Starting, Some(message));
        info!(%txn, "order accepted");
        Ok(txn)
    }

    pub fn snapshot(&self) -> OrderSnapshot {
        self.record.lock().snapshot.clone()
    }

    pub fn status(&self) -> OrderStatus {
        self.record.lock().snapshot.status
    }

    /// Whether `txn` still owns the record (false once stopped or superseded)
    pub fn is_current(&self, txn: &TransactionId) -> bool {
        self.record.lock().txn.as_ref() == Some(txn)
    }

    pub fn request(&self, txn: &TransactionId) -> Result<OrderRequest, OrderError> {
        let record = self.record.lock();
        record.owned_by(txn)?;
        record
            .request
            .clone()
            .ok_or_else(|| OrderError::unknown("order record has no request"))
    }

    /// Move the owned record to `to`, validating against the transition table.
    pub fn transition(
        &self,
        txn: &TransactionId,
        to: OrderStatus,
        message: impl Into<String>,
    ) -> Result<(), OrderError> {
        self.transition_with(txn, to, message.into(), None)
    }

    /// Update the message without changing status.
    pub fn set_message(&self, txn: &TransactionId, message: impl Into<String>) -> Result<(), OrderError> {
        let mut record = self.record.lock();
        record.owned_by(txn)?;
        record.snapshot.last_message = Some(message.into());
        Ok(())
    }

    /// Returns the position of the new entry in `successfully_added`.
    pub fn record_added(&self, txn: &TransactionId, item: AddedItem) -> Result<usize, OrderError> {
        let mut record = self.record.lock();
        record.owned_by(txn)?;
        let added = &mut record.snapshot.successfully_added;
        added.push(item);
        Ok(added.len() - 1)
    }

    /// Raise the quantity of an entry previously returned by [`Self::record_added`].
    pub fn add_quantity(&self, txn: &TransactionId, entry: usize, extra: u32) -> Result<(), OrderError> {
        let mut record = self.record.lock();
        record.owned_by(txn)?;
        match record.snapshot.successfully_added.get_mut(entry) {
            Some(item) => {
                item.quantity += extra;
                Ok(())
            }
            None => Err(OrderError::unknown(format!("no added item at position {entry}"))),
        }
    }

    pub fn record_out_of_stock(
        &self,
        txn: &TransactionId,
        item: OutOfStockItem,
    ) -> Result<(), OrderError> {
        let mut record = self.record.lock();
        record.owned_by(txn)?;
        record.snapshot.out_of_stock_items.push(item);
        Ok(())
    }

    pub fn clear_out_of_stock(&self, txn: &TransactionId) -> Result<(), OrderError> {
        let mut record = self.record.lock();
        record.owned_by(txn)?;
        record.snapshot.out_of_stock_items.clear();
        Ok(())
    }

    /// Enter the OTP checkpoint for `kind`.
    pub fn await_otp(
        &self,
        txn: &TransactionId,
        kind: OtpKind,
        message: impl Into<String>,
    ) -> Result<(), OrderError> {
        self.transition_with(txn, kind.waiting_status(), message.into(), Some(kind))
    }

    /// External OTP entry point; only effective in the matching waiting state.
    ///
    /// A second code for the same checkpoint is rejected: once a code is received the
    /// checkpoint is no longer pending.
    pub fn submit_otp(&self, kind: OtpKind, code: &str) -> Result<(), OrderError> {
        let mut record = self.record.lock();
        let current = record.snapshot.status;
        if current != kind.waiting_status() || record.snapshot.pending_otp != Some(kind) {
            return Err(OrderError::NotWaiting {
                expected: kind.label(),
                current,
            });
        }
        let code = normalize_otp(code)?;
        record.otp = Some((kind, code));
        record.snapshot.pending_otp = None;
        record.snapshot.last_message = Some(format!("{} received, verifying", capitalized(kind.label())));
        info!(kind = kind.label(), "otp submitted");
        Ok(())
    }

    /// Hand the submitted code to the owning transaction, once.
    pub fn take_otp(&self, txn: &TransactionId, kind: OtpKind) -> Result<Option<String>, OrderError> {
        let mut record = self.record.lock();
        record.owned_by(txn)?;
        match record.otp.take() {
            Some((received, code)) if received == kind => Ok(Some(code)),
            other => {
                record.otp = other;
                Ok(None)
            }
        }
    }

    /// Enter the stock-decision checkpoint.
    pub fn await_stock_decision(
        &self,
        txn: &TransactionId,
        message: impl Into<String>,
    ) -> Result<(), OrderError> {
        {
            let mut record = self.record.lock();
            record.owned_by(txn)?;
            record.decision = None;
        }
        self.transition(txn, OrderStatus::WaitingStockDecision, message)
    }

    /// External stock-decision entry point; only effective while waiting for one.
    pub fn submit_stock_decision(&self, decision: StockDecision) -> Result<(), OrderError> {
        let mut record = self.record.lock();
        let current = record.snapshot.status;
        if current != OrderStatus::WaitingStockDecision || record.decision.is_some() {
            return Err(OrderError::NotWaiting {
                expected: "stock decision",
                current,
            });
        }
        record.snapshot.last_message = Some(format!("Stock decision '{}' received", decision.as_str()));
        info!(decision = decision.as_str(), "stock decision submitted");
        record.decision = Some(decision);
        Ok(())
    }

    pub fn take_decision(&self, txn: &TransactionId) -> Result<Option<StockDecision>, OrderError> {
        let mut record = self.record.lock();
        record.owned_by(txn)?;
        Ok(record.decision.take())
    }

    /// Move a still-owned transaction to `Error`; a stopped transaction is left alone.
    pub fn fail(&self, txn: &TransactionId, message: impl Into<String>) {
        let message = message.into();
        if let Err(err) = self.transition(txn, OrderStatus::Error, message) {
            debug!(%txn, %err, "failure not recorded");
        }
    }

    /// Stop entry point: detach any transaction and force `Cancelled`.
    pub fn cancel(&self, message: impl Into<String>) -> OrderStatus {
        let message = message.into();
        let mut record = self.record.lock();
        let from = record.snapshot.status;
        if let Some(txn) = record.txn.take() {
            info!(%txn, from = %from, "order cancelled");
        }
        record.request = None;
        record.otp = None;
        record.decision = None;
        record.snapshot = OrderSnapshot {
            status: OrderStatus::Cancelled,
            last_message: Some(message.clone()),
            ..OrderSnapshot::default()
        };
        drop(record);

        self.record_transition(from, OrderStatus::Cancelled, Some(message));
        from
    }

    /// Most recent transitions, oldest first
    pub fn history(&self) -> Vec<TransitionRecord> {
        self.history.lock().snapshot()
    }

    fn transition_with(
        &self,
        txn: &TransactionId,
        to: OrderStatus,
        message: String,
        pending_otp: Option<OtpKind>,
    ) -> Result<(), OrderError> {
        let mut record = self.record.lock();
        record.owned_by(txn)?;
        let from = record.snapshot.status;
        if !is_valid_transition(from, to) {
            return Err(OrderError::InvalidTransition { from, to });
        }
        record.snapshot.status = to;
        record.snapshot.waiting_for = to.waiting_for();
        record.snapshot.pending_otp = pending_otp;
        record.snapshot.last_message = Some(message.clone());
        if pending_otp.is_some() {
            record.otp = None;
        }
        drop(record);

        info!(%txn, from = %from, to = %to, message = %message, "order status changed");
        self.record_transition(from, to, Some(message));
        Ok(())
    }

    fn record_transition(&self, from: OrderStatus, to: OrderStatus, message: Option<String>) {
        self.history.lock().push(TransitionRecord {
            from,
            to,
            message,
            recorded_at: Utc::now(),
        });
    }
}

fn capitalized(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Checks if a status transition is valid within one transaction
fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
        let mut m = HashMap::new();
        m.insert(Starting, HashSet::from([CheckingLogin, Error, Cancelled]));
        m.insert(
            CheckingLogin,
            HashSet::from([WaitingLoginOtp, AddingToCart, Error, Cancelled]),
        );
        m.insert(WaitingLoginOtp, HashSet::from([AddingToCart, Error, Cancelled]));
        m.insert(
            AddingToCart,
            HashSet::from([WaitingStockDecision, Checkout, Error, Cancelled]),
        );
        m.insert(
            WaitingStockDecision,
            HashSet::from([AddingToCart, Checkout, Error, Cancelled]),
        );
        m.insert(
            Checkout,
            HashSet::from([WaitingPaymentOtp, Completed, Error, Cancelled]),
        );
        m.insert(WaitingPaymentOtp, HashSet::from([Completed, Error, Cancelled]));
        // accepting states only leave through try_begin
        m.insert(Idle, HashSet::new());
        m.insert(Completed, HashSet::new());
        m.insert(Cancelled, HashSet::new());
        m.insert(Error, HashSet::new());
        m
    });

    TRANSITIONS
        .get(&from)
        .map(|allowed| allowed.contains(&to))
        .unwrap_or(false)
}
