//! The order engine service object
//!
//! Owns the state center, the session manager and the executor. External boundaries
//! (submit, status, OTP, stock decision, stop) are plain methods; the transaction itself
//! runs on a spawned task that is the only writer of the order record apart from the
//! guarded checkpoint slots.

use std::sync::Arc;

use action_locator::{ActionExecutor, StrategySet};
use cartpilot_core_types::{
    OrderError, OrderRequest, OrderSnapshot, OrderStatus, OtpKind, StockDecision, TransactionId,
};
use cartpilot_state_center::{OrderStateCenter, TransitionRecord};
use cdp_adapter::{Page, WaitOptions};
use parking_lot::Mutex;
use session_manager::SessionManager;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cart::{add_items, CartLedger};
use crate::checkout::{place_order, PaymentPath};
use crate::checkpoint::wait_for_decision;
use crate::config::EngineConfig;
use crate::context::FlowContext;
use crate::login::ensure_logged_in;
use crate::reconcile::CartReconciler;

/// How a transaction that did not fail came to an end
enum FlowEnd {
    Completed(PaymentPath),
    Declined(String),
}

/// Runs at most one order transaction at a time.
#[derive(Clone)]
pub struct OrderEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    state: OrderStateCenter,
    sessions: SessionManager,
    executor: ActionExecutor,
    reconciler: CartReconciler,
    config: EngineConfig,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl OrderEngine {
    pub fn new(sessions: SessionManager, config: EngineConfig) -> Self {
        Self::with_strategies(sessions, config, StrategySet::standard())
    }

    pub fn with_strategies(
        sessions: SessionManager,
        config: EngineConfig,
        strategies: StrategySet,
    ) -> Self {
        let mut executor = ActionExecutor::new(strategies).with_address_policy(config.address_policy);
        if let Some(domain) = &config.session_domain {
            executor = executor.with_session_domain(domain.clone());
        }
        let reconciler = CartReconciler::new(
            config.reconcile,
            WaitOptions::new(config.element_wait, config.poll_interval()),
        );
        Self {
            inner: Arc::new(EngineInner {
                state: OrderStateCenter::new(config.history_capacity),
                sessions,
                executor,
                reconciler,
                config,
                task: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Accept an order and start it in the background.
    ///
    /// Returns immediately; rejected with `Concurrency` while a transaction is in flight.
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, request: OrderRequest) -> Result<TransactionId, OrderError> {
        let txn = self.inner.state.try_begin(request.clone())?;
        let inner = Arc::clone(&self.inner);
        let task_txn = txn.clone();
        let handle = tokio::spawn(async move { inner.run(task_txn, request).await });
        *self.inner.task.lock() = Some(handle);
        Ok(txn)
    }

    pub fn status(&self) -> OrderSnapshot {
        self.inner.state.snapshot()
    }

    pub fn history(&self) -> Vec<TransitionRecord> {
        self.inner.state.history()
    }

    pub fn submit_otp(&self, kind: OtpKind, code: &str) -> Result<(), OrderError> {
        self.inner.state.submit_otp(kind, code)
    }

    pub fn submit_stock_decision(&self, decision: StockDecision) -> Result<(), OrderError> {
        self.inner.state.submit_stock_decision(decision)
    }

    /// Stop whatever is running. Always succeeds; returns the status it was stopped from.
    pub async fn stop(&self) -> OrderStatus {
        let from = self.inner.state.cancel("Order cancelled by user");
        self.inner.sessions.release_current().await;
        from
    }

    /// Wait for the background task of the latest transaction to return.
    pub async fn wait_until_settled(&self) {
        let handle = self.inner.task.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!(%err, "order task aborted");
            }
        }
    }
}

impl EngineInner {
    async fn run(self: Arc<Self>, txn: TransactionId, request: OrderRequest) {
        if let Err(err) = self.state.set_message(&txn, "Launching browser session") {
            debug!(%txn, %err, "order stopped before launch");
            return;
        }
        let session = match self.sessions.acquire().await {
            Ok(session) => session,
            Err(err) => {
                error!(%txn, %err, "session acquisition failed");
                self.state.fail(&txn, OrderError::from(err).to_string());
                return;
            }
        };

        let page = session.page();
        let outcome = self.drive(&txn, &request, page.as_ref()).await;
        self.sessions.release(&session).await;

        let finished = match outcome {
            Ok(FlowEnd::Completed(path)) => self.state.transition(
                &txn,
                OrderStatus::Completed,
                format!("Order placed successfully (payment: {})", path.as_str()),
            ),
            Ok(FlowEnd::Declined(message)) => {
                self.state.transition(&txn, OrderStatus::Cancelled, message)
            }
            Err(OrderError::Cancelled) => {
                info!(%txn, "order stopped");
                Ok(())
            }
            Err(err) => {
                error!(%txn, %err, "order failed");
                self.state.fail(&txn, err.to_string());
                Ok(())
            }
        };
        if let Err(err) = finished {
            warn!(%txn, %err, "final status not recorded");
        }
    }

    async fn drive(
        &self,
        txn: &TransactionId,
        request: &OrderRequest,
        page: &dyn Page,
    ) -> Result<FlowEnd, OrderError> {
        let ctx = FlowContext {
            txn,
            state: &self.state,
            executor: &self.executor,
            config: &self.config,
            page,
        };

        ensure_logged_in(&ctx, request.phone_number()).await?;

        self.state
            .transition(txn, OrderStatus::AddingToCart, "Clearing existing cart")?;
        let report = self.reconciler.reconcile(&self.executor, page).await;
        debug!(?report, "cart reconciled");

        let mut ledger = CartLedger::default();
        add_items(&ctx, request.items(), &mut ledger).await?;

        loop {
            let snapshot = self.state.snapshot();
            if snapshot.out_of_stock_items.is_empty() {
                break;
            }
            let names: Vec<&str> = snapshot
                .out_of_stock_items
                .iter()
                .map(|item| item.name.as_str())
                .collect();
            self.state.await_stock_decision(
                txn,
                format!(
                    "Out of stock: {}. Choose cancel, proceed_with_remaining or replace_items",
                    names.join(", ")
                ),
            )?;

            match wait_for_decision(&ctx).await? {
                StockDecision::Cancel => {
                    return Ok(FlowEnd::Declined(
                        "Order cancelled: out-of-stock items declined".to_string(),
                    ))
                }
                StockDecision::ProceedWithRemaining => {
                    if snapshot.successfully_added.is_empty() {
                        return Ok(FlowEnd::Declined(
                            "Order cancelled: no in-stock items to order".to_string(),
                        ));
                    }
                    break;
                }
                StockDecision::ReplaceItems(items) => {
                    self.state.clear_out_of_stock(txn)?;
                    self.state.transition(
                        txn,
                        OrderStatus::AddingToCart,
                        format!("Adding {} replacement item(s)", items.len()),
                    )?;
                    add_items(&ctx, &items, &mut ledger).await?;
                }
            }
        }

        let path = place_order(&ctx, request.delivery_address_label()).await?;
        Ok(FlowEnd::Completed(path))
    }
}
