use std::future::Future;

use action_locator::{ActionExecutor, LocatorError, Outcome, Probe, SemanticAction};
use cartpilot_core_types::{OrderError, TransactionId};
use cartpilot_state_center::OrderStateCenter;
use cdp_adapter::{poll_until, Page, WaitOptions};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::EngineConfig;
use crate::errors::{page_failure, ui_failure};

enum Polled<T> {
    Ready(T),
    Stopped,
}

/// Everything one transaction step needs, borrowed from the engine.
pub(crate) struct FlowContext<'a> {
    pub txn: &'a TransactionId,
    pub state: &'a OrderStateCenter,
    pub executor: &'a ActionExecutor,
    pub config: &'a EngineConfig,
    pub page: &'a dyn Page,
}

impl<'a> FlowContext<'a> {
    /// Fails with `Cancelled` once the transaction was stopped.
    pub fn ensure_current(&self) -> Result<(), OrderError> {
        if self.state.is_current(self.txn) {
            Ok(())
        } else {
            Err(OrderError::Cancelled)
        }
    }

    pub fn element_wait(&self) -> WaitOptions {
        WaitOptions::new(self.config.element_wait, self.config.poll_interval())
    }

    pub async fn goto(&self, url: &str) -> Result<(), OrderError> {
        self.ensure_current()?;
        self.page.goto(url).await.map_err(page_failure)
    }

    /// Run a detection once.
    pub async fn detect(&self, action: SemanticAction) -> Result<Outcome, OrderError> {
        self.ensure_current()?;
        self.executor
            .perform(&action, self.page)
            .await
            .map_err(ui_failure)
    }

    /// Poll a detection until it reports `expected` or the element wait runs out.
    pub async fn wait_for_outcome(
        &self,
        action: SemanticAction,
        expected: Outcome,
    ) -> Result<bool, OrderError> {
        let action = &action;
        let reached = self
            .poll(move || async move {
                let outcome = self.executor.perform(action, self.page).await?;
                Ok::<_, LocatorError>((outcome == expected).then_some(()))
            })
            .await?;
        Ok(reached.is_some())
    }

    /// Poll a probe until it reads non-empty text or the element wait runs out.
    pub async fn wait_for_text(&self, probe: Probe) -> Result<Option<String>, OrderError> {
        self.poll(move || self.executor.read(probe, self.page)).await
    }

    /// Bounded readiness poll that gives up as soon as the transaction is stopped.
    async fn poll<T, F, Fut>(&self, mut probe: F) -> Result<Option<T>, OrderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, LocatorError>>,
    {
        self.ensure_current()?;
        let polled = poll_until(self.element_wait(), move || {
            let next = probe();
            async move {
                if !self.state.is_current(self.txn) {
                    return Ok(Some(Polled::Stopped));
                }
                Ok::<_, LocatorError>(next.await?.map(Polled::Ready))
            }
        })
        .await;
        match polled {
            Some(Polled::Ready(value)) => Ok(Some(value)),
            Some(Polled::Stopped) => Err(OrderError::Cancelled),
            None => Ok(None),
        }
    }

    /// Perform a required interaction, waiting for its target to appear.
    ///
    /// Only exhaustion is retried; an exhausted attempt issued no interaction, so the
    /// action still happens at most once.
    pub async fn perform_when_ready(&self, action: SemanticAction) -> Result<(), OrderError> {
        let deadline = Instant::now() + self.config.element_wait;
        loop {
            self.ensure_current()?;
            match self.executor.perform(&action, self.page).await {
                Ok(_) => return Ok(()),
                Err(LocatorError::StrategiesExhausted { .. }) if Instant::now() < deadline => {
                    debug!(action = action.name(), "target not ready, waiting");
                    sleep(self.config.poll_interval()).await;
                }
                Err(err) if err.is_retryable() && Instant::now() < deadline => {
                    debug!(action = action.name(), %err, "transient page fault, retrying");
                    sleep(self.config.poll_interval()).await;
                }
                Err(err) => return Err(ui_failure(err)),
            }
        }
    }

    /// Best-effort interaction; failure is logged and ignored.
    pub async fn try_perform(&self, action: SemanticAction) -> bool {
        match self.executor.perform(&action, self.page).await {
            Ok(_) => true,
            Err(err) => {
                debug!(action = action.name(), %err, "optional action skipped");
                false
            }
        }
    }
}
