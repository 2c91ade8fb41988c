//! Cart reconciliation
//!
//! Empties whatever a previous session left in the cart so a transaction starts from a
//! known state. Best effort: once the pass bound is exhausted the transaction proceeds
//! with whatever is left.

use action_locator::{ActionExecutor, Collection, LocatorError, Probe, SemanticAction};
use cdp_adapter::{poll_until, ElementRef, Page, WaitOptions};
use tracing::{debug, info, warn};

use crate::config::ReconcileLimits;

/// What a reconciliation run did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Count shown by the cart badge before any work
    pub initial_count: u32,
    pub opened: bool,
    pub passes: usize,
    pub decrement_clicks: usize,
    pub cleared: bool,
    pub closed: bool,
}

pub struct CartReconciler {
    limits: ReconcileLimits,
    wait: WaitOptions,
}

impl CartReconciler {
    pub fn new(limits: ReconcileLimits, wait: WaitOptions) -> Self {
        Self { limits, wait }
    }

    /// Empty the cart. Issues no interaction when the badge is absent or reads zero.
    pub async fn reconcile(&self, executor: &ActionExecutor, page: &dyn Page) -> ReconcileReport {
        let initial_count = match executor.read(Probe::CartBadgeCount, page).await {
            Ok(text) => text.as_deref().map(parse_count).unwrap_or(0),
            Err(err) => {
                warn!(%err, "cart badge unreadable, assuming empty");
                0
            }
        };
        let mut report = ReconcileReport {
            initial_count,
            ..ReconcileReport::default()
        };
        if report.initial_count == 0 {
            debug!("cart already empty");
            report.cleared = true;
            return report;
        }

        info!(count = report.initial_count, "clearing existing cart");
        if let Err(err) = executor.perform(&SemanticAction::ClickCheckoutEntry, page).await {
            warn!(%err, "could not open cart, proceeding without clearing");
            return report;
        }
        report.opened = true;
        poll_until(self.wait, move || async move {
            let entries = executor.enumerate(Collection::CartEntries, page).await?;
            Ok::<_, LocatorError>((!entries.is_empty()).then_some(()))
        })
        .await;

        for pass in 1..=self.limits.max_passes {
            report.passes = pass;
            let entries = entries(executor, page).await;
            if next_target(executor, page, &entries).await.is_none() {
                report.cleared = true;
                break;
            }
            report.decrement_clicks += self.drain_first(executor, page, entries.len()).await;
        }
        if !report.cleared {
            let left = entries(executor, page).await;
            report.cleared = next_target(executor, page, &left).await.is_none();
            if !report.cleared {
                warn!(
                    passes = report.passes,
                    entries = left.len(),
                    "cart not fully cleared, proceeding"
                );
            }
        }

        match executor.perform(&SemanticAction::ClickCloseCart, page).await {
            Ok(_) => report.closed = true,
            Err(err) => warn!(%err, "could not close cart view"),
        }
        info!(
            clicks = report.decrement_clicks,
            cleared = report.cleared,
            "cart reconciliation finished"
        );
        report
    }

    /// Decrement the first non-empty entry until it leaves the enumeration.
    ///
    /// Entries are re-enumerated after every click: removing one shifts the others.
    async fn drain_first(&self, executor: &ActionExecutor, page: &dyn Page, start: usize) -> usize {
        let mut clicks = 0;
        let mut current = entries(executor, page).await;
        while clicks < self.limits.max_clicks_per_entry {
            let Some(target) = next_target(executor, page, &current).await else {
                break;
            };
            if let Err(err) = executor
                .perform_scoped(&SemanticAction::DecrementCartEntry, target, page)
                .await
            {
                warn!(%err, "decrement failed");
                break;
            }
            clicks += 1;
            current = entries(executor, page).await;
            if current.len() < start {
                break;
            }
        }
        clicks
    }
}

async fn entries(executor: &ActionExecutor, page: &dyn Page) -> Vec<ElementRef> {
    executor
        .enumerate(Collection::CartEntries, page)
        .await
        .unwrap_or_else(|err| {
            warn!(%err, "cart entries unreadable");
            Vec::new()
        })
}

/// First entry whose quantity does not read zero.
async fn next_target(
    executor: &ActionExecutor,
    page: &dyn Page,
    entries: &[ElementRef],
) -> Option<ElementRef> {
    for entry in entries {
        let quantity = executor
            .read_scoped(Probe::EntryQuantity, *entry, page)
            .await
            .ok()
            .flatten();
        if quantity.as_deref().map(parse_count) != Some(0) {
            return Some(*entry);
        }
    }
    None
}

/// Leading digits of a badge or quantity label; non-numeric text counts as one.
fn parse_count(text: &str) -> u32 {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.parse() {
        Ok(count) => count,
        Err(_) if text.trim().is_empty() => 0,
        Err(_) => 1,
    }
}
