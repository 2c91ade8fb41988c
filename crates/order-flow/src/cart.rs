//! The per-item add phase.

use std::collections::HashMap;

use action_locator::{Outcome, Probe, SemanticAction};
use cartpilot_core_types::{AddedItem, LineItem, OrderError, OutOfStockItem};
use tracing::{info, warn};

use crate::context::FlowContext;

/// Products this transaction already put in the cart, by URL, with their entry in
/// `successfully_added`.
#[derive(Debug, Default)]
pub(crate) struct CartLedger {
    entries: HashMap<String, usize>,
}

/// Add `items` in order, recording each as added or out of stock.
///
/// A product already in the cart shows a quantity stepper instead of the add button, so
/// it is topped up rather than stock-checked again.
pub(crate) async fn add_items(
    ctx: &FlowContext<'_>,
    items: &[LineItem],
    ledger: &mut CartLedger,
) -> Result<(), OrderError> {
    for (idx, item) in items.iter().enumerate() {
        ctx.state.set_message(
            ctx.txn,
            format!("Adding item {}/{}: {}", idx + 1, items.len(), item.product_url),
        )?;
        match ledger.entries.get(&item.product_url) {
            Some(&entry) => top_up_item(ctx, item, entry).await?,
            None => {
                if let Some(entry) = add_item(ctx, item).await? {
                    ledger.entries.insert(item.product_url.clone(), entry);
                }
            }
        }
    }
    Ok(())
}

async fn top_up_item(ctx: &FlowContext<'_>, item: &LineItem, entry: usize) -> Result<(), OrderError> {
    ctx.goto(&item.product_url).await?;
    ctx.try_perform(SemanticAction::DismissOverlay).await;

    let extra = increase_quantity(ctx, item, item.quantity).await?;
    if extra < item.quantity {
        warn!(
            item = %item.product_url,
            requested = item.quantity,
            added = extra,
            "topped up fewer than requested"
        );
    }
    info!(item = %item.product_url, extra, "raised quantity of item already in cart");
    ctx.state.add_quantity(ctx.txn, entry, extra)
}

/// Click the quantity stepper up to `steps` times; yields how many clicks landed.
async fn increase_quantity(
    ctx: &FlowContext<'_>,
    item: &LineItem,
    steps: u32,
) -> Result<u32, OrderError> {
    let mut landed = 0;
    for step in 1..=steps {
        match ctx.perform_when_ready(SemanticAction::ClickIncreaseQuantity).await {
            Ok(()) => landed += 1,
            Err(OrderError::Cancelled) => return Err(OrderError::Cancelled),
            Err(err) => {
                warn!(item = %item.product_url, step, %err, "quantity increase failed");
                break;
            }
        }
    }
    Ok(landed)
}

/// Yields the `successfully_added` entry when the item made it into the cart.
async fn add_item(ctx: &FlowContext<'_>, item: &LineItem) -> Result<Option<usize>, OrderError> {
    ctx.goto(&item.product_url).await?;
    ctx.try_perform(SemanticAction::DismissOverlay).await;

    let name = ctx
        .wait_for_text(Probe::ProductTitle)
        .await?
        .unwrap_or_else(|| item.fallback_name());

    if ctx.detect(SemanticAction::DetectInStock).await? != Outcome::Matched {
        info!(item = %item.product_url, %name, "out of stock");
        mark_out_of_stock(ctx, item, name)?;
        return Ok(None);
    }

    ctx.ensure_current()?;
    if let Err(err) = ctx
        .executor
        .perform(&SemanticAction::ClickAddToBasket, ctx.page)
        .await
    {
        // the stock check passed but nothing could be added: never a silent skip
        warn!(item = %item.product_url, %err, "add to basket failed, treating as out of stock");
        mark_out_of_stock(ctx, item, name)?;
        return Ok(None);
    }

    let quantity = 1 + increase_quantity(ctx, item, item.quantity.saturating_sub(1)).await?;
    if quantity < item.quantity {
        warn!(
            item = %item.product_url,
            requested = item.quantity,
            added = quantity,
            "added fewer than requested"
        );
    }

    info!(item = %item.product_url, %name, quantity, "added to cart");
    let entry = ctx.state.record_added(ctx.txn, AddedItem { name, quantity })?;
    Ok(Some(entry))
}

fn mark_out_of_stock(ctx: &FlowContext<'_>, item: &LineItem, name: String) -> Result<(), OrderError> {
    ctx.state.record_out_of_stock(
        ctx.txn,
        OutOfStockItem {
            name,
            url: item.product_url.clone(),
            quantity: item.quantity,
        },
    )
}
