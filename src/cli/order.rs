use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use cartpilot_core_types::{LineItem, OrderRequest, OrderSnapshot, OrderStatus, OtpKind, StockDecision};
use clap::Args;
use order_flow::OrderEngine;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

use super::context::CliContext;
use crate::catalog::Catalog;

#[derive(Args, Clone)]
pub struct OrderArgs {
    /// Product name or URL, optionally suffixed with `:QTY` (repeatable)
    #[arg(long = "item", value_name = "NAME_OR_URL[:QTY]", required = true)]
    pub items: Vec<String>,

    /// Phone number for login (defaults to the configured one)
    #[arg(long)]
    pub phone: Option<String>,

    /// Saved delivery address label (defaults to the configured one)
    #[arg(long)]
    pub address: Option<String>,
}

enum Answer {
    Line(String),
    Closed,
    Interrupted,
    /// The engine left the waiting state on its own (timeout, failure)
    Moved,
}

pub async fn cmd_order(args: OrderArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    let catalog = config.catalog();
    let items = resolve_specs(&catalog, args.items.iter().map(String::as_str))?;

    let phone = args
        .phone
        .or_else(|| config.default_phone.clone())
        .context("Phone number is required (--phone or CARTPILOT_PHONE_NUMBER)")?;
    let address = args
        .address
        .or_else(|| config.default_address.clone())
        .context("Address is required (--address or CARTPILOT_DEFAULT_ADDRESS)")?;
    let request = OrderRequest::new(items, phone, address)?;

    let engine = ctx.engine();
    let poll = engine.config().poll_interval;
    let txn = engine.submit(request)?;
    println!("Order {txn} started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(poll);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return interrupt(&engine).await,
            _ = ticker.tick() => {}
        }

        let snapshot = engine.status();
        match snapshot.status {
            status if status.accepts_new_order() => return report(&snapshot),
            OrderStatus::WaitingLoginOtp | OrderStatus::WaitingPaymentOtp => {
                let kind = match snapshot.status {
                    OrderStatus::WaitingLoginOtp => OtpKind::Login,
                    _ => OtpKind::Payment,
                };
                println!("Enter the {} sent to your phone:", kind.label());
                match read_answer(&mut lines, &engine, snapshot.status, poll).await? {
                    Answer::Line(code) => {
                        if let Err(err) = engine.submit_otp(kind, &code) {
                            eprintln!("{err}");
                        }
                    }
                    Answer::Closed => return abandon(&engine).await,
                    Answer::Interrupted => return interrupt(&engine).await,
                    Answer::Moved => {}
                }
            }
            OrderStatus::WaitingStockDecision => {
                print_stock_prompt(&snapshot);
                match read_answer(&mut lines, &engine, snapshot.status, poll).await? {
                    Answer::Line(line) => match parse_decision(&catalog, &line) {
                        Ok(decision) => {
                            if let Err(err) = engine.submit_stock_decision(decision) {
                                eprintln!("{err}");
                            }
                        }
                        Err(err) => eprintln!("{err:#}"),
                    },
                    Answer::Closed => return abandon(&engine).await,
                    Answer::Interrupted => return interrupt(&engine).await,
                    Answer::Moved => {}
                }
            }
            _ => {}
        }
    }
}

/// Split `name-or-url[:qty]`. The suffix counts as a quantity only when it is numeric and
/// does not close a URL authority (`https://host:8080`).
pub(crate) fn parse_item_spec(spec: &str) -> (&str, u32) {
    let spec = spec.trim();
    let Some((head, tail)) = spec.rsplit_once(':') else {
        return (spec, 1);
    };
    let Ok(quantity) = tail.trim().parse::<u32>() else {
        return (spec, 1);
    };
    if let Some((_, rest)) = head.split_once("://") {
        if !rest.contains('/') {
            return (spec, 1);
        }
    }
    if head.trim().is_empty() {
        return (spec, 1);
    }
    (head.trim(), quantity)
}

fn resolve_specs<'a>(
    catalog: &Catalog,
    specs: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<LineItem>> {
    specs
        .into_iter()
        .filter(|spec| !spec.trim().is_empty())
        .map(|spec| {
            let (target, quantity) = parse_item_spec(spec);
            let url = catalog
                .resolve_any(target)
                .with_context(|| format!("Invalid item: {spec}"))?;
            Ok(LineItem::new(url, quantity))
        })
        .collect()
}

/// `cancel`, `proceed`, or `replace <item>[:qty], <item>[:qty]...`
fn parse_decision(catalog: &Catalog, line: &str) -> Result<StockDecision> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let decision = match verb.to_ascii_lowercase().as_str() {
        "cancel" => "cancel",
        "proceed" | "proceed_with_remaining" => "proceed_with_remaining",
        "replace" | "replace_items" => "replace_items",
        other => bail!("Unknown decision '{other}' (expected cancel, proceed or replace)"),
    };
    let replacements = if decision == "replace_items" {
        resolve_specs(catalog, rest.split(','))?
    } else {
        Vec::new()
    };
    Ok(StockDecision::parse(decision, replacements)?)
}

fn print_stock_prompt(snapshot: &OrderSnapshot) {
    println!("Some items are out of stock:");
    for item in &snapshot.out_of_stock_items {
        println!("  - {} (x{})", item.name, item.quantity);
    }
    if !snapshot.successfully_added.is_empty() {
        println!("Already in the cart:");
        for item in &snapshot.successfully_added {
            println!("  - {} (x{})", item.name, item.quantity);
        }
    }
    println!("Decide: cancel | proceed | replace <item>[:qty], <item>[:qty]...");
}

async fn read_answer(
    lines: &mut Lines<BufReader<Stdin>>,
    engine: &OrderEngine,
    waiting: OrderStatus,
    poll: Duration,
) -> Result<Answer> {
    let moved = async {
        while engine.status().status == waiting {
            tokio::time::sleep(poll).await;
        }
    };
    tokio::select! {
        line = lines.next_line() => {
            match line.context("failed to read stdin")? {
                Some(line) => Ok(Answer::Line(line.trim().to_string())),
                None => Ok(Answer::Closed),
            }
        }
        _ = tokio::signal::ctrl_c() => Ok(Answer::Interrupted),
        _ = moved => Ok(Answer::Moved),
    }
}

async fn interrupt(engine: &OrderEngine) -> Result<()> {
    let from = engine.stop().await;
    warn!(%from, "order interrupted");
    Err(anyhow!("order interrupted while {from}"))
}

async fn abandon(engine: &OrderEngine) -> Result<()> {
    let from = engine.stop().await;
    Err(anyhow!("stdin closed while the order was {from}"))
}

fn report(snapshot: &OrderSnapshot) -> Result<()> {
    let message = snapshot.last_message.as_deref().unwrap_or("");
    println!("Order {}: {message}", snapshot.status);
    for item in &snapshot.successfully_added {
        println!("  added {} (x{})", item.name, item.quantity);
    }
    for item in &snapshot.out_of_stock_items {
        println!("  unavailable {} (x{})", item.name, item.quantity);
    }
    info!(status = %snapshot.status, "order settled");
    match snapshot.status {
        OrderStatus::Error => bail!("order failed: {message}"),
        _ => Ok(()),
    }
}
