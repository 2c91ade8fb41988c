use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::context::CliContext;
use crate::server::{build_router, OrderDefaults, ServeState};

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Bind address (defaults to `server.host` from the config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port (defaults to `server.port` from the config)
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn cmd_serve(args: ServeArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.config();
    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;

    let engine = ctx.engine();
    let defaults = OrderDefaults {
        phone_number: config.default_phone.clone(),
        address: config.default_address.clone(),
    };
    if defaults.phone_number.is_none() {
        warn!("no default phone number configured; requests must carry phone_number");
    }
    let state = ServeState::new(engine.clone(), config.catalog(), defaults);
    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind order server on {}", addr))?;
    info!(
        profile = %config.profile_dir.display(),
        "Order API available at http://{}",
        addr
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(?err, "failed to listen for shutdown signal");
            }
            info!("shutdown requested");
        })
        .await
        .context("order server exited unexpectedly")?;

    let last = engine.stop().await;
    info!(%last, "order engine stopped");
    Ok(())
}
