use anyhow::Result;

use super::catalog::cmd_catalog;
use super::env::CliArgs;
use super::order::cmd_order;
use super::serve::cmd_serve;
use super::status_check::cmd_status_check;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Serve(args) => cmd_serve(args, ctx).await,
        Commands::Order(args) => cmd_order(args, ctx).await,
        Commands::Catalog => cmd_catalog(ctx, cli.output),
        Commands::StatusCheck(args) => cmd_status_check(args, ctx, cli.output).await,
    }
}
