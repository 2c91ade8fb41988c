use clap::Subcommand;

use super::order::OrderArgs;
use super::serve::ServeArgs;
use super::status_check::StatusCheckArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run the HTTP adapter
    Serve(ServeArgs),

    /// Place an order in-process, answering checkpoints on stdin
    Order(OrderArgs),

    /// List the products the catalog resolves by name
    Catalog,

    /// Report whether the durable profile is still logged in
    StatusCheck(StatusCheckArgs),
}
