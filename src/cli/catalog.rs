use anyhow::Result;
use serde_json::json;

use super::context::CliContext;
use super::output::{print_structured, OutputFormat};

pub fn cmd_catalog(ctx: &CliContext, format: OutputFormat) -> Result<()> {
    let catalog = ctx.config().catalog();
    match format {
        OutputFormat::Human => {
            println!("{} products:", catalog.len());
            for name in catalog.list() {
                println!("  {name}");
            }
            Ok(())
        }
        _ => print_structured(
            &json!({ "products": catalog.list(), "count": catalog.len() }),
            format,
        ),
    }
}
