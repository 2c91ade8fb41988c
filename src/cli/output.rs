use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Print `value` as JSON or YAML; `Human` falls back to pretty JSON.
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(value).context("failed to render YAML")?,
        OutputFormat::Human | OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("failed to render JSON")?
        }
    };
    println!("{rendered}");
    Ok(())
}
