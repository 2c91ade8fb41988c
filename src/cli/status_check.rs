use anyhow::{Context, Result};
use action_locator::{ActionExecutor, Outcome, SemanticAction, StrategySet};
use cdp_adapter::Page;
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use super::context::CliContext;
use super::output::{print_structured, OutputFormat};

#[derive(Args, Clone)]
pub struct StatusCheckArgs {
    /// Page to open instead of the configured landing URL
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginReport {
    profile: String,
    url: String,
    logged_in: Option<bool>,
}

/// Open the durable profile and report whether it is still logged in. Never starts the
/// interactive login.
pub async fn cmd_status_check(
    args: StatusCheckArgs,
    ctx: &CliContext,
    format: OutputFormat,
) -> Result<()> {
    let config = ctx.config();
    let url = args.url.unwrap_or_else(|| config.landing_url.clone());
    let mut executor = ActionExecutor::new(StrategySet::standard());
    if let Some(domain) = config.engine_config().session_domain {
        executor = executor.with_session_domain(domain);
    }

    let sessions = ctx.session_manager();
    let handle = sessions
        .acquire()
        .await
        .context("failed to open the durable profile")?;
    let page = handle.page();

    let probe = probe_login(page.as_ref(), &executor, &url).await;
    sessions.release(&handle).await;

    let logged_in = match probe? {
        Outcome::Matched => Some(false),
        Outcome::NotMatched => Some(true),
        Outcome::Indeterminate => {
            warn!("login state could not be determined");
            None
        }
    };
    info!(?logged_in, "status check finished");

    let report = LoginReport {
        profile: sessions.profile_dir().display().to_string(),
        url,
        logged_in,
    };
    match format {
        OutputFormat::Human => {
            let verdict = match report.logged_in {
                Some(true) => "logged in",
                Some(false) => "login required (run the interactive bootstrap)",
                None => "unknown",
            };
            println!("Profile: {}", report.profile);
            println!("Checked: {}", report.url);
            println!("Session: {verdict}");
            Ok(())
        }
        _ => print_structured(&report, format),
    }
}

async fn probe_login(page: &dyn Page, executor: &ActionExecutor, url: &str) -> Result<Outcome> {
    page.goto(url)
        .await
        .with_context(|| format!("failed to open {url}"))?;
    executor
        .perform(&SemanticAction::DetectLoginRequired, page)
        .await
        .context("login detection failed")
}
