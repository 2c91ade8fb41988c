//! YAML configuration for the CLI and the HTTP adapter

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use action_locator::AddressMatchPolicy;
use anyhow::{bail, Result};
use cdp_adapter::config::{default_profile_dir, parse_headless, CdpConfig};
use order_flow::{EngineConfig, ReconcileLimits};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::Catalog;

pub const PROFILE_DIR_ENV: &str = "CARTPILOT_PROFILE_DIR";
pub const CHROME_ENV: &str = "CARTPILOT_CHROME";
pub const HEADLESS_ENV: &str = "CARTPILOT_HEADLESS";
pub const PHONE_ENV: &str = "CARTPILOT_PHONE_NUMBER";
pub const ADDRESS_ENV: &str = "CARTPILOT_DEFAULT_ADDRESS";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Durable browser profile
    pub profile_dir: PathBuf,
    pub chrome_executable: Option<PathBuf>,
    pub headless: Option<bool>,
    pub landing_url: String,
    /// Cookie domain that marks a logged-in profile
    pub session_domain: Option<String>,
    pub login_timeout_secs: u64,
    pub payment_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub element_wait_ms: u64,
    pub reconcile: ReconcileSection,
    pub address_match: AddressMatchPolicy,
    pub default_phone: Option<String>,
    pub default_address: Option<String>,
    /// Product name to URL; empty means the built-in catalog
    pub catalog: BTreeMap<String, String>,
    pub server: ServerSection,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSection {
    pub max_passes: usize,
    pub max_clicks_per_entry: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            profile_dir: default_profile_dir(),
            chrome_executable: None,
            headless: None,
            landing_url: engine.landing_url,
            session_domain: engine.session_domain,
            login_timeout_secs: engine.login_timeout.as_secs(),
            payment_timeout_secs: engine.payment_timeout.as_secs(),
            poll_interval_ms: engine.poll_interval.as_millis() as u64,
            element_wait_ms: engine.element_wait.as_millis() as u64,
            reconcile: ReconcileSection::default(),
            address_match: AddressMatchPolicy::default(),
            default_phone: None,
            default_address: None,
            catalog: BTreeMap::new(),
            server: ServerSection::default(),
        }
    }
}

impl Default for ReconcileSection {
    fn default() -> Self {
        let limits = ReconcileLimits::default();
        Self {
            max_passes: limits.max_passes,
            max_clicks_per_entry: limits.max_clicks_per_entry,
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Config {
    /// Environment variables win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Some(dir) = env_value(PROFILE_DIR_ENV) {
            self.profile_dir = PathBuf::from(dir);
        }
        if let Some(chrome) = env_value(CHROME_ENV) {
            self.chrome_executable = Some(PathBuf::from(chrome));
        }
        if let Some(raw) = env_value(HEADLESS_ENV) {
            match parse_headless(&raw) {
                Some(headless) => self.headless = Some(headless),
                None => warn!(value = %raw, "ignoring unrecognised {HEADLESS_ENV}"),
            }
        }
        if let Some(phone) = env_value(PHONE_ENV) {
            self.default_phone = Some(phone);
        }
        if let Some(address) = env_value(ADDRESS_ENV) {
            self.default_address = Some(address);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 || self.poll_interval_ms >= 1000 {
            bail!(
                "poll_interval_ms must be between 1 and 999 (got {})",
                self.poll_interval_ms
            );
        }
        if self.element_wait_ms == 0 {
            bail!("element_wait_ms must be positive");
        }
        if self.login_timeout_secs == 0 || self.payment_timeout_secs == 0 {
            bail!("OTP timeouts must be positive");
        }
        if self.reconcile.max_passes == 0 || self.reconcile.max_clicks_per_entry == 0 {
            bail!("reconcile bounds must be positive");
        }
        url::Url::parse(&self.landing_url)
            .map_err(|err| anyhow::anyhow!("invalid landing_url '{}': {err}", self.landing_url))?;
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            landing_url: self.landing_url.clone(),
            session_domain: self
                .session_domain
                .clone()
                .filter(|domain| !domain.trim().is_empty()),
            login_timeout: Duration::from_secs(self.login_timeout_secs),
            payment_timeout: Duration::from_secs(self.payment_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            element_wait: Duration::from_millis(self.element_wait_ms),
            address_policy: self.address_match,
            reconcile: ReconcileLimits {
                max_passes: self.reconcile.max_passes,
                max_clicks_per_entry: self.reconcile.max_clicks_per_entry,
            },
            ..EngineConfig::default()
        }
    }

    pub fn cdp_config(&self) -> CdpConfig {
        let mut cdp = CdpConfig::default().with_user_data_dir(self.profile_dir.clone());
        if let Some(executable) = &self.chrome_executable {
            cdp.executable = Some(executable.clone());
        }
        if let Some(headless) = self.headless {
            cdp.headless = headless;
        }
        cdp
    }

    pub fn catalog(&self) -> Catalog {
        if self.catalog.is_empty() {
            Catalog::builtin()
        } else {
            info!(products = self.catalog.len(), "using configured catalog");
            Catalog::new(self.catalog.clone())
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
