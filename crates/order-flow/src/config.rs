use std::time::Duration;

use action_locator::AddressMatchPolicy;
use cartpilot_state_center::DEFAULT_HISTORY_CAPACITY;

pub const DEFAULT_LANDING_URL: &str = "https://www.zeptonow.com";

/// Bounds for emptying a pre-existing cart
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcileLimits {
    /// Outer passes over the cart entries
    pub max_passes: usize,
    /// Decrement clicks spent on one entry within a pass
    pub max_clicks_per_entry: usize,
}

impl Default for ReconcileLimits {
    fn default() -> Self {
        Self {
            max_passes: 10,
            max_clicks_per_entry: 50,
        }
    }
}

/// Runtime settings of the order engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Neutral page loaded before the login check and checkout
    pub landing_url: String,
    /// Cookie domain that marks an authenticated profile
    pub session_domain: Option<String>,
    pub login_timeout: Duration,
    pub payment_timeout: Duration,
    /// Checkpoint poll interval; kept sub-second
    pub poll_interval: Duration,
    /// Bound for waiting on a page element to appear
    pub element_wait: Duration,
    pub address_policy: AddressMatchPolicy,
    pub reconcile: ReconcileLimits,
    pub history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            landing_url: DEFAULT_LANDING_URL.to_string(),
            session_domain: Some("zeptonow.com".to_string()),
            login_timeout: Duration::from_secs(300),
            payment_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(500),
            element_wait: Duration::from_millis(3000),
            address_policy: AddressMatchPolicy::default(),
            reconcile: ReconcileLimits::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub(crate) fn poll_interval(&self) -> Duration {
        self.poll_interval.min(Duration::from_millis(900))
    }
}
