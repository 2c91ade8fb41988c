use std::path::{Path, PathBuf};
use std::sync::Arc;

use order_flow::OrderEngine;
use session_manager::{ChromiumLauncher, SessionManager};

use crate::config::Config;

pub struct CliContext {
    config: Arc<Config>,
    config_path: PathBuf,
}

impl CliContext {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
        }
    }

    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Session manager bound to the configured durable profile
    pub fn session_manager(&self) -> SessionManager {
        let launcher = ChromiumLauncher::new(self.config.cdp_config());
        SessionManager::new(Arc::new(launcher), self.config.profile_dir.clone())
    }

    pub fn engine(&self) -> OrderEngine {
        OrderEngine::new(self.session_manager(), self.config.engine_config())
    }
}
