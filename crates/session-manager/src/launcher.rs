use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cdp_adapter::config::CdpConfig;
use cdp_adapter::{AdapterError, ChromiumBrowser, Page};

/// Starts a browser bound to a profile directory.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, profile_dir: &Path) -> Result<Box<dyn LaunchedBrowser>, AdapterError>;
}

/// A running browser owned by the session manager.
#[async_trait]
pub trait LaunchedBrowser: Send {
    fn page(&self) -> Arc<dyn Page>;

    /// Close the browser and stop its driver.
    async fn close(self: Box<Self>) -> Result<(), AdapterError>;
}

/// Launches Chromium through the CDP adapter
#[derive(Clone, Debug, Default)]
pub struct ChromiumLauncher {
    config: CdpConfig,
}

impl ChromiumLauncher {
    pub fn new(config: CdpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, profile_dir: &Path) -> Result<Box<dyn LaunchedBrowser>, AdapterError> {
        let config = self.config.clone().with_user_data_dir(profile_dir);
        let browser = ChromiumBrowser::launch(&config).await?;
        Ok(Box::new(browser))
    }
}

#[async_trait]
impl LaunchedBrowser for ChromiumBrowser {
    fn page(&self) -> Arc<dyn Page> {
        ChromiumBrowser::page(self)
    }

    async fn close(self: Box<Self>) -> Result<(), AdapterError> {
        ChromiumBrowser::close(*self).await
    }
}
