//! Page adapter for the cartpilot engine.
//!
//! Every strategy and procedure above this crate talks to a [`Page`]: a narrow,
//! element-handle based view of one browser tab. The Chromium implementation drives a
//! real browser through `chromiumoxide`; the `fixture` feature provides an HTML page
//! rendered from an in-memory model for tests.

use std::{env, path::PathBuf};

use which::which;

pub mod chromium;
#[cfg(feature = "fixture")]
pub mod fixture;
pub mod page;
pub mod wait;

pub use chromium::{ChromiumBrowser, ChromiumPage};
pub use error::{AdapterError, AdapterErrorKind};
pub use page::{CookieInfo, ElementRef, Page};
pub use wait::{poll_until, WaitOptions};

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the adapter.
    #[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
    pub enum AdapterErrorKind {
        #[error("navigation failed")]
        Navigation,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("invalid selector")]
        InvalidSelector,
        #[error("element handle is stale")]
        StaleElement,
        #[error("browser launch failed")]
        LaunchFailed,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        /// The fault is transient and the same call may succeed on a second attempt
        pub retriable: bool,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }

        /// Launch failures caused by a profile directory held by another process or left
        /// behind half-written by a crashed one.
        pub fn indicates_locked_profile(&self) -> bool {
            if self.kind != AdapterErrorKind::LaunchFailed {
                return false;
            }
            let text = self.to_string().to_ascii_lowercase();
            ["lock", "in use", "has been closed", "corrupt"]
                .iter()
                .any(|needle| text.contains(needle))
        }
    }
}

pub mod config {
    use crate::detect_chrome_executable;
    use serde::{Deserialize, Serialize};
    use std::{
        env,
        path::{Path, PathBuf},
    };

    /// Configuration for launching a browser bound to a durable profile.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct CdpConfig {
        pub executable: Option<PathBuf>,
        pub user_data_dir: PathBuf,
        pub headless: bool,
        pub no_sandbox: bool,
        pub request_timeout_ms: u64,
        pub launch_timeout_ms: u64,
        #[serde(default)]
        pub extra_args: Vec<String>,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: detect_chrome_executable(),
                user_data_dir: default_profile_dir(),
                headless: resolve_headless_default(),
                no_sandbox: resolve_flag("CARTPILOT_DISABLE_SANDBOX"),
                request_timeout_ms: 30_000,
                launch_timeout_ms: 20_000,
                extra_args: Vec::new(),
            }
        }
    }

    impl CdpConfig {
        pub fn with_user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
            self.user_data_dir = dir.into();
            self
        }
    }

    /// Read a `CARTPILOT_HEADLESS` value. Unrecognised values yield `None`.
    pub fn parse_headless(raw: &str) -> Option<bool> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    fn resolve_headless_default() -> bool {
        env::var("CARTPILOT_HEADLESS")
            .ok()
            .and_then(|value| parse_headless(&value))
            .unwrap_or(true)
    }

    fn resolve_flag(key: &str) -> bool {
        env::var(key)
            .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }

    pub fn default_profile_dir() -> PathBuf {
        if let Ok(path) = env::var("CARTPILOT_PROFILE_DIR") {
            if !path.trim().is_empty() {
                return PathBuf::from(path.trim());
            }
        }

        Path::new("./.cartpilot-profile").into()
    }
}

/// Locate a Chromium-family executable: `CARTPILOT_CHROME` first, then `PATH`, then
/// well-known install locations.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("CARTPILOT_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    os_specific_chrome_paths()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
            .iter()
            .filter_map(|key| env::var(key).ok())
            .map(|root| PathBuf::from(root).join("Google/Chrome/Application/chrome.exe"))
            .collect()
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }
}
