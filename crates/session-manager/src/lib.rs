//! Session Manager
//!
//! Owns the one browser instance bound to the durable profile directory. Other components
//! borrow its page for the length of a transaction through a [`SessionHandle`].

pub mod errors;
pub mod launcher;
pub mod manager;

pub use errors::SessionError;
pub use launcher::{BrowserLauncher, ChromiumLauncher, LaunchedBrowser};
pub use manager::{SessionHandle, SessionManager};
