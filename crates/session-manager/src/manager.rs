use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cartpilot_core_types::SessionId;
use chrono::Utc;
use cdp_adapter::Page;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::errors::SessionError;
use crate::launcher::{BrowserLauncher, LaunchedBrowser};

/// Borrowed view of the live session.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    page: Arc<dyn Page>,
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn page(&self) -> Arc<dyn Page> {
        Arc::clone(&self.page)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle").field("id", &self.id).finish()
    }
}

struct ActiveSession {
    id: SessionId,
    browser: Box<dyn LaunchedBrowser>,
}

/// Owner of the single browser session.
pub struct SessionManager {
    launcher: Arc<dyn BrowserLauncher>,
    profile_dir: PathBuf,
    active: Mutex<Option<ActiveSession>>,
}

impl SessionManager {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, profile_dir: impl Into<PathBuf>) -> Self {
        Self {
            launcher,
            profile_dir: profile_dir.into(),
            active: Mutex::new(None),
        }
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    /// Launch a session on the durable profile.
    ///
    /// An outstanding session is torn down first. A launch failure that points at a locked
    /// or corrupt profile moves the directory aside and retries exactly once.
    pub async fn acquire(&self) -> Result<SessionHandle, SessionError> {
        let mut slot = self.active.lock().await;
        if let Some(previous) = slot.take() {
            warn!(session = %previous.id, "releasing outstanding session before acquire");
            teardown(previous).await;
        }

        let browser = match self.launcher.launch(&self.profile_dir).await {
            Ok(browser) => browser,
            Err(err) if err.indicates_locked_profile() => {
                warn!(
                    profile = %self.profile_dir.display(),
                    %err,
                    "profile locked or corrupt, moving it aside"
                );
                let backup = backup_profile(&self.profile_dir)?;
                match &backup {
                    Some(backup) => info!(backup = %backup.display(), "profile backed up, retrying launch"),
                    None => info!("no profile to back up, retrying launch"),
                }
                self.launcher
                    .launch(&self.profile_dir)
                    .await
                    .map_err(|err| SessionError::RecoveryFailed {
                        profile: self.profile_dir.clone(),
                        backup,
                        reason: err.to_string(),
                    })?
            }
            Err(err) => {
                return Err(SessionError::LaunchFailed {
                    profile: self.profile_dir.clone(),
                    reason: err.to_string(),
                })
            }
        };

        let id = SessionId::new();
        let page = browser.page();
        info!(session = %id, profile = %self.profile_dir.display(), "session acquired");
        *slot = Some(ActiveSession {
            id: id.clone(),
            browser,
        });
        Ok(SessionHandle { id, page })
    }

    /// Tear down `handle`'s session if it is still the live one. Never fails.
    pub async fn release(&self, handle: &SessionHandle) {
        let mut slot = self.active.lock().await;
        if slot.as_ref().map(|active| &active.id) != Some(&handle.id) {
            return;
        }
        if let Some(active) = slot.take() {
            teardown(active).await;
        }
    }

    /// Tear down whatever session is live. Never fails.
    pub async fn release_current(&self) {
        let active = self.active.lock().await.take();
        if let Some(active) = active {
            teardown(active).await;
        }
    }

    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }
}

async fn teardown(session: ActiveSession) {
    let id = session.id;
    match session.browser.close().await {
        Ok(()) => info!(session = %id, "session released"),
        Err(err) => warn!(session = %id, %err, "session teardown failed, ignoring"),
    }
}

/// Rename the profile to `<name>_backup_<utc-timestamp>` and recreate it empty.
///
/// Returns `None` when there was no profile directory to move. An existing backup is
/// never overwritten; a numeric suffix keeps the new one distinct.
fn backup_profile(profile: &Path) -> Result<Option<PathBuf>, SessionError> {
    let io_err = |source| SessionError::Backup {
        profile: profile.to_path_buf(),
        source,
    };

    let backup = if profile.exists() {
        let backup = unused_backup_path(profile);
        fs::rename(profile, &backup).map_err(io_err)?;
        Some(backup)
    } else {
        None
    };
    fs::create_dir_all(profile).map_err(io_err)?;
    Ok(backup)
}

fn unused_backup_path(profile: &Path) -> PathBuf {
    let name = profile
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "profile".to_string());
    let stamp = Utc::now().format("%Y%m%dT%H%M%S");
    let base = format!("{name}_backup_{stamp}");

    let mut candidate = profile.with_file_name(&base);
    let mut suffix = 1;
    while candidate.exists() {
        candidate = profile.with_file_name(format!("{base}_{suffix}"));
        suffix += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_moves_profile_aside() {
        let root = tempfile::tempdir().unwrap();
        let profile = root.path().join("profile");
        fs::create_dir_all(&profile).unwrap();
        fs::write(profile.join("SingletonLock"), b"held").unwrap();

        let backup = backup_profile(&profile).unwrap().unwrap();
        assert!(backup.join("SingletonLock").exists());
        assert!(profile.exists());
        assert_eq!(fs::read_dir(&profile).unwrap().count(), 0);
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("profile_backup_"));
    }

    #[test]
    fn backup_creates_missing_profile() {
        let root = tempfile::tempdir().unwrap();
        let profile = root.path().join("fresh");
        assert_eq!(backup_profile(&profile).unwrap(), None);
        assert!(profile.is_dir());
    }

    #[test]
    fn earlier_backups_are_never_overwritten() {
        let root = tempfile::tempdir().unwrap();
        let profile = root.path().join("profile");

        fs::create_dir_all(&profile).unwrap();
        fs::write(profile.join("Cookies"), b"first").unwrap();
        let first = backup_profile(&profile).unwrap().unwrap();

        fs::write(profile.join("Cookies"), b"second").unwrap();
        let second = backup_profile(&profile).unwrap().unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read(first.join("Cookies")).unwrap(), b"first");
        assert_eq!(fs::read(second.join("Cookies")).unwrap(), b"second");
    }
}
