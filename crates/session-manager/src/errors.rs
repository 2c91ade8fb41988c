use std::path::{Path, PathBuf};

use cartpilot_core_types::OrderError;
use thiserror::Error;

const BOOTSTRAP_HINT: &str =
    "re-create the durable profile with the one-time interactive login bootstrap and retry";

/// Session acquisition errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Launch failed for a reason other than a locked profile
    #[error("browser launch failed for profile {}: {reason}", profile.display())]
    LaunchFailed { profile: PathBuf, reason: String },

    /// Launch still failed after the profile was moved aside
    #[error(
        "browser launch failed for profile {} after recovery ({}): {reason}; {hint}",
        profile.display(),
        describe_backup(backup.as_deref()),
        hint = BOOTSTRAP_HINT
    )]
    RecoveryFailed {
        profile: PathBuf,
        /// Where the old profile was moved; `None` if there was nothing to move
        backup: Option<PathBuf>,
        reason: String,
    },

    /// The profile could not be moved aside
    #[error("could not back up profile {}: {source}", profile.display())]
    Backup {
        profile: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_backup(backup: Option<&Path>) -> String {
    match backup {
        Some(path) => format!("backup at {}", path.display()),
        None => "no existing profile to back up".to_string(),
    }
}

impl From<SessionError> for OrderError {
    fn from(err: SessionError) -> Self {
        OrderError::SessionAcquisition(err.to_string())
    }
}
