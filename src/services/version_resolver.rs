use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::backend::SharedBackend;
use crate::errors::ErrorRecord;
use crate::models::{Branch, LATEST_VERSION};
use crate::services::session_state::{SessionState, Transition};

/// Owns branch/version selection. Selection changes persist through the
/// backend first and only land in session state once persistence succeeded,
/// so a failed switch leaves the previous selection fully in effect.
pub struct VersionResolver {
    backend: SharedBackend,
    tx: mpsc::UnboundedSender<Transition>,
}

impl VersionResolver {
    pub fn new(backend: SharedBackend, tx: mpsc::UnboundedSender<Transition>) -> Self {
        Self { backend, tx }
    }

    pub fn set_branch(&self, state: &SessionState, branch: Branch) {
        if branch == state.branch && !state.selector().is_unset() {
            debug!(%branch, "branch unchanged, ignoring");
            return;
        }

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            match backend.set_version_type(branch).await {
                Ok(()) => {
                    let _ = tx.send(Transition::BranchSelected(branch));
                }
                Err(err) => {
                    warn!(%branch, %err, "branch switch failed, keeping previous selection");
                    let _ = tx.send(Transition::ErrorReported(ErrorRecord::version_error(
                        "Failed to switch branch",
                        &err,
                    )));
                }
            }
        });
    }

    pub fn set_version(&self, state: &SessionState, version: i64) {
        if version == state.version {
            debug!(version, "version unchanged, ignoring");
            return;
        }
        if version != LATEST_VERSION && !state.available_versions.contains(&version) {
            let _ = self.tx.send(Transition::ErrorReported(ErrorRecord::new(
                crate::errors::ErrorKind::VersionError,
                "Unknown version",
                format!("version {version} is not available on {}", state.branch),
            )));
            return;
        }

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            match backend.set_selected_version(version).await {
                Ok(()) => {
                    let _ = tx.send(Transition::VersionSelected(version));
                }
                Err(err) => {
                    warn!(version, %err, "version switch failed");
                    let _ = tx.send(Transition::ErrorReported(ErrorRecord::version_error(
                        "Failed to switch version",
                        &err,
                    )));
                }
            }
        });
    }

    /// Reloads the version list for `branch`. The reducer handles both the
    /// stale-branch case and resetting a pinned version that disappeared.
    pub fn load_version_list(&self, branch: Branch) {
        let _ = self.tx.send(Transition::VersionListRequested(branch));

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            match backend.get_version_list(branch).await {
                Ok(versions) => {
                    let _ = tx.send(Transition::VersionListLoaded { branch, versions });
                }
                Err(err) => {
                    warn!(%branch, %err, "version list load failed");
                    let _ = tx.send(Transition::VersionListFailed(branch));
                }
            }
        });
    }
}
