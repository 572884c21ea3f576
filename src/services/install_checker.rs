use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::backend::SharedBackend;
use crate::models::VersionSelector;
use crate::services::session_state::Transition;

/// Issues asynchronous install-state queries and reports them back to the
/// orchestrator tagged with the selection they were issued for. The reducer
/// drops any result whose tag no longer matches the current selection; the
/// generation counter here exists purely so superseded queries can be logged.
pub struct InstallChecker {
    backend: SharedBackend,
    tx: mpsc::UnboundedSender<Transition>,
    generation: u64,
}

impl InstallChecker {
    pub fn new(backend: SharedBackend, tx: mpsc::UnboundedSender<Transition>) -> Self {
        Self {
            backend,
            tx,
            generation: 0,
        }
    }

    /// Starts one check for `target`. Never blocks the caller.
    pub fn issue(&mut self, target: VersionSelector) {
        self.generation += 1;
        let generation = self.generation;
        let _ = self.tx.send(Transition::InstallCheckStarted(target));

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let (installed, needs_update) = run_check(&backend, target).await;
            debug!(
                branch = %target.branch,
                version = target.version,
                generation,
                installed,
                needs_update,
                "install check resolved"
            );
            let _ = tx.send(Transition::InstallChecked {
                target,
                installed,
                needs_update,
            });
        });
    }
}

/// Resolves `{installed, needs_update}` for one selection.
///
/// Version < 0 short-circuits without touching the backend; pinned versions
/// never need updates; any backend failure collapses to `(false, false)` so
/// the UI falls back to offering a reinstall rather than surfacing an error.
pub async fn run_check(backend: &SharedBackend, target: VersionSelector) -> (bool, bool) {
    if target.is_unset() {
        return (false, false);
    }

    let installed = match backend
        .is_version_installed(target.branch, target.version)
        .await
    {
        Ok(installed) => installed,
        Err(err) => {
            warn!(branch = %target.branch, version = target.version, %err, "install query failed");
            return (false, false);
        }
    };

    if !target.is_latest() || !installed {
        return (installed, false);
    }

    match backend.check_latest_needs_update(target.branch).await {
        Ok(needs_update) => (installed, needs_update),
        Err(err) => {
            warn!(branch = %target.branch, %err, "latest descriptor comparison failed");
            (installed, false)
        }
    }
}
