use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::SharedBackend;
use crate::errors::ErrorRecord;
use crate::models::PipelinePhase;
use crate::services::session_state::{SessionState, Transition};

/// Short grace period before the startup check so the backend's update feed
/// client has a chance to come up.
const STARTUP_CHECK_DELAY: Duration = Duration::from_millis(500);

/// Runs the mandatory startup update check and the self-update sub-pipeline.
/// Advisory updates need no logic here; they arrive on their own event
/// stream and only ever toggle an affordance.
pub struct UpdateGate {
    backend: SharedBackend,
    tx: mpsc::UnboundedSender<Transition>,
}

impl UpdateGate {
    pub fn new(backend: SharedBackend, tx: mpsc::UnboundedSender<Transition>) -> Self {
        Self { backend, tx }
    }

    /// One-shot startup check. A failed check proceeds as if no update
    /// existed; being offline must never block the launcher.
    pub fn startup_check(&self) -> JoinHandle<()> {
        let _ = self.tx.send(Transition::StartupCheckStarted);

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(STARTUP_CHECK_DELAY).await;
            let asset = match backend.check_update().await {
                Ok(asset) => asset,
                Err(err) => {
                    warn!(%err, "startup update check failed, proceeding without gate");
                    None
                }
            };
            if let Some(asset) = &asset {
                info!(name = %asset.name, "blocking launcher update available");
            }
            let _ = tx.send(Transition::StartupChecked(asset));
        })
    }

    /// Starts the self-update sub-pipeline. Success never reports back: the
    /// backend replaces the running process. Failure drops back to Idle.
    pub fn self_update(&self, state: &SessionState) {
        if state.phase != PipelinePhase::Idle {
            warn!(phase = ?state.phase, "self-update refused outside Idle");
            return;
        }
        let _ = self.tx.send(Transition::SelfUpdateStarted);

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if let Err(err) = backend.update().await {
                warn!(%err, "launcher self-update failed");
                let _ = tx.send(Transition::SelfUpdateFailed(ErrorRecord::update_error(
                    "Failed to update launcher",
                    &err,
                )));
            }
        });
    }
}
