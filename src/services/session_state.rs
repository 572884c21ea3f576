use serde::Serialize;

use crate::errors::ErrorRecord;
use crate::events::BackendErrorPayload;
use crate::models::{
    Branch, DownloadProgress, InstalledVersion, PipelinePhase, ProgressEvent, UpdateAsset,
    VersionSelector, LATEST_VERSION, STAGE_LAUNCH, UNSET_VERSION,
};

pub const DEFAULT_NICK: &str = "HyPrism";

/// The one authoritative session aggregate. Mutated only through [`reduce`],
/// so every writer goes through the same transition arms and the phase can
/// never contradict itself.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub nickname: String,
    pub branch: Branch,
    pub version: i64,
    pub available_versions: Vec<i64>,
    pub installed_versions: Vec<InstalledVersion>,
    pub is_version_installed: bool,
    pub latest_needs_update: bool,
    pub is_loading_versions: bool,
    pub is_checking_installed: bool,
    pub phase: PipelinePhase,
    pub download: DownloadProgress,
    pub update: DownloadProgress,
    pub advisory_update: Option<UpdateAsset>,
    pub blocking_update: Option<UpdateAsset>,
    pub last_error: Option<ErrorRecord>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            nickname: DEFAULT_NICK.to_string(),
            branch: Branch::Release,
            version: UNSET_VERSION,
            available_versions: Vec::new(),
            installed_versions: Vec::new(),
            is_version_installed: false,
            latest_needs_update: false,
            is_loading_versions: false,
            is_checking_installed: false,
            phase: PipelinePhase::Idle,
            download: DownloadProgress::default(),
            update: DownloadProgress::default(),
            advisory_update: None,
            blocking_update: None,
            last_error: None,
        }
    }
}

impl SessionState {
    pub fn selector(&self) -> VersionSelector {
        VersionSelector::new(self.branch, self.version)
    }
}

/// Every way session state can change. User commands, backend completions,
/// inbound events and timer expiries all funnel into one of these arms.
#[derive(Clone, Debug)]
pub enum Transition {
    /// Nick and branch recovered from persisted config at startup.
    SessionRestored { nick: String, branch: Branch },
    NickChanged(String),

    BranchSelected(Branch),
    VersionSelected(i64),
    VersionListRequested(Branch),
    VersionListLoaded { branch: Branch, versions: Vec<i64> },
    VersionListFailed(Branch),
    InstalledVersionsLoaded {
        branch: Branch,
        versions: Vec<InstalledVersion>,
    },

    InstallCheckStarted(VersionSelector),
    InstallChecked {
        target: VersionSelector,
        installed: bool,
        needs_update: bool,
    },
    /// Install facts can no longer be trusted (directory change, deletion).
    InstallInvalidated,

    PlayStarted,
    GameProgress(ProgressEvent),
    /// `exit()` and a failed liveness poll both land here.
    GameStopped,

    StartupCheckStarted,
    StartupChecked(Option<UpdateAsset>),
    BlockingUpdateSkipped,
    AdvisoryUpdate(UpdateAsset),
    SelfUpdateStarted,
    SelfUpdateProgress(ProgressEvent),
    SelfUpdateFailed(ErrorRecord),

    ErrorReported(ErrorRecord),
    /// Backend-reported fatal error: records it and aborts the pipeline.
    FatalError(ErrorRecord),
    ErrorDismissed,
}

/// Pure transition function: `(old, transition) -> new`. No clock, no I/O,
/// no backend; staleness is decided by comparing the tags a completion
/// carries against the selection in `state`.
pub fn reduce(state: &SessionState, transition: &Transition) -> SessionState {
    let mut next = state.clone();
    match transition {
        Transition::SessionRestored { nick, branch } => {
            if !nick.trim().is_empty() {
                next.nickname = nick.trim().to_string();
            }
            next.branch = *branch;
            next.version = LATEST_VERSION;
        }
        Transition::NickChanged(nick) => {
            next.nickname = nick.clone();
        }

        Transition::BranchSelected(branch) => {
            next.branch = *branch;
            next.version = LATEST_VERSION;
            next.available_versions.clear();
            next.installed_versions.clear();
            next.is_version_installed = false;
            next.latest_needs_update = false;
        }
        Transition::VersionSelected(version) => {
            next.version = *version;
            next.is_version_installed = false;
            next.latest_needs_update = false;
        }
        Transition::VersionListRequested(branch) => {
            if *branch == next.branch {
                next.is_loading_versions = true;
            }
        }
        Transition::VersionListLoaded { branch, versions } => {
            // A load issued for an abandoned branch is stale; drop it whole.
            if *branch == next.branch {
                next.is_loading_versions = false;
                next.available_versions = versions.clone();
                if next.version > 0 && !versions.contains(&next.version) {
                    next.version = versions.first().copied().unwrap_or(LATEST_VERSION);
                }
            }
        }
        Transition::VersionListFailed(branch) => {
            if *branch == next.branch {
                next.is_loading_versions = false;
            }
        }
        Transition::InstalledVersionsLoaded { branch, versions } => {
            if *branch == next.branch {
                next.installed_versions = versions.clone();
            }
        }

        Transition::InstallCheckStarted(target) => {
            if *target == next.selector() {
                next.is_checking_installed = true;
            }
        }
        Transition::InstallChecked {
            target,
            installed,
            needs_update,
        } => {
            // Stale results for abandoned selections are discarded.
            if *target == next.selector() {
                next.is_checking_installed = false;
                next.is_version_installed = *installed;
                // Only the latest slot ever carries a meaningful update flag.
                next.latest_needs_update =
                    target.is_latest() && *installed && *needs_update;
            }
        }
        Transition::InstallInvalidated => {
            next.is_version_installed = false;
            next.latest_needs_update = false;
        }

        Transition::PlayStarted => {
            if next.phase == PipelinePhase::Idle {
                next.phase = PipelinePhase::Downloading;
                next.download.reset();
            }
        }
        Transition::GameProgress(event) => {
            next.download.apply(event);
            if event.stage == STAGE_LAUNCH && next.phase == PipelinePhase::Downloading {
                next.phase = PipelinePhase::Running;
                next.download.reset();
                // The backend just put the files on disk; no fresh query needed.
                next.is_version_installed = true;
                next.latest_needs_update = false;
            }
        }
        Transition::GameStopped => {
            if next.phase == PipelinePhase::Running {
                next.phase = PipelinePhase::Idle;
                next.download.reset();
            }
        }

        Transition::StartupCheckStarted => {
            if next.phase == PipelinePhase::Idle {
                next.phase = PipelinePhase::CheckingStartupUpdate;
            }
        }
        Transition::StartupChecked(asset) => {
            if next.phase == PipelinePhase::CheckingStartupUpdate {
                next.phase = PipelinePhase::Idle;
            }
            next.blocking_update = asset.clone();
        }
        Transition::BlockingUpdateSkipped => {
            next.blocking_update = None;
        }
        Transition::AdvisoryUpdate(asset) => {
            next.advisory_update = Some(asset.clone());
        }
        Transition::SelfUpdateStarted => {
            if matches!(
                next.phase,
                PipelinePhase::Idle | PipelinePhase::CheckingStartupUpdate
            ) {
                next.phase = PipelinePhase::UpdatingLauncher;
                next.update.reset();
            }
        }
        Transition::SelfUpdateProgress(event) => {
            next.update.apply(event);
        }
        Transition::SelfUpdateFailed(record) => {
            if next.phase == PipelinePhase::UpdatingLauncher {
                next.phase = PipelinePhase::Idle;
            }
            next.last_error = Some(record.clone());
        }

        Transition::ErrorReported(record) => {
            next.last_error = Some(record.clone());
        }
        Transition::FatalError(record) => {
            next.last_error = Some(record.clone());
            next.phase = PipelinePhase::Idle;
            next.download.reset();
            next.update.reset();
        }
        Transition::ErrorDismissed => {
            next.last_error = None;
        }
    }
    next
}

impl From<&BackendErrorPayload> for ErrorRecord {
    fn from(payload: &BackendErrorPayload) -> Self {
        ErrorRecord::new(
            crate::errors::ErrorKind::Backend(payload.kind.clone()),
            payload.message.clone(),
            payload.technical.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn progress(stage: &str, pct: u8) -> ProgressEvent {
        ProgressEvent {
            stage: stage.to_string(),
            progress: pct,
            ..ProgressEvent::default()
        }
    }

    fn fold(state: SessionState, transitions: &[Transition]) -> SessionState {
        transitions.iter().fold(state, |s, t| reduce(&s, t))
    }

    fn ready_state() -> SessionState {
        fold(
            SessionState::default(),
            &[Transition::SessionRestored {
                nick: "Steve".to_string(),
                branch: Branch::Release,
            }],
        )
    }

    #[test]
    fn play_moves_idle_to_downloading_only() {
        let state = ready_state();
        let downloading = reduce(&state, &Transition::PlayStarted);
        assert_eq!(downloading.phase, PipelinePhase::Downloading);

        // A second PlayStarted while not Idle is a no-op.
        let again = reduce(&downloading, &Transition::PlayStarted);
        assert_eq!(again.phase, PipelinePhase::Downloading);
    }

    #[test]
    fn launch_stage_marks_running_and_installed() {
        let state = fold(
            ready_state(),
            &[
                Transition::PlayStarted,
                Transition::GameProgress(progress("download", 40)),
                Transition::GameProgress(progress("download", 80)),
            ],
        );
        assert_eq!(state.download.progress, 80);
        assert!(!state.is_version_installed);

        let running = reduce(&state, &Transition::GameProgress(progress(STAGE_LAUNCH, 100)));
        assert_eq!(running.phase, PipelinePhase::Running);
        assert!(running.is_version_installed);
        assert_eq!(running.download.progress, 0, "progress resets on launch");
    }

    #[test]
    fn game_stopped_only_applies_while_running() {
        let idle = reduce(&ready_state(), &Transition::GameStopped);
        assert_eq!(idle.phase, PipelinePhase::Idle);

        let running = fold(
            ready_state(),
            &[
                Transition::PlayStarted,
                Transition::GameProgress(progress(STAGE_LAUNCH, 100)),
            ],
        );
        let stopped = reduce(&running, &Transition::GameStopped);
        assert_eq!(stopped.phase, PipelinePhase::Idle);
        assert_eq!(stopped.download.progress, 0);
    }

    #[test]
    fn stale_install_check_is_discarded() {
        let state = ready_state();
        let b2_tag = VersionSelector::new(Branch::Nightly, LATEST_VERSION);
        let after = reduce(
            &state,
            &Transition::InstallChecked {
                target: b2_tag,
                installed: true,
                needs_update: true,
            },
        );
        assert!(!after.is_version_installed, "result for abandoned branch applied");
        assert!(!after.latest_needs_update);
    }

    #[test]
    fn current_install_check_is_applied() {
        let state = ready_state();
        let after = reduce(
            &state,
            &Transition::InstallChecked {
                target: state.selector(),
                installed: true,
                needs_update: true,
            },
        );
        assert!(after.is_version_installed);
        assert!(after.latest_needs_update);
        assert!(!after.is_checking_installed);
    }

    #[test]
    fn needs_update_never_set_when_not_installed() {
        let state = ready_state();
        let after = reduce(
            &state,
            &Transition::InstallChecked {
                target: state.selector(),
                installed: false,
                needs_update: true,
            },
        );
        assert!(!after.latest_needs_update);
    }

    #[test]
    fn pinned_version_never_carries_needs_update() {
        let state = fold(
            ready_state(),
            &[
                Transition::VersionListLoaded {
                    branch: Branch::Release,
                    versions: vec![7, 5, 3],
                },
                Transition::VersionSelected(7),
            ],
        );
        let after = reduce(
            &state,
            &Transition::InstallChecked {
                target: VersionSelector::new(Branch::Release, 7),
                installed: true,
                needs_update: true,
            },
        );
        assert!(after.is_version_installed);
        assert!(!after.latest_needs_update);
    }

    #[test]
    fn stale_version_list_is_discarded() {
        let state = fold(
            ready_state(),
            &[Transition::BranchSelected(Branch::Nightly)],
        );
        let after = reduce(
            &state,
            &Transition::VersionListLoaded {
                branch: Branch::Release,
                versions: vec![9, 8],
            },
        );
        assert!(after.available_versions.is_empty());
    }

    #[test]
    fn removed_pinned_version_falls_back_to_newest() {
        let state = fold(
            ready_state(),
            &[
                Transition::VersionListLoaded {
                    branch: Branch::Release,
                    versions: vec![5, 4],
                },
                Transition::VersionSelected(4),
            ],
        );
        let after = reduce(
            &state,
            &Transition::VersionListLoaded {
                branch: Branch::Release,
                versions: vec![6, 5],
            },
        );
        assert_eq!(after.version, 6);

        let emptied = reduce(
            &after,
            &Transition::VersionListLoaded {
                branch: Branch::Release,
                versions: vec![],
            },
        );
        assert_eq!(emptied.version, LATEST_VERSION);
    }

    #[test]
    fn branch_change_resets_selection_and_install_facts() {
        let state = fold(
            ready_state(),
            &[
                Transition::VersionListLoaded {
                    branch: Branch::Release,
                    versions: vec![3],
                },
                Transition::VersionSelected(3),
                Transition::InstallChecked {
                    target: VersionSelector::new(Branch::Release, 3),
                    installed: true,
                    needs_update: false,
                },
                Transition::BranchSelected(Branch::PreRelease),
            ],
        );
        assert_eq!(state.branch, Branch::PreRelease);
        assert_eq!(state.version, LATEST_VERSION);
        assert!(!state.is_version_installed);
        assert!(state.available_versions.is_empty());
    }

    #[test]
    fn progress_streams_stay_disjoint() {
        let state = fold(
            ready_state(),
            &[
                Transition::PlayStarted,
                Transition::GameProgress(progress("download", 40)),
                Transition::SelfUpdateProgress(ProgressEvent {
                    stage: "download".to_string(),
                    progress: 50,
                    downloaded: 50,
                    total: 100,
                    ..ProgressEvent::default()
                }),
            ],
        );
        assert_eq!(state.download.progress, 40);
        assert_eq!(state.download.downloaded, 0);
        assert_eq!(state.update.progress, 50);
        assert_eq!(state.update.downloaded, 50);
    }

    #[test]
    fn fatal_error_aborts_pipeline_from_any_phase() {
        let record = ErrorRecord::new(ErrorKind::Backend("X".into()), "boom", "");
        for setup in [
            vec![Transition::PlayStarted],
            vec![
                Transition::PlayStarted,
                Transition::GameProgress(progress(STAGE_LAUNCH, 100)),
            ],
            vec![Transition::SelfUpdateStarted],
        ] {
            let state = fold(ready_state(), &setup);
            let after = reduce(&state, &Transition::FatalError(record.clone()));
            assert_eq!(after.phase, PipelinePhase::Idle);
            assert_eq!(after.download.progress, 0);
            assert!(after.last_error.is_some());
        }
    }

    #[test]
    fn error_slot_is_last_write_wins() {
        let first = ErrorRecord::validation("first", "");
        let second = ErrorRecord::validation("second", "");
        let state = fold(
            ready_state(),
            &[
                Transition::ErrorReported(first),
                Transition::ErrorReported(second.clone()),
            ],
        );
        assert_eq!(state.last_error.as_ref().map(|e| e.message.as_str()), Some("second"));

        let cleared = reduce(&state, &Transition::ErrorDismissed);
        assert!(cleared.last_error.is_none());
    }

    #[test]
    fn startup_check_gates_then_clears() {
        let asset = UpdateAsset {
            name: "v2.0".to_string(),
            metadata: serde_json::Value::Null,
        };
        let checking = reduce(&ready_state(), &Transition::StartupCheckStarted);
        assert_eq!(checking.phase, PipelinePhase::CheckingStartupUpdate);

        let prompted = reduce(&checking, &Transition::StartupChecked(Some(asset.clone())));
        assert_eq!(prompted.phase, PipelinePhase::Idle);
        assert_eq!(prompted.blocking_update, Some(asset));

        let skipped = reduce(&prompted, &Transition::BlockingUpdateSkipped);
        assert!(skipped.blocking_update.is_none());
        assert_eq!(skipped.phase, PipelinePhase::Idle);
    }

    #[test]
    fn advisory_and_blocking_assets_are_independent() {
        let advisory = UpdateAsset {
            name: "advisory".to_string(),
            metadata: serde_json::Value::Null,
        };
        let blocking = UpdateAsset {
            name: "blocking".to_string(),
            metadata: serde_json::Value::Null,
        };
        let state = fold(
            ready_state(),
            &[
                Transition::StartupChecked(Some(blocking.clone())),
                Transition::AdvisoryUpdate(advisory.clone()),
                Transition::BlockingUpdateSkipped,
            ],
        );
        assert_eq!(state.advisory_update, Some(advisory));
        assert!(state.blocking_update.is_none());
        assert_eq!(state.phase, PipelinePhase::Idle, "advisory never triggers anything");
    }

    #[test]
    fn self_update_failure_returns_to_idle() {
        let record = ErrorRecord::new(ErrorKind::UpdateError, "Failed to update launcher", "e");
        let state = fold(
            ready_state(),
            &[
                Transition::SelfUpdateStarted,
                Transition::SelfUpdateFailed(record),
            ],
        );
        assert_eq!(state.phase, PipelinePhase::Idle);
        assert_eq!(
            state.last_error.as_ref().map(|e| e.kind.clone()),
            Some(ErrorKind::UpdateError)
        );
    }

    #[test]
    fn self_update_not_startable_while_running() {
        let running = fold(
            ready_state(),
            &[
                Transition::PlayStarted,
                Transition::GameProgress(progress(STAGE_LAUNCH, 100)),
            ],
        );
        let after = reduce(&running, &Transition::SelfUpdateStarted);
        assert_eq!(after.phase, PipelinePhase::Running);
    }
}
