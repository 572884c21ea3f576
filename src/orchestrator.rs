use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::backend::SharedBackend;
use crate::errors::{ErrorKind, ErrorRecord};
use crate::events::EventStreams;
use crate::models::{Branch, PipelinePhase, VersionSelector, STAGE_LAUNCH};
use crate::services::session_state::{reduce, SessionState, Transition};
use crate::services::{InstallChecker, UpdateGate, VersionResolver};

/// How often a running game process is confirmed alive. Event delivery is the
/// primary path; this poll is the fallback when the termination event is lost.
const LIVENESS_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Granularity of the download watchdog.
const WATCHDOG_TICK: Duration = Duration::from_secs(5);
/// Silence threshold after which a download is declared stalled. The backend
/// does not guarantee a terminal error event if `download_and_launch` dies
/// mid-flight, so the orchestrator keeps its own clock.
const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(60);

const NICK_MAX_CHARS: usize = 16;

/// User commands accepted by the session orchestrator.
#[derive(Clone, Debug)]
pub enum Command {
    Play { nickname: String },
    ExitGame,
    SetBranch(Branch),
    SetVersion(i64),
    SetNick(String),
    RefreshInstallState,
    ChangeInstanceDirectory,
    DeleteInstall,
    SelfUpdate,
    SkipBlockingUpdate,
    DismissError,
    Shutdown,
}

/// Cloneable front door to a running orchestrator. Commands never block;
/// their effects become visible through the state watch channel.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn send(&self, command: Command) {
        let _ = self.commands.send(command);
    }

    pub fn play(&self, nickname: impl Into<String>) {
        self.send(Command::Play {
            nickname: nickname.into(),
        });
    }

    pub fn exit_game(&self) {
        self.send(Command::ExitGame);
    }

    pub fn set_branch(&self, branch: Branch) {
        self.send(Command::SetBranch(branch));
    }

    pub fn set_version(&self, version: i64) {
        self.send(Command::SetVersion(version));
    }

    pub fn set_nick(&self, nick: impl Into<String>) {
        self.send(Command::SetNick(nick.into()));
    }

    pub fn refresh_install_state(&self) {
        self.send(Command::RefreshInstallState);
    }

    pub fn change_instance_directory(&self) {
        self.send(Command::ChangeInstanceDirectory);
    }

    pub fn delete_install(&self) {
        self.send(Command::DeleteInstall);
    }

    pub fn self_update(&self) {
        self.send(Command::SelfUpdate);
    }

    pub fn skip_blocking_update(&self) {
        self.send(Command::SkipBlockingUpdate);
    }

    pub fn dismiss_error(&self) {
        self.send(Command::DismissError);
    }

    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscription for UI layers that want change notifications.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }
}

/// The session orchestrator: one task, one serialized stream of stimuli.
///
/// User commands, inbound backend events, poll ticks and async completions
/// all funnel through a single `select!` loop; each is applied as one atomic
/// state transition via the pure reducer, so no two effects ever interleave
/// partway and the UI can never observe a contradictory state.
pub struct Orchestrator {
    backend: SharedBackend,
    state: SessionState,
    publish: watch::Sender<SessionState>,
    transitions_tx: mpsc::UnboundedSender<Transition>,
    resolver: VersionResolver,
    checker: InstallChecker,
    gate: UpdateGate,
    last_progress: Instant,
}

impl Orchestrator {
    /// Spawns the orchestrator over `backend` and its event streams, returning
    /// the command handle. Subscriptions are established exactly once here and
    /// torn down when the task exits.
    pub fn spawn(backend: SharedBackend, streams: EventStreams) -> SessionHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (transitions_tx, transitions_rx) = mpsc::unbounded_channel();
        let (publish, state_rx) = watch::channel(SessionState::default());

        let orchestrator = Orchestrator {
            backend: backend.clone(),
            state: SessionState::default(),
            publish,
            transitions_tx: transitions_tx.clone(),
            resolver: VersionResolver::new(backend.clone(), transitions_tx.clone()),
            checker: InstallChecker::new(backend.clone(), transitions_tx.clone()),
            gate: UpdateGate::new(backend, transitions_tx),
            last_progress: Instant::now(),
        };
        tokio::spawn(orchestrator.run(commands_rx, transitions_rx, streams));

        SessionHandle {
            commands: commands_tx,
            state: state_rx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut transitions: mpsc::UnboundedReceiver<Transition>,
        mut streams: EventStreams,
    ) {
        let startup_tasks = self.bootstrap();

        let mut poll = interval(LIVENESS_POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut watchdog = interval(WATCHDOG_TICK);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                maybe = commands.recv() => match maybe {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(transition) = transitions.recv() => self.apply(transition),
                Some(event) = streams.game_progress.recv() => {
                    self.apply(Transition::GameProgress(event));
                }
                Some(asset) = streams.update_available.recv() => {
                    self.apply(Transition::AdvisoryUpdate(asset));
                }
                Some(event) = streams.update_progress.recv() => {
                    self.apply(Transition::SelfUpdateProgress(event));
                }
                Some(payload) = streams.errors.recv() => {
                    warn!(kind = %payload.kind, message = %payload.message, "backend error event");
                    self.apply(Transition::FatalError((&payload).into()));
                }
                _ = poll.tick(), if self.state.phase.is_running() => self.poll_liveness(),
                _ = watchdog.tick(), if self.state.phase.is_downloading() => self.check_watchdog(),
            }
        }
        for task in startup_tasks {
            task.abort();
        }
        info!("session orchestrator stopped");
    }

    /// Startup sequence: restore the persisted identity/selection and run the
    /// mandatory update check. Neither may block the other.
    fn bootstrap(&mut self) -> Vec<tokio::task::JoinHandle<()>> {
        let check_task = self.gate.startup_check();

        let backend = self.backend.clone();
        let tx = self.transitions_tx.clone();
        let restore_task = tokio::spawn(async move {
            let nick = match backend.get_nick().await {
                Ok(nick) => nick,
                Err(err) => {
                    warn!(%err, "could not restore nickname");
                    String::new()
                }
            };
            let branch = match backend.get_version_type().await {
                Ok(branch) => branch,
                Err(err) => {
                    warn!(%err, "could not restore branch, defaulting to release");
                    Branch::Release
                }
            };
            let _ = tx.send(Transition::SessionRestored { nick, branch });
        });

        vec![check_task, restore_task]
    }

    fn apply(&mut self, transition: Transition) {
        let before = self.state.clone();
        self.state = reduce(&self.state, &transition);
        self.publish.send_replace(self.state.clone());
        self.after_apply(&transition, &before);
    }

    /// Side effects that hang off specific transitions: follow-up backend
    /// queries and watchdog bookkeeping. State itself only changes in `apply`.
    fn after_apply(&mut self, transition: &Transition, before: &SessionState) {
        match transition {
            Transition::SessionRestored { .. } | Transition::BranchSelected(_) => {
                let branch = self.state.branch;
                self.resolver.load_version_list(branch);
                self.checker.issue(self.state.selector());
                self.load_installed_versions(branch);
            }
            Transition::VersionSelected(_) => {
                self.checker.issue(self.state.selector());
            }
            Transition::VersionListLoaded { .. } => {
                // The reducer may have moved a pinned selection that vanished
                // from the list; that move must be persisted and re-checked.
                if self.state.version != before.version {
                    info!(
                        from = before.version,
                        to = self.state.version,
                        "selected version no longer available, moved to newest"
                    );
                    self.persist_version(self.state.version);
                    self.checker.issue(self.state.selector());
                }
            }
            Transition::InstallInvalidated => {
                self.checker.issue(self.state.selector());
                self.load_installed_versions(self.state.branch);
            }
            Transition::PlayStarted => {
                self.last_progress = Instant::now();
            }
            Transition::GameProgress(event) => {
                self.last_progress = Instant::now();
                if event.stage == STAGE_LAUNCH && before.phase.is_downloading() {
                    info!("game process launched");
                    self.load_installed_versions(self.state.branch);
                }
            }
            _ => {}
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Play { nickname } => self.handle_play(nickname),
            Command::ExitGame => self.handle_exit(),
            Command::SetBranch(branch) => self.resolver.set_branch(&self.state, branch),
            Command::SetVersion(version) => self.resolver.set_version(&self.state, version),
            Command::SetNick(nick) => self.handle_set_nick(nick),
            Command::RefreshInstallState => self.checker.issue(self.state.selector()),
            Command::ChangeInstanceDirectory => self.handle_change_directory(),
            Command::DeleteInstall => self.handle_delete_install(),
            Command::SelfUpdate => self.gate.self_update(&self.state),
            Command::SkipBlockingUpdate => self.apply(Transition::BlockingUpdateSkipped),
            Command::DismissError => self.apply(Transition::ErrorDismissed),
            Command::Shutdown => unreachable!("handled by the run loop"),
        }
    }

    fn handle_play(&mut self, nickname: String) {
        let trimmed = nickname.trim().to_string();
        if trimmed.is_empty() || trimmed.chars().count() > NICK_MAX_CHARS {
            self.apply(Transition::ErrorReported(ErrorRecord::validation(
                "Invalid Nickname",
                "Nickname must be between 1 and 16 characters",
            )));
            return;
        }
        if self.state.phase != PipelinePhase::Idle {
            warn!(phase = ?self.state.phase, "play refused outside Idle");
            return;
        }
        if self.state.blocking_update.is_some() {
            warn!("play refused while a mandatory update is pending");
            return;
        }

        self.apply(Transition::NickChanged(trimmed.clone()));
        self.apply(Transition::PlayStarted);

        let backend = self.backend.clone();
        let tx = self.transitions_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = backend.set_nick(&trimmed).await {
                warn!(%err, "could not persist nickname before launch");
            }
            if let Err(err) = backend.download_and_launch(&trimmed).await {
                warn!(%err, "download-and-launch rejected");
                let _ = tx.send(Transition::FatalError(ErrorRecord::new(
                    ErrorKind::Backend("LAUNCH_FAILED".to_string()),
                    "Failed to start the game",
                    err.to_string(),
                )));
            }
        });
    }

    fn handle_exit(&mut self) {
        if !self.state.phase.is_running() {
            warn!(phase = ?self.state.phase, "exit refused, game is not running");
            return;
        }

        let backend = self.backend.clone();
        tokio::spawn(async move {
            if let Err(err) = backend.exit_game().await {
                // Local state already converged to Idle; the poller would
                // catch a process that survived this failure.
                warn!(%err, "exit request failed");
            }
        });

        // Local state is authoritative for the UI, regardless of the
        // termination call's outcome.
        self.apply(Transition::GameStopped);
    }

    fn handle_set_nick(&mut self, nick: String) {
        let trimmed = nick.trim().to_string();
        if trimmed.is_empty() || trimmed.chars().count() > NICK_MAX_CHARS {
            self.apply(Transition::ErrorReported(ErrorRecord::validation(
                "Invalid Nickname",
                "Nickname must be between 1 and 16 characters",
            )));
            return;
        }
        self.apply(Transition::NickChanged(trimmed.clone()));

        let backend = self.backend.clone();
        let tx = self.transitions_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = backend.set_nick(&trimmed).await {
                let _ = tx.send(Transition::ErrorReported(ErrorRecord::settings_error(
                    "Failed to save nickname",
                    &err,
                )));
            }
        });
    }

    fn handle_change_directory(&mut self) {
        let backend = self.backend.clone();
        let tx = self.transitions_tx.clone();
        tokio::spawn(async move {
            match backend.select_instance_directory().await {
                Ok(Some(path)) => {
                    info!(path = %path.display(), "instance directory changed");
                    let _ = tx.send(Transition::InstallInvalidated);
                }
                Ok(None) => debug!("directory picker cancelled"),
                Err(err) => {
                    let _ = tx.send(Transition::ErrorReported(ErrorRecord::settings_error(
                        "Failed to change instance directory",
                        &err,
                    )));
                }
            }
        });
    }

    fn handle_delete_install(&mut self) {
        if self.state.phase != PipelinePhase::Idle {
            warn!(phase = ?self.state.phase, "delete refused outside Idle");
            return;
        }
        let selector = self.state.selector();
        if selector.is_unset() {
            warn!("delete refused before selection restore");
            return;
        }

        let backend = self.backend.clone();
        let tx = self.transitions_tx.clone();
        tokio::spawn(async move {
            match backend.delete_install(selector.branch, selector.version).await {
                Ok(()) => {
                    info!(branch = %selector.branch, version = selector.version, "installation deleted");
                    let _ = tx.send(Transition::InstallInvalidated);
                }
                Err(err) => {
                    let _ = tx.send(Transition::ErrorReported(ErrorRecord::settings_error(
                        "Failed to delete installation",
                        &err,
                    )));
                }
            }
        });
    }

    fn persist_version(&self, version: i64) {
        let backend = self.backend.clone();
        let tx = self.transitions_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = backend.set_selected_version(version).await {
                let _ = tx.send(Transition::ErrorReported(ErrorRecord::version_error(
                    "Failed to switch version",
                    &err,
                )));
            }
        });
    }

    fn load_installed_versions(&self, branch: Branch) {
        let backend = self.backend.clone();
        let tx = self.transitions_tx.clone();
        tokio::spawn(async move {
            match backend.get_installed_versions_for_branch(branch).await {
                Ok(versions) => {
                    let _ = tx.send(Transition::InstalledVersionsLoaded { branch, versions });
                }
                Err(err) => warn!(%branch, %err, "installed versions load failed"),
            }
        });
    }

    /// Fallback path for a lost termination event: ask the backend whether
    /// the process is still there and converge through the same transition
    /// `exit()` uses.
    fn poll_liveness(&self) {
        let backend = self.backend.clone();
        let tx = self.transitions_tx.clone();
        tokio::spawn(async move {
            match backend.is_game_running().await {
                Ok(true) => {}
                Ok(false) => {
                    info!("liveness poll found the game process gone");
                    let _ = tx.send(Transition::GameStopped);
                }
                Err(err) => warn!(%err, "liveness poll failed"),
            }
        });
    }

    fn check_watchdog(&mut self) {
        if self.last_progress.elapsed() >= WATCHDOG_TIMEOUT {
            warn!("no download progress within watchdog window, aborting pipeline");
            self.apply(Transition::FatalError(ErrorRecord::new(
                ErrorKind::Backend("DOWNLOAD_STALLED".to_string()),
                "The download stopped responding",
                format!(
                    "no progress events received for {} seconds",
                    WATCHDOG_TIMEOUT.as_secs()
                ),
            )));
        }
    }
}
