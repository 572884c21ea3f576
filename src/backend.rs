use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{Branch, InstalledVersion, UpdateAsset};

/// Command surface of the installation/runtime backend.
///
/// The backend owns the bytes: it verifies and fetches game assets, spawns
/// the process, persists launcher settings, and applies self-updates. The
/// orchestrator only issues commands and reacts to the event streams the
/// backend emits while a `download_and_launch` or `update` call is in flight.
#[async_trait]
pub trait GameBackend: Send + Sync + 'static {
    async fn get_nick(&self) -> Result<String>;
    async fn set_nick(&self, nick: &str) -> Result<()>;

    async fn get_version_type(&self) -> Result<Branch>;
    async fn set_version_type(&self, branch: Branch) -> Result<()>;
    /// Version numbers for a branch, newest first. Never contains 0.
    async fn get_version_list(&self, branch: Branch) -> Result<Vec<i64>>;
    async fn set_selected_version(&self, version: i64) -> Result<()>;

    async fn is_version_installed(&self, branch: Branch, version: i64) -> Result<bool>;
    async fn get_installed_versions_for_branch(
        &self,
        branch: Branch,
    ) -> Result<Vec<InstalledVersion>>;
    /// Whether the local "latest" slot lags the remote descriptor.
    async fn check_latest_needs_update(&self, branch: Branch) -> Result<bool>;

    /// Verify/fetch assets for the current selection, then spawn the game.
    /// Progress and the terminal `launch` stage arrive on the event stream.
    async fn download_and_launch(&self, nickname: &str) -> Result<()>;
    async fn exit_game(&self) -> Result<()>;
    async fn is_game_running(&self) -> Result<bool>;

    async fn check_update(&self) -> Result<Option<UpdateAsset>>;
    /// Replace the running launcher. On success the process is restarted
    /// externally, so there is no success path to model here.
    async fn update(&self) -> Result<()>;

    /// Opens a directory picker. `None` means the user cancelled.
    async fn select_instance_directory(&self) -> Result<Option<PathBuf>>;
    async fn delete_install(&self, branch: Branch, version: i64) -> Result<()>;
}

pub type SharedBackend = Arc<dyn GameBackend>;
