//! Scriptable backend double shared by the service and orchestrator tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::GameBackend;
use crate::errors::{LauncherError, Result};
use crate::models::{Branch, InstalledVersion, UpdateAsset};

/// Records every call as `"name:detail"` and lets tests script failures and
/// artificial latency per call prefix.
pub struct MockBackend {
    pub nick: Mutex<String>,
    pub branch: Mutex<Branch>,
    pub version_lists: Mutex<HashMap<Branch, Vec<i64>>>,
    pub installed: Mutex<HashMap<Branch, bool>>,
    pub needs_update: AtomicBool,
    pub running: AtomicBool,
    pub startup_asset: Mutex<Option<UpdateAsset>>,
    pub installed_versions: Mutex<Vec<InstalledVersion>>,
    pub picked_directory: Mutex<Option<PathBuf>>,
    failing: Mutex<Vec<String>>,
    latencies: Mutex<Vec<(String, Duration)>>,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            nick: Mutex::new("Steve".to_string()),
            branch: Mutex::new(Branch::Release),
            version_lists: Mutex::new(HashMap::new()),
            installed: Mutex::new(HashMap::new()),
            needs_update: AtomicBool::new(false),
            running: AtomicBool::new(false),
            startup_asset: Mutex::new(None),
            installed_versions: Mutex::new(Vec::new()),
            picked_directory: Mutex::new(None),
            failing: Mutex::new(Vec::new()),
            latencies: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_on(&self, prefix: &str) {
        self.failing.lock().unwrap().push(prefix.to_string());
    }

    pub fn delay(&self, prefix: &str, latency: Duration) {
        self.latencies
            .lock()
            .unwrap()
            .push((prefix.to_string(), latency));
    }

    pub fn set_installed(&self, branch: Branch, installed: bool) {
        self.installed.lock().unwrap().insert(branch, installed);
    }

    pub fn calls_of(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    async fn enter(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call.clone());
        let latency = self
            .latencies
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| call.starts_with(prefix.as_str()))
            .map(|(_, latency)| *latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let failing = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| call.starts_with(prefix.as_str()));
        if failing {
            return Err(LauncherError::Backend(format!("scripted failure: {call}")));
        }
        Ok(())
    }
}

#[async_trait]
impl GameBackend for MockBackend {
    async fn get_nick(&self) -> Result<String> {
        self.enter("get_nick".to_string()).await?;
        Ok(self.nick.lock().unwrap().clone())
    }

    async fn set_nick(&self, nick: &str) -> Result<()> {
        self.enter(format!("set_nick:{nick}")).await?;
        *self.nick.lock().unwrap() = nick.to_string();
        Ok(())
    }

    async fn get_version_type(&self) -> Result<Branch> {
        self.enter("get_version_type".to_string()).await?;
        Ok(*self.branch.lock().unwrap())
    }

    async fn set_version_type(&self, branch: Branch) -> Result<()> {
        self.enter(format!("set_version_type:{branch}")).await?;
        *self.branch.lock().unwrap() = branch;
        Ok(())
    }

    async fn get_version_list(&self, branch: Branch) -> Result<Vec<i64>> {
        self.enter(format!("get_version_list:{branch}")).await?;
        Ok(self
            .version_lists
            .lock()
            .unwrap()
            .get(&branch)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_selected_version(&self, version: i64) -> Result<()> {
        self.enter(format!("set_selected_version:{version}")).await
    }

    async fn is_version_installed(&self, branch: Branch, version: i64) -> Result<bool> {
        self.enter(format!("is_version_installed:{branch}:{version}"))
            .await?;
        Ok(self
            .installed
            .lock()
            .unwrap()
            .get(&branch)
            .copied()
            .unwrap_or(false))
    }

    async fn get_installed_versions_for_branch(
        &self,
        branch: Branch,
    ) -> Result<Vec<InstalledVersion>> {
        self.enter(format!("get_installed_versions_for_branch:{branch}"))
            .await?;
        Ok(self.installed_versions.lock().unwrap().clone())
    }

    async fn check_latest_needs_update(&self, branch: Branch) -> Result<bool> {
        self.enter(format!("check_latest_needs_update:{branch}"))
            .await?;
        Ok(self.needs_update.load(Ordering::SeqCst))
    }

    async fn download_and_launch(&self, nickname: &str) -> Result<()> {
        self.enter(format!("download_and_launch:{nickname}")).await
    }

    async fn exit_game(&self) -> Result<()> {
        self.enter("exit_game".to_string()).await?;
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_game_running(&self) -> Result<bool> {
        self.enter("is_game_running".to_string()).await?;
        Ok(self.running.load(Ordering::SeqCst))
    }

    async fn check_update(&self) -> Result<Option<UpdateAsset>> {
        self.enter("check_update".to_string()).await?;
        Ok(self.startup_asset.lock().unwrap().clone())
    }

    async fn update(&self) -> Result<()> {
        self.enter("update".to_string()).await
    }

    async fn select_instance_directory(&self) -> Result<Option<PathBuf>> {
        self.enter("select_instance_directory".to_string()).await?;
        Ok(self.picked_directory.lock().unwrap().clone())
    }

    async fn delete_install(&self, branch: Branch, version: i64) -> Result<()> {
        self.enter(format!("delete_install:{branch}:{version}")).await
    }
}
