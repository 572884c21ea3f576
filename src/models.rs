use serde::{Deserialize, Serialize};

/// The auto-updating "latest" slot. Never appears in a branch's version list.
pub const LATEST_VERSION: i64 = 0;
/// Sentinel for a selection that has not been restored from config yet.
pub const UNSET_VERSION: i64 = -1;

/// Release channel. The set is closed; anything else coming from config or
/// the backend is rejected at parse time.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Branch {
    Release,
    PreRelease,
    Nightly,
}

impl Branch {
    pub fn parse(value: &str) -> Option<Branch> {
        match value {
            "release" => Some(Branch::Release),
            "pre-release" => Some(Branch::PreRelease),
            "nightly" => Some(Branch::Nightly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Release => "release",
            Branch::PreRelease => "pre-release",
            Branch::Nightly => "nightly",
        }
    }
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (branch, version) pair. Version 0 is the rolling "latest" slot; positive
/// numbers are pinned snapshots; negative means not yet initialized.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionSelector {
    pub branch: Branch,
    pub version: i64,
}

impl VersionSelector {
    pub fn new(branch: Branch, version: i64) -> Self {
        Self { branch, version }
    }

    pub fn is_latest(&self) -> bool {
        self.version == LATEST_VERSION
    }

    pub fn is_unset(&self) -> bool {
        self.version < 0
    }
}

/// Exclusive pipeline phase. Every "is the launcher busy doing X" question is
/// answered by this one value; there are no parallel booleans to drift apart.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PipelinePhase {
    #[default]
    Idle,
    CheckingStartupUpdate,
    Downloading,
    Running,
    UpdatingLauncher,
}

impl PipelinePhase {
    pub fn is_downloading(&self) -> bool {
        matches!(self, PipelinePhase::Downloading)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, PipelinePhase::Running)
    }

    pub fn is_updating_launcher(&self) -> bool {
        matches!(self, PipelinePhase::UpdatingLauncher)
    }
}

/// One progress notification from the backend, shared by the game-download
/// and self-update streams (the streams themselves stay separate).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub stage: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub progress: u8,
    #[serde(default, alias = "file")]
    pub current_file: String,
    #[serde(default)]
    pub speed: String,
    #[serde(default)]
    pub downloaded: i64,
    #[serde(default)]
    pub total: i64,
}

/// Terminal stage emitted by `download_and_launch` once the game process is up.
pub const STAGE_LAUNCH: &str = "launch";

/// Live counters for one pipeline. The session holds two of these, one per
/// stream, and no handler ever writes the other one's.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    pub progress: u8,
    pub message: String,
    pub current_file: String,
    pub speed: String,
    pub downloaded: i64,
    pub total: i64,
}

impl DownloadProgress {
    pub fn reset(&mut self) {
        *self = DownloadProgress::default();
    }

    pub fn apply(&mut self, event: &ProgressEvent) {
        self.progress = event.progress;
        self.message = event.message.clone();
        self.current_file = event.current_file.clone();
        self.speed = event.speed.clone();
        self.downloaded = event.downloaded;
        self.total = event.total;
    }
}

/// A launcher build offered by the update feed. Opaque beyond its name.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAsset {
    pub name: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// An installed snapshot as reported by the backend.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstalledVersion {
    pub version: i64,
    #[serde(alias = "versionType")]
    pub branch: Branch,
    #[serde(default)]
    pub install_date: String,
}

/// One article scraped from the news page.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub excerpt: String,
    pub url: String,
    pub date: String,
    pub author: String,
    pub image_url: String,
}
