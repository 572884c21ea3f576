use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LauncherError>;

/// Category of a user-visible error. Serialized forms match the `type` field
/// the UI layer has always received.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    UpdateError,
    VersionError,
    SettingsError,
    /// Backend-reported error, carrying the backend's own type tag.
    #[serde(untagged)]
    Backend(String),
}

/// The single visible error slot. Last write wins; dismissal clears it.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub technical: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>, technical: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            technical: technical.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn validation(message: impl Into<String>, technical: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message, technical)
    }

    pub fn update_error(message: impl Into<String>, err: &LauncherError) -> Self {
        Self::new(ErrorKind::UpdateError, message, err.to_string())
    }

    pub fn version_error(message: impl Into<String>, err: &LauncherError) -> Self {
        Self::new(ErrorKind::VersionError, message, err.to_string())
    }

    pub fn settings_error(message: impl Into<String>, err: &LauncherError) -> Self {
        Self::new(ErrorKind::SettingsError, message, err.to_string())
    }
}
