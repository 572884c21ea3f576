use std::path::{Path, PathBuf};

fn ensure_dir(path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        return None;
    }
    if std::fs::create_dir_all(path).is_ok() {
        return Some(path.to_path_buf());
    }
    None
}

/// Root data directory for the launcher, honoring `HYPRISM_ROOT_DIR` first,
/// then the platform-conventional application data location.
pub fn resolve_root_dir() -> PathBuf {
    if let Ok(value) = std::env::var("HYPRISM_ROOT_DIR") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            if let Some(dir) = ensure_dir(&PathBuf::from(trimmed)) {
                return dir;
            }
        }
    }

    let base = platform_data_dir();
    let root = base.join("HyPrism");
    ensure_dir(&root).unwrap_or(root)
}

#[cfg(target_os = "windows")]
fn platform_data_dir() -> PathBuf {
    std::env::var("LOCALAPPDATA")
        .or_else(|_| std::env::var("APPDATA"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(target_os = "macos")]
fn platform_data_dir() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home)
            .join("Library")
            .join("Application Support"),
        Err(_) => PathBuf::from("."),
    }
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn platform_data_dir() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".local").join("share"),
        Err(_) => PathBuf::from("."),
    }
}

pub fn resolve_log_dir() -> PathBuf {
    if let Ok(value) = std::env::var("HYPRISM_LOG_DIR") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            if let Some(dir) = ensure_dir(&PathBuf::from(trimmed)) {
                return dir;
            }
        }
    }

    let candidate = resolve_root_dir().join("logs");
    ensure_dir(&candidate).unwrap_or(candidate)
}
