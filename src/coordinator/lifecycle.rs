use crate::Result;
use std::path::{Path, PathBuf};

/// Triggers that (re)establish the alarm and run an immediate poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// First daemon start after installing or upgrading.
    Installed,
    /// The browser came up while the daemon was running.
    BrowserStartup,
    ProcessStart,
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleEvent::Installed => "installed",
            LifecycleEvent::BrowserStartup => "browser startup",
            LifecycleEvent::ProcessStart => "process start",
        };
        f.write_str(name)
    }
}

/// File recording the version that last ran.
pub struct VersionMarker {
    path: PathBuf,
}

impl VersionMarker {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::config::default_config_dir()?.join("installed-version"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records `version` and reports whether it differs from the stored one.
    pub fn check_and_update(&self, version: &str) -> Result<bool> {
        let previous = match std::fs::read_to_string(&self.path) {
            Ok(content) => Some(content.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        if previous.as_deref() == Some(version) {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, version)?;
        Ok(true)
    }
}

/// Turns periodic reachability checks into `BrowserStartup` edges.
#[derive(Debug, Default)]
pub struct ReachabilityTracker {
    last: Option<bool>,
}

impl ReachabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True only on an unreachable to reachable transition.
    pub fn observe(&mut self, reachable: bool) -> bool {
        let came_up = self.last == Some(false) && reachable;
        self.last = Some(reachable);
        came_up
    }
}
