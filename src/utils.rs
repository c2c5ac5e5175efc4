use crate::{Result, SignInError};
use std::path::PathBuf;

#[cfg(target_os = "macos")]
const CHROME_LOCATIONS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(target_os = "linux")]
const CHROME_LOCATIONS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
const CHROME_LOCATIONS: &[&str] = &[];

const CHROME_BINARIES: &[&str] = &["google-chrome", "chromium", "chromium-browser", "chrome"];

pub fn find_chrome_executable() -> Result<PathBuf> {
    CHROME_LOCATIONS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .or_else(|| CHROME_BINARIES.iter().find_map(|b| which::which(b).ok()))
        .ok_or_else(|| {
            SignInError::LaunchFailed(
                "Could not find Chrome/Chromium executable. Please specify with --chrome-path"
                    .into(),
            )
        })
}

/// Resolves when the process receives SIGINT or SIGTERM.
pub async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down..."),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down..."),
    }
    Ok(())
}

pub fn process_exists(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{}", pid)).exists() || kill(pid, "-0")
}

/// Sends SIGTERM; false when the signal could not be delivered.
pub fn terminate_process(pid: u32) -> bool {
    kill(pid, "-TERM")
}

fn kill(pid: u32, signal: &str) -> bool {
    std::process::Command::new("kill")
        .args([signal, &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_process_exists() {
        assert!(process_exists(std::process::id()));
    }

    #[test]
    fn test_missing_process() {
        assert!(!process_exists(u32::MAX - 1));
    }
}
