use crate::platform::{Platform, Scope};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CliDetection {
    pub platform: Platform,
    pub binary: &'static str,
    /// Resolved binary location when it was found on `PATH` in time.
    pub path: Option<PathBuf>,
    /// The platform's global configuration directory exists.
    pub config_dir: bool,
}

impl CliDetection {
    pub fn detected(&self) -> bool {
        self.path.is_some() || self.config_dir
    }
}

/// Look up `binary` on `PATH` from a worker thread, giving up after `timeout`.
pub fn probe_binary(binary: &'static str, timeout: Duration) -> Option<PathBuf> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(which::which(binary).ok());
    });
    match rx.recv_timeout(timeout) {
        Ok(found) => found,
        Err(_) => {
            tracing::debug!(binary, "PATH lookup timed out");
            None
        }
    }
}

/// Probe every platform CLI, one after another.
///
/// `home` is used to check for each platform's global configuration directory.
pub fn detect_binaries(timeout: Duration, home: Option<&Path>) -> Vec<CliDetection> {
    Platform::ALL
        .iter()
        .map(|&platform| {
            let binary = platform.cli_binary();
            CliDetection {
                platform,
                binary,
                path: probe_binary(binary, timeout),
                config_dir: home.is_some_and(|h| h.join(platform.dir(Scope::Global)).is_dir()),
            }
        })
        .collect()
}

/// `Detected: ✓ Claude Code, ✗ Codex CLI, …` or `No CLIs detected`.
pub fn detected_message(detections: &[CliDetection]) -> String {
    if !detections.iter().any(CliDetection::detected) {
        return "No CLIs detected".to_string();
    }
    let parts: Vec<String> = detections
        .iter()
        .map(|d| {
            let mark = if d.detected() { '✓' } else { '✗' };
            format!("{mark} {}", d.platform.display_name())
        })
        .collect();
    format!("Detected: {}", parts.join(", "))
}
