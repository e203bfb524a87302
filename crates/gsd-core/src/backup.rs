//! Timestamped backups of legacy installations.
//!
//! Backups live under `<target>/.gsd-backup/<YYYY-MM-DD-HHMM>/` and mirror the
//! relative layout of what was copied. They are never cleaned up automatically.

use crate::effects::{nearest_existing_ancestor, Effects};
use crate::error::{format_mb, InstallError, Result};
use crate::io::{copy_tree, dir_size, ensure_dir, path_exists};
use crate::paths::backup_root;
use crate::platform::Platform;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BACKUP_HEADROOM: f64 = 1.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub backup_path: PathBuf,
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl BackupRecord {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Copy `src` to `dst`, retrying with a fixed delay. Never fails outright.
pub fn copy_with_retry(src: &Path, dst: &Path, policy: &RetryPolicy) -> CopyOutcome {
    retry_copy(src, policy, || copy_tree(src, dst))
}

fn retry_copy(
    src: &Path,
    policy: &RetryPolicy,
    mut copy: impl FnMut() -> std::io::Result<()>,
) -> CopyOutcome {
    let max = policy.max_retries.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match copy() {
            Ok(()) => {
                return CopyOutcome {
                    success: true,
                    error: None,
                    attempts: attempt,
                }
            }
            Err(e) if attempt >= max => {
                tracing::warn!(src = %src.display(), attempts = attempt, error = %e, "copy failed");
                return CopyOutcome {
                    success: false,
                    error: Some(e.to_string()),
                    attempts: attempt,
                };
            }
            Err(e) => {
                tracing::debug!(src = %src.display(), attempt, error = %e, "copy failed, retrying");
                std::thread::sleep(policy.retry_delay);
            }
        }
    }
}

pub struct BackupManager<'a> {
    effects: &'a Effects,
    retry: RetryPolicy,
    headroom: f64,
}

impl<'a> BackupManager<'a> {
    pub fn new(effects: &'a Effects) -> Self {
        Self {
            effects,
            retry: RetryPolicy::default(),
            headroom: DEFAULT_BACKUP_HEADROOM,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_headroom(mut self, headroom: f64) -> Self {
        self.headroom = headroom;
        self
    }

    /// Planned name for a new backup directory, without creating it.
    ///
    /// Collisions within the same minute get the seconds appended, then a counter.
    pub fn next_backup_path(&self, target_dir: &Path) -> PathBuf {
        let now = self.effects.clock.now_local();
        let root = backup_root(target_dir);
        let minute = now.format("%Y-%m-%d-%H%M").to_string();

        let candidate = root.join(&minute);
        if !path_exists(&candidate) {
            return candidate;
        }
        let with_seconds = format!("{minute}-{}", now.format("%S"));
        let candidate = root.join(&with_seconds);
        if !path_exists(&candidate) {
            return candidate;
        }
        (1u32..)
            .map(|n| root.join(format!("{with_seconds}-{n}")))
            .find(|p| !path_exists(p))
            .unwrap_or(candidate)
    }

    pub fn create_backup_directory(&self, version: &str, target_dir: &Path) -> Result<PathBuf> {
        let path = self.next_backup_path(target_dir);
        ensure_dir(&path)?;
        tracing::debug!(path = %path.display(), version, "backup directory created");
        Ok(path)
    }

    /// Fail when the sources, plus headroom, will not fit next to `backup_dir`.
    ///
    /// If free space cannot be measured the check is skipped.
    pub fn validate_backup_space(&self, sources: &[PathBuf], backup_dir: &Path) -> Result<()> {
        let total: u64 = sources
            .iter()
            .filter(|p| path_exists(p))
            .map(|p| dir_size(p))
            .sum();
        let required = (total as f64 * self.headroom).ceil() as u64;

        let probe = nearest_existing_ancestor(backup_dir).unwrap_or_else(|| backup_dir.to_path_buf());
        let available = match self.effects.disk.available_bytes(&probe) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "could not check free space for backup; continuing");
                return Ok(());
            }
        };
        if available < required {
            return Err(InstallError::InsufficientSpace {
                path: backup_dir.to_path_buf(),
                required_bytes: required,
                available_bytes: available,
            });
        }
        tracing::debug!(
            required = %format_mb(required),
            available = %format_mb(available),
            "backup space ok"
        );
        Ok(())
    }

    /// Copy each source path (relative to `target_dir`) into a backup directory.
    ///
    /// Missing sources are skipped. Copy failures are collected and the loop keeps
    /// going; only the space check aborts.
    pub fn create_backup(
        &self,
        platform: Platform,
        version: &str,
        source_paths: &[String],
        target_dir: &Path,
        shared_backup_dir: Option<&Path>,
    ) -> Result<BackupRecord> {
        let backup_path = match shared_backup_dir {
            Some(dir) => {
                ensure_dir(dir)?;
                dir.to_path_buf()
            }
            None => self.create_backup_directory(version, target_dir)?,
        };

        let resolved: Vec<PathBuf> = source_paths
            .iter()
            .map(|p| target_dir.join(p))
            .collect();
        self.validate_backup_space(&resolved, &backup_path)?;

        let mut record = BackupRecord {
            backup_path,
            succeeded: Vec::new(),
            failed: Vec::new(),
        };
        for (relative, source) in source_paths.iter().zip(resolved) {
            if !path_exists(&source) {
                continue;
            }
            let dest = record.backup_path.join(backup_relative(relative, target_dir));
            let outcome = copy_with_retry(&source, &dest, &self.retry);
            if outcome.success {
                record.succeeded.push(source);
            } else {
                record.failed.push(source);
            }
        }

        tracing::info!(
            platform = %platform,
            version,
            copied = record.succeeded.len(),
            failed = record.failed.len(),
            path = %record.backup_path.display(),
            "backup finished"
        );
        Ok(record)
    }
}

/// Path under the backup directory for a source path.
fn backup_relative(source: &str, target_dir: &Path) -> PathBuf {
    let path = Path::new(source);
    if !path.is_absolute() {
        return path.to_path_buf();
    }
    match path.strip_prefix(target_dir) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("root")),
    }
}
