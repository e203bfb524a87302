use crate::effects::Clock;
use crate::error::InstallError;
use crate::manifest::{read_manifest_with_repair, RepairOptions};
use crate::paths::{manifest_path, MANIFEST_FILE, SHARED_DIR};
use crate::platform::{Platform, Scope};
use crate::version::{compare_versions, VersionStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The three per-platform manifest locations for a scope rooted at `base`.
///
/// `base` is the home directory for global scope and the project root for local.
pub fn manifest_candidates(scope: Scope, base: &Path) -> Vec<(Platform, PathBuf)> {
    Platform::ALL
        .iter()
        .map(|&p| (p, manifest_path(base, p, scope)))
        .collect()
}

/// Accept a manifest file, an install directory, or a platform directory.
pub fn custom_manifest_path(path: &Path) -> PathBuf {
    if path.file_name().is_some_and(|n| n == MANIFEST_FILE) || path.is_file() {
        return path.to_path_buf();
    }
    if path.file_name().is_some_and(|n| n == SHARED_DIR) {
        return path.join(MANIFEST_FILE);
    }
    if path.join(SHARED_DIR).is_dir() {
        return path.join(SHARED_DIR).join(MANIFEST_FILE);
    }
    path.join(MANIFEST_FILE)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InstallationStatus {
    NotInstalled,
    Installed {
        version: String,
        installed_at: DateTime<Utc>,
        status: VersionStatus,
        repaired: bool,
    },
    /// A manifest exists but could not be read or rebuilt.
    Unreadable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallStatusReport {
    pub platform: Option<Platform>,
    pub scope: Option<Scope>,
    pub manifest_path: PathBuf,
    pub status: InstallationStatus,
}

impl InstallStatusReport {
    /// Short label such as `Claude Code (v1.2.0 → v1.3.0)`.
    pub fn label(&self) -> String {
        let name = self
            .platform
            .map(|p| p.display_name().to_string())
            .unwrap_or_else(|| self.manifest_path.display().to_string());
        match &self.status {
            InstallationStatus::Installed { status, .. } => match status {
                VersionStatus::UpToDate { installed, .. } => format!("{name} (v{installed})"),
                VersionStatus::UpdateAvailable {
                    installed, current, ..
                } => format!("{name} (v{installed} → v{current})"),
                VersionStatus::MajorUpdate { installed, current } => {
                    format!("{name} (v{installed} → v{current}, major)")
                }
                VersionStatus::Downgrade { installed, .. } => {
                    format!("{name} (v{installed}, newer than this installer)")
                }
                VersionStatus::Unknown { .. } => format!("{name} (version unknown)"),
            },
            InstallationStatus::NotInstalled => name,
            InstallationStatus::Unreadable { .. } => format!("{name} (unreadable manifest)"),
        }
    }
}

/// Read (repairing if needed) one manifest and classify it against `current_version`.
pub fn check_installation(
    manifest_path: &Path,
    current_version: &str,
    options: &RepairOptions,
    clock: &dyn Clock,
) -> InstallationStatus {
    match read_manifest_with_repair(manifest_path, options, clock) {
        Ok(read) => InstallationStatus::Installed {
            status: compare_versions(&read.manifest.version, current_version),
            version: read.manifest.version,
            installed_at: read.manifest.installed_at,
            repaired: read.repaired,
        },
        Err(InstallError::ManifestNotFound(_)) => InstallationStatus::NotInstalled,
        Err(e) => {
            tracing::warn!(path = %manifest_path.display(), error = %e, "manifest unusable");
            InstallationStatus::Unreadable {
                reason: e.to_string(),
            }
        }
    }
}

/// Status of every platform for a scope, checked one after another.
pub fn check_installations(
    scope: Scope,
    base: &Path,
    current_version: &str,
    options: &RepairOptions,
    clock: &dyn Clock,
) -> Vec<InstallStatusReport> {
    manifest_candidates(scope, base)
        .into_iter()
        .map(|(platform, path)| InstallStatusReport {
            platform: Some(platform),
            scope: Some(scope),
            status: check_installation(&path, current_version, options, clock),
            manifest_path: path,
        })
        .collect()
}
