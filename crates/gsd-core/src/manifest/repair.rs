//! Rebuild a manifest from the installation directory when the file on disk
//! can no longer be trusted.
//!
//! Nothing from the broken file is reused. Platform and scope come from the
//! install path, the file list from a directory scan, and the version from the
//! version declarations shipped with the installed content.

use super::reader::read_manifest;
use super::schema::InstallationManifest;
use super::writer::write_manifest;
use crate::effects::Clock;
use crate::error::{InstallError, Result};
use crate::io::collect_files;
use crate::paths::{self, is_metadata_file, SHARED_DIR};
use crate::platform::Platform;
use crate::version::coerce;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const UNKNOWN_VERSION: &str = "unknown";

#[derive(Debug, Clone, Default)]
pub struct RepairOptions {
    /// Write `"unknown"` instead of failing when no version can be derived.
    pub allow_unknown_version: bool,
    /// Home directory used to classify scope. Defaults to the current user's.
    pub home_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSourceKind {
    IndividualSkill = 1,
    Agents = 2,
    MetaSkill = 3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSource {
    pub kind: VersionSourceKind,
    pub path: PathBuf,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairOutcome {
    pub manifest: InstallationManifest,
    /// Where the version came from; `None` when it was written as unknown.
    pub version_source: Option<VersionSource>,
}

pub fn repair_manifest(
    manifest_path: &Path,
    options: &RepairOptions,
    clock: &dyn Clock,
) -> Result<RepairOutcome> {
    let fail = |reason: String| InstallError::ManifestRepairFailed {
        path: manifest_path.to_path_buf(),
        reason,
    };

    tracing::warn!(path = %manifest_path.display(), "attempting manifest repair");

    let install_dir = manifest_path
        .parent()
        .ok_or_else(|| fail("manifest path has no parent directory".into()))?;

    let platform = Platform::from_path(install_dir)
        .ok_or_else(|| fail("cannot determine platform from path".into()))?;

    let home = match &options.home_dir {
        Some(h) => Some(h.clone()),
        None => paths::home_dir().ok(),
    };
    let scope = paths::scope_of(install_dir, home.as_deref());

    let search_root = if install_dir.file_name().is_some_and(|n| n == SHARED_DIR) {
        install_dir.parent().unwrap_or(install_dir)
    } else {
        install_dir
    };
    let version_source = detect_version(search_root);
    let version = match (&version_source, options.allow_unknown_version) {
        (Some(source), _) => source.version.clone(),
        (None, true) => UNKNOWN_VERSION.to_string(),
        (None, false) => {
            return Err(fail(format!(
                "no version declaration found under {}",
                search_root.display()
            )))
        }
    };

    let files = match collect_files(install_dir, |name| !is_metadata_file(name)) {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(dir = %install_dir.display(), error = %e, "could not scan install directory");
            Vec::new()
        }
    };

    let now = clock.now_utc();
    let mut manifest = InstallationManifest::new(version, platform, scope, now, files);
    manifest.mark_repaired(now);
    write_manifest(manifest_path, &manifest)?;

    tracing::info!(
        path = %manifest_path.display(),
        version = %manifest.version,
        files = manifest.files.len(),
        "manifest repaired"
    );
    Ok(RepairOutcome {
        manifest,
        version_source,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairedRead {
    pub manifest: InstallationManifest,
    pub repaired: bool,
}

/// Read a manifest, rebuilding it when it is corrupt or schema-invalid.
pub fn read_manifest_with_repair(
    manifest_path: &Path,
    options: &RepairOptions,
    clock: &dyn Clock,
) -> Result<RepairedRead> {
    let result = read_manifest(manifest_path);
    if !result.needs_repair() {
        return result.into_result(manifest_path).map(|manifest| RepairedRead {
            manifest,
            repaired: false,
        });
    }
    tracing::warn!(
        path = %manifest_path.display(),
        reason = result.reason(),
        "unusable manifest detected"
    );
    let outcome = repair_manifest(manifest_path, options, clock)?;
    Ok(RepairedRead {
        manifest: outcome.manifest,
        repaired: true,
    })
}

// ---------------------------------------------------------------------------
// Version search
// ---------------------------------------------------------------------------

/// Highest-priority usable version declaration under a platform directory.
pub fn detect_version(platform_dir: &Path) -> Option<VersionSource> {
    meta_skill_version(platform_dir)
        .or_else(|| agents_version(platform_dir))
        .or_else(|| individual_skill_version(platform_dir))
}

fn meta_skill_version(root: &Path) -> Option<VersionSource> {
    let meta = root.join("skills").join(SHARED_DIR);
    let mut candidates = vec![meta.join("version.json")];
    candidates.extend(
        sorted_subdirs(&meta)
            .into_iter()
            .map(|d| d.join("version.json")),
    );
    candidates.into_iter().find_map(|path| {
        let version = read_json(&path).and_then(|v| usable(v.get("version")))?;
        Some(VersionSource {
            kind: VersionSourceKind::MetaSkill,
            path,
            version,
        })
    })
}

fn agents_version(root: &Path) -> Option<VersionSource> {
    let path = root.join("agents").join("versions.json");
    let data = read_json(&path)?;
    let entries: Vec<&Value> = match &data {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => return None,
    };
    let version = entries
        .into_iter()
        .find_map(|entry| usable(entry.pointer("/metadata/projectVersion")))?;
    Some(VersionSource {
        kind: VersionSourceKind::Agents,
        path,
        version,
    })
}

fn individual_skill_version(root: &Path) -> Option<VersionSource> {
    sorted_subdirs(&root.join("skills"))
        .into_iter()
        .filter(|d| {
            d.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("gsd-"))
        })
        .map(|d| d.join("version.json"))
        .find_map(|path| {
            let data = read_json(&path)?;
            let version = usable(data.pointer("/metadata/projectVersion"))
                .or_else(|| usable(data.get("skill_version")))?;
            Some(VersionSource {
                kind: VersionSourceKind::IndividualSkill,
                path,
                version,
            })
        })
}

fn read_json(path: &Path) -> Option<Value> {
    let bytes = fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "skipping unreadable version file");
            None
        }
    }
}

/// A declared version counts only if it coerces.
fn usable(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    coerce(s).map(|_| s.to_string())
}

fn sorted_subdirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .map(|e| e.path())
        .collect();
    dirs.sort();
    dirs
}
