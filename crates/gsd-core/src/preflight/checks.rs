use crate::effects::{nearest_existing_ancestor, Clock, DiskSpaceProbe};
use crate::error::{InstallError, Result};
use crate::io::{dir_size, ensure_dir};
use crate::paths::WRITE_PROBE_PREFIX;
use crate::validation::PathRejection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Template directory that every content selection needs.
pub const SHARED_TEMPLATES: &str = "shared";

// ---------------------------------------------------------------------------
// Content selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSelection {
    Skills,
    Agents,
    Workflows,
    #[default]
    All,
}

impl ContentSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSelection::Skills => "skills",
            ContentSelection::Agents => "agents",
            ContentSelection::Workflows => "workflows",
            ContentSelection::All => "all",
        }
    }

    /// Template directories that must exist for this selection, `shared` last.
    pub fn required_template_dirs(&self) -> Vec<&'static str> {
        let mut dirs = match self {
            ContentSelection::Skills => vec!["skills"],
            ContentSelection::Agents => vec!["agents"],
            ContentSelection::Workflows => vec!["workflows"],
            ContentSelection::All => vec!["skills", "agents", "workflows"],
        };
        dirs.push(SHARED_TEMPLATES);
        dirs
    }
}

impl fmt::Display for ContentSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentSelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skills" => Ok(ContentSelection::Skills),
            "agents" => Ok(ContentSelection::Agents),
            "workflows" => Ok(ContentSelection::Workflows),
            "all" => Ok(ContentSelection::All),
            other => Err(format!(
                "unknown content selection '{other}'; expected skills, agents, workflows or all"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

/// Bytes of template content the selection will copy.
pub fn template_payload_bytes(templates_dir: &Path, content: ContentSelection) -> u64 {
    content
        .required_template_dirs()
        .iter()
        .map(|d| dir_size(&templates_dir.join(d)))
        .sum()
}

/// `ceil(payload * headroom)`.
pub fn required_with_headroom(payload: u64, headroom: f64) -> u64 {
    (payload as f64 * headroom).ceil() as u64
}

/// Compare free space at `target` (or its nearest existing ancestor) against `required`.
///
/// Returns the available byte count. A probe failure surfaces as `InstallError::Io`
/// so callers can downgrade it to a warning.
pub fn check_disk_space(target: &Path, required: u64, disk: &dyn DiskSpaceProbe) -> Result<u64> {
    let probe_path = nearest_existing_ancestor(target).unwrap_or_else(|| target.to_path_buf());
    let available = disk.available_bytes(&probe_path)?;
    if available < required {
        return Err(InstallError::InsufficientSpace {
            path: target.to_path_buf(),
            required_bytes: required,
            available_bytes: available,
        });
    }
    Ok(available)
}

/// Every required template directory must exist under `templates_dir`.
pub fn check_templates(templates_dir: &Path, content: ContentSelection) -> Result<Vec<&'static str>> {
    let required = content.required_template_dirs();
    let missing: Vec<String> = required
        .iter()
        .filter(|d| !templates_dir.join(d).is_dir())
        .map(|d| d.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(InstallError::MissingTemplates {
            missing,
            templates_dir: templates_dir.to_path_buf(),
        });
    }
    Ok(required)
}

/// Create `target` if needed, then write and delete a probe file inside it.
pub fn check_write_permission(target: &Path, clock: &dyn Clock) -> Result<()> {
    let denied = |source: io::Error| InstallError::PermissionDenied {
        path: target.to_path_buf(),
        source,
    };
    ensure_dir(target).map_err(|e| match e {
        InstallError::Io(source) => denied(source),
        other => other,
    })?;
    let probe = target.join(format!(
        "{WRITE_PROBE_PREFIX}{}",
        clock.now_utc().timestamp_millis()
    ));
    fs::write(&probe, b"test").map_err(denied)?;
    fs::remove_file(&probe).map_err(denied)?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymlinkInfo {
    NotSymlink,
    Missing,
    /// A symlink whose target is a real directory.
    SingleLevel { target: PathBuf },
}

/// Resolve one level of symlink at `path`.
///
/// Broken links, links pointing at another link and links to anything but a
/// directory are rejected.
pub fn inspect_symlink(path: &Path) -> Result<SymlinkInfo> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SymlinkInfo::Missing),
        Err(e) => return Err(e.into()),
    };
    if !meta.file_type().is_symlink() {
        return Ok(SymlinkInfo::NotSymlink);
    }

    let link = fs::read_link(path)?;
    let resolved = match path.parent() {
        Some(parent) => parent.join(&link),
        None => link.clone(),
    };
    let display = path.display().to_string();
    match fs::symlink_metadata(&resolved) {
        Err(_) => Err(InstallError::invalid_path(
            display,
            PathRejection::BrokenSymlink { target: link },
        )),
        Ok(m) if m.file_type().is_symlink() => Err(InstallError::invalid_path(
            display,
            PathRejection::SymlinkChain { target: link },
        )),
        Ok(m) if !m.is_dir() => Err(InstallError::invalid_path(
            display,
            PathRejection::SymlinkNotDirectory { target: link },
        )),
        Ok(_) => Ok(SymlinkInfo::SingleLevel { target: resolved }),
    }
}
