use crate::error::{InstallError, Result};
use crate::paths::ALLOWED_ROOTS;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::path::{Component, Path, PathBuf};

pub const MAX_COMPONENT_LEN: usize = 255;

#[cfg(windows)]
pub const MAX_PATH_LEN: usize = 260;
#[cfg(not(windows))]
pub const MAX_PATH_LEN: usize = 4096;

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Why a path was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathRejection {
    InvalidEncoding { detail: String },
    NullByte,
    Traversal,
    EscapesBase,
    NotAllowed { first_segment: String },
    TooLong { length: usize, max: usize },
    ComponentTooLong { component: String },
    ReservedName { component: String },
    BrokenSymlink { target: PathBuf },
    SymlinkChain { target: PathBuf },
    SymlinkNotDirectory { target: PathBuf },
}

impl fmt::Display for PathRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathRejection::InvalidEncoding { detail } => {
                write!(f, "invalid URL encoding in path ({detail})")
            }
            PathRejection::NullByte => f.write_str("null byte detected in path"),
            PathRejection::Traversal => f.write_str("path traversal detected (..)"),
            PathRejection::EscapesBase => f.write_str("path escapes base directory"),
            PathRejection::NotAllowed { first_segment } => {
                write!(f, "path not in allowlist: {first_segment}")
            }
            PathRejection::TooLong { length, max } => {
                write!(f, "path exceeds maximum length: {length} > {max}")
            }
            PathRejection::ComponentTooLong { component } => {
                write!(f, "component exceeds {MAX_COMPONENT_LEN} characters: {component}...")
            }
            PathRejection::ReservedName { component } => {
                write!(f, "reserved device name: {component}")
            }
            PathRejection::BrokenSymlink { target } => {
                write!(f, "broken symlink to {} (does not exist)", target.display())
            }
            PathRejection::SymlinkChain { target } => {
                write!(f, "symlink chain via {} (target is also a symlink)", target.display())
            }
            PathRejection::SymlinkNotDirectory { target } => {
                write!(f, "symlink to {} (target is not a directory)", target.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedPath {
    pub input: String,
    /// Decoded, normalized relative path using `/` separators.
    pub normalized: String,
    /// Absolute destination under the base directory.
    pub resolved: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidPathEntry {
    pub input: String,
    pub reason: PathRejection,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PathValidationReport {
    pub valid: Vec<ValidatedPath>,
    pub invalid: Vec<InvalidPathEntry>,
    pub total_errors: usize,
}

/// Check that `input` is safe to write under `base`.
///
/// The checks run in a fixed order and the first violation is reported:
/// decoding, NUL bytes, normalization, `..` segments, containment, allow-list,
/// total length, then per-component length and reserved device names.
pub fn validate_path(base: &Path, input: &str) -> Result<ValidatedPath> {
    let reject = |reason| InstallError::invalid_path(input, reason);

    let decoded = decode(input).map_err(|detail| reject(PathRejection::InvalidEncoding { detail }))?;

    if decoded.contains('\0') {
        return Err(reject(PathRejection::NullByte));
    }

    let (absolute, segments) = normalize_segments(&decoded);

    if segments.iter().any(|s| s == "..") {
        return Err(reject(PathRejection::Traversal));
    }

    let resolved_base = absolutize(base);
    let resolved = segments
        .iter()
        .fold(resolved_base.clone(), |acc, s| acc.join(s));
    if absolute || resolved.strip_prefix(&resolved_base).is_err() {
        return Err(reject(PathRejection::EscapesBase));
    }

    let first = segments.first().map(String::as_str).unwrap_or(".");
    if !ALLOWED_ROOTS.contains(&first) {
        return Err(reject(PathRejection::NotAllowed {
            first_segment: first.to_string(),
        }));
    }

    let length = resolved.as_os_str().len();
    if length > MAX_PATH_LEN {
        return Err(reject(PathRejection::TooLong {
            length,
            max: MAX_PATH_LEN,
        }));
    }

    for component in &segments {
        if component.chars().count() > MAX_COMPONENT_LEN {
            return Err(reject(PathRejection::ComponentTooLong {
                component: component.chars().take(20).collect(),
            }));
        }
        if is_reserved_name(component) {
            return Err(reject(PathRejection::ReservedName {
                component: component.clone(),
            }));
        }
    }

    Ok(ValidatedPath {
        input: input.to_string(),
        normalized: segments.join("/"),
        resolved,
    })
}

/// Validate every path, collecting all failures instead of stopping at the first.
pub fn validate_all_paths<S: AsRef<str>>(base: &Path, inputs: &[S]) -> PathValidationReport {
    let mut report = PathValidationReport::default();
    for input in inputs {
        let input = input.as_ref();
        match validate_path(base, input) {
            Ok(valid) => report.valid.push(valid),
            Err(InstallError::InvalidPath { reason, .. }) => {
                report.invalid.push(InvalidPathEntry {
                    input: input.to_string(),
                    reason,
                });
                report.total_errors += 1;
            }
            Err(other) => {
                tracing::warn!(path = input, error = %other, "unexpected path validation error");
                report.total_errors += 1;
            }
        }
    }
    report
}

/// Windows device name check, case-insensitive and ignoring any extension.
pub fn is_reserved_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or("").to_ascii_uppercase();
    RESERVED_NAMES.contains(&stem.as_str())
}

fn decode(input: &str) -> std::result::Result<Cow<'_, str>, String> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(format!("malformed escape at byte {i}"));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    percent_decode_str(input)
        .decode_utf8()
        .map_err(|e| e.to_string())
}

/// Lexically normalize a path, treating `/` and `\` as separators.
///
/// Returns whether the path was absolute, plus its segments with `.` dropped and
/// `name/..` pairs folded. Leading `..` segments of relative paths survive.
fn normalize_segments(path: &str) -> (bool, Vec<String>) {
    let absolute = path.starts_with('/') || path.starts_with('\\') || has_drive_prefix(path);
    let mut out: Vec<String> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => match out.last() {
                Some(last) if last != ".." => {
                    out.pop();
                }
                _ if absolute => {}
                _ => out.push("..".to_string()),
            },
            s => out.push(s.to_string()),
        }
    }
    (absolute, out)
}

fn has_drive_prefix(path: &str) -> bool {
    let b = path.as_bytes();
    b.len() >= 2 && b[0].is_ascii_alphabetic() && b[1] == b':'
}

fn absolutize(base: &Path) -> PathBuf {
    let joined = if base.is_absolute() {
        base.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(base))
            .unwrap_or_else(|_| base.to_path_buf())
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
