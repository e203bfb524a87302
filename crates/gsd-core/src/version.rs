use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::OnceLock;

static COERCE_RE: OnceLock<Regex> = OnceLock::new();

fn coerce_re() -> &'static Regex {
    COERCE_RE.get_or_init(|| {
        Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("valid regex")
    })
}

/// Pull the first `major[.minor[.patch]]` run out of `input`.
///
/// Missing parts become zero, so `v2`, `2.0` and `release-2.0.0-beta` all
/// coerce to `2.0.0`. Returns `None` when no digits are present.
pub fn coerce(input: &str) -> Option<Version> {
    let caps = coerce_re().captures(input)?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Minor,
    Patch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownReason {
    InvalidVersion,
}

/// Relationship between an installed version and the version about to be installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VersionStatus {
    UpToDate {
        installed: Version,
        current: Version,
    },
    UpdateAvailable {
        installed: Version,
        current: Version,
        update_type: UpdateType,
    },
    MajorUpdate {
        installed: Version,
        current: Version,
    },
    Downgrade {
        installed: Version,
        current: Version,
        blocking: bool,
    },
    Unknown {
        reason: UnknownReason,
    },
}

impl VersionStatus {
    pub fn is_blocking(&self) -> bool {
        matches!(self, VersionStatus::Downgrade { blocking: true, .. })
    }

    pub fn is_update(&self) -> bool {
        matches!(
            self,
            VersionStatus::UpdateAvailable { .. } | VersionStatus::MajorUpdate { .. }
        )
    }

    /// One-line summary for terminal output.
    pub fn describe(&self) -> String {
        match self {
            VersionStatus::UpToDate { installed, .. } => format!("up to date (v{installed})"),
            VersionStatus::UpdateAvailable {
                installed,
                current,
                update_type,
            } => {
                let kind = match update_type {
                    UpdateType::Minor => "minor",
                    UpdateType::Patch => "patch",
                };
                format!("{kind} update available: v{installed} → v{current}")
            }
            VersionStatus::MajorUpdate { installed, current } => format!(
                "major update available: v{installed} → v{current} (may contain breaking changes)"
            ),
            VersionStatus::Downgrade {
                installed, current, ..
            } => format!("downgrade blocked: installed v{installed} is newer than v{current}"),
            VersionStatus::Unknown { .. } => "version unknown (invalid_version)".to_string(),
        }
    }
}

/// Classify `candidate` against `installed`.
///
/// Checks run downgrade first, then major, then minor/patch, then equality.
pub fn compare_versions(installed: &str, candidate: &str) -> VersionStatus {
    let (Some(installed), Some(current)) = (coerce(installed), coerce(candidate)) else {
        return VersionStatus::Unknown {
            reason: UnknownReason::InvalidVersion,
        };
    };

    match current.cmp(&installed) {
        Ordering::Less => VersionStatus::Downgrade {
            installed,
            current,
            blocking: true,
        },
        Ordering::Greater if current.major > installed.major => {
            VersionStatus::MajorUpdate { installed, current }
        }
        Ordering::Greater => {
            let update_type = if current.minor > installed.minor {
                UpdateType::Minor
            } else {
                UpdateType::Patch
            };
            VersionStatus::UpdateAvailable {
                installed,
                current,
                update_type,
            }
        }
        Ordering::Equal => VersionStatus::UpToDate { installed, current },
    }
}
