use crate::platform::Platform;
use crate::preflight::PreflightFailure;
use crate::validation::PathRejection;
use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes consumed by the CLI layer.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGS: i32 = 2;
    pub const MISSING_TEMPLATES: i32 = 3;
    pub const PERMISSION_DENIED: i32 = 4;
    pub const INSUFFICIENT_SPACE: i32 = 5;
    pub const INVALID_PATH: i32 = 6;
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("missing template directories: {}", missing.join(", "))]
    MissingTemplates {
        missing: Vec<String>,
        templates_dir: PathBuf,
    },

    #[error("cannot write to directory: {}", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "insufficient disk space at {}: {} required, {} available",
        path.display(),
        format_mb(*required_bytes),
        format_mb(*available_bytes)
    )]
    InsufficientSpace {
        path: PathBuf,
        required_bytes: u64,
        available_bytes: u64,
    },

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: PathRejection },

    #[error("manifest not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("manifest {} has an invalid schema: {detail}", path.display())]
    ManifestInvalidSchema { path: PathBuf, detail: String },

    #[error("manifest {} is corrupt: {detail}", path.display())]
    ManifestCorrupt { path: PathBuf, detail: String },

    #[error("could not repair manifest {}: {reason}", path.display())]
    ManifestRepairFailed { path: PathBuf, reason: String },

    #[error("migration of {platform} declined; its original files are untouched")]
    UserDeclinedMigration { platform: Platform },

    #[error(
        "backup incomplete ({} path(s) failed); partial backup kept at {}; its original files are untouched",
        failed.len(),
        backup_path.display()
    )]
    BackupPartialFailure {
        backup_path: PathBuf,
        failed: Vec<PathBuf>,
    },

    #[error("{0}")]
    PreflightFailed(PreflightFailure),

    #[error(
        "target {} is locked by another installer run ({holder}); if no installer is running, delete {}",
        path.parent().unwrap_or(path.as_path()).display(),
        path.display()
    )]
    Locked { path: PathBuf, holder: String },

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl InstallError {
    pub fn exit_code(&self) -> i32 {
        match self {
            InstallError::InvalidArgs(_) => exit_code::INVALID_ARGS,
            InstallError::MissingTemplates { .. } => exit_code::MISSING_TEMPLATES,
            InstallError::PermissionDenied { .. } => exit_code::PERMISSION_DENIED,
            InstallError::InsufficientSpace { .. } => exit_code::INSUFFICIENT_SPACE,
            InstallError::InvalidPath { .. } => exit_code::INVALID_PATH,
            _ => exit_code::GENERAL_ERROR,
        }
    }

    pub fn invalid_path(path: impl Into<String>, reason: PathRejection) -> Self {
        InstallError::InvalidPath {
            path: path.into(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, InstallError>;

/// Render a byte count as megabytes with two decimals.
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}
