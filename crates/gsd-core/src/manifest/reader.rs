use super::schema::{validate_manifest, InstallationManifest, ManifestDraft};
use crate::error::{InstallError, Result};
use serde::Serialize;
use std::io;
use std::path::Path;

/// Outcome of reading a manifest file. Never repairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ManifestReadResult {
    Success { manifest: InstallationManifest },
    NotFound,
    /// Valid JSON that is not a usable manifest.
    InvalidSchema { missing: Vec<String>, detail: String },
    /// Not JSON at all.
    Corrupt { detail: String },
    PermissionDenied { detail: String },
    Unreadable { detail: String },
}

impl ManifestReadResult {
    pub fn reason(&self) -> &'static str {
        match self {
            ManifestReadResult::Success { .. } => "success",
            ManifestReadResult::NotFound => "not_found",
            ManifestReadResult::InvalidSchema { .. } => "invalid_schema",
            ManifestReadResult::Corrupt { .. } => "corrupt",
            ManifestReadResult::PermissionDenied { .. } => "permission_denied",
            ManifestReadResult::Unreadable { .. } => "unknown_error",
        }
    }

    /// Corrupt and schema-invalid manifests can be rebuilt from the directory.
    pub fn needs_repair(&self) -> bool {
        matches!(
            self,
            ManifestReadResult::Corrupt { .. } | ManifestReadResult::InvalidSchema { .. }
        )
    }

    pub fn into_result(self, path: &Path) -> Result<InstallationManifest> {
        match self {
            ManifestReadResult::Success { manifest } => Ok(manifest),
            ManifestReadResult::NotFound => Err(InstallError::ManifestNotFound(path.to_path_buf())),
            ManifestReadResult::InvalidSchema { detail, .. } => {
                Err(InstallError::ManifestInvalidSchema {
                    path: path.to_path_buf(),
                    detail,
                })
            }
            ManifestReadResult::Corrupt { detail } => Err(InstallError::ManifestCorrupt {
                path: path.to_path_buf(),
                detail,
            }),
            ManifestReadResult::PermissionDenied { detail } => {
                Err(InstallError::PermissionDenied {
                    path: path.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, detail),
                })
            }
            ManifestReadResult::Unreadable { detail } => {
                Err(InstallError::Io(io::Error::new(io::ErrorKind::Other, detail)))
            }
        }
    }
}

pub fn read_manifest(path: &Path) -> ManifestReadResult {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            return match e.kind() {
                io::ErrorKind::NotFound => ManifestReadResult::NotFound,
                io::ErrorKind::PermissionDenied => ManifestReadResult::PermissionDenied {
                    detail: e.to_string(),
                },
                _ => ManifestReadResult::Unreadable {
                    detail: e.to_string(),
                },
            }
        }
    };

    let value: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "manifest is not valid JSON");
            return ManifestReadResult::Corrupt {
                detail: format!("invalid JSON format: {e}"),
            };
        }
    };

    if !value.is_object() {
        return ManifestReadResult::InvalidSchema {
            missing: Vec::new(),
            detail: "manifest is not a JSON object".to_string(),
        };
    }

    let draft: ManifestDraft = match serde_json::from_value(value.clone()) {
        Ok(d) => d,
        Err(e) => {
            return ManifestReadResult::InvalidSchema {
                missing: Vec::new(),
                detail: e.to_string(),
            }
        }
    };

    let validation = validate_manifest(&draft);
    if !validation.valid {
        return ManifestReadResult::InvalidSchema {
            missing: validation.missing.iter().map(|s| s.to_string()).collect(),
            detail: format!("missing required fields: {}", validation.missing.join(", ")),
        };
    }

    match serde_json::from_value::<InstallationManifest>(value) {
        Ok(manifest) => ManifestReadResult::Success { manifest },
        Err(e) => ManifestReadResult::InvalidSchema {
            missing: Vec::new(),
            detail: e.to_string(),
        },
    }
}
