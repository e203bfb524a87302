use super::checks::{
    check_disk_space, check_templates, check_write_permission, inspect_symlink,
    required_with_headroom, template_payload_bytes, ContentSelection, SymlinkInfo,
};
use super::report::{PreflightFailure, ValidationCategory, ValidationError};
use crate::effects::Effects;
use crate::error::{format_mb, InstallError, Result};
use crate::platform::{Platform, Scope};
use crate::validation::validate_all_paths;
use serde::Serialize;
use std::path::PathBuf;

pub const DEFAULT_DISK_HEADROOM: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct PreflightConfig {
    pub target_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub content: ContentSelection,
    /// Relative destination paths the installer intends to write.
    pub planned_paths: Vec<String>,
    /// Multiplier applied to the template payload size.
    pub headroom: f64,
}

impl PreflightConfig {
    pub fn new(target_dir: impl Into<PathBuf>, templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            templates_dir: templates_dir.into(),
            content: ContentSelection::All,
            planned_paths: Vec::new(),
            headroom: DEFAULT_DISK_HEADROOM,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PreflightOutcome {
    pub warnings: Vec<String>,
    pub required_bytes: u64,
    pub available_bytes: Option<u64>,
    pub paths_checked: usize,
}

/// Run every pre-install check and report all fatal problems together.
///
/// Disk, template, permission, path and symlink checks run in that order. A
/// missing template directory skips the path check. Warnings never fail the run.
pub fn validate_before_install(
    platforms: &[Platform],
    scope: Scope,
    config: &PreflightConfig,
    effects: &Effects,
) -> Result<PreflightOutcome> {
    if platforms.is_empty() {
        return Err(InstallError::InvalidArgs(
            "at least one platform is required".to_string(),
        ));
    }

    let target = &config.target_dir;
    tracing::debug!(
        platforms = ?platforms,
        scope = %scope,
        content = %config.content,
        target = %target.display(),
        "running preflight validation"
    );

    let mut failure = PreflightFailure::default();
    let mut outcome = PreflightOutcome::default();

    // 1. Disk space
    let payload = template_payload_bytes(&config.templates_dir, config.content);
    outcome.required_bytes = required_with_headroom(payload, config.headroom);
    match check_disk_space(target, outcome.required_bytes, effects.disk.as_ref()) {
        Ok(available) => {
            outcome.available_bytes = Some(available);
            tracing::debug!(available = %format_mb(available), "disk space ok");
        }
        Err(InstallError::Io(e)) => {
            tracing::warn!(error = %e, "could not check disk space");
            outcome
                .warnings
                .push(format!("could not check disk space: {e}"));
        }
        Err(e) => failure
            .errors
            .push(ValidationError::new(ValidationCategory::Disk, e)),
    }

    // 2. Templates
    let templates_ok = match check_templates(&config.templates_dir, config.content) {
        Ok(dirs) => {
            tracing::debug!(dirs = ?dirs, "templates present");
            true
        }
        Err(e) => {
            tracing::debug!("templates missing, skipping path validation");
            failure
                .errors
                .push(ValidationError::new(ValidationCategory::Templates, e));
            false
        }
    };

    // 3. Permissions
    if let Err(e) = check_write_permission(target, effects.clock.as_ref()) {
        failure
            .errors
            .push(ValidationError::new(ValidationCategory::Permissions, e));
    }

    // 4. Paths
    if templates_ok && !config.planned_paths.is_empty() {
        let report = validate_all_paths(target, &config.planned_paths);
        outcome.paths_checked = report.valid.len() + report.invalid.len();
        for invalid in report.invalid {
            failure.errors.push(ValidationError::new(
                ValidationCategory::Paths,
                InstallError::invalid_path(invalid.input, invalid.reason),
            ));
        }
        tracing::debug!(valid = report.valid.len(), "paths validated");
    }

    // 5. Symlinks
    match inspect_symlink(target) {
        Ok(SymlinkInfo::SingleLevel { target: resolved }) => {
            outcome.warnings.push(format!(
                "target is a symlink: {} -> {}",
                target.display(),
                resolved.display()
            ));
        }
        Ok(_) => {}
        Err(e) => failure
            .errors
            .push(ValidationError::new(ValidationCategory::Symlinks, e)),
    }

    if !failure.is_empty() {
        failure.warnings = outcome.warnings;
        return Err(InstallError::PreflightFailed(failure));
    }
    Ok(outcome)
}
