use crate::error::{format_mb, InstallError};
use crate::paths::ALLOWED_ROOTS;
use crate::validation::PathRejection;
use serde::Serialize;
use std::fmt;

/// Grouping used in the failure report. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ValidationCategory {
    Templates,
    Disk,
    Permissions,
    Paths,
    Symlinks,
}

impl ValidationCategory {
    pub const ORDER: [ValidationCategory; 5] = [
        ValidationCategory::Templates,
        ValidationCategory::Disk,
        ValidationCategory::Permissions,
        ValidationCategory::Paths,
        ValidationCategory::Symlinks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCategory::Templates => "Templates",
            ValidationCategory::Disk => "Disk",
            ValidationCategory::Permissions => "Permissions",
            ValidationCategory::Paths => "Paths",
            ValidationCategory::Symlinks => "Symlinks",
        }
    }
}

impl fmt::Display for ValidationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct ValidationError {
    pub category: ValidationCategory,
    pub error: InstallError,
}

impl ValidationError {
    pub fn new(category: ValidationCategory, error: InstallError) -> Self {
        Self { category, error }
    }
}

/// Every fatal problem found by a preflight run, plus the non-fatal warnings.
#[derive(Debug, Default)]
pub struct PreflightFailure {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl PreflightFailure {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn in_category(&self, category: ValidationCategory) -> impl Iterator<Item = &InstallError> {
        self.errors
            .iter()
            .filter(move |e| e.category == category)
            .map(|e| &e.error)
    }
}

impl fmt::Display for PreflightFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Preflight validation failed")?;
        for category in ValidationCategory::ORDER {
            let mut errors = self.in_category(category).peekable();
            if errors.peek().is_none() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{category}:")?;
            for error in errors {
                for line in error_lines(error) {
                    writeln!(f, "{line}")?;
                }
            }
        }
        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, " ! {warning}")?;
            }
        }
        Ok(())
    }
}

fn error_lines(error: &InstallError) -> Vec<String> {
    let mut lines = Vec::new();
    match error {
        InstallError::InsufficientSpace {
            required_bytes,
            available_bytes,
            ..
        } => {
            let short = required_bytes.saturating_sub(*available_bytes);
            lines.push(" ✗ Insufficient disk space".to_string());
            lines.push(format!(" | Required: {}", format_mb(*required_bytes)));
            lines.push(format!(" | Available: {}", format_mb(*available_bytes)));
            lines.push(format!(
                " | Fix: Free up at least {} and try again",
                format_mb(short)
            ));
        }
        InstallError::PermissionDenied { path, source } => {
            lines.push(" ✗ Cannot write to target directory".to_string());
            lines.push(format!(" | Reason: {source}"));
            lines.push(format!(" | Location: {}", path.display()));
            lines.push(" | Fix: Run with appropriate permissions or choose another --target".to_string());
        }
        InstallError::MissingTemplates {
            missing,
            templates_dir,
        } => {
            lines.push(format!(
                " ✗ Missing template directories: {}",
                missing.join(", ")
            ));
            for dir in missing {
                lines.push(format!(" | Missing: templates/{dir}/"));
            }
            lines.push(format!(" | Location: {}", templates_dir.display()));
            lines.push(" | Fix: Ensure template directories exist or reinstall the package".to_string());
        }
        InstallError::InvalidPath { path, reason } => {
            lines.push(format!(" ✗ Invalid path: {path}"));
            lines.push(format!(" | Reason: {reason}"));
            let fix = match reason {
                PathRejection::NotAllowed { first_segment } => {
                    lines.push(format!(" | Blocked: {first_segment} not in allowlist"));
                    lines.push(format!(" | Allowed: {}", ALLOWED_ROOTS.join(", ")));
                    "Use a valid installation directory"
                }
                PathRejection::BrokenSymlink { .. }
                | PathRejection::SymlinkChain { .. }
                | PathRejection::SymlinkNotDirectory { .. } => {
                    "Resolve the symlink or use the actual target directory"
                }
                _ => "Use a valid installation directory",
            };
            lines.push(format!(" | Fix: {fix}"));
        }
        other => {
            lines.push(format!(" ✗ {other}"));
            lines.push(" | Fix: Review the error details and retry".to_string());
        }
    }
    lines
}
