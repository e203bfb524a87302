use super::detect::detect_old_version;
use crate::backup::{BackupManager, RetryPolicy, DEFAULT_BACKUP_HEADROOM};
use crate::effects::Effects;
use crate::error::{InstallError, Result};
use crate::io::remove_path;
use crate::platform::{Platform, PlatformRegistry};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub skip_prompts: bool,
    /// Backup directory already created for an earlier platform in this run.
    pub shared_backup_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
    pub backup_headroom: f64,
    /// Version being installed, shown in the confirmation prompt.
    pub new_version: String,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            skip_prompts: false,
            shared_backup_dir: None,
            retry: RetryPolicy::default(),
            backup_headroom: DEFAULT_BACKUP_HEADROOM,
            new_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MigrationOutcome {
    Migrated {
        backup_path: PathBuf,
        removed: Vec<String>,
        /// Originals that could not be removed after a complete backup.
        warnings: Vec<String>,
    },
    Declined,
    NoLegacyFiles,
    /// Some copies failed; the partial backup is kept and nothing was removed.
    BackupIncomplete {
        backup_path: PathBuf,
        failed: Vec<PathBuf>,
    },
}

impl MigrationOutcome {
    /// Turn every non-migrated outcome into the matching error.
    pub fn into_result(self, platform: Platform) -> Result<PathBuf> {
        match self {
            MigrationOutcome::Migrated { backup_path, .. } => Ok(backup_path),
            MigrationOutcome::Declined => Err(InstallError::UserDeclinedMigration { platform }),
            MigrationOutcome::NoLegacyFiles => Err(InstallError::InvalidArgs(format!(
                "no legacy {platform} files found to migrate"
            ))),
            MigrationOutcome::BackupIncomplete {
                backup_path,
                failed,
            } => Err(InstallError::BackupPartialFailure {
                backup_path,
                failed,
            }),
        }
    }
}

pub fn confirmation_message(
    platform: Platform,
    old_version: &str,
    new_version: &str,
    backup_path: &Path,
) -> String {
    format!(
        "{} v{old_version} is incompatible with v{new_version}.\n  \
         - Back up v{old_version} to {}\n  \
         - Remove the old files\n  \
         - Install v{new_version}\n\
         Create backup and upgrade?",
        platform.display_name(),
        backup_path.display()
    )
}

/// Back up and remove one platform's legacy installation.
///
/// The user is asked first unless prompts are skipped; declining changes nothing
/// on disk. Originals are only removed after every path was backed up.
pub fn perform_migration(
    registry: &PlatformRegistry,
    platform: Platform,
    old_version: &str,
    target_dir: &Path,
    options: &MigrationOptions,
    effects: &Effects,
) -> Result<MigrationOutcome> {
    let detection = detect_old_version(registry, platform, target_dir);
    if detection.paths.is_empty() {
        return Ok(MigrationOutcome::NoLegacyFiles);
    }

    let manager = BackupManager::new(effects)
        .with_retry(options.retry)
        .with_headroom(options.backup_headroom);

    if !options.skip_prompts {
        let planned = options
            .shared_backup_dir
            .clone()
            .unwrap_or_else(|| manager.next_backup_path(target_dir));
        let message =
            confirmation_message(platform, old_version, &options.new_version, &planned);
        if !effects.prompter.confirm(&message, true)? {
            tracing::info!(platform = %platform, "migration declined");
            return Ok(MigrationOutcome::Declined);
        }
    }

    let record = manager.create_backup(
        platform,
        old_version,
        &detection.paths,
        target_dir,
        options.shared_backup_dir.as_deref(),
    )?;

    if !record.is_complete() {
        tracing::warn!(
            platform = %platform,
            failed = record.failed.len(),
            path = %record.backup_path.display(),
            "backup incomplete; leaving originals in place"
        );
        return Ok(MigrationOutcome::BackupIncomplete {
            backup_path: record.backup_path,
            failed: record.failed,
        });
    }

    let mut removed = Vec::new();
    let mut warnings = Vec::new();
    for rel in &detection.paths {
        match remove_path(&target_dir.join(rel)) {
            Ok(()) => removed.push(rel.clone()),
            Err(e) => {
                tracing::warn!(path = %rel, error = %e, "could not remove legacy file");
                warnings.push(format!("could not remove {rel}: {e}"));
            }
        }
    }

    tracing::info!(
        platform = %platform,
        from = old_version,
        backup = %record.backup_path.display(),
        "legacy installation migrated"
    );
    Ok(MigrationOutcome::Migrated {
        backup_path: record.backup_path,
        removed,
        warnings,
    })
}
