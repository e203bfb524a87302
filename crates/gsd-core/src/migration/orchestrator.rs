use super::detect::{detect_all_old_versions, LegacyInstall};
use super::manager::{perform_migration, MigrationOptions, MigrationOutcome};
use crate::effects::Effects;
use crate::error::InstallError;
use crate::platform::{Platform, PlatformRegistry};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct MigrationSummary {
    pub success: bool,
    pub migrations_performed: usize,
    pub cancelled: bool,
    pub error: Option<String>,
    pub detected: Vec<LegacyInstall>,
    pub backup_path: Option<PathBuf>,
    #[serde(skip)]
    pub cause: Option<InstallError>,
}

impl MigrationSummary {
    fn stopped(
        detected: Vec<LegacyInstall>,
        migrated: &[Platform],
        failed_on: Platform,
        backup_path: Option<PathBuf>,
        cause: InstallError,
    ) -> Self {
        let cancelled = matches!(cause, InstallError::UserDeclinedMigration { .. });
        let mut error = match &cause {
            InstallError::UserDeclinedMigration { .. } | InstallError::BackupPartialFailure { .. } => {
                cause.to_string()
            }
            other => format!(
                "{other}; original {} files are untouched",
                failed_on.display_name()
            ),
        };
        if !migrated.is_empty() {
            let names: Vec<&str> = migrated.iter().map(|p| p.display_name()).collect();
            error.push_str(&format!("; already migrated: {}", names.join(", ")));
            if let Some(backup) = &backup_path {
                error.push_str(&format!(" (backed up to {})", backup.display()));
            }
        }
        Self {
            success: false,
            migrations_performed: migrated.len(),
            cancelled,
            error: Some(error),
            detected,
            backup_path,
            cause: Some(cause),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.cause
            .as_ref()
            .map_or(crate::error::exit_code::SUCCESS, InstallError::exit_code)
    }
}

/// Detect legacy installs under `target_dir` and migrate them one platform at a time.
///
/// All platforms share the backup directory created for the first one. The run
/// stops at the first decline or failure.
pub fn check_and_migrate_old_versions(
    registry: &PlatformRegistry,
    target_dir: &Path,
    options: &MigrationOptions,
    effects: &Effects,
) -> MigrationSummary {
    let detected = detect_all_old_versions(registry, target_dir);
    if detected.is_empty() {
        tracing::debug!(target = %target_dir.display(), "no legacy installations found");
        return MigrationSummary {
            success: true,
            migrations_performed: 0,
            cancelled: false,
            error: None,
            detected,
            backup_path: None,
            cause: None,
        };
    }

    for old in &detected {
        tracing::warn!(
            platform = %old.platform,
            version = %old.version,
            "incompatible legacy installation detected"
        );
    }

    let mut shared = options.shared_backup_dir.clone();
    let mut migrated = Vec::new();
    for old in &detected {
        let opts = MigrationOptions {
            shared_backup_dir: shared.clone(),
            ..options.clone()
        };
        let outcome =
            perform_migration(registry, old.platform, &old.version, target_dir, &opts, effects);
        let result = outcome.and_then(|o| match o {
            MigrationOutcome::NoLegacyFiles => Err(InstallError::InvalidArgs(format!(
                "legacy {} files disappeared before migration",
                old.platform
            ))),
            other => other.into_result(old.platform),
        });
        match result {
            Ok(backup_path) => {
                migrated.push(old.platform);
                if shared.is_none() {
                    shared = Some(backup_path);
                }
            }
            Err(cause) => {
                return MigrationSummary::stopped(
                    detected.clone(),
                    &migrated,
                    old.platform,
                    shared,
                    cause,
                )
            }
        }
    }

    tracing::info!(count = migrated.len(), "all legacy installations migrated");
    MigrationSummary {
        success: true,
        migrations_performed: migrated.len(),
        cancelled: false,
        error: None,
        detected,
        backup_path: shared,
        cause: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::RetryPolicy;
    use crate::effects::{AutoConfirm, FixedClock, FixedDiskSpace, Prompter};
    use chrono::{Local, TimeZone};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, body: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, body).unwrap();
    }

    fn legacy_all(root: &Path) {
        touch(root, ".claude/get-shit-done/VERSION", "1.9.0");
        touch(root, ".claude/commands/gsd/plan.md", "p");
        touch(root, ".github/skills/get-shit-done/SKILL.md", "s");
        touch(root, ".github/skills/get-shit-done/VERSION", "1.9.0");
        touch(root, ".codex/skills/get-shit-done/SKILL.md", "s");
        touch(root, ".codex/skills/get-shit-done/VERSION", "1.9.0");
    }

    fn effects() -> Effects {
        Effects::system()
            .with_clock(FixedClock(Local.with_ymd_and_hms(2026, 8, 2, 10, 15, 0).unwrap()))
            .with_disk(FixedDiskSpace(u64::MAX))
            .with_prompter(AutoConfirm(true))
    }

    fn options(skip_prompts: bool) -> MigrationOptions {
        MigrationOptions {
            skip_prompts,
            retry: RetryPolicy {
                max_retries: 1,
                retry_delay: Duration::ZERO,
            },
            ..Default::default()
        }
    }

    /// Says yes a fixed number of times, then no.
    struct YesThenNo(AtomicUsize);

    impl Prompter for YesThenNo {
        fn confirm(&self, _message: &str, _default: bool) -> std::io::Result<bool> {
            let left = self.0.load(Ordering::SeqCst);
            if left == 0 {
                return Ok(false);
            }
            self.0.store(left - 1, Ordering::SeqCst);
            Ok(true)
        }
    }

    #[test]
    fn nothing_detected_is_success() {
        let dir = TempDir::new().unwrap();
        let summary = check_and_migrate_old_versions(
            &PlatformRegistry::builtin(),
            dir.path(),
            &options(true),
            &effects(),
        );
        assert!(summary.success);
        assert_eq!(summary.migrations_performed, 0);
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn all_platforms_share_one_backup_directory() {
        let dir = TempDir::new().unwrap();
        legacy_all(dir.path());
        let summary = check_and_migrate_old_versions(
            &PlatformRegistry::builtin(),
            dir.path(),
            &options(true),
            &effects(),
        );
        assert!(summary.success, "{:?}", summary.error);
        assert_eq!(summary.migrations_performed, 3);

        let backup = summary.backup_path.unwrap();
        assert_eq!(backup, dir.path().join(".gsd-backup/2026-08-02-1015"));
        assert!(backup.join(".claude/commands/gsd/plan.md").is_file());
        assert!(backup.join(".github/skills/get-shit-done/SKILL.md").is_file());
        assert!(backup.join(".codex/skills/get-shit-done/VERSION").is_file());
        assert_eq!(fs::read_dir(dir.path().join(".gsd-backup")).unwrap().count(), 1);
        assert!(!dir.path().join(".codex/skills/get-shit-done").exists());
    }

    #[test]
    fn decline_stops_the_run() {
        let dir = TempDir::new().unwrap();
        legacy_all(dir.path());
        let fx = effects().with_prompter(YesThenNo(AtomicUsize::new(1)));
        let summary = check_and_migrate_old_versions(
            &PlatformRegistry::builtin(),
            dir.path(),
            &options(false),
            &fx,
        );
        assert!(!summary.success);
        assert!(summary.cancelled);
        assert_eq!(summary.migrations_performed, 1);
        let error = summary.error.as_deref().unwrap();
        assert!(error.contains("migration of copilot declined"));
        assert!(error.contains("its original files are untouched"));
        assert!(error.contains("already migrated: Claude Code"));
        assert!(error.contains(".gsd-backup/2026-08-02-1015"));
        assert_eq!(summary.exit_code(), 1);
        assert!(!dir.path().join(".claude/commands/gsd").exists());
        assert!(dir.path().join(".github/skills/get-shit-done/SKILL.md").exists());
        assert!(dir.path().join(".codex/skills/get-shit-done/SKILL.md").exists());
    }

    #[test]
    fn space_failure_reports_untouched_originals() {
        let dir = TempDir::new().unwrap();
        legacy_all(dir.path());
        let fx = effects().with_disk(FixedDiskSpace(0));
        let summary = check_and_migrate_old_versions(
            &PlatformRegistry::builtin(),
            dir.path(),
            &options(true),
            &fx,
        );
        assert!(!summary.success);
        assert!(!summary.cancelled);
        assert_eq!(summary.exit_code(), 5);
        let error = summary.error.unwrap();
        assert!(error.ends_with("original Claude Code files are untouched"));
        assert!(!error.contains("already migrated"));
        assert!(dir.path().join(".claude/commands/gsd/plan.md").exists());
    }
}
