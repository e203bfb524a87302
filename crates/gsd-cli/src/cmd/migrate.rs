use crate::output::print_json;
use crate::root::resolve_project_root;
use anyhow::Context;
use gsd_core::effects::Effects;
use gsd_core::lock::InstallLock;
use gsd_core::migration::{check_and_migrate_old_versions, MigrationOptions};
use gsd_core::platform::PlatformRegistry;
use gsd_core::settings::Settings;
use std::path::Path;

pub fn run(target: Option<&Path>, settings: &Settings, yes: bool, json: bool) -> anyhow::Result<()> {
    let target = resolve_project_root(target);
    let _lock = InstallLock::acquire(&target)
        .with_context(|| format!("cannot migrate {}", target.display()))?;

    let options = MigrationOptions {
        skip_prompts: yes,
        retry: settings.retry_policy(),
        backup_headroom: settings.backup_headroom,
        ..Default::default()
    };
    let registry = PlatformRegistry::builtin();
    let mut summary =
        check_and_migrate_old_versions(&registry, &target, &options, &Effects::system());

    if json {
        print_json(&summary)?;
    } else if summary.detected.is_empty() {
        println!("No legacy installations found in {}", target.display());
    } else {
        for old in &summary.detected {
            println!(
                "Found {} v{} ({} legacy path(s))",
                old.platform.display_name(),
                old.version,
                old.paths.len()
            );
        }
        if summary.success {
            println!(
                "Migrated {} installation(s).",
                summary.migrations_performed
            );
        } else if let Some(error) = &summary.error {
            println!(
                "Migration stopped after {} of {} platform(s): {error}",
                summary.migrations_performed,
                summary.detected.len()
            );
        }
        if let Some(backup) = &summary.backup_path {
            println!("Backup: {}", backup.display());
        }
    }

    match summary.cause.take() {
        Some(cause) => Err(cause.into()),
        None => Ok(()),
    }
}
