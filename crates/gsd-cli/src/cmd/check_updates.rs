use crate::output::{print_json, print_table};
use crate::root::resolve_base;
use gsd_core::effects::SystemClock;
use gsd_core::platform::{Platform, Scope};
use gsd_core::settings::Settings;
use gsd_core::status::{
    check_installation, check_installations, custom_manifest_path, InstallStatusReport,
    InstallationStatus,
};
use std::path::Path;

const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run(
    target: Option<&Path>,
    settings: &Settings,
    scope: Option<Scope>,
    custom_path: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let options = settings.repair_options();
    let clock = SystemClock;

    let reports = match custom_path {
        Some(path) => {
            let manifest_path = custom_manifest_path(path);
            vec![InstallStatusReport {
                platform: Platform::from_path(&manifest_path),
                scope: None,
                status: check_installation(&manifest_path, CURRENT_VERSION, &options, &clock),
                manifest_path,
            }]
        }
        None => {
            let scopes = match scope {
                Some(s) => vec![s],
                None => vec![Scope::Global, Scope::Local],
            };
            let mut reports = Vec::new();
            for scope in scopes {
                let base = resolve_base(target, scope)?;
                reports.extend(check_installations(
                    scope,
                    &base,
                    CURRENT_VERSION,
                    &options,
                    &clock,
                ));
            }
            reports
        }
    };

    if json {
        return print_json(&serde_json::json!({
            "current_version": CURRENT_VERSION,
            "installations": reports,
        }));
    }

    let rows: Vec<Vec<String>> = reports
        .iter()
        .filter(|r| custom_path.is_some() || r.status != InstallationStatus::NotInstalled)
        .map(|r| {
            vec![
                r.label(),
                r.scope.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                status_text(&r.status),
            ]
        })
        .collect();

    if rows.is_empty() {
        println!("No installations found.");
        return Ok(());
    }
    print_table(&["INSTALLATION", "SCOPE", "STATUS"], &rows);
    Ok(())
}

fn status_text(status: &InstallationStatus) -> String {
    match status {
        InstallationStatus::NotInstalled => "not installed".into(),
        InstallationStatus::Installed {
            status, repaired, ..
        } => {
            let text = status.describe();
            if *repaired {
                format!("{text} (manifest repaired)")
            } else {
                text
            }
        }
        InstallationStatus::Unreadable { reason } => reason.clone(),
    }
}
