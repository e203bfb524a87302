use crate::output::{print_json, print_table};
use crate::root::resolve_base;
use gsd_core::migration::detect_all_old_versions;
use gsd_core::paths::home_dir;
use gsd_core::platform::{PlatformRegistry, Scope};
use gsd_core::probe::{detect_binaries, detected_message};
use gsd_core::settings::Settings;
use std::path::Path;

pub fn run(target: Option<&Path>, settings: &Settings, scope: Scope, json: bool) -> anyhow::Result<()> {
    let base = resolve_base(target, scope)?;
    let legacy = detect_all_old_versions(&PlatformRegistry::builtin(), &base);
    let home = home_dir().ok();
    let clis = detect_binaries(settings.probe_timeout(), home.as_deref());

    if json {
        return print_json(&serde_json::json!({
            "target": base,
            "legacy": legacy,
            "clis": clis,
        }));
    }

    if legacy.is_empty() {
        println!("No legacy installations in {}", base.display());
    } else {
        let rows: Vec<Vec<String>> = legacy
            .iter()
            .map(|l| {
                vec![
                    l.platform.display_name().to_string(),
                    l.version.clone(),
                    l.paths.len().to_string(),
                ]
            })
            .collect();
        print_table(&["LEGACY INSTALL", "VERSION", "PATHS"], &rows);
    }
    println!("{}", detected_message(&clis));
    Ok(())
}
