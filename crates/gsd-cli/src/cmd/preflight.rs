use crate::output::print_json;
use crate::root::resolve_base;
use gsd_core::effects::Effects;
use gsd_core::error::format_mb;
use gsd_core::platform::{Platform, Scope};
use gsd_core::preflight::{validate_before_install, ContentSelection, PreflightConfig};
use gsd_core::settings::Settings;
use std::path::{Path, PathBuf};

pub struct PreflightArgs {
    pub platforms: Vec<Platform>,
    pub scope: Scope,
    pub content: ContentSelection,
    pub templates: PathBuf,
    pub paths: Vec<String>,
}

pub fn run(
    target: Option<&Path>,
    settings: &Settings,
    args: PreflightArgs,
    json: bool,
) -> anyhow::Result<()> {
    let base = resolve_base(target, args.scope)?;
    let config = PreflightConfig {
        content: args.content,
        planned_paths: args.paths,
        headroom: settings.disk_headroom,
        ..PreflightConfig::new(base, args.templates)
    };

    let outcome = validate_before_install(&args.platforms, args.scope, &config, &Effects::system())?;

    if json {
        return print_json(&outcome);
    }

    for warning in &outcome.warnings {
        println!("warning: {warning}");
    }
    match outcome.available_bytes {
        Some(available) => println!(
            "Disk: {} required, {} available",
            format_mb(outcome.required_bytes),
            format_mb(available)
        ),
        None => println!("Disk: {} required", format_mb(outcome.required_bytes)),
    }
    if outcome.paths_checked > 0 {
        println!("Paths: {} checked", outcome.paths_checked);
    }
    println!("Preflight passed for {}", join_names(&args.platforms));
    Ok(())
}

fn join_names(platforms: &[Platform]) -> String {
    platforms
        .iter()
        .map(|p| p.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}
