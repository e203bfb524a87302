use crate::output::print_json;
use crate::root::resolve_base;
use anyhow::Context;
use clap::{Args, Subcommand};
use gsd_core::effects::SystemClock;
use gsd_core::lock::InstallLock;
use gsd_core::manifest::{
    generate_manifest, read_manifest, repair_manifest, write_manifest, InstallationManifest,
    ManifestReadResult,
};
use gsd_core::paths::{install_dir, manifest_path};
use gsd_core::platform::{Platform, Scope};
use gsd_core::settings::Settings;
use gsd_core::status::custom_manifest_path;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct Location {
    /// Platform whose manifest to use
    #[arg(long, required_unless_present = "path")]
    platform: Option<Platform>,

    #[arg(long, default_value = "local")]
    scope: Scope,

    /// Manifest file or installation directory instead of platform/scope
    #[arg(long, conflicts_with = "platform")]
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum ManifestSubcommand {
    /// Read a manifest without modifying it
    Show {
        #[command(flatten)]
        location: Location,
    },

    /// Rebuild a manifest from the installation directory
    Repair {
        #[command(flatten)]
        location: Location,

        /// Record version "unknown" when no version declaration is found
        #[arg(long)]
        allow_unknown: bool,
    },

    /// Record the files currently installed for a platform
    #[command(disable_version_flag = true)]
    Write {
        #[arg(long)]
        platform: Platform,

        #[arg(long, default_value = "local")]
        scope: Scope,

        /// Installed version (default: this installer's version)
        #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
        version: String,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(
    target: Option<&Path>,
    settings: &Settings,
    subcmd: ManifestSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        ManifestSubcommand::Show { location } => show(target, &location, json),
        ManifestSubcommand::Repair {
            location,
            allow_unknown,
        } => repair(target, settings, &location, allow_unknown, json),
        ManifestSubcommand::Write {
            platform,
            scope,
            version,
        } => write(target, platform, scope, &version, json),
    }
}

fn locate(target: Option<&Path>, location: &Location) -> anyhow::Result<PathBuf> {
    if let Some(path) = &location.path {
        return Ok(custom_manifest_path(path));
    }
    let platform = location
        .platform
        .context("either --platform or --path is required")?;
    let base = resolve_base(target, location.scope)?;
    Ok(manifest_path(&base, platform, location.scope))
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(target: Option<&Path>, location: &Location, json: bool) -> anyhow::Result<()> {
    let path = locate(target, location)?;
    let result = read_manifest(&path);

    if json {
        print_json(&serde_json::json!({
            "path": path,
            "read": result,
        }))?;
        if matches!(result, ManifestReadResult::Success { .. }) {
            return Ok(());
        }
    }

    let manifest = result.into_result(&path)?;
    if !json {
        print_manifest(&path, &manifest);
    }
    Ok(())
}

fn print_manifest(path: &Path, m: &InstallationManifest) {
    println!("Manifest:  {}", path.display());
    println!("Platform:  {} ({})", m.platform.display_name(), m.scope);
    println!("Version:   {}", m.version);
    println!("Installed: {}", m.installed_at.to_rfc3339());
    println!("Files:     {}", m.files.len());
    if m.repaired {
        let at = m
            .repair_date
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "unknown date".into());
        println!("Repaired:  {at}");
    }
}

// ---------------------------------------------------------------------------
// repair
// ---------------------------------------------------------------------------

fn repair(
    target: Option<&Path>,
    settings: &Settings,
    location: &Location,
    allow_unknown: bool,
    json: bool,
) -> anyhow::Result<()> {
    let path = locate(target, location)?;
    let lock_root = lock_root_for(&path);
    let _lock = InstallLock::acquire(&lock_root)
        .with_context(|| format!("cannot repair {}", path.display()))?;

    let mut options = settings.repair_options();
    options.allow_unknown_version |= allow_unknown;
    let outcome = repair_manifest(&path, &options, &SystemClock)?;

    if json {
        return print_json(&outcome);
    }
    print_manifest(&path, &outcome.manifest);
    match &outcome.version_source {
        Some(source) => println!("Version from: {}", source.path.display()),
        None => println!("Version from: no declaration found, recorded as unknown"),
    }
    Ok(())
}

/// Directory holding the platform directory of a manifest, or its parent.
fn lock_root_for(manifest_path: &Path) -> PathBuf {
    manifest_path
        .ancestors()
        .skip(1)
        .find(|dir| {
            dir.file_name()
                .and_then(|n| n.to_str())
                .and_then(Platform::from_dir_name)
                .is_some()
        })
        .and_then(Path::parent)
        .or_else(|| manifest_path.parent())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf()
}

// ---------------------------------------------------------------------------
// write
// ---------------------------------------------------------------------------

fn write(
    target: Option<&Path>,
    platform: Platform,
    scope: Scope,
    version: &str,
    json: bool,
) -> anyhow::Result<()> {
    let base = resolve_base(target, scope)?;
    let dir = install_dir(&base, platform, scope);
    anyhow::ensure!(
        dir.is_dir(),
        "no {} installation at {}",
        platform.display_name(),
        dir.display()
    );

    let _lock = InstallLock::acquire(&base)
        .with_context(|| format!("cannot write manifest under {}", base.display()))?;
    let manifest = generate_manifest(&dir, version, platform, scope, &SystemClock)?;
    let path = manifest_path(&base, platform, scope);
    write_manifest(&path, &manifest)?;

    if json {
        return print_json(&manifest);
    }
    println!(
        "Wrote {} ({} file(s), v{})",
        path.display(),
        manifest.files.len(),
        manifest.version
    );
    Ok(())
}
