use super::schema::InstallationManifest;
use crate::effects::Clock;
use crate::error::Result;
use crate::io::{atomic_write, collect_files};
use crate::paths::is_metadata_file;
use crate::platform::{Platform, Scope};
use std::path::Path;

/// Serialize and atomically replace the manifest at `path`.
pub fn write_manifest(path: &Path, manifest: &InstallationManifest) -> Result<()> {
    let mut manifest = manifest.clone();
    manifest.normalize_files();
    let mut data = serde_json::to_string_pretty(&manifest)?;
    data.push('\n');
    atomic_write(path, data.as_bytes())?;
    tracing::debug!(path = %path.display(), files = manifest.files.len(), "manifest written");
    Ok(())
}

/// Build a fresh manifest from what is on disk under `install_dir`.
///
/// Installer metadata files are not listed.
pub fn generate_manifest(
    install_dir: &Path,
    version: &str,
    platform: Platform,
    scope: Scope,
    clock: &dyn Clock,
) -> Result<InstallationManifest> {
    let files = collect_files(install_dir, |name| !is_metadata_file(name))?;
    Ok(InstallationManifest::new(
        version,
        platform,
        scope,
        clock.now_utc(),
        files,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::FixedClock;
    use crate::manifest::reader::read_manifest;
    use chrono::{Local, TimeZone};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn generate_then_write_then_read() {
        let dir = TempDir::new().unwrap();
        let install = dir.path().join(".claude/get-shit-done");
        fs::create_dir_all(install.join("workflows")).unwrap();
        fs::write(install.join("workflows/plan.md"), "x").unwrap();
        fs::write(install.join("README.md"), "x").unwrap();
        fs::write(install.join(".gsd-install.lock"), "x").unwrap();

        let clock = FixedClock(Local.with_ymd_and_hms(2026, 2, 3, 4, 5, 6).unwrap());
        let manifest =
            generate_manifest(&install, "2.1.0", Platform::Claude, Scope::Local, &clock).unwrap();
        assert_eq!(manifest.files, vec!["README.md", "workflows/plan.md"]);

        let path = install.join(".gsd-install-manifest.json");
        write_manifest(&path, &manifest).unwrap();
        let read = read_manifest(&path).into_result(&path).unwrap();
        assert_eq!(read, manifest);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"gsd_version\": \"2.1.0\""));
    }

    #[test]
    fn write_sorts_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.json");
        let mut manifest = InstallationManifest::new(
            "2.0.0",
            Platform::Codex,
            Scope::Global,
            chrono::Utc::now(),
            vec![],
        );
        manifest.files = vec!["z".into(), "a".into()];
        write_manifest(&path, &manifest).unwrap();
        let read = read_manifest(&path).into_result(&path).unwrap();
        assert_eq!(read.files, vec!["a", "z"]);
    }
}
