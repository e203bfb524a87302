use crate::error::{InstallError, Result};
use crate::platform::{Platform, Scope};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SHARED_DIR: &str = "get-shit-done";
pub const BACKUP_DIR: &str = ".gsd-backup";

pub const MANIFEST_FILE: &str = ".gsd-install-manifest.json";
pub const LOCK_FILE: &str = ".gsd-install.lock";
pub const WRITE_PROBE_PREFIX: &str = ".gsd-test-write-";

/// Files whose name starts with this prefix are installer metadata, not content.
pub const METADATA_PREFIX: &str = ".gsd-";

/// First path segments the installer is allowed to write under.
pub const ALLOWED_ROOTS: &[&str] = &[".claude", ".github", ".codex", ".copilot", SHARED_DIR];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn platform_dir(base: &Path, platform: Platform, scope: Scope) -> PathBuf {
    base.join(platform.dir(scope))
}

pub fn install_dir(base: &Path, platform: Platform, scope: Scope) -> PathBuf {
    platform_dir(base, platform, scope).join(SHARED_DIR)
}

pub fn manifest_path(base: &Path, platform: Platform, scope: Scope) -> PathBuf {
    install_dir(base, platform, scope).join(MANIFEST_FILE)
}

pub fn backup_root(target: &Path) -> PathBuf {
    target.join(BACKUP_DIR)
}

pub fn lock_path(target: &Path) -> PathBuf {
    target.join(LOCK_FILE)
}

pub fn is_metadata_file(name: &str) -> bool {
    name.starts_with(METADATA_PREFIX)
}

pub fn home_dir() -> Result<PathBuf> {
    home::home_dir().ok_or(InstallError::HomeNotFound)
}

/// Scope of an install rooted at `dir`: global when it lies under `home`.
///
/// Both sides are canonicalized first so `~/./` and symlinks to home count.
pub fn scope_of(dir: &Path, home: Option<&Path>) -> Scope {
    match home {
        Some(home) if canonical_or_self(dir).starts_with(canonical_or_self(home)) => {
            Scope::Global
        }
        _ => Scope::Local,
    }
}

/// True when both paths name the same directory once canonicalized.
pub fn same_location(a: &Path, b: &Path) -> bool {
    canonical_or_self(a) == canonical_or_self(b)
}

fn canonical_or_self(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Base directory for a scope: the home directory or the given project root.
pub fn scope_base(scope: Scope, project_root: &Path) -> Result<PathBuf> {
    match scope {
        Scope::Global => home_dir(),
        Scope::Local => Ok(project_root.to_path_buf()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            manifest_path(root, Platform::Claude, Scope::Local),
            PathBuf::from("/tmp/proj/.claude/get-shit-done/.gsd-install-manifest.json")
        );
        assert_eq!(
            install_dir(root, Platform::Copilot, Scope::Local),
            PathBuf::from("/tmp/proj/.github/get-shit-done")
        );
        assert_eq!(backup_root(root), PathBuf::from("/tmp/proj/.gsd-backup"));
    }

    #[test]
    fn metadata_prefix_matches_installer_files() {
        assert!(is_metadata_file(MANIFEST_FILE));
        assert!(is_metadata_file(".gsd-test-write-123"));
        assert!(!is_metadata_file("SKILL.md"));
    }

    #[cfg(unix)]
    #[test]
    fn scope_of_sees_through_dots_and_symlinks() {
        let dir = tempfile::TempDir::new().unwrap();
        let home = dir.path().join("home");
        std::fs::create_dir_all(home.join(".claude")).unwrap();
        let alias = dir.path().join("alias");
        std::os::unix::fs::symlink(&home, &alias).unwrap();

        assert_eq!(scope_of(&home.join("."), Some(&home)), Scope::Global);
        assert_eq!(scope_of(&alias, Some(&home)), Scope::Global);
        assert_eq!(scope_of(&alias.join(".claude"), Some(&home)), Scope::Global);
        assert_eq!(scope_of(dir.path(), Some(&home)), Scope::Local);
        assert_eq!(scope_of(&home, None), Scope::Local);

        assert!(same_location(&alias, &home.join(".")));
        assert!(!same_location(&alias.join(".claude"), &home));
    }

    #[test]
    fn local_scope_base_is_project_root() {
        let root = Path::new("/tmp/proj");
        assert_eq!(scope_base(Scope::Local, root).unwrap(), root);
    }
}
