use crate::platform::{LegacyGlob, Platform, PlatformLayout, PlatformRegistry, Scope};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OldVersionDetection {
    pub is_old: bool,
    pub version: Option<String>,
    /// Existing legacy paths, relative to the target directory.
    pub paths: Vec<String>,
}

impl OldVersionDetection {
    fn not_old() -> Self {
        Self {
            is_old: false,
            version: None,
            paths: Vec::new(),
        }
    }
}

/// A legacy installation found in a target directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyInstall {
    pub platform: Platform,
    pub scope: Scope,
    pub version: String,
    pub paths: Vec<String>,
}

/// Look for a pre-2.0 installation of `platform` under `target_dir`.
///
/// Anything that goes wrong while looking counts as "not old" so detection never
/// blocks an install.
pub fn detect_old_version(
    registry: &PlatformRegistry,
    platform: Platform,
    target_dir: &Path,
) -> OldVersionDetection {
    let Some(layout) = registry.get(platform) else {
        return OldVersionDetection::not_old();
    };
    if !layout.has_legacy_markers(target_dir) {
        return OldVersionDetection::not_old();
    }
    let version = match fs::read_to_string(target_dir.join(layout.legacy_version_file())) {
        Ok(v) => v.trim().to_string(),
        Err(e) => {
            tracing::debug!(platform = %platform, error = %e, "legacy VERSION unreadable");
            return OldVersionDetection::not_old();
        }
    };
    OldVersionDetection {
        is_old: true,
        version: Some(version),
        paths: legacy_paths(layout, target_dir),
    }
}

/// Global only when the target is the home directory itself.
fn target_scope(target_dir: &Path, home: Option<&Path>) -> Scope {
    match home {
        Some(home) if crate::paths::same_location(home, target_dir) => Scope::Global,
        _ => Scope::Local,
    }
}

/// Every legacy installation in `target_dir`, in registry order.
pub fn detect_all_old_versions(registry: &PlatformRegistry, target_dir: &Path) -> Vec<LegacyInstall> {
    let home = crate::paths::home_dir().ok();
    let scope = target_scope(target_dir, home.as_deref());
    registry
        .platforms()
        .filter_map(|platform| {
            let detection = detect_old_version(registry, platform, target_dir);
            if !detection.is_old {
                return None;
            }
            Some(LegacyInstall {
                platform,
                scope,
                version: detection.version.unwrap_or_default(),
                paths: detection.paths,
            })
        })
        .collect()
}

fn legacy_paths(layout: &dyn PlatformLayout, target_dir: &Path) -> Vec<String> {
    let mut paths: Vec<String> = layout
        .legacy_static_paths()
        .iter()
        .filter(|p| crate::io::path_exists(&target_dir.join(p)))
        .map(|p| p.to_string())
        .collect();
    for glob in layout.legacy_globs() {
        paths.extend(glob_matches(glob, target_dir));
    }
    paths
}

fn glob_matches(glob: &LegacyGlob, target_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(target_dir.join(glob.dir)) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| glob.matches(name))
        .collect();
    names.sort();
    names
        .into_iter()
        .map(|name| format!("{}/{name}", glob.dir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, body: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, body).unwrap();
    }

    #[test]
    fn claude_needs_version_and_commands_or_hook() {
        let dir = TempDir::new().unwrap();
        let registry = PlatformRegistry::builtin();
        touch(dir.path(), ".claude/get-shit-done/VERSION", "1.8.0\n");
        assert!(!detect_old_version(&registry, Platform::Claude, dir.path()).is_old);

        touch(dir.path(), ".claude/hooks/gsd-check-update.js", "");
        touch(dir.path(), ".claude/agents/gsd-planner.md", "");
        touch(dir.path(), ".claude/agents/gsd-planner.agent.md", "");
        touch(dir.path(), ".claude/agents/notes.md", "");
        let d = detect_old_version(&registry, Platform::Claude, dir.path());
        assert!(d.is_old);
        assert_eq!(d.version.as_deref(), Some("1.8.0"));
        assert_eq!(
            d.paths,
            vec![
                ".claude/hooks/gsd-check-update.js",
                ".claude/get-shit-done",
                ".claude/agents/gsd-planner.md",
            ]
        );
    }

    #[test]
    fn copilot_collects_agents_and_issue_templates() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".github/skills/get-shit-done/SKILL.md", "");
        touch(dir.path(), ".github/skills/get-shit-done/VERSION", "1.9.1");
        touch(dir.path(), ".github/agents/gsd-b.agent.md", "");
        touch(dir.path(), ".github/agents/gsd-a.agent.md", "");
        touch(dir.path(), ".github/ISSUE_TEMPLATE/gsd-bug.yml", "");
        touch(dir.path(), ".github/ISSUE_TEMPLATE/bug.yml", "");
        let d = detect_old_version(&PlatformRegistry::builtin(), Platform::Copilot, dir.path());
        assert_eq!(
            d.paths,
            vec![
                ".github/skills/get-shit-done",
                ".github/agents/gsd-a.agent.md",
                ".github/agents/gsd-b.agent.md",
                ".github/ISSUE_TEMPLATE/gsd-bug.yml",
            ]
        );
    }

    #[test]
    fn platform_missing_from_registry_is_not_old() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".codex/skills/get-shit-done/SKILL.md", "");
        touch(dir.path(), ".codex/skills/get-shit-done/VERSION", "1.0.0");
        let only_claude = PlatformRegistry::with_platforms(&[Platform::Claude]);
        assert!(!detect_old_version(&only_claude, Platform::Codex, dir.path()).is_old);
        assert!(detect_old_version(&PlatformRegistry::builtin(), Platform::Codex, dir.path()).is_old);
    }

    #[test]
    fn detect_all_reports_only_old_platforms() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".codex/skills/get-shit-done/SKILL.md", "");
        touch(dir.path(), ".codex/skills/get-shit-done/VERSION", "1.2.0");
        touch(dir.path(), ".github/skills/get-shit-done/SKILL.md", "");
        let found = detect_all_old_versions(&PlatformRegistry::builtin(), dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].platform, Platform::Codex);
        assert_eq!(found[0].scope, Scope::Local);
        assert_eq!(found[0].version, "1.2.0");
    }

    #[cfg(unix)]
    #[test]
    fn home_reached_through_a_symlink_is_global() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        fs::create_dir_all(home.join("project")).unwrap();
        let alias = dir.path().join("home-alias");
        std::os::unix::fs::symlink(&home, &alias).unwrap();

        assert_eq!(target_scope(&alias, Some(&home)), Scope::Global);
        assert_eq!(target_scope(&home.join("."), Some(&home)), Scope::Global);
        assert_eq!(target_scope(&home.join("project"), Some(&home)), Scope::Local);
        assert_eq!(target_scope(&home, None), Scope::Local);
    }
}
