use anyhow::Context;
use gsd_core::paths::scope_base;
use gsd_core::platform::Scope;
use std::path::{Path, PathBuf};

/// Resolve the project root for local installs.
///
/// Priority:
/// 1. `--target` flag / `GSD_TARGET` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.git/`
/// 3. Fall back to `cwd`
pub fn resolve_project_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut dir = cwd.clone();
    loop {
        if dir.join(".git").is_dir() {
            return dir;
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => break,
        }
    }
    cwd
}

/// Base directory holding the platform directories for `scope`.
///
/// An explicit target always wins; otherwise global scope is the home directory.
pub fn resolve_base(explicit: Option<&Path>, scope: Scope) -> anyhow::Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    scope_base(scope, &resolve_project_root(None))
        .with_context(|| format!("resolve {scope} install base"))
}
