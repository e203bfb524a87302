use crate::error::Result;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting the manifest.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// True if anything (including a dangling symlink) exists at `path`.
pub fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Total size in bytes of the regular files under `path`.
///
/// Symlinks are not followed and unreadable directories are skipped.
pub fn dir_size(path: &Path) -> u64 {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return 0;
    };
    if meta.is_file() {
        return meta.len();
    }
    if !meta.is_dir() {
        return 0;
    }
    let Ok(entries) = fs::read_dir(path) else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| dir_size(&e.path()))
        .sum()
}

/// Recursively copy `src` to `dst`.
///
/// Existing destination files are left alone, modification and access times are
/// carried over, and symlinks are recreated rather than followed.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(src)?;
    let file_type = meta.file_type();

    if file_type.is_symlink() {
        if path_exists(dst) {
            return Ok(());
        }
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        return copy_symlink(src, dst);
    }

    if file_type.is_dir() {
        fs::create_dir_all(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_tree(&entry.path(), &dst.join(entry.file_name()))?;
        }
        return Ok(());
    }

    if path_exists(dst) {
        return Ok(());
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    let times = fs::FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    // `dst` already carries the source mode, which may be read-only.
    fs::File::open(dst)?.set_times(times)?;
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let target = fs::read_link(src)?;
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst).map(|_| ())
}

/// Remove a file, symlink or directory tree. Missing paths are not an error.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Relative paths (with `/` separators) of regular files under `root`, sorted.
///
/// Symlinked files and directories are neither listed nor descended into, so a
/// symlink cycle cannot make the walk unbounded.
pub fn collect_files(root: &Path, keep: impl Fn(&str) -> bool) -> io::Result<Vec<String>> {
    let mut files = Vec::new();
    walk(root, root, &keep, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(
    root: &Path,
    dir: &Path,
    keep: &dyn Fn(&str) -> bool,
    out: &mut Vec<String>,
) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            walk(root, &path, keep, out)?;
        } else if file_type.is_file() {
            let name = entry.file_name();
            if !keep(&name.to_string_lossy()) {
                continue;
            }
            out.push(relative_slash_path(root, &path));
        }
    }
    Ok(())
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/manifest.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn dir_size_sums_nested_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("x/y")).unwrap();
        fs::write(dir.path().join("x/a.txt"), b"12345").unwrap();
        fs::write(dir.path().join("x/y/b.txt"), b"123").unwrap();
        assert_eq!(dir_size(dir.path()), 8);
        assert_eq!(dir_size(&dir.path().join("x/a.txt")), 5);
        assert_eq!(dir_size(&dir.path().join("missing")), 0);
    }

    #[test]
    fn copy_tree_does_not_overwrite_and_keeps_mtime() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("nested/keep.md"), b"new").unwrap();
        fs::write(src.join("fresh.md"), b"fresh").unwrap();
        fs::create_dir_all(dst.join("nested")).unwrap();
        fs::write(dst.join("nested/keep.md"), b"old").unwrap();

        copy_tree(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("nested/keep.md")).unwrap(), "old");
        assert_eq!(fs::read_to_string(dst.join("fresh.md")).unwrap(), "fresh");
        let src_mtime = fs::metadata(src.join("fresh.md")).unwrap().modified().unwrap();
        let dst_mtime = fs::metadata(dst.join("fresh.md")).unwrap().modified().unwrap();
        assert_eq!(src_mtime, dst_mtime);
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_handles_read_only_files() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        for name in ["a.md", "b.md"] {
            let file = src.join(name);
            fs::write(&file, name).unwrap();
            fs::set_permissions(&file, fs::Permissions::from_mode(0o444)).unwrap();
        }
        let dst = dir.path().join("dst");

        copy_tree(&src, &dst).unwrap();

        for name in ["a.md", "b.md"] {
            let copied = fs::metadata(dst.join(name)).unwrap();
            assert_eq!(copied.permissions().mode() & 0o777, 0o444);
            assert_eq!(
                copied.modified().unwrap(),
                fs::metadata(src.join(name)).unwrap().modified().unwrap()
            );
        }
    }

    #[test]
    fn remove_path_handles_files_dirs_and_missing() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("d/e")).unwrap();
        fs::write(dir.path().join("f.txt"), b"x").unwrap();
        remove_path(&dir.path().join("d")).unwrap();
        remove_path(&dir.path().join("f.txt")).unwrap();
        remove_path(&dir.path().join("missing")).unwrap();
        assert!(!dir.path().join("d").exists());
        assert!(!dir.path().join("f.txt").exists());
    }

    #[test]
    fn collect_files_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/z.md"), b"").unwrap();
        fs::write(dir.path().join("a.md"), b"").unwrap();
        fs::write(dir.path().join(".gsd-install-manifest.json"), b"").unwrap();
        let files = collect_files(dir.path(), |n| !n.starts_with(".gsd-")).unwrap();
        assert_eq!(files, vec!["a.md".to_string(), "b/z.md".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn collect_files_survives_symlink_cycle() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop/back")).unwrap();
        fs::write(dir.path().join("loop/file.md"), b"").unwrap();
        let files = collect_files(dir.path(), |_| true).unwrap();
        assert_eq!(files, vec!["loop/file.md".to_string()]);
    }
}
