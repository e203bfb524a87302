use crate::error::{InstallError, Result};
use crate::paths::lock_path;
use chrono::Utc;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use sysinfo::{Pid, System};

/// Advisory marker that one installer run owns a target directory.
///
/// Other runs that honour the marker refuse to start; nothing stops a process
/// that ignores it. The file is removed when the guard is dropped. A marker
/// left by a process that no longer exists is reclaimed.
#[derive(Debug)]
pub struct InstallLock {
    path: PathBuf,
}

impl InstallLock {
    pub fn acquire(target_dir: &Path) -> Result<Self> {
        fs::create_dir_all(target_dir)?;
        let path = lock_path(target_dir);

        let mut reclaimed = false;
        let mut file = loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => break file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let holder = fs::read_to_string(&path)
                        .map(|s| s.trim().to_string())
                        .unwrap_or_default();
                    if !reclaimed && holder_pid(&holder).is_some_and(|pid| !process_alive(pid)) {
                        tracing::warn!(path = %path.display(), holder = %holder, "reclaiming stale install lock");
                        fs::remove_file(&path)?;
                        reclaimed = true;
                        continue;
                    }
                    return Err(InstallError::Locked {
                        path,
                        holder: if holder.is_empty() {
                            "unknown holder".to_string()
                        } else {
                            holder
                        },
                    });
                }
                Err(e) => return Err(e.into()),
            }
        };

        let holder = format!("pid={} since={}", std::process::id(), Utc::now().to_rfc3339());
        file.write_all(format!("{holder}\n").as_bytes())?;
        file.flush()?;
        tracing::debug!(path = %path.display(), "install lock acquired");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Pid recorded by [`InstallLock::acquire`], if the marker carries one.
fn holder_pid(holder: &str) -> Option<u32> {
    holder
        .split_whitespace()
        .find_map(|field| field.strip_prefix("pid="))
        .and_then(|pid| pid.parse().ok())
}

fn process_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_process(pid);
    system.process(pid).is_some()
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "could not release install lock");
        }
    }
}
