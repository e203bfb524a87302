//! Side-effect seams: wall clock, free-space probe and the confirmation prompt.
//!
//! Every subsystem that needs one of these takes an [`Effects`] so tests can pin
//! the clock, fake a nearly-full disk, or answer prompts without a terminal.

use chrono::{DateTime, Local, Utc};
use std::io;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

pub trait Clock: Send + Sync {
    fn now_local(&self) -> DateTime<Local>;

    fn now_utc(&self) -> DateTime<Utc> {
        self.now_local().with_timezone(&Utc)
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock frozen at one instant.
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now_local(&self) -> DateTime<Local> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Disk space
// ---------------------------------------------------------------------------

pub trait DiskSpaceProbe: Send + Sync {
    /// Bytes available to the current user on the filesystem holding `path`.
    fn available_bytes(&self, path: &Path) -> io::Result<u64>;
}

pub struct SystemDiskSpace;

impl DiskSpaceProbe for SystemDiskSpace {
    fn available_bytes(&self, path: &Path) -> io::Result<u64> {
        let probe = nearest_existing_ancestor(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no existing ancestor"))?;
        let probe = probe.canonicalize()?;

        let disks = sysinfo::Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter(|d| probe.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .map(|d| d.available_space())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no mounted filesystem contains {}", probe.display()),
                )
            })
    }
}

/// Reports the same free-space figure for every path.
pub struct FixedDiskSpace(pub u64);

impl DiskSpaceProbe for FixedDiskSpace {
    fn available_bytes(&self, _path: &Path) -> io::Result<u64> {
        Ok(self.0)
    }
}

/// `path` itself if it exists, otherwise its closest existing parent.
pub fn nearest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors().find(|p| p.exists()).map(Path::to_path_buf)
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

pub trait Prompter: Send + Sync {
    /// Ask a yes/no question. A cancelled prompt counts as "no".
    fn confirm(&self, message: &str, default: bool) -> io::Result<bool>;
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, message: &str, default: bool) -> io::Result<bool> {
        let answer = dialoguer::Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact_opt()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(answer.unwrap_or(false))
    }
}

/// Answers every prompt the same way.
pub struct AutoConfirm(pub bool);

impl Prompter for AutoConfirm {
    fn confirm(&self, _message: &str, _default: bool) -> io::Result<bool> {
        Ok(self.0)
    }
}

// ---------------------------------------------------------------------------
// Effects bundle
// ---------------------------------------------------------------------------

pub struct Effects {
    pub clock: Box<dyn Clock>,
    pub disk: Box<dyn DiskSpaceProbe>,
    pub prompter: Box<dyn Prompter>,
}

impl Effects {
    pub fn system() -> Self {
        Self {
            clock: Box::new(SystemClock),
            disk: Box::new(SystemDiskSpace),
            prompter: Box::new(TerminalPrompter),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_disk(mut self, disk: impl DiskSpaceProbe + 'static) -> Self {
        self.disk = Box::new(disk);
        self
    }

    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Box::new(prompter);
        self
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn nearest_ancestor_walks_up_to_existing_dir() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("a/b/c");
        assert_eq!(nearest_existing_ancestor(&missing).unwrap(), dir.path());
        assert_eq!(nearest_existing_ancestor(dir.path()).unwrap(), dir.path());
    }

    #[test]
    fn fixed_clock_is_stable() {
        let at = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let clock = FixedClock(at);
        assert_eq!(clock.now_local(), at);
        assert_eq!(clock.now_utc(), at.with_timezone(&Utc));
    }

    #[test]
    fn fixed_disk_space_ignores_path() {
        let probe = FixedDiskSpace(42);
        assert_eq!(probe.available_bytes(Path::new("/nowhere")).unwrap(), 42);
    }

    #[test]
    fn auto_confirm_answers_without_terminal() {
        assert!(AutoConfirm(true).confirm("go?", false).unwrap());
        assert!(!AutoConfirm(false).confirm("go?", true).unwrap());
    }
}
