use crate::backup::{RetryPolicy, DEFAULT_BACKUP_HEADROOM};
use crate::error::{InstallError, Result};
use crate::manifest::RepairOptions;
use crate::preflight::validator::DEFAULT_DISK_HEADROOM;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Installer tunables. Every field has a default, so a settings file only
/// needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Multiplier applied to the measured backup size before the space check.
    #[serde(default = "default_backup_headroom")]
    pub backup_headroom: f64,
    /// Multiplier applied to the template payload before the space check.
    #[serde(default = "default_disk_headroom")]
    pub disk_headroom: f64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Let manifest repair record `unknown` when no version declaration exists.
    #[serde(default)]
    pub allow_unknown_version: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_backup_headroom() -> f64 {
    DEFAULT_BACKUP_HEADROOM
}

fn default_disk_headroom() -> f64 {
    DEFAULT_DISK_HEADROOM
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            backup_headroom: default_backup_headroom(),
            disk_headroom: default_disk_headroom(),
            probe_timeout_ms: default_probe_timeout_ms(),
            allow_unknown_version: false,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(&data)?;
        settings.check()?;
        Ok(settings)
    }

    /// Load `path` when given, otherwise fall back to the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    fn check(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(InstallError::InvalidArgs(
                "max_retries must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("backup_headroom", self.backup_headroom),
            ("disk_headroom", self.disk_headroom),
        ] {
            if !value.is_finite() || value < 1.0 {
                return Err(InstallError::InvalidArgs(format!(
                    "{name} must be a number >= 1.0, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn repair_options(&self) -> RepairOptions {
        RepairOptions {
            allow_unknown_version: self.allow_unknown_version,
            ..RepairOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gsd.yaml");
        std::fs::write(&path, "max_retries: 5\nprobe_timeout_ms: 250\n").unwrap();

        let s = Settings::load(&path).unwrap();
        assert_eq!(s.max_retries, 5);
        assert_eq!(s.probe_timeout(), Duration::from_millis(250));
        assert_eq!(s.retry_delay_ms, 1000);
        assert_eq!(s.backup_headroom, DEFAULT_BACKUP_HEADROOM);
        assert!(!s.allow_unknown_version);
    }

    #[test]
    fn empty_file_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gsd.yaml");
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(Settings::load(&path).unwrap(), Settings::default());
    }

    #[test]
    fn rejects_headroom_below_one() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gsd.yaml");
        std::fs::write(&path, "disk_headroom: 0.5\n").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("disk_headroom"));
    }

    #[test]
    fn retry_policy_uses_millis() {
        let s = Settings {
            max_retries: 2,
            retry_delay_ms: 10,
            ..Settings::default()
        };
        let policy = s.retry_policy();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.retry_delay, Duration::from_millis(10));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Settings::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, InstallError::Io(_)));
    }
}
