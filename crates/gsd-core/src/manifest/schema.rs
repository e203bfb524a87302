use crate::platform::{Platform, Scope};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// The caller must supply a value.
    None,
    /// Current UTC time in RFC 3339.
    Now,
    EmptyList,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDefinition {
    pub name: &'static str,
    pub required: bool,
    pub default: FieldDefault,
    pub description: &'static str,
}

pub const FIELD_DEFINITIONS: &[FieldDefinition] = &[
    FieldDefinition {
        name: "gsd_version",
        required: true,
        default: FieldDefault::None,
        description: "Package version that wrote this manifest (e.g. \"2.0.0\")",
    },
    FieldDefinition {
        name: "platform",
        required: true,
        default: FieldDefault::None,
        description: "Platform name (claude/copilot/codex)",
    },
    FieldDefinition {
        name: "scope",
        required: true,
        default: FieldDefault::None,
        description: "Installation scope (global/local)",
    },
    FieldDefinition {
        name: "installed_at",
        required: true,
        default: FieldDefault::Now,
        description: "RFC 3339 timestamp of installation",
    },
    FieldDefinition {
        name: "files",
        required: false,
        default: FieldDefault::EmptyList,
        description: "Installed file paths relative to the install directory",
    },
];

pub const REQUIRED_FIELDS: &[&str] = &["gsd_version", "platform", "scope", "installed_at"];

// ---------------------------------------------------------------------------
// Draft (untrusted, possibly partial)
// ---------------------------------------------------------------------------

/// A manifest as supplied by a caller or read from disk, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestDraft {
    #[serde(rename = "gsd_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
}

impl ManifestDraft {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "gsd_version" => self.version.as_deref(),
            "platform" => self.platform.as_deref(),
            "scope" => self.scope.as_deref(),
            "installed_at" => self.installed_at.as_deref(),
            _ => None,
        }
    }
}

/// Fill omitted fields from the default table. Fields without a default stay empty.
pub fn create_manifest(mut draft: ManifestDraft, now: DateTime<Utc>) -> ManifestDraft {
    for def in FIELD_DEFINITIONS {
        match (def.name, def.default) {
            ("installed_at", FieldDefault::Now) if draft.installed_at.is_none() => {
                draft.installed_at = Some(now.to_rfc3339_opts(SecondsFormat::Millis, true));
            }
            ("files", FieldDefault::EmptyList) if draft.files.is_none() => {
                draft.files = Some(Vec::new());
            }
            _ => {}
        }
    }
    draft
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestValidation {
    pub valid: bool,
    pub missing: Vec<&'static str>,
    pub fields: Vec<&'static str>,
}

/// A required field is missing when it is absent or an empty string.
pub fn validate_manifest(draft: &ManifestDraft) -> ManifestValidation {
    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|name| draft.field(name).map_or(true, str::is_empty))
        .collect();
    ManifestValidation {
        valid: missing.is_empty(),
        missing,
        fields: REQUIRED_FIELDS.to_vec(),
    }
}

// ---------------------------------------------------------------------------
// InstallationManifest
// ---------------------------------------------------------------------------

pub const REPAIR_REASON: &str = "corrupt_or_incomplete";

/// Per-installation record written to `.gsd-install-manifest.json`.
///
/// Field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationManifest {
    #[serde(rename = "gsd_version")]
    pub version: String,
    pub platform: Platform,
    pub scope: Scope,
    pub installed_at: DateTime<Utc>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(rename = "_repaired", default, skip_serializing_if = "std::ops::Not::not")]
    pub repaired: bool,
    #[serde(rename = "_repair_date", default, skip_serializing_if = "Option::is_none")]
    pub repair_date: Option<DateTime<Utc>>,
    #[serde(rename = "_repair_reason", default, skip_serializing_if = "Option::is_none")]
    pub repair_reason: Option<String>,
}

impl InstallationManifest {
    pub fn new(
        version: impl Into<String>,
        platform: Platform,
        scope: Scope,
        installed_at: DateTime<Utc>,
        files: Vec<String>,
    ) -> Self {
        let mut manifest = Self {
            version: version.into(),
            platform,
            scope,
            installed_at,
            files,
            repaired: false,
            repair_date: None,
            repair_reason: None,
        };
        manifest.normalize_files();
        manifest
    }

    pub fn normalize_files(&mut self) {
        self.files.sort();
        self.files.dedup();
    }

    pub fn mark_repaired(&mut self, at: DateTime<Utc>) {
        self.repaired = true;
        self.repair_date = Some(at);
        self.repair_reason = Some(REPAIR_REASON.to_string());
    }
}
