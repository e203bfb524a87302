use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Platform / Scope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Claude,
    Copilot,
    Codex,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Claude, Platform::Copilot, Platform::Codex];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Claude => "claude",
            Platform::Copilot => "copilot",
            Platform::Codex => "codex",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Claude => "Claude Code",
            Platform::Copilot => "GitHub Copilot CLI",
            Platform::Codex => "Codex CLI",
        }
    }

    /// Name of the CLI binary looked up on `PATH`.
    pub fn cli_binary(&self) -> &'static str {
        self.as_str()
    }

    /// Platform directory for a scope. Local Copilot installs live under `.github`.
    pub fn dir(&self, scope: Scope) -> &'static str {
        match (self, scope) {
            (Platform::Claude, _) => ".claude",
            (Platform::Copilot, Scope::Global) => ".copilot",
            (Platform::Copilot, Scope::Local) => ".github",
            (Platform::Codex, _) => ".codex",
        }
    }

    /// Map a directory segment back to its platform.
    pub fn from_dir_name(segment: &str) -> Option<Platform> {
        match segment {
            ".claude" => Some(Platform::Claude),
            ".copilot" | ".github" => Some(Platform::Copilot),
            ".codex" => Some(Platform::Codex),
            _ => None,
        }
    }

    /// First path segment that names a platform directory, if any.
    pub fn from_path(path: &Path) -> Option<Platform> {
        path.components()
            .filter_map(|c| c.as_os_str().to_str())
            .find_map(Platform::from_dir_name)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "claude" => Ok(Platform::Claude),
            "copilot" => Ok(Platform::Copilot),
            "codex" => Ok(Platform::Codex),
            other => Err(format!(
                "unknown platform '{other}'; supported platforms: claude, copilot, codex"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Local,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Local => "local",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(Scope::Global),
            "local" => Ok(Scope::Local),
            other => Err(format!("unknown scope '{other}'; expected global or local")),
        }
    }
}

// ---------------------------------------------------------------------------
// Legacy (v1.x) layouts
// ---------------------------------------------------------------------------

/// Directory entries matched by name inside one legacy directory.
#[derive(Debug, Clone, Copy)]
pub struct LegacyGlob {
    pub dir: &'static str,
    pub prefix: &'static str,
    pub suffix: &'static str,
    pub exclude_suffix: Option<&'static str>,
}

impl LegacyGlob {
    pub fn matches(&self, name: &str) -> bool {
        name.starts_with(self.prefix)
            && name.ends_with(self.suffix)
            && !self.exclude_suffix.is_some_and(|s| name.ends_with(s))
    }
}

/// Knowledge about one platform's pre-2.0 on-disk layout.
pub trait PlatformLayout: Send + Sync {
    fn platform(&self) -> Platform;

    /// Relative path of the legacy `VERSION` file.
    fn legacy_version_file(&self) -> &'static str;

    /// True when every marker of the incompatible layout is present under `target`.
    fn has_legacy_markers(&self, target: &Path) -> bool;

    /// Fixed relative paths that belong to the legacy layout.
    fn legacy_static_paths(&self) -> &'static [&'static str];

    /// Name-matched legacy files inside known directories.
    fn legacy_globs(&self) -> &'static [LegacyGlob];
}

pub struct ClaudeLayout;
pub struct CopilotLayout;
pub struct CodexLayout;

impl PlatformLayout for ClaudeLayout {
    fn platform(&self) -> Platform {
        Platform::Claude
    }

    fn legacy_version_file(&self) -> &'static str {
        ".claude/get-shit-done/VERSION"
    }

    fn has_legacy_markers(&self, target: &Path) -> bool {
        target.join(self.legacy_version_file()).exists()
            && (target.join(".claude/commands/gsd").exists()
                || target.join(".claude/hooks/gsd-check-update.js").exists())
    }

    fn legacy_static_paths(&self) -> &'static [&'static str] {
        &[
            ".claude/commands/gsd",
            ".claude/hooks/gsd-check-update.js",
            ".claude/hooks/pre-commit-docs",
            ".claude/hooks/statusline.js",
            ".claude/get-shit-done",
            ".claude/settings.json",
        ]
    }

    fn legacy_globs(&self) -> &'static [LegacyGlob] {
        &[LegacyGlob {
            dir: ".claude/agents",
            prefix: "gsd-",
            suffix: ".md",
            exclude_suffix: Some(".agent.md"),
        }]
    }
}

impl PlatformLayout for CopilotLayout {
    fn platform(&self) -> Platform {
        Platform::Copilot
    }

    fn legacy_version_file(&self) -> &'static str {
        ".github/skills/get-shit-done/VERSION"
    }

    fn has_legacy_markers(&self, target: &Path) -> bool {
        target.join(".github/skills/get-shit-done/SKILL.md").exists()
            && target.join(self.legacy_version_file()).exists()
    }

    fn legacy_static_paths(&self) -> &'static [&'static str] {
        &[
            ".github/skills/get-shit-done",
            ".github/copilot-instructions.md",
        ]
    }

    fn legacy_globs(&self) -> &'static [LegacyGlob] {
        &[
            LegacyGlob {
                dir: ".github/agents",
                prefix: "gsd-",
                suffix: ".agent.md",
                exclude_suffix: None,
            },
            LegacyGlob {
                dir: ".github/ISSUE_TEMPLATE",
                prefix: "gsd-",
                suffix: ".yml",
                exclude_suffix: None,
            },
        ]
    }
}

impl PlatformLayout for CodexLayout {
    fn platform(&self) -> Platform {
        Platform::Codex
    }

    fn legacy_version_file(&self) -> &'static str {
        ".codex/skills/get-shit-done/VERSION"
    }

    fn has_legacy_markers(&self, target: &Path) -> bool {
        target.join(".codex/skills/get-shit-done/SKILL.md").exists()
            && target.join(self.legacy_version_file()).exists()
    }

    fn legacy_static_paths(&self) -> &'static [&'static str] {
        &[".codex/skills/get-shit-done"]
    }

    fn legacy_globs(&self) -> &'static [LegacyGlob] {
        &[LegacyGlob {
            dir: ".codex/agents",
            prefix: "gsd-",
            suffix: ".agent.md",
            exclude_suffix: None,
        }]
    }
}

fn layout_for(platform: Platform) -> Box<dyn PlatformLayout> {
    match platform {
        Platform::Claude => Box::new(ClaudeLayout),
        Platform::Copilot => Box::new(CopilotLayout),
        Platform::Codex => Box::new(CodexLayout),
    }
}

// ---------------------------------------------------------------------------
// PlatformRegistry
// ---------------------------------------------------------------------------

/// Lookup table of platform layouts, built once and passed to whoever needs it.
pub struct PlatformRegistry {
    layouts: BTreeMap<Platform, Box<dyn PlatformLayout>>,
}

impl PlatformRegistry {
    pub fn builtin() -> Self {
        Self::with_platforms(&Platform::ALL)
    }

    /// Registry restricted to a subset of platforms.
    pub fn with_platforms(platforms: &[Platform]) -> Self {
        let layouts = platforms.iter().map(|&p| (p, layout_for(p))).collect();
        Self { layouts }
    }

    pub fn get(&self, platform: Platform) -> Option<&dyn PlatformLayout> {
        self.layouts.get(&platform).map(|l| l.as_ref())
    }

    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.layouts.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn PlatformLayout> {
        self.layouts.values().map(|l| l.as_ref())
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
