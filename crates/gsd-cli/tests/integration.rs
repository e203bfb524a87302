#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

struct Env {
    target: TempDir,
    home: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            target: TempDir::new().unwrap(),
            home: TempDir::new().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.target.path()
    }

    fn gsd(&self) -> Command {
        let mut cmd = Command::cargo_bin("gsd-install").unwrap();
        cmd.current_dir(self.path())
            .env("GSD_TARGET", self.path())
            .env("HOME", self.home.path())
            .env_remove("GSD_CONFIG")
            .env_remove("RUST_LOG");
        cmd
    }
}

fn touch(root: &Path, rel: &str, body: &str) {
    let p = root.join(rel);
    std::fs::create_dir_all(p.parent().unwrap()).unwrap();
    std::fs::write(p, body).unwrap();
}

fn legacy_claude(root: &Path) {
    touch(root, ".claude/get-shit-done/VERSION", "1.9.0\n");
    touch(root, ".claude/commands/gsd/plan-phase.md", "plan");
    touch(root, ".claude/agents/gsd-planner.md", "agent");
    touch(root, ".claude/agents/custom.md", "keep me");
}

fn templates(root: &Path) {
    for dir in ["skills", "agents", "workflows", "shared"] {
        touch(root, &format!("templates/{dir}/README.md"), "template");
    }
}

// ---------------------------------------------------------------------------
// gsd-install migrate
// ---------------------------------------------------------------------------

#[test]
fn migrate_without_legacy_files_is_a_noop() {
    let env = Env::new();
    env.gsd()
        .args(["migrate", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No legacy installations found"));
    assert!(!env.path().join(".gsd-backup").exists());
}

#[test]
fn migrate_backs_up_then_removes_legacy_files() {
    let env = Env::new();
    legacy_claude(env.path());

    env.gsd()
        .args(["migrate", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found Claude Code v1.9.0"))
        .stdout(predicate::str::contains("Migrated 1 installation(s)."));

    assert!(!env.path().join(".claude/commands/gsd").exists());
    assert!(!env.path().join(".claude/agents/gsd-planner.md").exists());
    assert!(env.path().join(".claude/agents/custom.md").exists());
    assert!(!env.path().join(".gsd-install.lock").exists());

    let backups: Vec<_> = std::fs::read_dir(env.path().join(".gsd-backup"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(backups.len(), 1);
    let backup = &backups[0];
    assert_eq!(
        std::fs::read_to_string(backup.join(".claude/commands/gsd/plan-phase.md")).unwrap(),
        "plan"
    );
    assert!(backup.join(".claude/get-shit-done/VERSION").is_file());
}

#[cfg(unix)]
#[test]
fn migrate_handles_read_only_legacy_files() {
    use std::os::unix::fs::PermissionsExt;

    let env = Env::new();
    legacy_claude(env.path());
    for name in ["execute.md", "verify.md"] {
        let file = env.path().join(".claude/commands/gsd").join(name);
        std::fs::write(&file, name).unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o444)).unwrap();
    }

    env.gsd()
        .args(["migrate", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Migrated 1 installation(s)."));
    assert!(!env.path().join(".claude/commands/gsd").exists());
}

#[test]
fn migrate_json_reports_summary() {
    let env = Env::new();
    legacy_claude(env.path());

    let out = env
        .gsd()
        .args(["migrate", "--yes", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let summary: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(summary["success"], true);
    assert_eq!(summary["migrations_performed"], 1);
    assert_eq!(summary["detected"][0]["platform"], "claude");
    assert_eq!(summary["detected"][0]["version"], "1.9.0");
}

#[test]
fn migrate_without_terminal_or_yes_changes_nothing() {
    let env = Env::new();
    legacy_claude(env.path());

    env.gsd()
        .arg("migrate")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Migration stopped after 0 of 1"))
        .stdout(predicate::str::contains("untouched"));

    assert!(env.path().join(".claude/commands/gsd/plan-phase.md").exists());
    assert!(!env.path().join(".gsd-backup").exists());
}

#[test]
fn migrate_refuses_locked_target() {
    let env = Env::new();
    legacy_claude(env.path());
    std::fs::write(env.path().join(".gsd-install.lock"), "pid=1 since=earlier\n").unwrap();

    env.gsd()
        .args(["migrate", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("locked by another installer run"))
        .stderr(predicate::str::contains("pid=1"));

    assert!(env.path().join(".claude/commands/gsd").exists());
}

// ---------------------------------------------------------------------------
// gsd-install preflight
// ---------------------------------------------------------------------------

#[test]
fn preflight_passes_with_templates() {
    let env = Env::new();
    templates(env.path());

    env.gsd()
        .args(["preflight", "--platform", "claude", "codex"])
        .args(["--path", ".claude/get-shit-done/README.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Paths: 1 checked"))
        .stdout(predicate::str::contains(
            "Preflight passed for Claude Code, Codex CLI",
        ));
}

#[test]
fn preflight_reports_every_failure_together() {
    let env = Env::new();
    touch(env.path(), "templates/skills/README.md", "x");

    env.gsd()
        .args(["preflight", "--platform", "claude"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Preflight validation failed"))
        .stderr(predicate::str::contains("Templates:"))
        .stderr(predicate::str::contains("templates/agents/"))
        .stderr(predicate::str::contains("templates/shared/"));
}

#[test]
fn preflight_rejects_traversal_paths() {
    let env = Env::new();
    templates(env.path());

    env.gsd()
        .args(["preflight", "--platform", "copilot"])
        .args(["--path", "../../etc/passwd", "--path", ".github/skills/ok.md"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Paths:"))
        .stderr(predicate::str::contains("Invalid path: ../../etc/passwd"))
        .stderr(predicate::str::contains("ok.md").not());
}

#[test]
fn preflight_rejects_unknown_platform() {
    let env = Env::new();
    env.gsd()
        .args(["preflight", "--platform", "vim"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown platform 'vim'"));
}

// ---------------------------------------------------------------------------
// gsd-install manifest / check-updates
// ---------------------------------------------------------------------------

#[test]
fn manifest_write_then_show() {
    let env = Env::new();
    touch(env.path(), ".claude/get-shit-done/workflows/plan.md", "w");
    touch(env.path(), ".claude/get-shit-done/references/a.md", "r");

    env.gsd()
        .args(["manifest", "write", "--platform", "claude", "--version", "2.1.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 file(s), v2.1.0"));

    let out = env
        .gsd()
        .args(["manifest", "show", "--platform", "claude", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let shown: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(shown["read"]["result"], "success");
    assert_eq!(shown["read"]["manifest"]["gsd_version"], "2.1.0");
    assert_eq!(shown["read"]["manifest"]["scope"], "local");
    assert_eq!(
        shown["read"]["manifest"]["files"],
        serde_json::json!(["references/a.md", "workflows/plan.md"])
    );
}

#[test]
fn manifest_show_corrupt_then_repair() {
    let env = Env::new();
    touch(
        env.path(),
        ".claude/skills/get-shit-done/version.json",
        r#"{"version": "2.3.0"}"#,
    );
    touch(
        env.path(),
        ".claude/get-shit-done/.gsd-install-manifest.json",
        "{ not json",
    );

    env.gsd()
        .args(["manifest", "show", "--platform", "claude"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("corrupt"));

    env.gsd()
        .args(["manifest", "repair", "--platform", "claude"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Version:   2.3.0"))
        .stdout(predicate::str::contains("Repaired:"));

    let raw = std::fs::read_to_string(
        env.path()
            .join(".claude/get-shit-done/.gsd-install-manifest.json"),
    )
    .unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(manifest["_repaired"], true);
    assert_eq!(manifest["_repair_reason"], "corrupt_or_incomplete");
}

#[test]
fn manifest_repair_without_version_fails() {
    let env = Env::new();
    touch(
        env.path(),
        ".codex/get-shit-done/.gsd-install-manifest.json",
        "{}",
    );

    env.gsd()
        .args(["manifest", "repair", "--platform", "codex"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no version declaration found"));
}

#[test]
fn check_updates_reports_major_update() {
    let env = Env::new();
    touch(env.path(), ".codex/get-shit-done/workflows/a.md", "a");
    env.gsd()
        .args(["manifest", "write", "--platform", "codex", "--version", "1.0.0"])
        .assert()
        .success();

    env.gsd()
        .args(["check-updates", "--scope", "local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Codex CLI (v1.0.0"))
        .stdout(predicate::str::contains("major update available"));
}

#[test]
fn check_updates_with_nothing_installed() {
    let env = Env::new();
    env.gsd()
        .args(["check-updates", "--scope", "local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No installations found."));
}

// ---------------------------------------------------------------------------
// settings
// ---------------------------------------------------------------------------

#[test]
fn invalid_settings_file_is_invalid_args() {
    let env = Env::new();
    let config = env.home.path().join("gsd.yaml");
    std::fs::write(&config, "max_retries: 0\n").unwrap();

    env.gsd()
        .args(["check-updates", "--scope", "local"])
        .env("GSD_CONFIG", &config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max_retries"));
}
