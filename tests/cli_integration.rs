//! Integration tests for the `gitcoach` binary.
//!
//! These run the compiled binary against scripts in a temporary directory.
//! Config lookup is pointed at the temporary directory so a user's own
//! config file never leaks in.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Fixtures
// =============================================================================

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, contents).expect("failed to write fixture");
        path
    }

    /// The binary, isolated from any real configuration.
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("gitcoach").expect("binary builds");
        cmd.current_dir(self.path())
            .env("GITCOACH_CONFIG", self.path().join("no-config.toml"))
            .env("XDG_CONFIG_HOME", self.path())
            .env("HOME", self.path())
            .env_remove("RUST_LOG");
        cmd
    }
}

// =============================================================================
// Catalogue
// =============================================================================

#[test]
fn list_shows_builtin_scenarios() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("personal-dev"))
        .stdout(predicate::str::contains("team-collaboration"))
        .stdout(predicate::str::contains("conflict-resolution"))
        .stdout(predicate::str::contains("tagging-releases"));
}

#[test]
fn quiet_list_prints_ids_only() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["list", "--quiet"])
        .assert()
        .success()
        .stdout("personal-dev\nteam-collaboration\nconflict-resolution\ntagging-releases\n");
}

#[test]
fn show_lists_steps() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["show", "personal-dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Step 1/3: Initialize a repository"))
        .stdout(predicate::str::contains("Step 3/3: Make the first commit"));
}

#[test]
fn show_unknown_scenario_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["show", "rebasing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown scenario 'rebasing'"));
}

#[test]
fn extra_scenarios_from_flag() {
    let ws = Workspace::new();
    let extra = ws.write(
        "extra.toml",
        r#"
        [[scenario]]
        id = "stash-basics"
        title = "Stash basics"

        [[scenario.steps]]
        id = 1
        title = "Init"
        allowed_commands = ["git init"]
        expected_state = { hasGitInit = true }
        "#,
    );

    ws.cmd()
        .arg("--scenarios")
        .arg(&extra)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("stash-basics"))
        .stdout(predicate::str::contains("personal-dev"));
}

#[test]
fn invalid_extra_scenarios_fail() {
    let ws = Workspace::new();
    let extra = ws.write("bad.toml", "[[scenario]]\nid = \"x\"\n");

    ws.cmd()
        .arg("--scenarios")
        .arg(&extra)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse scenarios"));
}

// =============================================================================
// Playing scenarios
// =============================================================================

#[test]
fn play_script_to_completion() {
    let ws = Workspace::new();
    let script = ws.write(
        "steps.txt",
        "# personal development\ngit init\n\ngit add .\ngit commit -m \"Initial commit\"\n",
    );

    ws.cmd()
        .args(["play", "personal-dev", "--script"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Step 1 complete!"))
        .stdout(predicate::str::contains("[main (root-commit)"))
        .stdout(predicate::str::contains("Scenario complete: Personal development"));
}

#[test]
fn unfinished_script_fails() {
    let ws = Workspace::new();
    let script = ws.write("steps.txt", "git init\n");

    ws.cmd()
        .args(["play", "personal-dev", "--script"])
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("script ended with 1 of 3 steps completed"));
}

#[test]
fn disallowed_command_prints_hint() {
    let ws = Workspace::new();
    let script = ws.write("steps.txt", "git commit -m x\n:quit\n");

    ws.cmd()
        .args(["play", "personal-dev", "--script"])
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "hint: 'git commit -m x' is not allowed in this step",
        ));
}

#[test]
fn conflict_banner_is_shown() {
    let ws = Workspace::new();
    let script = ws.write(
        "steps.txt",
        "git checkout feature\n\
         echo \"feature version\" > app.js\n\
         git commit -am \"Change app on feature\"\n\
         git checkout main\n\
         echo \"main version\" > app.js\n\
         git commit -am \"Change app on main\"\n\
         git merge feature\n\
         echo \"merged version\" > app.js\n\
         git add app.js\n\
         git commit -m \"Merge feature\"\n",
    );

    ws.cmd()
        .args(["play", "conflict-resolution", "--script"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("CONFLICT (content): Merge conflict in app.js"))
        .stderr(predicate::str::contains("Merging 'feature' stopped with conflicts in:"))
        .stdout(predicate::str::contains("Scenario complete: Conflict resolution"));
}

// =============================================================================
// Practice
// =============================================================================

#[test]
fn practice_with_graph() {
    let ws = Workspace::new();
    let script = ws.write(
        "steps.txt",
        "git init\necho hi > a.txt\ngit add a.txt\ngit commit -m first\n:graph\n",
    );

    ws.cmd()
        .args(["practice", "--script"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("(HEAD -> main) first"));
}

#[test]
fn practice_reports_errors_and_continues() {
    let ws = Workspace::new();
    let script = ws.write("steps.txt", "git push\ngit init\n");

    ws.cmd()
        .args(["practice", "--script"])
        .arg(&script)
        .assert()
        .success()
        .stderr(predicate::str::contains("error: unknown command: git push"))
        .stdout(predicate::str::contains("Initialized empty Git repository"));
}

#[test]
fn config_sets_default_branch() {
    let ws = Workspace::new();
    let config = ws.write("config.toml", "default_branch = \"trunk\"\n");
    let script = ws.write("steps.txt", "git init\n");

    ws.cmd()
        .env("GITCOACH_CONFIG", &config)
        .args(["practice", "--script"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("default branch 'trunk'"));
}

#[test]
fn invalid_config_fails() {
    let ws = Workspace::new();
    let config = ws.write("config.toml", "colour = true\n");

    ws.cmd()
        .env("GITCOACH_CONFIG", &config)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn missing_script_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["practice", "--script", "nope.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read script 'nope.txt'"));
}

// =============================================================================
// Completion
// =============================================================================

#[test]
fn completion_bash() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gitcoach"));
}
