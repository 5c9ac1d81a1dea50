//! CLI subprocess integration tests.
//!
//! These tests invoke the `lumen` binary as a subprocess with the mock engine
//! backend and verify exit codes, stdout content, and JSON output stability.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Run against an empty HOME so no user config is picked up.
fn lumen_bin(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_lumen"));
    cmd.env("HOME", home);
    cmd.env_remove("LUMEN_LOG");
    cmd
}

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn cli_version_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = lumen_bin(home.path()).arg("--version").output().unwrap();
    assert!(output.status.success(), "lumen --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("lumen"), "version output: {stdout}");
}

#[test]
fn cli_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let output = lumen_bin(home.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for cmd in ["play", "profiles", "options", "doctor", "completions"] {
        assert!(stdout.contains(cmd), "help must list '{cmd}'");
    }
}

#[test]
fn cli_profiles_json_lists_catalog_in_order() {
    let home = tempfile::tempdir().unwrap();
    let output = lumen_bin(home.path())
        .args(["--json", "profiles"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["light", "normal", "high"]);
    assert_eq!(json[2]["hwdec"], "auto");
    assert_eq!(json[0]["shaders"].as_array().unwrap().len(), 1);
}

#[test]
fn cli_profiles_table_marks_default() {
    let home = tempfile::tempdir().unwrap();
    let output = lumen_bin(home.path()).arg("profiles").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let normal = stdout.lines().find(|l| l.contains("normal")).unwrap();
    assert!(normal.ends_with('*'), "default profile marked: {normal}");
}

#[test]
fn cli_options_baseline() {
    let home = tempfile::tempdir().unwrap();
    let output = lumen_bin(home.path()).arg("options").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l == "profile=gpu-hq"));
    assert!(stdout.lines().any(|l| l == "hwdec-codecs=all"));
    assert!(stdout.lines().any(|l| l == "glsl-shaders-clr="));
}

#[test]
fn cli_options_profile_json_uses_shader_dir() {
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), "[shaders]\ndir = \"/opt/shaders\"\n");
    let output = lumen_bin(home.path())
        .arg("--config")
        .arg(&config)
        .args(["--json", "options", "--profile", "light"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let options = json.as_array().unwrap();
    let last = options.last().unwrap();
    assert_eq!(last["name"], "glsl-shaders-append");
    assert_eq!(last["value"], "/opt/shaders/Anime4K_Clamp_Highlights.glsl");
    assert!(options.iter().any(|o| o["name"] == "deband" && o["value"] == "no"));
}

#[test]
fn cli_unknown_profile_fails() {
    let home = tempfile::tempdir().unwrap();
    let output = lumen_bin(home.path())
        .args(["options", "--profile", "ultra"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown profile 'ultra'"));
}

#[test]
fn cli_invalid_config_exits_with_config_error() {
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), "[profile]\ndefault = \"ultra\"\n");
    let output = lumen_bin(home.path())
        .arg("--config")
        .arg(&config)
        .arg("profiles")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config error"), "stderr: {stderr}");
}

#[test]
fn cli_play_with_mock_backend() {
    let home = tempfile::tempdir().unwrap();
    let output = lumen_bin(home.path())
        .args([
            "--json",
            "play",
            "/media/episode.mkv",
            "--backend",
            "mock",
            "--profile",
            "high",
            "--exec",
            "set pause no",
        ])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["file"], "/media/episode.mkv");
    assert_eq!(json["profile"], "high");
    assert_eq!(json["backend"], "mock");
    assert_eq!(json["outcome"], "finished");
    assert_eq!(json["commands"], 2);
}

#[test]
fn cli_play_uses_config_backend_and_profile() {
    let home = tempfile::tempdir().unwrap();
    let config = write_config(
        home.path(),
        "[engine]\nbackend = \"mock\"\n[profile]\ndefault = \"light\"\n",
    );
    let output = lumen_bin(home.path())
        .arg("--config")
        .arg(&config)
        .args(["play", "clip.webm"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("light profile"), "stdout: {stdout}");
    assert!(stdout.contains("finished"));
}

#[test]
fn cli_play_unknown_backend_fails() {
    let home = tempfile::tempdir().unwrap();
    let output = lumen_bin(home.path())
        .args(["play", "clip.webm", "--backend", "gstreamer"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn cli_doctor_json_with_mock_backend() {
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), "[engine]\nbackend = \"mock\"\n");
    let output = lumen_bin(home.path())
        .arg("--config")
        .arg(&config)
        .args(["--json", "doctor"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["healthy"], true);
    let checks = json["checks"].as_array().unwrap();
    assert!(checks
        .iter()
        .any(|c| c["name"] == "backend" && c["status"] == "pass"));
}

#[test]
fn cli_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    let output = lumen_bin(home.path())
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("lumen"));
}
