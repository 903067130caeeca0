//! Integration tests for the kiln CLI

use std::path::PathBuf;
use std::process::{Command, Output};

fn recipe(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../recipes")
        .join(name)
        .join("recipe.yml")
}

/// Run kiln against an empty config file so the host config is ignored
fn kiln(args: &[&str]) -> Output {
    let temp = tempfile::tempdir().expect("create temp dir");
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "").expect("write config");

    Command::new(env!("CARGO_BIN_EXE_kiln"))
        .arg("--config")
        .arg(&config)
        .arg("--color")
        .arg("never")
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("KILN_COLOR")
        .env_remove("KILN_BUILD_JOBS")
        .env_remove("KILN_WORKSPACE")
        .output()
        .expect("run kiln")
}

#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_kiln"))
        .arg("--version")
        .output()
        .expect("Failed to execute kiln");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("kiln"));
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_kiln"))
        .arg("--help")
        .output()
        .expect("Failed to execute kiln");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("build"));
    assert!(stdout.contains("validate"));
}

#[test]
fn test_invalid_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_kiln"))
        .arg("invalid-command")
        .output()
        .expect("Failed to execute kiln");

    assert!(!output.status.success());
}

#[test]
fn test_info_lists_versions_as_json() {
    let recipe = recipe("libxmlpp");
    let output = kiln(&["info", recipe.to_str().unwrap(), "--json"]);

    assert!(output.status.success(), "{output:?}");
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["kind"], "info");
    assert_eq!(json["name"], "libxmlpp");
    assert_eq!(json["build_system"], "meson");
    let versions = json["versions"].as_array().unwrap();
    assert!(versions.iter().any(|v| v == "5.4.0"));
}

#[test]
fn test_validate_reports_cppstd() {
    let recipe = recipe("libxmlpp");
    let output = kiln(&[
        "validate",
        recipe.to_str().unwrap(),
        "--version",
        "5.4.0",
        "-s",
        "os=Linux",
        "-s",
        "arch=x86_64",
        "-s",
        "compiler=gcc",
        "-s",
        "compiler.version=13",
        "-o",
        "libxmlpp:shared=True",
        "--json",
    ]);

    assert!(output.status.success(), "{output:?}");
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["kind"], "validate");
    assert_eq!(json["options"]["shared"], true);
    assert!(json["options"].get("fPIC").is_none());
}

#[test]
fn test_validate_rejects_shared_msvc() {
    let recipe = recipe("testcpp");
    let output = kiln(&[
        "validate",
        recipe.to_str().unwrap(),
        "--version",
        "0.1.0",
        "-s",
        "os=Windows",
        "-s",
        "arch=x86_64",
        "-s",
        "compiler=msvc",
        "-s",
        "compiler.version=193",
        "-s",
        "compiler.runtime=dynamic",
        "-o",
        "shared=True",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("configuration.invalid_combination"), "{stderr}");
}

#[test]
fn test_build_rejects_missing_dependency_folder() {
    let recipe = recipe("testcpp");
    let temp = tempfile::tempdir().unwrap();
    let workspace = temp.path().join("ws");
    let missing = temp.path().join("no-such-dep");
    let output = kiln(&[
        "build",
        recipe.to_str().unwrap(),
        "--version",
        "0.1.0",
        "-s",
        "os=Linux",
        "-s",
        "arch=x86_64",
        "-s",
        "compiler=gcc",
        "-s",
        "compiler.version=13",
        "--workspace",
        workspace.to_str().unwrap(),
        "--deps",
        missing.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "{stderr}");
    assert!(!workspace.exists());
}
