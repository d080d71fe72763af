//! CLI integration tests

use std::process::Command;

fn adopt() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_adopt"));
    cmd.env_remove("ADOPTIMA_API_URL");
    cmd
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = adopt()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("AdOptima"), "Should show app name");
    assert!(stdout.contains("optimize"), "Should show optimize command");
    assert!(stdout.contains("scenarios"), "Should show scenarios command");
    assert!(stdout.contains("model"), "Should show model command");
    assert!(stdout.contains("health"), "Should show health command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = adopt()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("adopt"), "Should show binary name");
}

/// Test optimize subcommand help
#[test]
fn test_optimize_help() {
    let output = adopt()
        .args(["optimize", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Optimize help should succeed");
    assert!(stdout.contains("--social"), "Should show social option");
    assert!(stdout.contains("--search"), "Should show search option");
    assert!(stdout.contains("--email"), "Should show email option");
    assert!(stdout.contains("--promotions"), "Should show promotions option");
    assert!(stdout.contains("--budget"), "Should show budget option");
    assert!(stdout.contains("--scenario"), "Should show scenario option");
}

/// Test scenarios subcommand help
#[test]
fn test_scenarios_help() {
    let output = adopt()
        .args(["scenarios", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Scenarios help should succeed");
    assert!(stdout.contains("--budget"), "Should show budget option");
    assert!(stdout.contains("--scenario"), "Should show scenario option");
}

/// Optimize requires every channel amount
#[test]
fn test_optimize_missing_channel_fails() {
    let output = adopt()
        .args(["optimize", "--social", "100", "--search", "200", "--email", "50"])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Missing --promotions should fail");
    assert!(stderr.contains("--promotions"), "Should name the missing option");
}

/// Test invalid output format
#[test]
fn test_invalid_format() {
    let output = adopt()
        .args(["--format", "yaml", "health"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Unknown format should fail");
}

/// Unreachable server surfaces a connection error
#[test]
fn test_unreachable_server() {
    let output = adopt()
        .args(["--api-url", "http://127.0.0.1:1", "health"])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Health against a closed port should fail");
    assert!(
        stderr.contains("Failed to send request"),
        "Should report the request failure"
    );
}
