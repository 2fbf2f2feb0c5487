use std::fs;

use assert_cmd::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Command isolated from any real config files or operator env vars.
fn cmd(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("ledger-agent-kit");
    cmd.env("HOME", home.path())
        .env_remove("LEDGER_ACCOUNT_ID")
        .env_remove("LEDGER_PUBLIC_KEY")
        .env_remove("RUST_LOG")
        .current_dir(home.path());
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn test_help_shows_usage() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Agent-invokable ledger tools"))
        .stdout(predicate::str::contains("--agent-mode"));
}

#[test]
fn test_version_shows_version() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ledger-agent-kit"));
}

#[test]
fn test_tools_lists_every_core_tool() {
    let home = TempDir::new().unwrap();
    let output = cmd(&home).arg("tools").output().unwrap();
    assert!(output.status.success());

    let tools = stdout_json(&output);
    let methods: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["method"].as_str().unwrap())
        .collect();
    assert_eq!(methods.len(), 16);
    assert_eq!(methods[0], "transfer_hbar");
    assert!(methods.contains(&"mint_non_fungible_token"));
    assert_eq!(methods.last(), Some(&"transfer_erc20"));
}

#[test]
fn test_tools_flag_filters_the_set() {
    let home = TempDir::new().unwrap();
    let output = cmd(&home)
        .args(["--tools", "get_hbar_balance,transfer_hbar", "tools"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let tools = stdout_json(&output);
    let methods: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["method"].as_str().unwrap())
        .collect();
    assert_eq!(methods, vec!["transfer_hbar", "get_hbar_balance"]);
}

#[test]
fn test_unknown_allowed_tool_fails_at_startup() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .args(["--tools", "launch_rocket", "tools"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("launch_rocket"));
}

#[test]
fn test_call_transfer_hbar() {
    let home = TempDir::new().unwrap();
    let output = cmd(&home)
        .args([
            "call",
            "transfer_hbar",
            r#"{"transfers":[{"account_id":"0.0.800","amount":1.5}]}"#,
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let response = stdout_json(&output);
    assert_eq!(response["result"]["status"], "success");
    assert!(
        response["result"]["transaction_id"]
            .as_str()
            .unwrap()
            .starts_with("0.0.2@")
    );
}

#[test]
fn test_call_with_bad_arguments_exits_nonzero() {
    let home = TempDir::new().unwrap();
    let output = cmd(&home)
        .args(["call", "get_hbar_balance", r#"{"account_id":"nope"}"#])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let response = stdout_json(&output);
    assert_eq!(response["result"]["status"], "error");
    assert!(response["human_message"].as_str().unwrap().contains("account_id"));
}

#[test]
fn test_bad_agent_mode_fails() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .args(["--agent-mode", "sometimes", "tools"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown agent mode"));
}

#[test]
fn test_return_bytes_mode_rejects_calls() {
    let home = TempDir::new().unwrap();
    cmd(&home)
        .args(["--agent-mode", "returnBytes", "call", "get_exchange_rate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("agent mode returnBytes is not supported"));
}

#[test]
fn test_project_config_file_sets_operator() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("agent-kit.toml"),
        "account_id = \"0.0.1234\"\ntools = [\"get_hbar_balance\"]\n",
    )
    .unwrap();

    let output = cmd(&home).arg("tools").output().unwrap();
    assert!(output.status.success());
    let tools = stdout_json(&output);
    assert_eq!(tools.as_array().unwrap().len(), 1);
    assert!(tools[0]["description"].as_str().unwrap().contains("0.0.1234"));
}

#[test]
fn test_cli_flags_override_config_file() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("custom.toml");
    fs::write(&path, "account_id = \"0.0.1234\"\n").unwrap();

    let output = cmd(&home)
        .args(["--account-id", "0.0.77", "--config"])
        .arg(&path)
        .args(["call", "get_hbar_balance"])
        .output()
        .unwrap();

    // The sandbox seeds the configured operator, so its balance is readable.
    let response = stdout_json(&output);
    assert_eq!(response["result"]["account_id"], "0.0.77");
}

#[test]
fn test_malformed_config_file_fails() {
    let home = TempDir::new().unwrap();
    fs::write(home.path().join("agent-kit.toml"), "ledger_id = 5\n").unwrap();

    cmd(&home)
        .arg("tools")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config file"));
}

#[test]
fn test_serve_answers_each_line() {
    let home = TempDir::new().unwrap();
    let input = concat!(
        r#"{"tool":"get_exchange_rate","arguments":{}}"#,
        "\n",
        "not json\n",
        r#"{"tool":"nope"}"#,
        "\n",
    );

    let output = cmd(&home).arg("serve").write_stdin(input).output().unwrap();
    assert!(output.status.success());

    let lines: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["result"]["status"], "success");
    assert!(lines[1]["result"]["error"].as_str().unwrap().starts_with("invalid request"));
    assert_eq!(lines[2]["result"]["error"], "unknown tool: nope");
}
