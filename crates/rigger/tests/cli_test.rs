#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;

fn rigger() -> Command {
    let mut cmd = Command::cargo_bin("rigger").unwrap();
    for var in [
        "RIGGER_REPO",
        "RIGGER_IMAGE_NAME",
        "RIGGER_CREDENTIALS_KEY",
        "RIGGER_REGION",
        "RIGGER_REGISTRY_ID",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    rigger()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--repo"))
        .stdout(predicate::str::contains("--name"))
        .stdout(predicate::str::contains("--credentials-key"))
        .stdout(predicate::str::contains("--region"))
        .stdout(predicate::str::contains("--registry-id"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    rigger()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rigger"));
}

/// --repo が無ければ起動前にエラー
#[test]
fn test_missing_repo_is_usage_error() {
    rigger()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--repo"));
}

/// .git で終わらない参照はネットワークに触れる前に拒否される
#[test]
fn test_invalid_reference_fails_before_network() {
    rigger()
        .args(["-r", "github.com/acme/widget"])
        .env("DOCKER_HOST", "tcp://127.0.0.1:1")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing .git ending"));
}

/// 環境変数からも参照を受け取る
#[test]
fn test_repo_from_env() {
    rigger()
        .env("RIGGER_REPO", "ssh://github.com/acme/widget.git")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unsupported scheme"));
}
