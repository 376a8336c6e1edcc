// CLI integration tests for config handling and error reporting.
use std::net::TcpListener;
use std::path::Path;
use std::process::Command;

use serde_json::Value;

fn cmd(config: &Path) -> Command {
    let exe = env!("CARGO_BIN_EXE_board");
    let mut command = Command::new(exe);
    command
        .env_remove("BOARD_BASE_URL")
        .env_remove("BOARD_PASSWORD")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config);
    command
}

fn parse_json_line(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    let line = text.lines().next().expect("json line");
    serde_json::from_str(line).expect("valid json")
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

#[test]
fn set_url_persists_and_show_reads_it() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("board").join("config.json");

    let set = cmd(&config)
        .args(["config", "set-url", "https://board.example/"])
        .output()
        .expect("set-url");
    assert!(set.status.success());
    let set_json = parse_json_line(&set.stdout);
    assert_eq!(set_json["baseUrl"], "https://board.example");
    assert!(config.exists());

    let show = cmd(&config)
        .args(["config", "show"])
        .output()
        .expect("show");
    assert!(show.status.success());
    let show_json = parse_json_line(&show.stdout);
    assert_eq!(show_json["baseUrl"], "https://board.example");
    assert_eq!(show_json["pageSize"], 20);
}

#[test]
fn env_and_flag_override_stored_url() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("config.json");
    std::fs::write(&config, r#"{"baseUrl":"http://file:1"}"#).expect("write");

    let env_only = cmd(&config)
        .env("BOARD_BASE_URL", "http://env:2")
        .args(["config", "show"])
        .output()
        .expect("show");
    assert_eq!(parse_json_line(&env_only.stdout)["baseUrl"], "http://env:2");

    let flagged = cmd(&config)
        .env("BOARD_BASE_URL", "http://env:2")
        .args(["--base-url", "http://flag:3", "config", "show"])
        .output()
        .expect("show");
    assert_eq!(parse_json_line(&flagged.stdout)["baseUrl"], "http://flag:3");
}

#[test]
fn invalid_url_is_usage_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("config.json");
    let output = cmd(&config)
        .args(["config", "set-url", "ftp://board.example"])
        .output()
        .expect("set-url");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
    assert!(!config.exists());
}

#[test]
fn unreachable_service_exits_with_network_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("config.json");
    let base_url = format!("http://127.0.0.1:{}", closed_port());
    let output = cmd(&config)
        .args(["--base-url", &base_url, "posts", "list"])
        .output()
        .expect("posts list");
    assert_eq!(output.status.code(), Some(3));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Network");
    assert!(err["error"]["hint"].as_str().is_some());
}

#[test]
fn writes_without_credentials_are_auth_errors() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("config.json");
    let base_url = format!("http://127.0.0.1:{}", closed_port());
    let output = cmd(&config)
        .args([
            "--base-url",
            &base_url,
            "posts",
            "create",
            "--title",
            "T1",
            "--content",
            "C1",
        ])
        .output()
        .expect("posts create");
    assert_eq!(output.status.code(), Some(7));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Auth");
    assert_eq!(err["error"]["message"], "not signed in");
}

#[test]
fn bad_arguments_exit_with_usage_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = temp.path().join("config.json");
    let output = cmd(&config)
        .args(["posts", "list", "--page", "two"])
        .output()
        .expect("posts list");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
}
