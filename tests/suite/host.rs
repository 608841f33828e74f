//! The `beacon` binary over stdin/stdout.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::{Value, json};

fn run_host(config: &Path, input: &str) -> Vec<Value> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_beacon"))
        .env("BEACON_CONFIG", config)
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn beacon");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("reply is one JSON object per line"))
        .collect()
}

fn by_id(replies: &[Value]) -> HashMap<String, &Value> {
    replies
        .iter()
        .map(|reply| (reply["id"].to_string(), reply))
        .collect()
}

#[test]
fn one_reply_per_request() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        "[strings]\nparse_app_id = \"host-app\"\nparse_client_key = \"host-key\"\n",
    )
    .unwrap();

    let input = [
        r#"{"id": 1, "action": "initialize"}"#,
        r#"{"id": 2, "action": "setBadge", "args": [3]}"#,
        r#"{"id": 3, "action": "subscribe", "args": []}"#,
        "",
        "not json",
    ]
    .join("\n");

    let replies = run_host(&config, &input);
    assert_eq!(replies.len(), 4, "{replies:?}");
    let replies = by_id(&replies);

    let init = replies["1"];
    assert_eq!(init["status"], "ok");
    assert!(init["payload"].as_str().is_some_and(|id| !id.is_empty()));

    assert_eq!(*replies["2"], json!({"status": "not_handled", "id": 2}));

    let decode = replies["3"];
    assert_eq!(decode["status"], "error");
    assert_eq!(
        decode["message"],
        "subscribe expects exactly 1 argument(s), got 0"
    );

    let malformed = replies["null"];
    assert_eq!(malformed["status"], "error");
    assert!(
        malformed["message"]
            .as_str()
            .unwrap()
            .starts_with("malformed request")
    );
}

#[test]
fn missing_config_reports_missing_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("absent.toml");

    let replies = run_host(&config, "{\"id\": \"x\", \"action\": \"initialize\"}\n");
    assert_eq!(
        replies,
        vec![json!({
            "status": "error",
            "id": "x",
            "message": "missing configuration value 'parse_app_id'"
        })]
    );
}
