/*!
 * Binary-level tests for the offline paths of the w3stat CLI
 */

use std::io::Write;
use std::process::{Command, Output, Stdio};
use tempfile::tempdir;

const V0: &str = "QmdfTbBqBPQ7VNxZEYEj14VmRuZBkqFbiwReogJgS1zR1n";
const V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

fn w3stat() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_w3stat"));
    cmd.env_remove("R2_ACCESS_KEY_ID")
        .env_remove("R2_SECRET_ACCESS_KEY")
        .env_remove("W3STAT_LOG");
    cmd
}

fn run_with_stdin(mut cmd: Command, input: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn w3stat");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_mh_from_args() {
    let output = w3stat().args(["mh", V0, V1]).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let expected = format!("z{}", V0);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec![expected.as_str(); 2]);
}

#[test]
fn test_mh_from_stdin_reports_bad_lines() {
    let mut cmd = w3stat();
    cmd.arg("mh");
    let output = run_with_stdin(cmd, &format!("{}\nnot-a-cid\n{}\n", V1, V0));
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], format!("z{}", V0));
    assert!(lines[1].contains("not-a-cid"));
    assert_eq!(lines[2], lines[0]);
}

#[test]
fn test_mh_json() {
    let output = w3stat().args(["mh", "--json", V1]).output().unwrap();
    assert!(output.status.success());

    let row: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(row["cid"], V1);
    assert_eq!(row["multihash"], format!("z{}", V0));
}

#[test]
fn test_missing_r2_credentials_is_fatal() {
    for args in [vec![V1], vec!["cid", V1], vec!["dudewhere", V1]] {
        let output = w3stat().args(&args).output().unwrap();
        assert_eq!(output.status.code(), Some(2), "args {:?}", args);
        assert!(output.stdout.is_empty());

        let stderr = String::from_utf8(output.stderr).unwrap();
        assert!(stderr.contains("R2_ACCESS_KEY_ID must be set in ENV"), "{}", stderr);
    }
}

#[test]
fn test_missing_credentials_checked_before_stdin() {
    let mut cmd = w3stat();
    cmd.arg("dudewhere");
    let output = run_with_stdin(cmd, &format!("{}\n", V1));
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_invalid_config_is_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("w3stat.toml");
    std::fs::write(&path, "table = \"\"\n").unwrap();

    let output = w3stat()
        .args(["dynamo", V1, "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let output = w3stat().args(["denylist", V1, "--timeout", "0"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_completions() {
    let output = w3stat().args(["completions", "bash"]).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("w3stat"));
}
