//! Exit status and diagnostics of the `monitor` binary.

use std::process::{Command, Output, Stdio};
use std::time::Duration;
use test_toolkit::ws_node::{Ending, NodeScript, ScriptedNode, HEAD_INTERVAL};

const RUN_TIMEOUT: Duration = Duration::from_secs(20);

fn monitor_command(rpc_url: Option<&str>, args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_monitor"));
    // Keep a developer's .env out of the way.
    cmd.current_dir(std::env::temp_dir())
        .env_remove("SEPOLIA_RPC_URL")
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .args(args);
    if let Some(url) = rpc_url {
        cmd.env("SEPOLIA_RPC_URL", url);
    }
    cmd
}

fn run_monitor(rpc_url: Option<&str>, args: &[&str]) -> Output {
    monitor_command(rpc_url, args)
        .output()
        .expect("failed to run monitor")
}

async fn run_monitor_against(node: &ScriptedNode) -> Output {
    let cmd = monitor_command(Some(&node.ws_url()), &[]);
    let output = tokio::process::Command::from(cmd).output();
    tokio::time::timeout(RUN_TIMEOUT, output)
        .await
        .expect("monitor did not exit")
        .expect("failed to run monitor")
}

fn combined_output(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn closed_local_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .expect("failed to reserve a local port")
        .port()
}

#[test]
fn missing_rpc_url_exits_with_one() {
    let output = run_monitor(None, &[]);

    assert_eq!(output.status.code(), Some(1));
    let log = combined_output(&output);
    assert!(log.contains("SEPOLIA_RPC_URL is not set"), "{log}");
    assert!(!log.contains("failed to reach the node"), "{log}");
}

#[test]
fn empty_rpc_url_exits_with_one() {
    let output = run_monitor(Some("  "), &[]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn http_endpoint_is_rejected_before_dialing() {
    let output = run_monitor(Some("https://sepolia.example.org/v3/key"), &[]);

    assert_eq!(output.status.code(), Some(1));
    let log = combined_output(&output);
    assert!(log.contains("unsupported RPC URL scheme `https`"), "{log}");
    assert!(!log.contains("failed to reach the node"), "{log}");
}

#[test]
fn command_line_url_takes_precedence_over_environment() {
    let output = run_monitor(Some("ws://127.0.0.1:1"), &["--rpc-url", "http://localhost:8545"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("unsupported RPC URL scheme `http`"));
}

#[test]
fn unreachable_endpoint_exits_with_one() {
    let url = format!("ws://127.0.0.1:{}", closed_local_port());
    let output = run_monitor(Some(&url), &[]);

    assert_eq!(output.status.code(), Some(1));
    let log = combined_output(&output);
    assert!(log.contains("failed to reach the node"), "{log}");
    assert!(!log.contains("New block"), "{log}");
}

#[test]
fn unknown_argument_exits_with_one() {
    let output = run_monitor(Some("ws://127.0.0.1:1"), &["--frobnicate"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("invalid arguments"));
}

#[test]
fn help_exits_cleanly() {
    let output = run_monitor(None, &["--help"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("--rpc-url"));
}

#[test]
fn malformed_dotenv_exits_before_dialing() {
    let dir = std::env::temp_dir().join(format!("monitor-dotenv-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("failed to create a scratch directory");
    std::fs::write(dir.join(".env"), "RUST_LOG=info\nTHIS IS NOT A VALID LINE\n")
        .expect("failed to write .env");

    let url = format!("ws://127.0.0.1:{}", closed_local_port());
    let output = monitor_command(Some(&url), &[])
        .current_dir(&dir)
        .output()
        .expect("failed to run monitor");
    let _ = std::fs::remove_dir_all(&dir);

    assert_eq!(output.status.code(), Some(1));
    let log = combined_output(&output);
    assert!(log.contains("invalid .env file"), "{log}");
    assert!(!log.contains("failed to reach the node"), "{log}");
}

#[test]
fn missing_dotenv_is_not_an_error() {
    let dir = std::env::temp_dir().join(format!("monitor-no-dotenv-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("failed to create a scratch directory");
    let _ = std::fs::remove_file(dir.join(".env"));

    let url = format!("ws://127.0.0.1:{}", closed_local_port());
    let output = monitor_command(Some(&url), &[])
        .current_dir(&dir)
        .output()
        .expect("failed to run monitor");
    let _ = std::fs::remove_dir_all(&dir);

    assert_eq!(output.status.code(), Some(1));
    let log = combined_output(&output);
    assert!(!log.contains("invalid .env file"), "{log}");
    assert!(log.contains("failed to reach the node"), "{log}");
}

#[tokio::test]
async fn logs_every_head_then_exits_with_one_on_connection_reset() {
    let node =
        ScriptedNode::spawn(NodeScript::announcing([100, 101, 102]).then(Ending::Reset)).await;

    let output = run_monitor_against(&node).await;

    assert_eq!(output.status.code(), Some(1));
    let log = combined_output(&output);
    let heads: Vec<&str> = log
        .lines()
        .filter_map(|line| line.find("New block: ").map(|at| &line[at..]))
        .collect();
    assert_eq!(heads, ["New block: 100", "New block: 101", "New block: 102"], "{log}");
    let resets = log
        .lines()
        .filter(|line| line.contains("ERROR") && line.to_lowercase().contains("connection reset"))
        .count();
    assert_eq!(resets, 1, "{log}");
    assert_eq!(log.matches("Subscription terminated").count(), 1, "{log}");
    assert_eq!(node.connections(), 1);
}

#[tokio::test]
async fn rejected_subscribe_exits_with_one() {
    let node = ScriptedNode::spawn(NodeScript::rejecting_subscribe(
        "the method eth_subscribe does not exist/is not available",
    ))
    .await;

    let output = run_monitor_against(&node).await;

    assert_eq!(output.status.code(), Some(1));
    let log = combined_output(&output);
    assert!(log.contains("failed to subscribe to new heads"), "{log}");
    assert!(!log.contains("New block"), "{log}");
}

#[cfg(unix)]
#[tokio::test]
async fn interrupt_exits_cleanly() {
    let node = ScriptedNode::spawn(NodeScript::announcing([100])).await;
    let child = tokio::process::Command::from(monitor_command(Some(&node.ws_url()), &[]))
        .spawn()
        .expect("failed to start monitor");

    assert!(node.wait_for_subscription(RUN_TIMEOUT).await);
    tokio::time::sleep(HEAD_INTERVAL * 4).await;

    let pid = child.id().expect("monitor is still running");
    let status = Command::new("kill")
        .args(["-INT", &pid.to_string()])
        .status()
        .expect("failed to run kill");
    assert!(status.success());

    let output = tokio::time::timeout(RUN_TIMEOUT, child.wait_with_output())
        .await
        .expect("monitor ignored the interrupt")
        .expect("failed to wait for monitor");

    assert_eq!(output.status.code(), Some(0));
    let log = combined_output(&output);
    assert!(log.contains("New block: 100"), "{log}");
    assert!(log.contains("Interrupted, shutting down"), "{log}");
}
