//! Shared fixtures for the end-to-end test crate.
//!
//! Tests against a live node need the `anvil` binary somewhere in `$PATH`
//! (or `foundryup --bin anvil`) and are ignored by default; run them with
//! `cargo test -p e2e-tests -- --ignored`.

use std::time::Duration;
use tokio::sync::mpsc;
use watcher::BlockHeader;

#[allow(unused_imports)]
pub use test_toolkit::test_env::{anvil_env, mock_env, unreachable_config, MockEnv, TestEnv};

/// Upper bound on waiting for one watcher event. Anvil mines every second.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Waits until the watcher has reported its next header.
#[allow(dead_code)]
pub async fn next_ack(acks: &mut mpsc::UnboundedReceiver<BlockHeader>) -> BlockHeader {
    tokio::time::timeout(EVENT_TIMEOUT, acks.recv())
        .await
        .expect("timed out waiting for the watcher to report a header")
        .expect("watcher dropped its reporter")
}
