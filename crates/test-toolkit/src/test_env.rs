//! Shared fixtures for the end-to-end test crate.
//!
//! * [`anvil_env`] requires the `anvil` binary somewhere in `$PATH` (or `foundryup --bin anvil`).
//! * Anvil mines a block every second, so a subscriber sees a steady stream of new heads.

use crate::mock_node::MockNode;
use crate::recording::RecordingReporter;
use alloy::node_bindings::{Anvil, AnvilInstance};
use rstest::*;
use tokio::sync::mpsc;
use watcher::{BlockHeader, HeaderFeed, WatcherConfig};

pub struct TestEnv {
    pub config: WatcherConfig,
    pub anvil: AnvilInstance,
}

#[fixture]
pub fn anvil_env() -> TestEnv {
    let anvil = Anvil::new()
        .block_time(1)
        .chain_id(1337)
        .try_spawn()
        .expect("failed to spawn anvil instance");

    let config =
        WatcherConfig::new(&anvil.ws_endpoint()).expect("anvil ws endpoint is a ws:// URL");

    TestEnv {
        config,
        anvil,
    }
}

/// A ws:// endpoint nothing listens on.
#[fixture]
pub fn unreachable_config() -> WatcherConfig {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .expect("failed to reserve a local port")
        .port();

    WatcherConfig::new(&format!("ws://127.0.0.1:{port}")).expect("valid ws URL")
}

pub struct MockEnv {
    pub node: MockNode,
    pub feed: HeaderFeed,
    pub reporter: RecordingReporter,
    pub acks: mpsc::UnboundedReceiver<BlockHeader>,
}

#[fixture]
pub fn mock_env() -> MockEnv {
    let (node, feed) = MockNode::new();
    let (reporter, acks) = RecordingReporter::acknowledging();

    MockEnv {
        node,
        feed,
        reporter,
        acks,
    }
}
