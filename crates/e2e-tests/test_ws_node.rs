//! Watcher behaviour over a real WebSocket connection to a scripted node.

mod fixtures;

use crate::fixtures::EVENT_TIMEOUT;
use std::time::Duration;
use test_toolkit::recording::RecordingReporter;
use test_toolkit::ws_node::{Ending, NodeScript, ScriptedNode, HEAD_INTERVAL};
use watcher::{HeaderWatcher, NewHeads, NodeConnection, SubscriptionError, WatchError};

#[tokio::test]
async fn dropped_socket_ends_the_watcher_without_redialing() {
    let node = ScriptedNode::spawn(NodeScript::announcing([100]).then(Ending::HangUp)).await;
    let connection = NodeConnection::dial(&node.config())
        .await
        .expect("failed to connect to the scripted node");
    let subscription = connection
        .subscribe_new_heads()
        .await
        .expect("failed to subscribe to new heads");

    let termination = tokio::time::timeout(
        EVENT_TIMEOUT,
        HeaderWatcher::new(subscription, RecordingReporter::default()).run(),
    )
    .await
    .expect("watcher kept running after the node hung up");

    assert_eq!(termination.reason, SubscriptionError::Closed);
    assert_eq!(
        termination.reporter.lines(),
        vec!["New block: 100", "Subscription terminated: subscription closed by the node"]
    );

    // Leave room for a reconnect attempt to show up.
    tokio::time::sleep(HEAD_INTERVAL * 4).await;
    assert_eq!(node.connections(), 1);
    assert_eq!(node.subscriptions(), 1);
}

#[tokio::test]
async fn reset_connection_ends_the_watcher_after_every_announced_head() {
    let node =
        ScriptedNode::spawn(NodeScript::announcing([100, 101, 102]).then(Ending::Reset)).await;
    let connection = NodeConnection::dial(&node.config())
        .await
        .expect("failed to connect to the scripted node");
    let subscription = connection
        .subscribe_new_heads()
        .await
        .expect("failed to subscribe to new heads");

    let termination = tokio::time::timeout(
        EVENT_TIMEOUT,
        HeaderWatcher::new(subscription, RecordingReporter::default()).run(),
    )
    .await
    .expect("watcher kept running after the connection reset");

    let lines = termination.reporter.lines();
    assert_eq!(
        lines[..3],
        ["New block: 100", "New block: 101", "New block: 102"]
    );
    assert_eq!(lines.len(), 4);
    assert_eq!(node.connections(), 1);
}

#[tokio::test]
async fn rejected_subscribe_is_a_setup_error() {
    let node = ScriptedNode::spawn(NodeScript::rejecting_subscribe(
        "the method eth_subscribe does not exist/is not available",
    ))
    .await;
    let connection = NodeConnection::dial(&node.config())
        .await
        .expect("failed to connect to the scripted node");

    let result = tokio::time::timeout(Duration::from_secs(5), connection.subscribe_new_heads())
        .await
        .expect("subscribe did not answer in time");

    match result {
        Err(WatchError::Subscribe(message)) => {
            assert!(message.contains("eth_subscribe does not exist"), "{message}")
        }
        other => panic!("expected a subscribe error, got {other:?}"),
    }
    assert_eq!(node.subscriptions(), 0);
}
