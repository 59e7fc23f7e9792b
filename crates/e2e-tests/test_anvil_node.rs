//! Watcher behaviour against a live Anvil node over WebSocket.

mod fixtures;

use crate::fixtures::{anvil_env, next_ack, unreachable_config, TestEnv, EVENT_TIMEOUT};
use rstest::rstest;
use test_toolkit::recording::RecordingReporter;
use watcher::{HeaderWatcher, NewHeads, NodeConnection, SubscriptionError, WatchError, WatcherConfig};

#[rstest]
#[tokio::test]
async fn dial_fails_when_nothing_listens(unreachable_config: WatcherConfig) {
    let result = tokio::time::timeout(EVENT_TIMEOUT, NodeConnection::dial(&unreachable_config))
        .await
        .expect("dial did not fail in time");

    assert!(matches!(result, Err(WatchError::Connection(_))));
}

#[rstest]
#[ignore = "requires the anvil binary in $PATH"]
#[tokio::test]
async fn reports_increasing_heads_from_anvil(anvil_env: TestEnv) {
    let connection = NodeConnection::dial(&anvil_env.config)
        .await
        .expect("failed to connect to anvil");
    let subscription = connection
        .subscribe_new_heads()
        .await
        .expect("failed to subscribe to new heads");

    let (reporter, mut acks) = RecordingReporter::acknowledging();
    let watcher = tokio::spawn(HeaderWatcher::new(subscription, reporter.clone()).run());

    let mut numbers = Vec::new();
    for _ in 0..3 {
        numbers.push(next_ack(&mut acks).await.number);
    }
    watcher.abort();

    assert!(
        numbers.windows(2).all(|pair| pair[0] < pair[1]),
        "heads not increasing: {numbers:?}"
    );
    assert_eq!(reporter.lines().len(), 3);
}

#[rstest]
#[ignore = "requires the anvil binary in $PATH"]
#[tokio::test]
async fn node_shutdown_terminates_the_watcher(anvil_env: TestEnv) {
    let TestEnv { config, anvil } = anvil_env;

    let connection = NodeConnection::dial(&config).await.unwrap();
    let subscription = connection.subscribe_new_heads().await.unwrap();
    let (reporter, mut acks) = RecordingReporter::acknowledging();
    let watcher = tokio::spawn(HeaderWatcher::new(subscription, reporter).run());

    next_ack(&mut acks).await;
    drop(anvil);

    let termination = tokio::time::timeout(EVENT_TIMEOUT, watcher)
        .await
        .expect("watcher kept running after the node went away")
        .unwrap();
    assert_eq!(termination.reason, SubscriptionError::Closed);
}
