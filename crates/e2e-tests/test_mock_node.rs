//! Watcher behaviour against a scripted node.

mod fixtures;

use crate::fixtures::{mock_env, next_ack, MockEnv};
use alloy_primitives::U256;
use rstest::rstest;
use test_toolkit::header;
use test_toolkit::mock_node::{preload, MockNode};
use test_toolkit::recording::RecordingReporter;
use watcher::{BlockHeader, HeaderWatcher, NewHeads, SubscriptionError, WatchError};

#[rstest]
#[tokio::test]
async fn reports_three_heads_then_connection_reset(mock_env: MockEnv) {
    let MockEnv {
        node,
        feed,
        reporter,
        mut acks,
    } = mock_env;

    let subscription = node
        .subscribe_new_heads()
        .await
        .expect("mock subscription");
    let watcher = tokio::spawn(HeaderWatcher::new(subscription, reporter.clone()).run());

    for number in [100u64, 101, 102] {
        feed.announce(header(number));
        assert_eq!(next_ack(&mut acks).await.number, U256::from(number));
    }
    feed.terminate(SubscriptionError::Terminated("connection reset".into()));

    let termination = watcher.await.expect("watcher task panicked");

    assert_eq!(
        termination.reason,
        SubscriptionError::Terminated("connection reset".into())
    );
    assert_eq!(
        reporter.lines(),
        vec![
            "New block: 100",
            "New block: 101",
            "New block: 102",
            "Subscription terminated: connection reset",
        ]
    );
}

#[rstest]
#[tokio::test]
async fn one_line_per_head_in_announcement_order(mock_env: MockEnv) {
    let MockEnv {
        node,
        feed,
        reporter,
        mut acks,
    } = mock_env;

    let subscription = node.subscribe_new_heads().await.unwrap();
    let watcher = tokio::spawn(HeaderWatcher::new(subscription, reporter.clone()).run());

    // Out of order and repeated on purpose: nothing is reordered or deduplicated.
    let numbers = [7u64, 9, 8, 8, 12];
    for number in numbers {
        feed.announce(header(number));
        next_ack(&mut acks).await;
    }
    drop(feed);

    let termination = watcher.await.unwrap();
    assert_eq!(termination.reason, SubscriptionError::Closed);

    let expected: Vec<String> = numbers
        .iter()
        .map(|n| format!("New block: {n}"))
        .chain(["Subscription terminated: subscription closed by the node".to_string()])
        .collect();
    assert_eq!(reporter.lines(), expected);
}

#[rstest]
#[tokio::test]
async fn block_number_past_u64_survives_in_the_log_line(mock_env: MockEnv) {
    let MockEnv {
        node,
        feed,
        reporter,
        mut acks,
    } = mock_env;

    let subscription = node.subscribe_new_heads().await.unwrap();
    let watcher = tokio::spawn(HeaderWatcher::new(subscription, reporter.clone()).run());

    let number: U256 = "18446744073709551616".parse().unwrap();
    feed.announce(BlockHeader::with_number(number));
    next_ack(&mut acks).await;
    feed.terminate(SubscriptionError::Closed);
    watcher.await.unwrap();

    assert_eq!(reporter.lines()[0], "New block: 18446744073709551616");
}

#[tokio::test]
async fn error_ahead_of_buffered_heads_stops_processing() {
    let (node, feed) = MockNode::new();
    preload(feed, [header(1), header(2), header(3)], "connection reset");

    let reporter = RecordingReporter::default();
    let subscription = node.subscribe_new_heads().await.unwrap();
    let termination = HeaderWatcher::new(subscription, reporter.clone()).run().await;

    assert_eq!(
        termination.reason,
        SubscriptionError::Terminated("connection reset".into())
    );
    assert_eq!(
        reporter.lines(),
        vec!["Subscription terminated: connection reset"]
    );
}

#[tokio::test]
async fn rejected_subscribe_is_a_setup_error() {
    let node = MockNode::rejecting("the method eth_subscribe does not exist/is not available");

    let err = node.subscribe_new_heads().await.unwrap_err();

    assert!(matches!(err, WatchError::Subscribe(_)));
    assert!(err.to_string().contains("eth_subscribe"));
    assert_eq!(node.subscribe_calls(), 1);
}

#[tokio::test]
async fn a_subscription_is_handed_out_once() {
    let (node, _feed) = MockNode::new();

    node.subscribe_new_heads().await.unwrap();
    let second = node.subscribe_new_heads().await;

    assert!(matches!(second, Err(WatchError::Subscribe(_))));
    assert_eq!(node.subscribe_calls(), 2);
}
