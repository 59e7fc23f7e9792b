//! In-process stand-in for a node's new-heads subscription.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use watcher::{
    subscription_channel, BlockHeader, HeaderFeed, HeaderSubscription, NewHeads, SubscriptionError,
    WatchError,
};

/// Hands out a single scripted subscription. Tests drive it through the
/// [`HeaderFeed`] returned alongside it.
pub struct MockNode {
    pending: Mutex<Option<HeaderSubscription>>,
    reject_with: Option<String>,
    subscribe_calls: AtomicUsize,
}

impl MockNode {
    pub fn new() -> (Self, HeaderFeed) {
        let (feed, subscription) = subscription_channel();
        let node = Self {
            pending: Mutex::new(Some(subscription)),
            reject_with: None,
            subscribe_calls: AtomicUsize::new(0),
        };
        (node, feed)
    }

    /// A node that refuses `eth_subscribe` with the given message.
    pub fn rejecting(reason: &str) -> Self {
        Self {
            pending: Mutex::new(None),
            reject_with: Some(reason.to_string()),
            subscribe_calls: AtomicUsize::new(0),
        }
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }
}

impl NewHeads for MockNode {
    async fn subscribe_new_heads(&self) -> Result<HeaderSubscription, WatchError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = &self.reject_with {
            return Err(WatchError::Subscribe(reason.clone()));
        }

        self.pending
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| WatchError::Subscribe("mock node already subscribed".into()))
    }
}

/// Announces `headers` in order and then terminates with `error`, all before
/// the watcher gets to run.
pub fn preload(feed: HeaderFeed, headers: impl IntoIterator<Item = BlockHeader>, error: &str) {
    for header in headers {
        feed.announce(header);
    }
    feed.terminate(SubscriptionError::Terminated(error.to_string()));
}
