use crate::errors::{SubscriptionError, WatchError};
use crate::header::BlockHeader;
use futures_util::stream::{self, BoxStream};
use std::future::Future;
use tokio::sync::{mpsc, oneshot};

/// Headers in the order the node announced them. Lazy, unbounded and not restartable.
pub type HeaderStream = BoxStream<'static, BlockHeader>;

/// Resolves at most once, with the error that ended the subscription.
pub type ErrorStream = oneshot::Receiver<SubscriptionError>;

/// A connection that can open a push subscription for new block headers.
pub trait NewHeads {
    fn subscribe_new_heads(
        &self,
    ) -> impl Future<Output = Result<HeaderSubscription, WatchError>> + Send;
}

/// The two independent sequences produced by a new-heads subscription.
pub struct HeaderSubscription {
    pub headers: HeaderStream,
    pub errors: ErrorStream,
}

impl std::fmt::Debug for HeaderSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderSubscription").finish_non_exhaustive()
    }
}

/// Producer side of a [`HeaderSubscription`].
#[derive(Debug)]
pub struct HeaderFeed {
    headers: mpsc::UnboundedSender<BlockHeader>,
    error: oneshot::Sender<SubscriptionError>,
}

impl HeaderFeed {
    /// Returns `false` once the consuming side has been dropped.
    pub fn announce(&self, header: BlockHeader) -> bool {
        self.headers.send(header).is_ok()
    }

    /// Ends the subscription. Takes `self` so a feed can only terminate once.
    pub fn terminate(self, error: SubscriptionError) {
        // The watcher may already be gone; nobody is left to tell.
        let _ = self.error.send(error);
    }

    pub fn is_closed(&self) -> bool {
        self.headers.is_closed()
    }
}

pub fn subscription_channel() -> (HeaderFeed, HeaderSubscription) {
    let (headers_tx, headers_rx) = mpsc::unbounded_channel();
    let (error_tx, error_rx) = oneshot::channel();

    let headers = stream::unfold(headers_rx, |mut rx| async move {
        rx.recv().await.map(|header| (header, rx))
    });

    (
        HeaderFeed {
            headers: headers_tx,
            error: error_tx,
        },
        HeaderSubscription {
            headers: Box::pin(headers),
            errors: error_rx,
        },
    )
}
