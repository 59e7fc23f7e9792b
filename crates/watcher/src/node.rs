//! WebSocket connection to an execution node, backed by an alloy provider.

use crate::config::WatcherConfig;
use crate::errors::{SubscriptionError, WatchError};
use crate::header::BlockHeader;
use crate::source::{subscription_channel, HeaderFeed, HeaderSubscription, NewHeads};
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use alloy::pubsub::{ConnectionHandle, PubSubConnect, Subscription};
use alloy::rpc::client::ClientBuilder;
use alloy::rpc::types::Header;
use alloy::transports::{TransportErrorKind, TransportResult};
use tokio::sync::broadcast::error::RecvError;

/// Dials like [`WsConnect`] but refuses to reconnect. The pubsub service
/// shuts down when the backend fails, which closes every subscription.
#[derive(Debug, Clone)]
struct SingleConnection(WsConnect);

impl PubSubConnect for SingleConnection {
    fn is_local(&self) -> bool {
        self.0.is_local()
    }

    async fn connect(&self) -> TransportResult<ConnectionHandle> {
        self.0.connect().await
    }

    async fn try_reconnect(&self) -> TransportResult<ConnectionHandle> {
        log::debug!("Connection to the node lost, not reconnecting");
        Err(TransportErrorKind::backend_gone())
    }
}

/// An open session with one node. Never reused across endpoints.
#[derive(Clone)]
pub struct NodeConnection {
    provider: DynProvider,
    endpoint: String,
}

impl std::fmt::Debug for NodeConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeConnection")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl NodeConnection {
    /// Opens the WebSocket session. A dropped socket ends the subscription;
    /// the client never dials the node a second time.
    pub async fn dial(config: &WatcherConfig) -> Result<Self, WatchError> {
        let endpoint = config.endpoint();
        let connect = SingleConnection(WsConnect::new(config.rpc_url().as_str()));

        let client = ClientBuilder::default()
            .pubsub(connect)
            .await
            .map_err(|e| WatchError::Connection(format!("{endpoint}: {e}")))?;
        let provider = ProviderBuilder::new().on_client(client).erased();

        log::debug!("Connected to {endpoint}");

        Ok(Self { provider, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl NewHeads for NodeConnection {
    async fn subscribe_new_heads(&self) -> Result<HeaderSubscription, WatchError> {
        let subscription = self
            .provider
            .subscribe_blocks()
            .await
            .map_err(|e| WatchError::Subscribe(format!("eth_subscribe(newHeads): {e}")))?;

        let (feed, headers) = subscription_channel();
        tokio::spawn(forward_headers(self.provider.clone(), subscription, feed));

        Ok(headers)
    }
}

/// Moves headers from the client's subscription into the feed. Holds a provider
/// handle so the socket outlives the `NodeConnection` that opened it.
async fn forward_headers(
    _provider: DynProvider,
    mut subscription: Subscription<Header>,
    feed: HeaderFeed,
) {
    loop {
        match subscription.recv().await {
            Ok(header) => {
                if !feed.announce(BlockHeader::from(&header)) {
                    return;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Header subscription lagged, {skipped} notifications were dropped");
            }
            Err(RecvError::Closed) => {
                feed.terminate(SubscriptionError::Closed);
                return;
            }
        }
    }
}
