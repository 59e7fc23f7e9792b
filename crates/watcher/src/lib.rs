//! Watches an Ethereum-compatible node for new block headers over a WebSocket
//! subscription and reports each header's block number.
//!
//! The watcher is fail-fast: any error ends it, and whether to restart is left
//! to whoever runs it.

pub mod config;
pub mod errors;
pub mod header;
pub mod node;
pub mod source;
pub mod watch;

pub use config::{WatcherConfig, RPC_URL_ENV};
pub use errors::{ConfigError, SubscriptionError, WatchError};
pub use header::BlockHeader;
pub use node::NodeConnection;
pub use source::{subscription_channel, HeaderFeed, HeaderSubscription, NewHeads};
pub use watch::{
    header_line, termination_line, HeaderReporter, HeaderWatcher, LogReporter, Termination,
    WatcherState,
};
