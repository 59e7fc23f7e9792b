//! A WebSocket JSON-RPC server that plays back a fixed new-heads script.
//!
//! It understands just enough of the protocol for a pubsub client: it answers
//! `eth_subscribe`, pushes `eth_subscription` notifications and acknowledges
//! anything else with `true`. Every accepted TCP connection is counted, so a
//! test can tell whether the client came back after the socket went away.

use alloy::rpc::types::Header;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use watcher::WatcherConfig;

const SUBSCRIPTION_ID: &str = "0xcd0c3e8af590364c09d0fa6a1210faf5";

/// Pause before each notification and before the script's ending, so the
/// client sees the events one at a time.
pub const HEAD_INTERVAL: Duration = Duration::from_millis(50);

/// What the node does once every scripted head has been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// Keep the connection open until the client leaves.
    Hold,
    /// Drop the socket without a close frame.
    HangUp,
    /// Abort the TCP connection, so the client reads "connection reset".
    Reset,
}

#[derive(Debug, Clone)]
pub struct NodeScript {
    heads: Vec<u64>,
    reject_subscribe: Option<String>,
    ending: Ending,
}

impl NodeScript {
    pub fn announcing(heads: impl IntoIterator<Item = u64>) -> Self {
        Self {
            heads: heads.into_iter().collect(),
            reject_subscribe: None,
            ending: Ending::Hold,
        }
    }

    /// A node that answers `eth_subscribe` with a JSON-RPC error.
    pub fn rejecting_subscribe(reason: &str) -> Self {
        Self {
            heads: Vec::new(),
            reject_subscribe: Some(reason.to_string()),
            ending: Ending::Hold,
        }
    }

    pub fn then(mut self, ending: Ending) -> Self {
        self.ending = ending;
        self
    }
}

pub struct ScriptedNode {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    subscriptions: Arc<AtomicUsize>,
    server: JoinHandle<()>,
}

impl ScriptedNode {
    pub async fn spawn(script: NodeScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind the scripted node");
        let addr = listener.local_addr().expect("listener has a local address");

        let connections = Arc::new(AtomicUsize::new(0));
        let subscriptions = Arc::new(AtomicUsize::new(0));
        let server = tokio::spawn(accept_loop(
            listener,
            Arc::new(script),
            connections.clone(),
            subscriptions.clone(),
        ));

        Self {
            addr,
            connections,
            subscriptions,
            server,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn config(&self) -> WatcherConfig {
        WatcherConfig::new(&self.ws_url()).expect("scripted node URL is a ws:// URL")
    }

    /// TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// `eth_subscribe` calls answered with a subscription id.
    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    /// Polls until a client holds a subscription. Returns false on timeout.
    pub async fn wait_for_subscription(&self, within: Duration) -> bool {
        let poll = async {
            while self.subscriptions() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(within, poll).await.is_ok()
    }
}

impl Drop for ScriptedNode {
    fn drop(&mut self) {
        // Dropping the accept loop aborts every connection it spawned.
        self.server.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    script: Arc<NodeScript>,
    connections: Arc<AtomicUsize>,
    subscriptions: Arc<AtomicUsize>,
) {
    let mut sessions = JoinSet::new();
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                connections.fetch_add(1, Ordering::SeqCst);
                log::debug!("scripted node accepted {peer}");
                sessions.spawn(serve(stream, script.clone(), subscriptions.clone()));
            }
            Err(e) => {
                log::warn!("scripted node stopped accepting: {e}");
                return;
            }
        }
    }
}

async fn serve(stream: TcpStream, script: Arc<NodeScript>, subscriptions: Arc<AtomicUsize>) {
    let mut ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            log::debug!("websocket handshake failed: {e}");
            return;
        }
    };

    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(request) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };
        let id = request["id"].clone();

        if request["method"] != "eth_subscribe" {
            send(&mut ws, json!({"jsonrpc": "2.0", "id": id, "result": true})).await;
            continue;
        }

        if let Some(reason) = &script.reject_subscribe {
            let error = json!({"code": -32601, "message": reason});
            send(&mut ws, json!({"jsonrpc": "2.0", "id": id, "error": error})).await;
            continue;
        }

        send(&mut ws, json!({"jsonrpc": "2.0", "id": id, "result": SUBSCRIPTION_ID})).await;
        subscriptions.fetch_add(1, Ordering::SeqCst);

        for &number in &script.heads {
            tokio::time::sleep(HEAD_INTERVAL).await;
            send(&mut ws, notification(number)).await;
        }

        match script.ending {
            Ending::Hold => {}
            Ending::HangUp => {
                tokio::time::sleep(HEAD_INTERVAL * 4).await;
                return;
            }
            Ending::Reset => {
                tokio::time::sleep(HEAD_INTERVAL * 4).await;
                // A zero linger turns the close into an RST.
                #[allow(deprecated)]
                let _ = ws.get_ref().set_linger(Some(Duration::ZERO));
                return;
            }
        }
    }
}

async fn send(ws: &mut WebSocketStream<TcpStream>, body: Value) {
    if let Err(e) = ws.send(Message::text(body.to_string())).await {
        log::debug!("scripted node failed to send: {e}");
    }
}

fn notification(number: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "eth_subscription",
        "params": {"subscription": SUBSCRIPTION_ID, "result": rpc_header(number)},
    })
}

fn rpc_header(number: u64) -> Header {
    let inner = alloy::consensus::Header {
        number,
        timestamp: 1_700_000_000 + number * 12,
        gas_used: 21_000,
        base_fee_per_gas: Some(7),
        ..Default::default()
    };
    Header {
        hash: inner.hash_slow(),
        inner,
        total_difficulty: None,
        size: None,
    }
}
