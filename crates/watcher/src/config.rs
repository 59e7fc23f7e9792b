use crate::errors::ConfigError;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Environment variable holding the node's WebSocket endpoint.
pub const RPC_URL_ENV: &str = "SEPOLIA_RPC_URL";

/// Everything the watcher needs to reach a node. Built once at process entry
/// and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    rpc_url: Url,
}

impl WatcherConfig {
    pub fn new(rpc_url: &str) -> Result<Self, ConfigError> {
        let rpc_url = rpc_url.trim();
        if rpc_url.is_empty() {
            return Err(ConfigError::MissingRpcUrl);
        }

        let rpc_url = Url::parse(rpc_url)?;
        match rpc_url.scheme() {
            "ws" | "wss" => Ok(Self { rpc_url }),
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    /// Returns `scheme://host[:port]`. Hosted endpoints embed API keys in the
    /// path or query, so this is the only form of the URL that gets logged.
    pub fn endpoint(&self) -> String {
        let host = self.rpc_url.host_str().unwrap_or_default();
        match self.rpc_url.port() {
            Some(port) => format!("{}://{host}:{port}", self.rpc_url.scheme()),
            None => format!("{}://{host}", self.rpc_url.scheme()),
        }
    }
}

impl FromStr for WatcherConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for WatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint())
    }
}
