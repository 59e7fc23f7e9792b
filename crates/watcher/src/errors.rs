/// The configuration source is missing a value or holds an unusable one.
/// Always detected before any network activity.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SEPOLIA_RPC_URL is not set; pass --rpc-url or set it in the environment")]
    MissingRpcUrl,

    #[error("invalid RPC URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported RPC URL scheme `{0}`: new-head subscriptions need ws:// or wss://")]
    UnsupportedScheme(String),

    #[error("invalid arguments: {0}")]
    Arguments(String),

    #[error("invalid .env file: {0}")]
    EnvFile(String),
}

/// A live subscription became unusable after it was set up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("subscription closed by the node")]
    Closed,

    #[error("{0}")]
    Terminated(String),
}

/// Setting up the subscription failed. Nothing was reported yet.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("subscription failed: {0}")]
    Subscribe(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_termination_message_is_passed_through() {
        let err = SubscriptionError::Terminated("connection reset".into());
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn missing_url_names_the_variable() {
        assert!(ConfigError::MissingRpcUrl
            .to_string()
            .contains(crate::config::RPC_URL_ENV));
    }

    #[test]
    fn setup_errors_name_the_failed_step() {
        let err = WatchError::Connection("ws://127.0.0.1:9: connection refused".into());
        assert_eq!(
            err.to_string(),
            "connection failed: ws://127.0.0.1:9: connection refused"
        );
    }
}
