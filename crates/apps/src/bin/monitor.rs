use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;
use watcher::{
    ConfigError, HeaderWatcher, LogReporter, NewHeads, NodeConnection, Termination, WatcherConfig,
    RPC_URL_ENV,
};

/// Logs the block number of every new head announced by an Ethereum node.
///
/// Exits with status 1 on the first error of any kind. There is no reconnect;
/// run it under a supervisor if it should keep going.
#[derive(Parser)]
#[command(version)]
struct CliArgs {
    /// WebSocket RPC endpoint URL (ws:// or wss://)
    #[arg(long, env = RPC_URL_ENV)]
    rpc_url: Option<String>,
}

fn parse_args() -> Result<CliArgs, ConfigError> {
    match CliArgs::try_parse() {
        Ok(args) => Ok(args),
        Err(e) if e.use_stderr() => Err(ConfigError::Arguments(e.to_string())),
        // --help and --version
        Err(e) => e.exit(),
    }
}

async fn monitor() -> Result<Termination<LogReporter>> {
    let args = parse_args()?;
    let config = WatcherConfig::new(args.rpc_url.as_deref().unwrap_or_default())?;

    log::debug!("Watching new heads on {config}");

    let connection = NodeConnection::dial(&config)
        .await
        .context("failed to reach the node")?;
    let subscription = connection
        .subscribe_new_heads()
        .await
        .context("failed to subscribe to new heads")?;

    log::debug!("Subscribed to new heads on {}", connection.endpoint());

    Ok(HeaderWatcher::new(subscription, LogReporter).run().await)
}

/// Loads `.env` from the working directory or one of its parents. Having no
/// such file is fine; a file that does not parse is not.
fn load_dotenv() -> Result<(), ConfigError> {
    match dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(ConfigError::EnvFile(e.to_string())),
    }
}

#[tokio::main]
async fn main() {
    // Before tracing, so RUST_LOG may come from .env.
    let dotenv = load_dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = dotenv {
        log::error!("{e}");
        std::process::exit(1);
    }

    let code = tokio::select! {
        result = monitor() => match result {
            // LogReporter has already logged the reason.
            Ok(_termination) => 1,
            Err(e) => {
                log::error!("{e:#}");
                1
            }
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            log::info!("Interrupted, shutting down");
            0
        }
    };

    std::process::exit(code);
}
