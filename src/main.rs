//! bnkv server
//!
//! Sets up logging, the numeric context, the storage engine and the TCP
//! listener, then serves clients until Ctrl+C.

use bnkv::commands::CommandHandler;
use bnkv::connection::{handle_connection, ConnectionStats};
use bnkv::decimal::context;
use bnkv::storage::StorageEngine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Server configuration
struct Config {
    host: String,
    port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: bnkv::DEFAULT_HOST.to_string(),
            port: bnkv::DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        Self::parse(std::env::args().skip(1)).unwrap_or_else(|msg| {
            eprintln!("Error: {}", msg);
            print_help();
            std::process::exit(1);
        })
    }

    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut config = Config::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => {
                    config.host = args.next().ok_or("--host requires a value")?;
                }
                "--port" | "-p" => {
                    let value = args.next().ok_or("--port requires a value")?;
                    config.port = value
                        .parse()
                        .map_err(|_| format!("invalid port number: {}", value))?;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("bnkv version {}", bnkv::VERSION);
                    std::process::exit(0);
                }
                other => return Err(format!("unknown argument: {}", other)),
            }
        }

        Ok(config)
    }

    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
bnkv - Exact decimal arithmetic over a RESP key-value store

USAGE:
    bnkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>    Host to bind to (default: {host})
    -p, --port <PORT>    Port to listen on (default: {port})
    -v, --version        Print version information
        --help           Print this help message

ENVIRONMENT:
    RUST_LOG             Log filter (default: info)

CONNECTING:
    $ redis-cli -p {port}
    127.0.0.1:{port}> BN.INCRBY acct 10.5
    "10.5"
    127.0.0.1:{port}> BN.INCRBY acct 0.25
    "10.75"
    127.0.0.1:{port}> BN.DIV 1 3
    "0.3333333333333333333333333333333333"
"#,
        host = bnkv::DEFAULT_HOST,
        port = bnkv::DEFAULT_PORT,
    );
}

fn print_banner(config: &Config) {
    let ctx = context::current();
    println!(
        r#"
   _               _
  | |__  _ __     | | ____   __
  | '_ \| '_ \    | |/ /\ \ / /
  | |_) | | | |   |   <  \ V /
  |_.__/|_| |_|   |_|\_\  \_/

bnkv v{} - decimal arithmetic over RESP
──────────────────────────────────────────
Listening on {}
Precision {} digits, rounding {}

Use Ctrl+C to shut down.
"#,
        bnkv::VERSION,
        config.bind_address(),
        ctx.precision,
        ctx.rounding.description(),
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    context::init();

    let storage = Arc::new(StorageEngine::new());
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    print_banner(&config);
    info!(address = %config.bind_address(), "Listening");

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await
            }
        }
    };

    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&storage), Arc::clone(&stats)) => {}
        _ = shutdown => {}
    }

    let store = storage.stats();
    info!(
        keys = store.keys,
        reads = store.read_ops,
        writes = store.write_ops,
        commands = stats.commands_processed.load(std::sync::atomic::Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}

async fn accept_loop(listener: TcpListener, storage: Arc<StorageEngine>, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(&storage));
                tokio::spawn(handle_connection(stream, addr, handler, Arc::clone(&stats)));
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::parse(args(&[])).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:6379");
    }

    #[test]
    fn test_config_host_and_port() {
        let config = Config::parse(args(&["--host", "0.0.0.0", "-p", "7000"])).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:7000");
    }

    #[test]
    fn test_config_errors() {
        assert!(Config::parse(args(&["--port"])).is_err());
        assert!(Config::parse(args(&["--port", "abc"])).is_err());
        assert!(Config::parse(args(&["--verbose"])).is_err());
    }
}
