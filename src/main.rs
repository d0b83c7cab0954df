//! Forwarding HTTP proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client                    ┌──────────────────────────────────────────┐
//!     ──── GET http://h/p ─────▶│  net::listener ──▶ http::session          │
//!                               │                      │  decompose URI      │
//!                               │                      │  rewrite line       │
//!                               │                      ▼                     │      Origin
//!                               │                 connect h:port ───────────┼────▶ server
//!     ◀──── response bytes ─────┼──────────────── relay response ◀──────────┼─────
//!                               │                      │                     │
//!                               │                      ▼                     │
//!                               │          observability::access_log         │
//!                               └──────────────────────────────────────────┘
//! ```
//!
//! One request per connection. Every accepted connection runs as its own task.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use time::UtcOffset;

use forward_proxy::config::{load_config, ProxyConfig};
use forward_proxy::lifecycle::startup;
use forward_proxy::observability::logging::init_logging;

/// Forwarding HTTP proxy: relays one absolute-URI request per connection.
#[derive(Debug, Parser)]
#[command(name = "forward-proxy", version, about)]
struct Cli {
    /// TCP port to listen on
    port: u16,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(_) => {
            eprintln!("{}", Cli::command().render_usage());
            std::process::exit(0);
        }
    };

    // Must be read while the process is still single-threaded.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    config.set_port(cli.port);

    init_logging(&config.observability.log_level);
    tracing::info!("forward-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(startup::run(config, offset))?;
    Ok(())
}
