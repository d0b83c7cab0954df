//! Startup orchestration.

use std::io;
use thiserror::Error;
use time::UtcOffset;

use crate::config::ProxyConfig;
use crate::http::ProxyServer;
use crate::lifecycle::signals::shutdown_signal;
use crate::lifecycle::Shutdown;
use crate::net::{Listener, ListenerError};
use crate::observability::AccessLogger;

/// Fatal errors while bringing the proxy up or running its accept loop.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("cannot open access log: {0}")]
    AccessLog(#[source] io::Error),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Build the access log sink named by the configuration.
pub fn access_logger(config: &ProxyConfig, offset: UtcOffset) -> Result<AccessLogger, StartupError> {
    match &config.observability.access_log {
        Some(path) => AccessLogger::open(path, offset).map_err(StartupError::AccessLog),
        None => Ok(AccessLogger::stdout(offset)),
    }
}

/// Run the proxy until a termination signal arrives.
pub async fn run(config: ProxyConfig, offset: UtcOffset) -> Result<(), StartupError> {
    let logger = access_logger(&config, offset)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        connect_timeout_secs = ?config.timeouts.connect_secs,
        io_timeout_secs = ?config.timeouts.io_secs,
        "Configuration loaded"
    );

    let server = ProxyServer::new(&config, logger);
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    shutdown.trigger_on(shutdown_signal());

    server.run(listener, shutdown_rx).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
